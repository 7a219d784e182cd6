//! Career posting database queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::career::{Career, CreateCareerRequest, UpdateCareerRequest};

pub async fn create_career(pool: &PgPool, req: &CreateCareerRequest, slug: &str) -> Result<Career> {
    let career = sqlx::query_as::<_, Career>(
        r#"
        INSERT INTO careers (
            id, title, slug, location, employment_type, description, is_open,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
        RETURNING *
        "#
    )
    .bind(Uuid::new_v4())
    .bind(&req.title)
    .bind(slug)
    .bind(&req.location)
    .bind(&req.employment_type)
    .bind(&req.description)
    .bind(req.is_open)
    .fetch_one(pool)
    .await?;

    Ok(career)
}

/// Public detail lookup; closed postings are not visible
pub async fn get_open_career_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Career>> {
    let career = sqlx::query_as::<_, Career>(
        "SELECT * FROM careers WHERE slug = $1 AND is_open"
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(career)
}

/// List postings, newest first. `open_only` restricts to open postings.
pub async fn list_careers(pool: &PgPool, open_only: bool, limit: i64, offset: i64) -> Result<Vec<Career>> {
    let careers = sqlx::query_as::<_, Career>(
        r#"
        SELECT * FROM careers
        WHERE (NOT $1 OR is_open)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    )
    .bind(open_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(careers)
}

pub async fn count_careers(pool: &PgPool, open_only: bool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM careers WHERE (NOT $1 OR is_open)")
        .bind(open_only)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

pub async fn slug_exists(pool: &PgPool, slug: &str, except_id: Option<Uuid>) -> Result<bool> {
    let exists: bool = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM careers WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(except_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Update a posting; `slug` is the already-normalised new slug, if any
pub async fn update_career(pool: &PgPool, req: &UpdateCareerRequest, slug: Option<&str>) -> Result<Option<Career>> {
    let career = sqlx::query_as::<_, Career>(
        r#"
        UPDATE careers
        SET
            title = COALESCE($2, title),
            slug = COALESCE($3, slug),
            location = COALESCE($4, location),
            employment_type = COALESCE($5, employment_type),
            description = COALESCE($6, description),
            is_open = COALESCE($7, is_open),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#
    )
    .bind(req.id)
    .bind(&req.title)
    .bind(slug)
    .bind(&req.location)
    .bind(&req.employment_type)
    .bind(&req.description)
    .bind(req.is_open)
    .fetch_optional(pool)
    .await?;

    Ok(career)
}

pub async fn delete_career(pool: &PgPool, career_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM careers WHERE id = $1")
        .bind(career_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
