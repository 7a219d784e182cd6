//! Blog post database queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::blog::BlogPost;

pub async fn create_post(
    pool: &PgPool,
    title: &str,
    content: Option<&str>,
    image_url: Option<&str>,
    slug: &str,
) -> Result<BlogPost> {
    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        INSERT INTO blog_posts (id, title, content, image_url, slug, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        RETURNING id, title, content, image_url, slug, created_at, updated_at
        "#
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(content)
    .bind(image_url)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(post)
}

pub async fn get_post(pool: &PgPool, post_id: Uuid) -> Result<Option<BlogPost>> {
    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        SELECT id, title, content, image_url, slug, created_at, updated_at
        FROM blog_posts
        WHERE id = $1
        "#
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

pub async fn get_post_by_slug(pool: &PgPool, slug: &str) -> Result<Option<BlogPost>> {
    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        SELECT id, title, content, image_url, slug, created_at, updated_at
        FROM blog_posts
        WHERE slug = $1
        "#
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// List posts, newest first
pub async fn list_posts(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<BlogPost>> {
    let posts = sqlx::query_as::<_, BlogPost>(
        r#"
        SELECT id, title, content, image_url, slug, created_at, updated_at
        FROM blog_posts
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

pub async fn count_posts(pool: &PgPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Whether a slug is used by any post other than `except_id`
pub async fn slug_exists(pool: &PgPool, slug: &str, except_id: Option<Uuid>) -> Result<bool> {
    let exists: bool = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM blog_posts WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(except_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn update_post(
    pool: &PgPool,
    post_id: Uuid,
    title: Option<&str>,
    content: Option<&str>,
    image_url: Option<&str>,
    slug: Option<&str>,
) -> Result<Option<BlogPost>> {
    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        UPDATE blog_posts
        SET
            title = COALESCE($2, title),
            content = COALESCE($3, content),
            image_url = COALESCE($4, image_url),
            slug = COALESCE($5, slug),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, title, content, image_url, slug, created_at, updated_at
        "#
    )
    .bind(post_id)
    .bind(title)
    .bind(content)
    .bind(image_url)
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

pub async fn delete_post(pool: &PgPool, post_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
