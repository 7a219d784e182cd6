//! Contact / quote inquiry queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::inquiry::{Inquiry, ListInquiriesRequest, SubmitInquiryRequest};

pub async fn insert_inquiry(pool: &PgPool, req: &SubmitInquiryRequest) -> Result<Inquiry> {
    let inquiry = sqlx::query_as::<_, Inquiry>(
        r#"
        INSERT INTO inquiries (id, kind, name, email, phone, subject, message, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NOW())
        RETURNING id, kind, name, email, phone, subject, message, is_read, created_at
        "#
    )
    .bind(Uuid::new_v4())
    .bind(req.kind)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.subject)
    .bind(&req.message)
    .fetch_one(pool)
    .await?;

    Ok(inquiry)
}

/// List inquiries, newest first, with the total matching the same filter
pub async fn list_inquiries(pool: &PgPool, req: &ListInquiriesRequest) -> Result<(Vec<Inquiry>, i64)> {
    let items = sqlx::query_as::<_, Inquiry>(
        r#"
        SELECT id, kind, name, email, phone, subject, message, is_read, created_at
        FROM inquiries
        WHERE ($1::inquiry_kind IS NULL OR kind = $1)
          AND (NOT $2 OR NOT is_read)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#
    )
    .bind(req.kind)
    .bind(req.unread_only)
    .bind(req.limit)
    .bind(req.offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM inquiries
        WHERE ($1::inquiry_kind IS NULL OR kind = $1)
          AND (NOT $2 OR NOT is_read)
        "#
    )
    .bind(req.kind)
    .bind(req.unread_only)
    .fetch_one(pool)
    .await?;

    Ok((items, total.0))
}

pub async fn mark_read(pool: &PgPool, inquiry_id: Uuid, is_read: bool) -> Result<Option<Inquiry>> {
    let inquiry = sqlx::query_as::<_, Inquiry>(
        r#"
        UPDATE inquiries SET is_read = $2
        WHERE id = $1
        RETURNING id, kind, name, email, phone, subject, message, is_read, created_at
        "#
    )
    .bind(inquiry_id)
    .bind(is_read)
    .fetch_optional(pool)
    .await?;

    Ok(inquiry)
}

pub async fn delete_inquiry(pool: &PgPool, inquiry_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM inquiries WHERE id = $1")
        .bind(inquiry_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_unread(pool: &PgPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inquiries WHERE NOT is_read")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}
