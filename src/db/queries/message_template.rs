//! SMS / mail template queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::message_template::{
    CreateMessageTemplateRequest, MessageTemplate, TemplateChannel, UpdateMessageTemplateRequest,
};

pub async fn create_template(pool: &PgPool, req: &CreateMessageTemplateRequest) -> Result<MessageTemplate> {
    let template = sqlx::query_as::<_, MessageTemplate>(
        r#"
        INSERT INTO message_templates (id, name, channel, subject, body, is_selected, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, NOW(), NOW())
        RETURNING id, name, channel, subject, body, is_selected, created_at, updated_at
        "#
    )
    .bind(Uuid::new_v4())
    .bind(&req.name)
    .bind(req.channel)
    .bind(&req.subject)
    .bind(&req.body)
    .fetch_one(pool)
    .await?;

    Ok(template)
}

pub async fn get_template(pool: &PgPool, template_id: Uuid) -> Result<Option<MessageTemplate>> {
    let template = sqlx::query_as::<_, MessageTemplate>(
        r#"
        SELECT id, name, channel, subject, body, is_selected, created_at, updated_at
        FROM message_templates
        WHERE id = $1
        "#
    )
    .bind(template_id)
    .fetch_optional(pool)
    .await?;

    Ok(template)
}

/// List templates, optionally for one channel; the selected one sorts first
pub async fn list_templates(pool: &PgPool, channel: Option<TemplateChannel>) -> Result<Vec<MessageTemplate>> {
    let templates = sqlx::query_as::<_, MessageTemplate>(
        r#"
        SELECT id, name, channel, subject, body, is_selected, created_at, updated_at
        FROM message_templates
        WHERE ($1::template_channel IS NULL OR channel = $1)
        ORDER BY channel, is_selected DESC, name ASC
        "#
    )
    .bind(channel)
    .fetch_all(pool)
    .await?;

    Ok(templates)
}

pub async fn update_template(pool: &PgPool, req: &UpdateMessageTemplateRequest) -> Result<Option<MessageTemplate>> {
    let template = sqlx::query_as::<_, MessageTemplate>(
        r#"
        UPDATE message_templates
        SET
            name = COALESCE($2, name),
            subject = COALESCE($3, subject),
            body = COALESCE($4, body),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, channel, subject, body, is_selected, created_at, updated_at
        "#
    )
    .bind(req.id)
    .bind(&req.name)
    .bind(&req.subject)
    .bind(&req.body)
    .fetch_optional(pool)
    .await?;

    Ok(template)
}

pub async fn delete_template(pool: &PgPool, template_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM message_templates WHERE id = $1")
        .bind(template_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Make a template the single selected one of its channel.
///
/// Runs in one transaction: the channel's current selection is cleared
/// before the target is set, so the partial unique index never trips.
pub async fn select_template(pool: &PgPool, template_id: Uuid) -> Result<Option<MessageTemplate>> {
    let mut tx = pool.begin().await?;

    let channel: Option<(TemplateChannel,)> = sqlx::query_as(
        "SELECT channel FROM message_templates WHERE id = $1 FOR UPDATE"
    )
    .bind(template_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((channel,)) = channel else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE message_templates
        SET is_selected = FALSE, updated_at = NOW()
        WHERE channel = $1 AND is_selected AND id <> $2
        "#
    )
    .bind(channel)
    .bind(template_id)
    .execute(&mut *tx)
    .await?;

    let template = sqlx::query_as::<_, MessageTemplate>(
        r#"
        UPDATE message_templates
        SET is_selected = TRUE, updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, channel, subject, body, is_selected, created_at, updated_at
        "#
    )
    .bind(template_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(template))
}

/// Clear the selection of a channel. Returns how many rows changed (0 or 1).
pub async fn unselect_channel(pool: &PgPool, channel: TemplateChannel) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE message_templates
        SET is_selected = FALSE, updated_at = NOW()
        WHERE channel = $1 AND is_selected
        "#
    )
    .bind(channel)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn count_selected(pool: &PgPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM message_templates WHERE is_selected")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}
