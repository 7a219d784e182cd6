//! Career posting admin handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{reply_error, reply_success};
use crate::auth;
use crate::db::queries;
use crate::services::slug::{slugify, unique_slug};
use crate::types::{
    CreateCareerRequest, DeleteResponse, IdRequest, ListRequest, ListResponse, Request,
    UpdateCareerRequest,
};

/// Start all career admin NATS handlers
pub async fn start_handlers(client: Client, pool: PgPool, jwt_secret: Arc<String>) -> Result<()> {
    let list_sub = client.subscribe("royal.career.list").await?;
    let create_sub = client.subscribe("royal.career.create").await?;
    let update_sub = client.subscribe("royal.career.update").await?;
    let delete_sub = client.subscribe("royal.career.delete").await?;

    tokio::spawn(handle_list(client.clone(), list_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_create(client.clone(), create_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_update(client.clone(), update_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_delete(client, delete_sub, pool, jwt_secret));

    info!("Career handlers started");
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_new_career(mut req: CreateCareerRequest) -> Result<CreateCareerRequest, &'static str> {
    req.title = req.title.trim().to_string();
    req.description = req.description.trim().to_string();
    req.location = trimmed(req.location);
    req.employment_type = trimmed(req.employment_type);

    if req.title.is_empty() || req.description.is_empty() {
        return Err("Title and description are required");
    }
    Ok(req)
}

fn normalize_career_update(mut req: UpdateCareerRequest) -> Result<UpdateCareerRequest, &'static str> {
    req.title = req.title.map(|t| t.trim().to_string());
    req.description = req.description.map(|d| d.trim().to_string());

    if req.title.as_deref() == Some("") || req.description.as_deref() == Some("") {
        return Err("Title and description cannot be blank");
    }
    Ok(req)
}

/// Handle career.list messages (all postings, open or not)
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received career.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        if let Err((code, message)) = auth::require_admin(&request, &jwt_secret) {
            reply_error(&client, reply, request.id, code, message).await?;
            continue;
        }

        let limit = request.payload.limit.clamp(1, 500);
        let offset = request.payload.offset.max(0);

        let result = async {
            let items = queries::career::list_careers(&pool, false, limit, offset).await?;
            let total = queries::career::count_careers(&pool, false).await?;
            anyhow::Ok(ListResponse { items, total, limit, offset })
        }
        .await;

        match result {
            Ok(response) => reply_success(&client, reply, request.id, response).await?,
            Err(e) => {
                error!("Failed to list careers: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle career.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received career.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateCareerRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        if let Err((code, message)) = auth::require_admin(&request, &jwt_secret) {
            reply_error(&client, reply, request.id, code, message).await?;
            continue;
        }

        let payload = match normalize_new_career(request.payload) {
            Ok(p) => p,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        let slug = unique_slug(&slugify(&payload.title), |candidate| {
            let pool = pool.clone();
            async move { queries::career::slug_exists(&pool, &candidate, None).await }
        })
        .await;
        let slug = match slug {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to allocate career slug: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        };

        match queries::career::create_career(&pool, &payload, &slug).await {
            Ok(career) => {
                info!("Created career posting '{}' ({})", career.slug, career.id);
                reply_success(&client, reply, request.id, career).await?;
            }
            Err(e) => {
                error!("Failed to create career posting: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle career.update messages
pub async fn handle_update(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received career.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateCareerRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        if let Err((code, message)) = auth::require_admin(&request, &jwt_secret) {
            reply_error(&client, reply, request.id, code, message).await?;
            continue;
        }

        let payload = match normalize_career_update(request.payload) {
            Ok(p) => p,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        let slug = payload.slug.as_deref().map(slugify);
        if let Some(ref slug) = slug {
            match queries::career::slug_exists(&pool, slug, Some(payload.id)).await {
                Ok(false) => {}
                Ok(true) => {
                    reply_error(&client, reply, request.id, "DUPLICATE_SLUG", format!("Slug '{}' is already used", slug)).await?;
                    continue;
                }
                Err(e) => {
                    error!("Failed to check career slug: {}", e);
                    reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                    continue;
                }
            }
        }

        match queries::career::update_career(&pool, &payload, slug.as_deref()).await {
            Ok(Some(career)) => reply_success(&client, reply, request.id, career).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Career posting not found").await?,
            Err(e) => {
                error!("Failed to update career posting: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle career.delete messages
pub async fn handle_delete(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received career.delete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<IdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        if let Err((code, message)) = auth::require_admin(&request, &jwt_secret) {
            reply_error(&client, reply, request.id, code, message).await?;
            continue;
        }

        match queries::career::delete_career(&pool, request.payload.id).await {
            Ok(true) => reply_success(&client, reply, request.id, DeleteResponse { deleted: true }).await?,
            Ok(false) => reply_error(&client, reply, request.id, "NOT_FOUND", "Career posting not found").await?,
            Err(e) => {
                error!("Failed to delete career posting: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_career_is_trimmed_and_open_by_default() {
        let req: CreateCareerRequest = serde_json::from_str(
            r#"{"title":"  Painter ","description":" Interior work ","location":"  "}"#,
        )
        .unwrap();
        let req = normalize_new_career(req).unwrap();
        assert_eq!(req.title, "Painter");
        assert_eq!(req.description, "Interior work");
        assert!(req.location.is_none());
        assert!(req.is_open);
    }

    #[test]
    fn test_new_career_requires_description() {
        let req: CreateCareerRequest =
            serde_json::from_str(r#"{"title":"Painter","description":""}"#).unwrap();
        assert!(normalize_new_career(req).is_err());
    }

    #[test]
    fn test_update_allows_partial_payload() {
        let req: UpdateCareerRequest = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","isOpen":false}"#,
        )
        .unwrap();
        let req = normalize_career_update(req).unwrap();
        assert_eq!(req.is_open, Some(false));
        assert!(req.title.is_none());
    }
}
