//! Inquiry inbox handlers

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
use crate::types::{
    DeleteResponse, IdRequest, ListInquiriesRequest, ListResponse, MarkInquiryReadRequest, Request,
};

pub async fn start_handlers(client: Client, pool: PgPool, jwt_secret: Arc<String>) -> Result<()> {
    let list_sub = client.subscribe("royal.inquiry.list").await?;
    let mark_read_sub = client.subscribe("royal.inquiry.mark_read").await?;
    let delete_sub = client.subscribe("royal.inquiry.delete").await?;

    tokio::spawn(handle_list(client.clone(), list_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_mark_read(client.clone(), mark_read_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_delete(client, delete_sub, pool, jwt_secret));

    info!("Inquiry handlers started");
    Ok(())
}

/// Handle inquiry.list messages
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received inquiry.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListInquiriesRequest> = match serde_json::from_slice(&msg.payload) {
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

        let mut filter = request.payload;
        filter.limit = filter.limit.clamp(1, 500);
        filter.offset = filter.offset.max(0);

        match queries::inquiry::list_inquiries(&pool, &filter).await {
            Ok((items, total)) => {
                let response = ListResponse {
                    items,
                    total,
                    limit: filter.limit,
                    offset: filter.offset,
                };
                reply_success(&client, reply, request.id, response).await?;
            }
            Err(e) => {
                error!("Failed to list inquiries: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle inquiry.mark_read messages
pub async fn handle_mark_read(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received inquiry.mark_read message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<MarkInquiryReadRequest> = match serde_json::from_slice(&msg.payload) {
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

        match queries::inquiry::mark_read(&pool, request.payload.id, request.payload.is_read).await {
            Ok(Some(inquiry)) => reply_success(&client, reply, request.id, inquiry).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Inquiry not found").await?,
            Err(e) => {
                error!("Failed to update inquiry: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle inquiry.delete messages
pub async fn handle_delete(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received inquiry.delete message");

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

        match queries::inquiry::delete_inquiry(&pool, request.payload.id).await {
            Ok(true) => reply_success(&client, reply, request.id, DeleteResponse { deleted: true }).await?,
            Ok(false) => reply_error(&client, reply, request.id, "NOT_FOUND", "Inquiry not found").await?,
            Err(e) => {
                error!("Failed to delete inquiry: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}
