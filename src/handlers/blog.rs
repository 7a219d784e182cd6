//! Blog post admin handlers

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
    CreateBlogPostRequest, DeleteResponse, IdRequest, ListRequest, ListResponse, Request,
    UpdateBlogPostRequest,
};

/// Start all blog admin NATS handlers
pub async fn start_handlers(client: Client, pool: PgPool, jwt_secret: Arc<String>) -> Result<()> {
    let list_sub = client.subscribe("royal.blog.list").await?;
    let get_sub = client.subscribe("royal.blog.get").await?;
    let create_sub = client.subscribe("royal.blog.create").await?;
    let update_sub = client.subscribe("royal.blog.update").await?;
    let delete_sub = client.subscribe("royal.blog.delete").await?;

    tokio::spawn(handle_list(client.clone(), list_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_get(client.clone(), get_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_create(client.clone(), create_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_update(client.clone(), update_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_delete(client, delete_sub, pool, jwt_secret));

    info!("Blog handlers started");
    Ok(())
}

/// Slug for a new post: the title's slug, suffixed until free
pub(crate) async fn free_post_slug(pool: &PgPool, title: &str) -> Result<String> {
    unique_slug(&slugify(title), |candidate| {
        let pool = pool.clone();
        async move { queries::blog::slug_exists(&pool, &candidate, None).await }
    })
    .await
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Handle blog.list messages
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received blog.list message");

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
            let items = queries::blog::list_posts(&pool, limit, offset).await?;
            let total = queries::blog::count_posts(&pool).await?;
            anyhow::Ok(ListResponse { items, total, limit, offset })
        }
        .await;

        match result {
            Ok(response) => reply_success(&client, reply, request.id, response).await?,
            Err(e) => {
                error!("Failed to list blog posts: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle blog.get messages
pub async fn handle_get(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received blog.get message");

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

        match queries::blog::get_post(&pool, request.payload.id).await {
            Ok(Some(post)) => reply_success(&client, reply, request.id, post).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Blog post not found").await?,
            Err(e) => {
                error!("Failed to get blog post: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle blog.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received blog.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateBlogPostRequest> = match serde_json::from_slice(&msg.payload) {
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

        let title = request.payload.title.trim().to_string();
        if title.is_empty() {
            reply_error(&client, reply, request.id, "VALIDATION_ERROR", "Title is required").await?;
            continue;
        }
        let content = non_blank(request.payload.content.clone());
        let image_url = non_blank(request.payload.image_url.clone());

        let slug = match free_post_slug(&pool, &title).await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to allocate blog slug: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        };

        match queries::blog::create_post(&pool, &title, content.as_deref(), image_url.as_deref(), &slug).await {
            Ok(post) => {
                info!("Created blog post '{}' ({})", post.slug, post.id);
                reply_success(&client, reply, request.id, post).await?;
            }
            Err(e) => {
                error!("Failed to create blog post: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle blog.update messages
pub async fn handle_update(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received blog.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateBlogPostRequest> = match serde_json::from_slice(&msg.payload) {
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

        let payload = &request.payload;
        let title = payload.title.as_ref().map(|t| t.trim().to_string());
        if title.as_deref() == Some("") {
            reply_error(&client, reply, request.id, "VALIDATION_ERROR", "Title cannot be blank").await?;
            continue;
        }

        let slug = payload.slug.as_deref().map(slugify);
        if let Some(ref slug) = slug {
            match queries::blog::slug_exists(&pool, slug, Some(payload.id)).await {
                Ok(false) => {}
                Ok(true) => {
                    reply_error(&client, reply, request.id, "DUPLICATE_SLUG", format!("Slug '{}' is already used", slug)).await?;
                    continue;
                }
                Err(e) => {
                    error!("Failed to check blog slug: {}", e);
                    reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                    continue;
                }
            }
        }

        match queries::blog::update_post(
            &pool,
            payload.id,
            title.as_deref(),
            payload.content.as_deref(),
            payload.image_url.as_deref(),
            slug.as_deref(),
        )
        .await
        {
            Ok(Some(post)) => reply_success(&client, reply, request.id, post).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Blog post not found").await?,
            Err(e) => {
                error!("Failed to update blog post: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle blog.delete messages
pub async fn handle_delete(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received blog.delete message");

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

        match queries::blog::delete_post(&pool, request.payload.id).await {
            Ok(true) => {
                info!("Deleted blog post {}", request.payload.id);
                reply_success(&client, reply, request.id, DeleteResponse { deleted: true }).await?;
            }
            Ok(false) => reply_error(&client, reply, request.id, "NOT_FOUND", "Blog post not found").await?,
            Err(e) => {
                error!("Failed to delete blog post: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}
