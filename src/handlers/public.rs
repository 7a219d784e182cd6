//! Public read endpoints and the contact/quote form. No token required.

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{reply_error, reply_success};
use crate::db::queries;
use crate::types::{ListRequest, ListResponse, Request, SlugRequest, SubmitInquiryRequest};

/// Public lists are capped lower than the admin ones
const PUBLIC_MAX_LIMIT: i64 = 100;

pub async fn start_handlers(client: Client, pool: PgPool) -> Result<()> {
    let blog_list_sub = client.subscribe("royal.public.blog.list").await?;
    let blog_get_sub = client.subscribe("royal.public.blog.get").await?;
    let career_list_sub = client.subscribe("royal.public.career.list").await?;
    let career_get_sub = client.subscribe("royal.public.career.get").await?;
    let inquiry_sub = client.subscribe("royal.public.inquiry.submit").await?;

    tokio::spawn(handle_blog_list(client.clone(), blog_list_sub, pool.clone()));
    tokio::spawn(handle_blog_get(client.clone(), blog_get_sub, pool.clone()));
    tokio::spawn(handle_career_list(client.clone(), career_list_sub, pool.clone()));
    tokio::spawn(handle_career_get(client.clone(), career_get_sub, pool.clone()));
    tokio::spawn(handle_inquiry_submit(client, inquiry_sub, pool));

    info!("Public handlers started");
    Ok(())
}

fn page(req: &ListRequest) -> (i64, i64) {
    (req.limit.clamp(1, PUBLIC_MAX_LIMIT), req.offset.max(0))
}

/// Handle public.blog.list messages
pub async fn handle_blog_list(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received public.blog.list message");

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

        let (limit, offset) = page(&request.payload);
        let result = async {
            let items = queries::blog::list_posts(&pool, limit, offset).await?;
            let total = queries::blog::count_posts(&pool).await?;
            anyhow::Ok(ListResponse { items, total, limit, offset })
        }
        .await;

        match result {
            Ok(response) => reply_success(&client, reply, request.id, response).await?,
            Err(e) => {
                error!("Failed to list public blog posts: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle public.blog.get messages
pub async fn handle_blog_get(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received public.blog.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SlugRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        match queries::blog::get_post_by_slug(&pool, request.payload.slug.trim()).await {
            Ok(Some(post)) => reply_success(&client, reply, request.id, post).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Blog post not found").await?,
            Err(e) => {
                error!("Failed to get public blog post: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle public.career.list messages (open postings only)
pub async fn handle_career_list(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received public.career.list message");

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

        let (limit, offset) = page(&request.payload);
        let result = async {
            let items = queries::career::list_careers(&pool, true, limit, offset).await?;
            let total = queries::career::count_careers(&pool, true).await?;
            anyhow::Ok(ListResponse { items, total, limit, offset })
        }
        .await;

        match result {
            Ok(response) => reply_success(&client, reply, request.id, response).await?,
            Err(e) => {
                error!("Failed to list public careers: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle public.career.get messages
pub async fn handle_career_get(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received public.career.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SlugRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        match queries::career::get_open_career_by_slug(&pool, request.payload.slug.trim()).await {
            Ok(Some(career)) => reply_success(&client, reply, request.id, career).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Career posting not found").await?,
            Err(e) => {
                error!("Failed to get public career: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle public.inquiry.submit messages
pub async fn handle_inquiry_submit(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received public.inquiry.submit message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SubmitInquiryRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let submission = match request.payload.normalized() {
            Ok(s) => s,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        match queries::inquiry::insert_inquiry(&pool, &submission).await {
            Ok(inquiry) => {
                info!("New {:?} inquiry from {}", inquiry.kind, inquiry.email);
                reply_success(&client, reply, request.id, inquiry).await?;
            }
            Err(e) => {
                error!("Failed to store inquiry: {}", e);
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
    fn test_public_page_is_clamped() {
        let req = ListRequest { limit: 10_000, offset: -5 };
        assert_eq!(page(&req), (PUBLIC_MAX_LIMIT, 0));
        assert_eq!(page(&ListRequest::default()), (50, 0));
    }
}
