//! Admin dashboard summary

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
use crate::types::{DashboardSummary, EmptyPayload, Request};

pub async fn start_handlers(client: Client, pool: PgPool, jwt_secret: Arc<String>) -> Result<()> {
    let summary_sub = client.subscribe("royal.dashboard.summary").await?;
    tokio::spawn(handle_summary(client, summary_sub, pool, jwt_secret));

    info!("Dashboard handlers started");
    Ok(())
}

async fn load_summary(pool: &PgPool) -> Result<DashboardSummary> {
    let (customer_count, sms_sent_count, blog_post_count, open_career_count, unread_inquiry_count, selected_template_count) = tokio::try_join!(
        queries::customer::count_customers(pool),
        queries::customer::count_sms_sent(pool),
        queries::blog::count_posts(pool),
        queries::career::count_careers(pool, true),
        queries::inquiry::count_unread(pool),
        queries::message_template::count_selected(pool),
    )?;

    Ok(DashboardSummary {
        customer_count,
        sms_sent_count,
        blog_post_count,
        open_career_count,
        unread_inquiry_count,
        selected_template_count,
    })
}

/// Handle dashboard.summary messages
pub async fn handle_summary(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received dashboard.summary message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<EmptyPayload> = match serde_json::from_slice(&msg.payload) {
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

        match load_summary(&pool).await {
            Ok(summary) => reply_success(&client, reply, request.id, summary).await?,
            Err(e) => {
                error!("Failed to load dashboard summary: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}
