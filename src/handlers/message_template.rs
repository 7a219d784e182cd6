//! SMS and mail template handlers

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
    CreateMessageTemplateRequest, DeleteResponse, IdRequest, ListMessageTemplatesRequest,
    Request, TemplateChannel, UnselectTemplateRequest, UpdateMessageTemplateRequest,
};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UnselectResponse {
    channel: TemplateChannel,
    cleared: bool,
}

/// Start all template NATS handlers
pub async fn start_handlers(client: Client, pool: PgPool, jwt_secret: Arc<String>) -> Result<()> {
    let list_sub = client.subscribe("royal.template.list").await?;
    let create_sub = client.subscribe("royal.template.create").await?;
    let update_sub = client.subscribe("royal.template.update").await?;
    let delete_sub = client.subscribe("royal.template.delete").await?;
    let select_sub = client.subscribe("royal.template.select").await?;
    let unselect_sub = client.subscribe("royal.template.unselect").await?;

    tokio::spawn(handle_list(client.clone(), list_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_create(client.clone(), create_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_update(client.clone(), update_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_delete(client.clone(), delete_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_select(client.clone(), select_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_unselect(client, unselect_sub, pool, jwt_secret));

    info!("Template handlers started");
    Ok(())
}

/// Trim name/body and drop the subject for SMS templates
fn normalize_new_template(
    mut req: CreateMessageTemplateRequest,
) -> Result<CreateMessageTemplateRequest, &'static str> {
    req.name = req.name.trim().to_string();
    req.body = req.body.trim().to_string();
    req.subject = match req.channel {
        TemplateChannel::Sms => None,
        TemplateChannel::Mail => req.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    };

    if req.name.is_empty() || req.body.is_empty() {
        return Err("Name and body are required");
    }
    Ok(req)
}

fn normalize_template_update(
    mut req: UpdateMessageTemplateRequest,
) -> Result<UpdateMessageTemplateRequest, &'static str> {
    req.name = req.name.map(|n| n.trim().to_string());
    req.body = req.body.map(|b| b.trim().to_string());
    req.subject = req.subject.map(|s| s.trim().to_string());

    if req.name.as_deref() == Some("") || req.body.as_deref() == Some("") {
        return Err("Name and body cannot be blank");
    }
    Ok(req)
}

/// Handle template.list messages
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received template.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListMessageTemplatesRequest> = match serde_json::from_slice(&msg.payload) {
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

        match queries::message_template::list_templates(&pool, request.payload.channel).await {
            Ok(templates) => reply_success(&client, reply, request.id, templates).await?,
            Err(e) => {
                error!("Failed to list templates: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle template.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received template.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateMessageTemplateRequest> = match serde_json::from_slice(&msg.payload) {
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

        let payload = match normalize_new_template(request.payload) {
            Ok(p) => p,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        match queries::message_template::create_template(&pool, &payload).await {
            Ok(template) => {
                info!("Created {} template '{}'", template.channel.as_str(), template.name);
                reply_success(&client, reply, request.id, template).await?;
            }
            Err(e) => {
                error!("Failed to create template: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle template.update messages
pub async fn handle_update(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received template.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateMessageTemplateRequest> = match serde_json::from_slice(&msg.payload) {
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

        let mut payload = match normalize_template_update(request.payload) {
            Ok(p) => p,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        // SMS templates never carry a subject
        match queries::message_template::get_template(&pool, payload.id).await {
            Ok(Some(existing)) if existing.channel == TemplateChannel::Sms => payload.subject = None,
            Ok(Some(_)) => {}
            Ok(None) => {
                reply_error(&client, reply, request.id, "NOT_FOUND", "Template not found").await?;
                continue;
            }
            Err(e) => {
                error!("Failed to load template: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        }

        match queries::message_template::update_template(&pool, &payload).await {
            Ok(Some(template)) => reply_success(&client, reply, request.id, template).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Template not found").await?,
            Err(e) => {
                error!("Failed to update template: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle template.delete messages
pub async fn handle_delete(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received template.delete message");

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

        match queries::message_template::delete_template(&pool, request.payload.id).await {
            Ok(true) => reply_success(&client, reply, request.id, DeleteResponse { deleted: true }).await?,
            Ok(false) => reply_error(&client, reply, request.id, "NOT_FOUND", "Template not found").await?,
            Err(e) => {
                error!("Failed to delete template: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle template.select messages
pub async fn handle_select(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received template.select message");

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

        match queries::message_template::select_template(&pool, request.payload.id).await {
            Ok(Some(template)) => {
                info!("Selected {} template '{}'", template.channel.as_str(), template.name);
                reply_success(&client, reply, request.id, template).await?;
            }
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Template not found").await?,
            Err(e) => {
                error!("Failed to select template: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle template.unselect messages
pub async fn handle_unselect(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received template.unselect message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UnselectTemplateRequest> = match serde_json::from_slice(&msg.payload) {
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

        let channel = request.payload.channel;
        match queries::message_template::unselect_channel(&pool, channel).await {
            Ok(changed) => {
                let response = UnselectResponse { channel, cleared: changed > 0 };
                reply_success(&client, reply, request.id, response).await?;
            }
            Err(e) => {
                error!("Failed to unselect {} template: {}", channel.as_str(), e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_template(channel: TemplateChannel) -> CreateMessageTemplateRequest {
        CreateMessageTemplateRequest {
            name: "  Spring promo ".to_string(),
            channel,
            subject: Some(" 20% off ".to_string()),
            body: " Hello {name} ".to_string(),
        }
    }

    #[test]
    fn test_sms_template_drops_subject() {
        let req = normalize_new_template(new_template(TemplateChannel::Sms)).unwrap();
        assert_eq!(req.name, "Spring promo");
        assert_eq!(req.body, "Hello {name}");
        assert!(req.subject.is_none());
    }

    #[test]
    fn test_mail_template_keeps_trimmed_subject() {
        let req = normalize_new_template(new_template(TemplateChannel::Mail)).unwrap();
        assert_eq!(req.subject.as_deref(), Some("20% off"));
    }

    #[test]
    fn test_blank_body_rejected() {
        let mut req = new_template(TemplateChannel::Sms);
        req.body = "   ".to_string();
        assert!(normalize_new_template(req).is_err());
    }

    #[test]
    fn test_update_rejects_blank_name() {
        let req = UpdateMessageTemplateRequest {
            id: Uuid::new_v4(),
            name: Some(" ".to_string()),
            subject: None,
            body: None,
        };
        assert!(normalize_template_update(req).is_err());
    }
}
