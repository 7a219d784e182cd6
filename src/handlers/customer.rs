//! Customer handlers

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
use crate::services::customer_import::store::is_unique_violation;
use crate::services::customer_import::validator::collapse_whitespace;
use crate::types::{
    CreateCustomerRequest, DeleteResponse, IdRequest, ListRequest, ListResponse,
    MarkSmsSentRequest, Request, UpdateCustomerRequest,
};

/// Start all customer NATS handlers
pub async fn start_handlers(client: Client, pool: PgPool, jwt_secret: Arc<String>) -> Result<()> {
    let list_sub = client.subscribe("royal.customer.list").await?;
    let get_sub = client.subscribe("royal.customer.get").await?;
    let create_sub = client.subscribe("royal.customer.create").await?;
    let update_sub = client.subscribe("royal.customer.update").await?;
    let delete_sub = client.subscribe("royal.customer.delete").await?;
    let sms_mark_sub = client.subscribe("royal.customer.sms.mark").await?;

    tokio::spawn(handle_list(client.clone(), list_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_get(client.clone(), get_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_create(client.clone(), create_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_update(client.clone(), update_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_delete(client.clone(), delete_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_mark_sms(client, sms_mark_sub, pool, jwt_secret));

    info!("Customer handlers started");
    Ok(())
}

/// Trim and collapse every field, lower-case the email; all four are required
fn normalize_new_customer(req: CreateCustomerRequest) -> Result<CreateCustomerRequest, &'static str> {
    let normalized = CreateCustomerRequest {
        full_name: collapse_whitespace(&req.full_name),
        contact_number: collapse_whitespace(&req.contact_number),
        address: collapse_whitespace(&req.address),
        email: collapse_whitespace(&req.email).to_lowercase(),
    };
    if normalized.full_name.is_empty()
        || normalized.contact_number.is_empty()
        || normalized.address.is_empty()
        || normalized.email.is_empty()
    {
        return Err("Full name, contact number, address and email are required");
    }
    Ok(normalized)
}

/// Same rules for the fields an update actually sets
fn normalize_customer_update(req: UpdateCustomerRequest) -> Result<UpdateCustomerRequest, &'static str> {
    fn field(value: Option<String>) -> Result<Option<String>, &'static str> {
        match value.map(|v| collapse_whitespace(&v)) {
            Some(v) if v.is_empty() => Err("Customer fields cannot be blank"),
            other => Ok(other),
        }
    }
    Ok(UpdateCustomerRequest {
        id: req.id,
        full_name: field(req.full_name)?,
        contact_number: field(req.contact_number)?,
        address: field(req.address)?,
        email: field(req.email)?.map(|e| e.to_lowercase()),
    })
}

/// Handle customer.list messages
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.list message");

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

        let items = match queries::customer::list_customers(&pool, limit, offset).await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to list customers: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        };

        match queries::customer::count_customers(&pool).await {
            Ok(total) => {
                let response = ListResponse { items, total, limit, offset };
                reply_success(&client, reply, request.id, response).await?;
            }
            Err(e) => {
                error!("Failed to count customers: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle customer.get messages
pub async fn handle_get(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.get message");

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

        match queries::customer::get_customer(&pool, request.payload.id).await {
            Ok(Some(customer)) => reply_success(&client, reply, request.id, customer).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Customer not found").await?,
            Err(e) => {
                error!("Failed to get customer: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle customer.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateCustomerRequest> = match serde_json::from_slice(&msg.payload) {
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

        let new_customer = match normalize_new_customer(request.payload) {
            Ok(c) => c,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        match queries::customer::contact_number_taken(&pool, &new_customer.contact_number, None).await {
            Ok(false) => {}
            Ok(true) => {
                reply_error(&client, reply, request.id, "DUPLICATE_CONTACT", "A customer with this contact number already exists").await?;
                continue;
            }
            Err(e) => {
                error!("Failed to check contact number: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        }

        match queries::customer::create_customer(&pool, &new_customer).await {
            Ok(customer) => {
                info!("Created customer {}", customer.id);
                reply_success(&client, reply, request.id, customer).await?;
            }
            Err(e) if is_unique_violation(&e) => {
                reply_error(&client, reply, request.id, "DUPLICATE_CONTACT", "A customer with this contact number already exists").await?;
            }
            Err(e) => {
                error!("Failed to create customer: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle customer.update messages
pub async fn handle_update(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateCustomerRequest> = match serde_json::from_slice(&msg.payload) {
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

        let update = match normalize_customer_update(request.payload) {
            Ok(u) => u,
            Err(message) => {
                reply_error(&client, reply, request.id, "VALIDATION_ERROR", message).await?;
                continue;
            }
        };

        if let Some(ref contact_number) = update.contact_number {
            match queries::customer::contact_number_taken(&pool, contact_number, Some(update.id)).await {
                Ok(false) => {}
                Ok(true) => {
                    reply_error(&client, reply, request.id, "DUPLICATE_CONTACT", "A customer with this contact number already exists").await?;
                    continue;
                }
                Err(e) => {
                    error!("Failed to check contact number: {}", e);
                    reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                    continue;
                }
            }
        }

        match queries::customer::update_customer(&pool, &update).await {
            Ok(Some(customer)) => reply_success(&client, reply, request.id, customer).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Customer not found").await?,
            Err(e) if is_unique_violation(&e) => {
                reply_error(&client, reply, request.id, "DUPLICATE_CONTACT", "A customer with this contact number already exists").await?;
            }
            Err(e) => {
                error!("Failed to update customer: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle customer.delete messages
pub async fn handle_delete(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.delete message");

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

        match queries::customer::delete_customer(&pool, request.payload.id).await {
            Ok(true) => {
                info!("Deleted customer {}", request.payload.id);
                reply_success(&client, reply, request.id, DeleteResponse { deleted: true }).await?;
            }
            Ok(false) => reply_error(&client, reply, request.id, "NOT_FOUND", "Customer not found").await?,
            Err(e) => {
                error!("Failed to delete customer: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle customer.sms.mark messages
pub async fn handle_mark_sms(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.sms.mark message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<MarkSmsSentRequest> = match serde_json::from_slice(&msg.payload) {
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

        match queries::customer::set_sms_sent(&pool, request.payload.id, request.payload.sms_sent).await {
            Ok(Some(customer)) => reply_success(&client, reply, request.id, customer).await?,
            Ok(None) => reply_error(&client, reply, request.id, "NOT_FOUND", "Customer not found").await?,
            Err(e) => {
                error!("Failed to update SMS status: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(full_name: &str, contact: &str, address: &str, email: &str) -> CreateCustomerRequest {
        CreateCustomerRequest {
            full_name: full_name.to_string(),
            contact_number: contact.to_string(),
            address: address.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_new_customer_is_normalised() {
        let c = normalize_new_customer(create(" Ali   Khan ", "0300  123", " Lahore ", " ALI@X.PK ")).unwrap();
        assert_eq!(c.full_name, "Ali Khan");
        assert_eq!(c.contact_number, "0300 123");
        assert_eq!(c.address, "Lahore");
        assert_eq!(c.email, "ali@x.pk");
    }

    #[test]
    fn test_new_customer_requires_every_field() {
        assert!(normalize_new_customer(create("Ali", "  ", "Lahore", "ali@x.pk")).is_err());
    }

    #[test]
    fn test_update_rejects_blank_fields_but_allows_absent_ones() {
        let update = UpdateCustomerRequest {
            id: Uuid::nil(),
            full_name: None,
            contact_number: Some(" 0300 ".to_string()),
            address: None,
            email: Some("A@B.C".to_string()),
        };
        let normalized = normalize_customer_update(update).unwrap();
        assert_eq!(normalized.contact_number.as_deref(), Some("0300"));
        assert_eq!(normalized.email.as_deref(), Some("a@b.c"));
        assert!(normalized.full_name.is_none());

        let blank = UpdateCustomerRequest {
            id: Uuid::nil(),
            full_name: Some("   ".to_string()),
            contact_number: None,
            address: None,
            email: None,
        };
        assert!(normalize_customer_update(blank).is_err());
    }
}
