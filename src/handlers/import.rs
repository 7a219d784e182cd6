//! Customer spreadsheet import and export handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::Engine;
use futures::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{reply_error, reply_success};
use crate::auth;
use crate::services::customer_export::{self, XLSX_CONTENT_TYPE};
use crate::services::customer_import::{CustomerImportService, CustomerStore, ImportError};
use crate::types::{
    EmptyPayload, ErrorResponse, FileDownloadResponse, ImportResolveRequest, ImportUploadRequest,
    Request,
};

/// Upper bound on the decoded upload
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Start import/export NATS handlers
pub async fn start_handlers(
    client: Client,
    jwt_secret: Arc<String>,
    import_service: CustomerImportService,
) -> Result<()> {
    let upload_sub = client.subscribe("royal.customer.import.upload").await?;
    let resolve_sub = client.subscribe("royal.customer.import.resolve").await?;
    let template_sub = client.subscribe("royal.customer.import.template").await?;
    let export_sub = client.subscribe("royal.customer.export").await?;

    tokio::spawn(handle_upload(client.clone(), upload_sub, jwt_secret.clone(), import_service.clone()));
    tokio::spawn(handle_resolve(client.clone(), resolve_sub, jwt_secret.clone(), import_service.clone()));
    tokio::spawn(handle_template(client.clone(), template_sub, jwt_secret.clone()));
    tokio::spawn(handle_export(client, export_sub, jwt_secret, import_service.store()));

    info!("Import handlers started");
    Ok(())
}

/// Error reply for an import failure; schema errors carry the missing columns
fn import_error_response(request_id: Uuid, err: &ImportError) -> ErrorResponse {
    let response = ErrorResponse::new(request_id, err.code(), err.to_string());
    match err {
        ImportError::Schema { missing } => {
            response.with_details(serde_json::json!({ "missing": missing }))
        }
        _ => response,
    }
}

fn file_response(filename: String, bytes: Vec<u8>) -> FileDownloadResponse {
    FileDownloadResponse {
        filename,
        content_type: XLSX_CONTENT_TYPE.to_string(),
        size_bytes: bytes.len() as u64,
        file_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
    }
}

/// Handle customer.import.upload messages
pub async fn handle_upload(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    import_service: CustomerImportService,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.import.upload message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ImportUploadRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import upload request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let auth_info = match auth::require_admin(&request, &jwt_secret) {
            Ok(info) => info,
            Err((code, message)) => {
                reply_error(&client, reply, request.id, code, message).await?;
                continue;
            }
        };

        let bytes = match base64::engine::general_purpose::STANDARD.decode(request.payload.file_content_base64.trim()) {
            Ok(b) => b,
            Err(e) => {
                warn!("Upload is not valid base64: {}", e);
                reply_error(&client, reply, request.id, "INVALID_REQUEST", format!("File content is not valid base64: {}", e)).await?;
                continue;
            }
        };

        if bytes.len() > MAX_UPLOAD_BYTES {
            reply_error(&client, reply, request.id, "VALIDATION_ERROR", format!("File exceeds {} MB", MAX_UPLOAD_BYTES / 1024 / 1024)).await?;
            continue;
        }

        info!(
            "Customer import upload from {}: {:?} ({} bytes)",
            auth_info.user_id,
            request.payload.filename,
            bytes.len()
        );

        match import_service
            .upload(auth_info.session_key(), &bytes, request.payload.filename.as_deref())
            .await
        {
            Ok(response) => reply_success(&client, reply, request.id, response).await?,
            Err(e) => {
                match e {
                    ImportError::Store(_) => error!("Customer import failed: {}", e),
                    _ => warn!("Customer import rejected: {}", e),
                }
                let error = import_error_response(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle customer.import.resolve messages
pub async fn handle_resolve(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    import_service: CustomerImportService,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.import.resolve message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ImportResolveRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import resolve request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let auth_info = match auth::require_admin(&request, &jwt_secret) {
            Ok(info) => info,
            Err((code, message)) => {
                reply_error(&client, reply, request.id, code, message).await?;
                continue;
            }
        };

        match import_service.resolve(auth_info.session_key(), request.payload.action).await {
            Ok(response) => reply_success(&client, reply, request.id, response).await?,
            Err(e) => {
                warn!("Import resolution '{}' failed: {}", request.payload.action.as_str(), e);
                let error = import_error_response(request.id, &e);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle customer.import.template messages
pub async fn handle_template(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.import.template message");

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
                error!("Failed to parse template request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        if let Err((code, message)) = auth::require_admin(&request, &jwt_secret) {
            reply_error(&client, reply, request.id, code, message).await?;
            continue;
        }

        match customer_export::build_import_template() {
            Ok(bytes) => {
                let response = file_response(customer_export::TEMPLATE_FILENAME.to_string(), bytes);
                reply_success(&client, reply, request.id, response).await?;
            }
            Err(e) => {
                error!("Failed to build import template: {}", e);
                reply_error(&client, reply, request.id, "INTERNAL_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle customer.export messages
pub async fn handle_export(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    store: Arc<dyn CustomerStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received customer.export message");

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
                error!("Failed to parse export request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        if let Err((code, message)) = auth::require_admin(&request, &jwt_secret) {
            reply_error(&client, reply, request.id, code, message).await?;
            continue;
        }

        let customers = match store.list_all().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load customers for export: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        };

        match customer_export::build_customer_export(&customers) {
            Ok(bytes) => {
                info!("Exported {} customers ({} bytes)", customers.len(), bytes.len());
                let filename = customer_export::export_filename(chrono::Utc::now());
                reply_success(&client, reply, request.id, file_response(filename, bytes)).await?;
            }
            Err(e) => {
                error!("Failed to build customer export: {}", e);
                reply_error(&client, reply, request.id, "INTERNAL_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_reply_lists_missing_columns() {
        let err = ImportError::Schema {
            missing: vec!["ADDRESS".to_string(), "EMAIL".to_string()],
        };
        let json = serde_json::to_value(import_error_response(Uuid::nil(), &err)).unwrap();
        assert_eq!(json["error"]["code"], "SCHEMA_ERROR");
        assert_eq!(json["error"]["details"]["missing"][1], "EMAIL");
        assert!(json["error"]["message"].as_str().unwrap().contains("ADDRESS, EMAIL"));
    }

    #[test]
    fn test_other_import_errors_have_no_details() {
        let json = serde_json::to_value(import_error_response(Uuid::nil(), &ImportError::NoStagedImport)).unwrap();
        assert_eq!(json["error"]["code"], "NO_STAGED_IMPORT");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_file_response_encodes_bytes() {
        let response = file_response("a.xlsx".to_string(), vec![1, 2, 3]);
        assert_eq!(response.size_bytes, 3);
        assert_eq!(response.file_base64, "AQID");
        assert_eq!(response.content_type, XLSX_CONTENT_TYPE);
    }
}
