//! Authentication handlers: login, verify, refresh, logout

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{reply_error, reply_success};
use crate::auth;
use crate::db::queries;
use crate::services::customer_import::CustomerImportService;
use crate::services::rate_limiter::RateLimiter;
use crate::types::{AuthResponse, EmptyPayload, Request, UserPublic};

// =============================================================================
// Auth request/response types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
    /// Whether a pending import was dropped with the session
    pub discarded_import: bool,
}

/// Start all auth-related NATS handlers
pub async fn start_handlers(
    client: Client,
    pool: PgPool,
    jwt_secret: Arc<String>,
    rate_limiter: Arc<RateLimiter>,
    import_service: CustomerImportService,
) -> Result<()> {
    let login_sub = client.subscribe("royal.auth.login").await?;
    let verify_sub = client.subscribe("royal.auth.verify").await?;
    let refresh_sub = client.subscribe("royal.auth.refresh").await?;
    let logout_sub = client.subscribe("royal.auth.logout").await?;

    tokio::spawn(handle_login(client.clone(), login_sub, pool.clone(), jwt_secret.clone(), rate_limiter));
    tokio::spawn(handle_verify(client.clone(), verify_sub, pool.clone(), jwt_secret.clone()));
    tokio::spawn(handle_refresh(client.clone(), refresh_sub, pool, jwt_secret.clone()));
    tokio::spawn(handle_logout(client, logout_sub, jwt_secret, import_service));

    info!("Auth handlers started");
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle auth.login messages
pub async fn handle_login(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
    rate_limiter: Arc<RateLimiter>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received auth.login message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<LoginRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse login request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let email = request.payload.email.trim().to_lowercase();
        if email.is_empty() || request.payload.password.is_empty() {
            reply_error(&client, reply, request.id, "VALIDATION_ERROR", "Email and password are required").await?;
            continue;
        }

        if !rate_limiter.check_and_record(&email) {
            warn!("Rate limited login attempt for: {}", email);
            reply_error(&client, reply, request.id, "RATE_LIMITED", "Too many login attempts. Please try again later.").await?;
            continue;
        }

        let user = match queries::user::get_user_by_email(&pool, &email).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                reply_error(&client, reply, request.id, "INVALID_CREDENTIALS", "Invalid email or password").await?;
                continue;
            }
            Err(e) => {
                error!("Database error during login: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
                continue;
            }
        };

        match auth::verify_password(&request.payload.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                reply_error(&client, reply, request.id, "INVALID_CREDENTIALS", "Invalid email or password").await?;
                continue;
            }
            Err(e) => {
                error!("Password verification error: {}", e);
                reply_error(&client, reply, request.id, "INTERNAL_ERROR", "Failed to verify password").await?;
                continue;
            }
        }

        // every login starts a new session
        let session_id = Uuid::new_v4();
        let token = match auth::generate_token(user.id, &user.email, &user.role, session_id, &jwt_secret) {
            Ok(t) => t,
            Err(e) => {
                error!("Failed to generate token: {}", e);
                reply_error(&client, reply, request.id, "INTERNAL_ERROR", "Failed to generate token").await?;
                continue;
            }
        };

        info!("User logged in: {}", user.email);
        let response = AuthResponse {
            token,
            user: UserPublic::from(user),
        };
        reply_success(&client, reply, request.id, response).await?;
    }

    Ok(())
}

/// Handle auth.verify messages
pub async fn handle_verify(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received auth.verify message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<VerifyRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse verify request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let claims = match auth::validate_token(&request.payload.token, &jwt_secret) {
            Ok(c) => c,
            Err(e) => {
                reply_error(&client, reply, request.id, "UNAUTHORIZED", e.to_string()).await?;
                continue;
            }
        };

        let user_id = match Uuid::parse_str(&claims.sub) {
            Ok(id) => id,
            Err(e) => {
                reply_error(&client, reply, request.id, "UNAUTHORIZED", e.to_string()).await?;
                continue;
            }
        };

        match queries::user::get_user(&pool, user_id).await {
            Ok(Some(user)) => {
                reply_success(&client, reply, request.id, UserPublic::from(user)).await?;
            }
            Ok(None) => {
                reply_error(&client, reply, request.id, "NOT_FOUND", "User no longer exists").await?;
            }
            Err(e) => {
                error!("Database error during verify: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle auth.refresh messages: new expiry, same session
pub async fn handle_refresh(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received auth.refresh message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<VerifyRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse refresh request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let claims = match auth::validate_token(&request.payload.token, &jwt_secret) {
            Ok(c) => c,
            Err(e) => {
                reply_error(&client, reply, request.id, "UNAUTHORIZED", e.to_string()).await?;
                continue;
            }
        };

        let (user_id, session_id) = match (Uuid::parse_str(&claims.sub), Uuid::parse_str(&claims.sid)) {
            (Ok(user_id), Ok(session_id)) => (user_id, session_id),
            _ => {
                reply_error(&client, reply, request.id, "UNAUTHORIZED", "Malformed token claims").await?;
                continue;
            }
        };

        match queries::user::get_user(&pool, user_id).await {
            Ok(Some(user)) => {
                match auth::generate_token(user.id, &user.email, &user.role, session_id, &jwt_secret) {
                    Ok(token) => {
                        let response = AuthResponse {
                            token,
                            user: UserPublic::from(user),
                        };
                        reply_success(&client, reply, request.id, response).await?;
                    }
                    Err(e) => {
                        error!("Failed to generate refresh token: {}", e);
                        reply_error(&client, reply, request.id, "INTERNAL_ERROR", e.to_string()).await?;
                    }
                }
            }
            Ok(None) => {
                reply_error(&client, reply, request.id, "NOT_FOUND", "User no longer exists").await?;
            }
            Err(e) => {
                error!("Database error during refresh: {}", e);
                reply_error(&client, reply, request.id, "DATABASE_ERROR", e.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Handle auth.logout messages: drops the session's pending import
pub async fn handle_logout(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    import_service: CustomerImportService,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received auth.logout message");

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
                error!("Failed to parse logout request: {}", e);
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

        let discarded_import = import_service.discard(&auth_info.session_key());
        info!("User {} logged out (pending import dropped: {})", auth_info.user_id, discarded_import);

        let response = LogoutResponse {
            logged_out: true,
            discarded_import,
        };
        reply_success(&client, reply, request.id, response).await?;
    }

    Ok(())
}
