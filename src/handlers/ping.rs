//! Ping handler for health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{reply_error, reply_success};
use crate::types::Request;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PongResponse {
    message: String,
    timestamp: String,
    version: String,
}

pub async fn start_handlers(client: Client) -> Result<()> {
    let ping_sub = client.subscribe("royal.ping").await?;
    tokio::spawn(handle_ping(client, ping_sub));
    info!("Ping handler started");
    Ok(())
}

/// Handle royal.ping messages
pub async fn handle_ping(client: Client, mut subscriber: Subscriber) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Ping message without reply subject");
                continue;
            }
        };

        let request: Request<PingRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse ping request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", format!("Failed to parse request: {}", e)).await?;
                continue;
            }
        };

        let response = PongResponse {
            message: pong_message(request.payload.message.as_deref()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        reply_success(&client, reply, request.id, response).await?;

        debug!("Sent pong response");
    }

    Ok(())
}

fn pong_message(message: Option<&str>) -> String {
    message
        .map(|m| format!("Pong: {}", m))
        .unwrap_or_else(|| "Pong".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pong_message_echoes_input() {
        assert_eq!(pong_message(Some("hello")), "Pong: hello");
        assert_eq!(pong_message(None), "Pong");
    }

    #[test]
    fn test_ping_payload_message_is_optional() {
        let req: PingRequest = serde_json::from_str("{}").unwrap();
        assert!(req.message.is_none());
    }
}
