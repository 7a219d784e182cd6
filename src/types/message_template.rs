//! SMS / mail template types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Delivery channel of a template. At most one template per channel is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "template_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemplateChannel {
    Sms,
    Mail,
}

impl TemplateChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateChannel::Sms => "sms",
            TemplateChannel::Mail => "mail",
        }
    }
}

/// Message template entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: Uuid,
    pub name: String,
    pub channel: TemplateChannel,
    pub subject: Option<String>,
    pub body: String,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageTemplateRequest {
    pub name: String,
    pub channel: TemplateChannel,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageTemplateRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessageTemplatesRequest {
    pub channel: Option<TemplateChannel>,
}

/// Clear the selected template of a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnselectTemplateRequest {
    pub channel: TemplateChannel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TemplateChannel::Sms).unwrap(), "\"sms\"");
        assert_eq!(serde_json::to_string(&TemplateChannel::Mail).unwrap(), "\"mail\"");
    }

    #[test]
    fn test_channel_as_str_matches_serde() {
        for channel in [TemplateChannel::Sms, TemplateChannel::Mail] {
            let json = serde_json::to_string(&channel).unwrap();
            assert_eq!(json.trim_matches('"'), channel.as_str());
        }
    }
}
