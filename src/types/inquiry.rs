//! Visitor contact and quote submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "inquiry_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InquiryKind {
    Contact,
    Quote,
}

impl Default for InquiryKind {
    fn default() -> Self {
        InquiryKind::Contact
    }
}

/// Inquiry entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: Uuid,
    pub kind: InquiryKind,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Public form submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitInquiryRequest {
    #[serde(default)]
    pub kind: InquiryKind,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

impl SubmitInquiryRequest {
    /// Trim the free-text fields and return the first validation problem, if any
    pub fn normalized(mut self) -> Result<Self, &'static str> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.message = self.message.trim().to_string();
        self.phone = self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self.subject = self.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        if self.name.is_empty() || self.email.is_empty() || self.message.is_empty() {
            return Err("Name, email, and message are required");
        }
        if !self.email.contains('@') {
            return Err("Email address is not valid");
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInquiriesRequest {
    pub kind: Option<InquiryKind>,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkInquiryReadRequest {
    pub id: Uuid,
    #[serde(default = "default_is_read")]
    pub is_read: bool,
}

fn default_is_read() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, email: &str, message: &str) -> SubmitInquiryRequest {
        SubmitInquiryRequest {
            kind: InquiryKind::Quote,
            name: name.to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            subject: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_normalized_trims_and_lowercases_email() {
        let req = submission("  Ali  ", " Ali@Example.COM ", " Need 20 litres ").normalized().unwrap();
        assert_eq!(req.name, "Ali");
        assert_eq!(req.email, "ali@example.com");
        assert_eq!(req.message, "Need 20 litres");
        assert!(req.phone.is_none());
    }

    #[test]
    fn test_normalized_rejects_blank_message() {
        assert!(submission("Ali", "ali@example.com", "   ").normalized().is_err());
    }

    #[test]
    fn test_normalized_rejects_email_without_at() {
        assert!(submission("Ali", "ali.example.com", "hi").normalized().is_err());
    }

    #[test]
    fn test_kind_defaults_to_contact() {
        let req: SubmitInquiryRequest =
            serde_json::from_str(r#"{"name":"A","email":"a@b.c","message":"m"}"#).unwrap();
        assert_eq!(req.kind, InquiryKind::Contact);
    }
}
