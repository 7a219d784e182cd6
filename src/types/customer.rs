//! Customer types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Customer entity
///
/// `contact_number` is the natural key: unique across all customers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub full_name: String,
    pub contact_number: String,
    pub address: String,
    pub email: String,

    // SMS campaign status
    pub sms_sent: bool,
    pub sms_sent_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub full_name: String,
    pub contact_number: String,
    pub address: String,
    pub email: String,
}

/// Request to update a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

/// Mutable details of an existing customer.
///
/// Has no contact number: replacing an existing record during import
/// never touches its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub full_name: String,
    pub address: String,
    pub email: String,
}

/// Request to flag whether the campaign SMS has been sent to a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSmsSentRequest {
    pub id: Uuid,
    #[serde(default = "default_sms_sent")]
    pub sms_sent: bool,
}

fn default_sms_sent() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_sms_sent_defaults_to_true() {
        let json = r#"{"id":"00000000-0000-0000-0000-000000000001"}"#;
        let req: MarkSmsSentRequest = serde_json::from_str(json).unwrap();
        assert!(req.sms_sent);
    }

    #[test]
    fn test_customer_serializes_camel_case() {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::nil(),
            full_name: "Jane Doe".to_string(),
            contact_number: "0300 1234567".to_string(),
            address: "12 Mall Road".to_string(),
            email: "jane@example.com".to_string(),
            sms_sent: false,
            sms_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["fullName"], "Jane Doe");
        assert_eq!(json["contactNumber"], "0300 1234567");
        assert_eq!(json["smsSent"], false);
    }
}
