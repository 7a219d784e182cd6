//! Career posting types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Job opening shown on the public careers page
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Career {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: String,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCareerRequest {
    pub title: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: String,
    #[serde(default = "default_is_open")]
    pub is_open: bool,
}

fn default_is_open() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCareerRequest {
    pub id: Uuid,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: Option<String>,
    pub is_open: Option<bool>,
}
