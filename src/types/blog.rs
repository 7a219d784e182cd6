//! Blog post types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    /// URL segment of the public detail page, unique across posts
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a blog post. The slug is derived from the title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

/// Request to update a blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogPostRequest {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub slug: Option<String>,
}
