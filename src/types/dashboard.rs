//! Admin dashboard types

use serde::{Deserialize, Serialize};

/// Headline counts shown on the admin landing page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub customer_count: i64,
    pub sms_sent_count: i64,
    pub blog_post_count: i64,
    pub open_career_count: i64,
    pub unread_inquiry_count: i64,
    pub selected_template_count: i64,
}
