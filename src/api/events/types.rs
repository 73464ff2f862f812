//! Request and response types for the event endpoints

use serde::{Deserialize, Serialize};

/// Query for `GET /events/recent`
#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub source_app: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, alias = "event_type")]
    pub hook_event_type: Option<String>,
}

/// Query for `GET /events/session/:session_id`
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Body of `DELETE /events/clear`
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    /// Rows removed
    pub deleted: u64,
}
