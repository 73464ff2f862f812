//! Unified activity feed
//!
//! GET /logs/unified?limit=N - task records, agent logs and stored events,
//! newest first

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use agentwatch_core::{AggregateDiagnostics, UnifiedAggregator, UnifiedLogEntry};

use crate::server::config::AppConfig;

/// Query for the unified feed
#[derive(Debug, Default, Deserialize)]
pub struct UnifiedQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Unified feed response
#[derive(Debug, Serialize)]
pub struct UnifiedLogsResponse {
    pub ok: bool,
    pub logs: Vec<UnifiedLogEntry>,
    /// Entries available before truncation
    pub total: usize,
    pub diagnostics: AggregateDiagnostics,
}

/// Build the unified feed
pub async fn unified_logs(
    Extension(aggregator): Extension<Arc<UnifiedAggregator>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Query(query): Query<UnifiedQuery>,
) -> Response {
    let limit = config
        .aggregator
        .clamp_limit(query.limit, config.aggregator.default_limit);

    match aggregator.aggregate(limit as usize).await {
        Ok(report) => Json(UnifiedLogsResponse {
            ok: true,
            logs: report.logs,
            total: report.total,
            diagnostics: report.diagnostics,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Unified log aggregation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Create unified log routes
pub fn logs_routes() -> Router {
    Router::new().route("/logs/unified", get(unified_logs))
}
