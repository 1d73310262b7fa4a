use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub open_sessions: usize,
    pub outstanding_previews: usize,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub attachments_deleted: u64,
    pub sessions_closed: usize,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        open_sessions: state.sessions.read().await.len(),
        outstanding_previews: state.previews.outstanding(),
    })
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state.db.purge_all()?;

    let sessions_closed = state.close_all_sessions().await;

    tracing::warn!(
        attachments = stats.attachments,
        sessions = sessions_closed,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        attachments_deleted: stats.attachments,
        sessions_closed,
    }))
}
