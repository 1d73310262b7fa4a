use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::parse_record_id;
use crate::api::response::{ApiError, AppQuery, JSend, Page, Pagination};
use crate::catalog::models::{Attachment, MediaSlot, RecordKind};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListAttachmentsParams {
    pub record_kind: RecordKind,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_attachments(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListAttachmentsParams>,
) -> Result<Json<JSend<Page<Attachment>>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let attachments = match params.record_id.as_deref() {
        Some(record_id) => state
            .db
            .list_for_record(params.record_kind, &parse_record_id(record_id)?)?,
        None => state.db.list_for_kind(params.record_kind)?,
    };

    let total = attachments.len() as u64;
    let items: Vec<Attachment> = attachments
        .into_iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .collect();

    Ok(JSend::page(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

pub async fn detach(
    State(state): State<Arc<AppState>>,
    Path((kind, record_id, slot)): Path<(RecordKind, String, MediaSlot)>,
) -> Result<Json<JSend<()>>, ApiError> {
    let record_id = parse_record_id(&record_id)?;
    if !state.db.detach(kind, &record_id, slot)? {
        return Err(ApiError::not_found("Attachment not found"));
    }

    tracing::debug!(record_kind = %kind, record_id = %record_id, slot = slot.as_str(), "Detached media");
    Ok(JSend::success(()))
}
