use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{lookup_session, parse_record_id};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::catalog::models::{Attachment, FileType, MediaSlot, RecordKind};
use crate::object_store::PutOptions;
use crate::upload::{Candidate, Coordinator, SessionOptions, SessionSnapshot};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Bucket folder for this session's files, e.g. `courses/banners`
    pub folder: String,
    #[serde(default)]
    pub max_files: Option<usize>,
    #[serde(default)]
    pub max_size: Option<u64>,
    #[serde(default)]
    pub allowed_mime_types: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub state: SessionSnapshot,
    pub public_urls: Vec<PublicUrl>,
}

#[derive(Debug, Serialize)]
pub struct PublicUrl {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    pub record_kind: RecordKind,
    pub record_id: String,
    pub slot: MediaSlot,
    /// Which stored file to attach; defaults to the first one.
    #[serde(default)]
    pub file_name: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let folder = req.folder.trim_matches('/').to_string();
    if folder.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(ApiError::bad_request(
            "folder must be a relative path without empty, '.' or '..' segments",
        ));
    }

    let mut policy = state.config.upload.policy.clone();
    if let Some(max_files) = req.max_files {
        if max_files == 0 {
            return Err(ApiError::bad_request("max_files must be greater than 0"));
        }
        policy.max_files = max_files;
    }
    if let Some(max_size) = req.max_size {
        policy.max_size = max_size.min(state.config.upload.policy.max_size);
    }
    if let Some(types) = req.allowed_mime_types {
        policy.allowed_mime_types = types.into_iter().map(|t| t.to_lowercase()).collect();
    }

    let options = SessionOptions {
        folder,
        policy,
        put: PutOptions {
            cache_control_secs: state.config.upload.cache_control_secs,
            upsert: state.config.upload.upsert,
            content_type: None,
        },
    };
    let coordinator = Coordinator::with_previews(
        Arc::clone(&state.object_store),
        options,
        Arc::clone(&state.previews),
    );

    let id = Uuid::new_v4();
    let response = session_response(id, &coordinator);
    state
        .sessions
        .write()
        .await
        .insert(id, Arc::new(Mutex::new(coordinator)));

    tracing::debug!(session_id = %id, folder = %response.state.folder, "Opened upload session");
    Ok(JSend::success(response))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let session = lookup_session(&state, &id).await?;
    let coordinator = session.lock().await;
    Ok(JSend::success(session_response(id, &coordinator)))
}

pub async fn add_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let session = lookup_session(&state, &id).await?;

    let mut candidates = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if !matches!(field.name(), Some("file") | Some("files")) {
            continue;
        }
        let name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::bad_request("file fields must carry a filename"))?;
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await?;

        let mut candidate = Candidate::new(name, data);
        candidate.mime_type = content_type;
        candidates.push(candidate);
    }

    if candidates.is_empty() {
        return Err(ApiError::bad_request("at least one file field is required"));
    }

    let mut coordinator = session.lock().await;
    let added = coordinator.drop_files(candidates);
    tracing::debug!(session_id = %id, added, "Took in files");

    Ok(JSend::success(session_response(id, &coordinator)))
}

pub async fn remove_file(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(Uuid, String)>,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let session = lookup_session(&state, &id).await?;
    let mut coordinator = session.lock().await;

    if !coordinator.remove_file(&name) {
        return Err(ApiError::not_found("File not found in session"));
    }
    Ok(JSend::success(session_response(id, &coordinator)))
}

/// Dispatch the session's work set. The session lock is released while the
/// writes are in flight so readers observe `is_uploading`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let session = lookup_session(&state, &id).await?;

    let plan = session.lock().await.begin_dispatch()?;
    let report = plan.execute().await;

    let mut coordinator = session.lock().await;
    let failed = report.failed();
    if coordinator.complete(report) {
        tracing::info!(session_id = %id, failed, "Upload round finished");
    }

    Ok(JSend::success(session_response(id, &coordinator)))
}

pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let session = lookup_session(&state, &id).await?;
    let mut coordinator = session.lock().await;
    coordinator.reset();
    Ok(JSend::success(session_response(id, &coordinator)))
}

pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JSend<()>>, ApiError> {
    let session = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    // An in-flight upload may still hold a reference; reset so its results are moot.
    session.lock().await.reset();

    tracing::debug!(session_id = %id, "Closed upload session");
    Ok(JSend::success(()))
}

/// Persist a stored file's public URL onto a catalog record.
pub async fn attach(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<AttachRequest>,
) -> Result<Json<JSend<Attachment>>, ApiError> {
    let record_id = parse_record_id(&req.record_id)?;
    let session = lookup_session(&state, &id).await?;
    let coordinator = session.lock().await;

    if !coordinator.overall_success() {
        return Err(ApiError::conflict(
            "upload session has not fully succeeded",
        ));
    }

    let urls = coordinator.public_urls();
    let (file_name, public_url) = match req.file_name.as_deref() {
        Some(wanted) => urls.into_iter().find(|(name, _)| name == wanted),
        None => urls.into_iter().next(),
    }
    .ok_or_else(|| ApiError::not_found("File not found in session"))?;

    let file = coordinator
        .files()
        .iter()
        .find(|f| f.client_name == file_name)
        .ok_or_else(|| ApiError::internal("Stored file missing from session"))?;

    let now = Utc::now();
    let attachment = Attachment {
        record_kind: req.record_kind,
        record_id,
        slot: req.slot,
        public_url,
        file_type: FileType::from_mime(&file.mime_type),
        mime_type: file.mime_type.clone(),
        byte_size: file.size_bytes,
        created_at: now,
        updated_at: now,
    };
    let stored = state.db.attach(&attachment)?;

    tracing::debug!(
        session_id = %id,
        record = %stored.key(),
        url = %stored.public_url,
        "Attached media"
    );
    Ok(JSend::success(stored))
}

// ============================================================================
// Helpers
// ============================================================================

fn session_response(id: Uuid, coordinator: &Coordinator) -> SessionResponse {
    SessionResponse {
        id,
        state: coordinator.snapshot(),
        public_urls: coordinator
            .public_urls()
            .into_iter()
            .map(|(file_name, url)| PublicUrl { file_name, url })
            .collect(),
    }
}
