use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::StorageBackend;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let policy = &state.config.upload.policy;
    // Room for a full batch of maximum-size files plus multipart overhead
    let upload_limit = (policy.max_size as usize)
        .saturating_mul(policy.max_files.max(1))
        .saturating_add(64 * 1024);

    let mut router = Router::new()
        // Upload sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", get(handlers::get_session))
        .route("/sessions/:id", delete(handlers::close_session))
        .route(
            "/sessions/:id/files",
            post(handlers::add_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/sessions/:id/files/:name", delete(handlers::remove_file))
        .route("/sessions/:id/upload", post(handlers::upload))
        .route("/sessions/:id/reset", post(handlers::reset_session))
        .route("/sessions/:id/attach", post(handlers::attach))
        // Catalog attachments
        .route("/attachments", get(handlers::list_attachments))
        .route(
            "/attachments/:kind/:record_id/:slot",
            delete(handlers::detach),
        )
        // Public site
        .route("/carousel", get(handlers::carousel))
        .route("/contact/validate", post(handlers::validate_contact_form))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // The local backend has no CDN in front of it
    if state.config.storage.backend == StorageBackend::Local {
        router = router.nest_service(
            "/media",
            ServeDir::new(&state.config.storage.local_storage_path),
        );
    }

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", post(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
