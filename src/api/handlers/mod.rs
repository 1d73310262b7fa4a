mod admin;
mod attachments;
mod sessions;
mod site;

use uuid::Uuid;

use crate::api::response::ApiError;
use crate::{AppState, SharedSession};

pub use admin::{admin_purge, health};
pub use attachments::{detach, list_attachments};
pub use sessions::{
    add_files, attach, close_session, create_session, get_session, remove_file, reset_session,
    upload,
};
pub use site::{carousel, validate_contact_form};

async fn lookup_session(state: &AppState, id: &Uuid) -> Result<SharedSession, ApiError> {
    state
        .session(id)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

/// Record ids are embedded in attachment keys, so they may not contain ':'.
fn parse_record_id(record_id: &str) -> Result<String, ApiError> {
    let record_id = record_id.trim();
    if record_id.is_empty() || record_id.contains(':') {
        return Err(ApiError::bad_request(
            "record_id must be non-empty and must not contain ':'",
        ));
    }
    Ok(record_id.to_string())
}
