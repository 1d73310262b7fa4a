//! catalog-media - Upload sessions and media attachments for a course-catalog dashboard
//!
//! This crate provides:
//! - Upload sessions that take in dropped files, write them concurrently to a
//!   storage bucket, and report per-file outcomes
//! - Swappable bucket backends (hosted storage REST API, local filesystem)
//! - redb-backed attachment records linking public URLs to catalog records
//! - REST API over sessions and attachments

pub mod api;
pub mod carousel;
pub mod catalog;
pub mod config;
pub mod object_store;
pub mod upload;
pub mod validation;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use catalog::Database;
use config::Config;
use upload::{Coordinator, PreviewPool};

/// One upload session shared between requests.
pub type SharedSession = Arc<Mutex<Coordinator>>;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub previews: Arc<PreviewPool>,
    pub sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        object_store: Arc<dyn object_store::ObjectStore>,
    ) -> Self {
        Self {
            config,
            db,
            object_store,
            previews: Arc::new(PreviewPool::new()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn session(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove and reset every open session. Returns how many were closed.
    pub async fn close_all_sessions(&self) -> usize {
        let sessions: Vec<SharedSession> =
            self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &sessions {
            session.lock().await.reset();
        }
        sessions.len()
    }
}
