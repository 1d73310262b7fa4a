//! Shared test helpers for catalog-media integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Barrier;

use catalog_media::catalog::Database;
use catalog_media::config::{Config, ServerConfig, StorageConfig, UploadConfig};
use catalog_media::object_store::{LocalStore, ObjectStore, ObjectStoreError, PutOptions};
use catalog_media::upload::{Candidate, IntakePolicy};
use catalog_media::AppState;

/// In-memory bucket that records every write and fails paths containing
/// any of the configured markers.
#[derive(Default)]
pub struct ScriptedStore {
    failing: Mutex<Vec<String>>,
    puts: Mutex<Vec<(String, PutOptions)>>,
    gate: Option<Arc<Barrier>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every write waits until `writers` writes are in flight at once.
    pub fn gated(writers: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Arc::new(Barrier::new(writers))),
            ..Self::default()
        })
    }

    pub fn fail_paths_containing(&self, markers: &[&str]) {
        *self.failing.lock().unwrap() = markers.iter().map(|m| m.to_string()).collect();
    }

    pub fn puts(&self) -> Vec<(String, PutOptions)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn put_paths(&self) -> Vec<String> {
        self.puts().into_iter().map(|(p, _)| p).collect()
    }
}

#[async_trait]
impl ObjectStore for ScriptedStore {
    async fn put(
        &self,
        path: &str,
        _data: Bytes,
        options: &PutOptions,
    ) -> Result<(), ObjectStoreError> {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        self.puts
            .lock()
            .unwrap()
            .push((path.to_string(), options.clone()));

        let failing = self.failing.lock().unwrap().clone();
        if let Some(marker) = failing.iter().find(|m| path.contains(m.as_str())) {
            return Err(ObjectStoreError::Backend(format!("write rejected: {marker}")));
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/public/media/{path}")
    }
}

pub fn png(name: &str, size: usize) -> Candidate {
    Candidate::new(name, vec![0u8; size]).with_mime_type("image/png")
}

pub fn images_policy(max_files: usize) -> IntakePolicy {
    IntakePolicy {
        max_files,
        max_size: 1024,
        min_size: 0,
        allowed_mime_types: vec!["image/*".to_string()],
    }
}

pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: temp_dir.path().join("data").to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            local_storage_path: temp_dir.path().join("files").to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        upload: UploadConfig {
            policy: images_policy(3),
            ..UploadConfig::default()
        },
        test_mode: true,
    }
}

/// AppState with a temporary database and the given bucket.
pub fn test_state(temp_dir: &tempfile::TempDir, store: Arc<dyn ObjectStore>) -> Arc<AppState> {
    let config = test_config(temp_dir);
    let db = Database::open(&config.server.data_dir).expect("Failed to open test database");
    Arc::new(AppState::new(config, db, store))
}

/// AppState backed by a local bucket under the temp dir.
pub fn local_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let store = LocalStore::new(temp_dir.path().join("files")).expect("Failed to create store");
    test_state(temp_dir, Arc::new(store))
}
