mod bucket;
mod local;

pub use bucket::BucketStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
    #[error("{0}")]
    Backend(String),
}

/// Per-write options sent alongside the object body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// `Cache-Control: max-age` for the stored object, in seconds.
    pub cache_control_secs: u64,
    /// Overwrite an existing object at the same path instead of failing.
    pub upsert: bool,
    pub content_type: Option<String>,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            cache_control_secs: 3600,
            upsert: false,
            content_type: None,
        }
    }
}

/// Abstraction over the storage bucket that receives uploaded media.
/// Paths are `{folder}/{identity}` relative to the bucket root.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, data: Bytes, options: &PutOptions)
        -> Result<(), ObjectStoreError>;

    /// Public URL of an object. Plain string construction, never a signed request.
    fn public_url(&self, path: &str) -> String;
}

/// Join a folder prefix and a file identity into a bucket-relative path.
pub fn object_path(folder: &str, identity: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        identity.to_string()
    } else {
        format!("{folder}/{identity}")
    }
}
