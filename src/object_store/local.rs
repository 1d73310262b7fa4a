use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

use super::{ObjectStore, ObjectStoreError, PutOptions};

/// Local filesystem bucket for development and testing.
pub struct LocalStore {
    base_path: PathBuf,
    public_base: String,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        Self::with_public_base(base_path, "/media")
    }

    /// Like [`LocalStore::new`], with the URL prefix used by [`ObjectStore::public_url`].
    pub fn with_public_base<P: AsRef<Path>>(
        base_path: P,
        public_base: &str,
    ) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, path: &str) -> Result<PathBuf, ObjectStoreError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(ObjectStoreError::InvalidPath(path.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<(), ObjectStoreError> {
        let target = self.object_path(path)?;
        if !options.upsert && tokio::fs::try_exists(&target).await? {
            return Err(ObjectStoreError::AlreadyExists(path.to_string()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &data).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }
}
