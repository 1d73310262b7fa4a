use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::object_store::{ObjectStore, PutOptions};

/// Result of one storage write for one file in one dispatch round.
///
/// `identity` names the object that was written, so the outcome can only be
/// credited to the file that still holds that identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub file_name: String,
    pub identity: String,
    pub failure_message: Option<String>,
}

impl UploadOutcome {
    pub fn success(file_name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            identity: identity.into(),
            failure_message: None,
        }
    }

    pub fn failure(
        file_name: impl Into<String>,
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            identity: identity.into(),
            failure_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

#[derive(Debug, Clone)]
pub(super) struct WriteJob {
    pub file_name: String,
    pub identity: String,
    pub path: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The work set of one dispatch round, detached from the session so the
/// writes can run without holding it.
pub struct DispatchPlan {
    pub(super) generation: u64,
    pub(super) store: Arc<dyn ObjectStore>,
    pub(super) options: PutOptions,
    pub(super) jobs: Vec<WriteJob>,
}

/// Settled outcomes of a [`DispatchPlan`], in work-set order.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub(super) generation: u64,
    pub outcomes: Vec<UploadOutcome>,
}

impl DispatchReport {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

impl DispatchPlan {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.file_name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Issue every write at once and wait for all of them to settle.
    /// A failed write is recorded in its outcome and never stops the others.
    pub async fn execute(self) -> DispatchReport {
        let DispatchPlan {
            generation,
            store,
            options,
            jobs,
        } = self;

        let writes = jobs.into_iter().map(|job| {
            let WriteJob {
                file_name,
                identity,
                path,
                content_type,
                data,
            } = job;
            let store = Arc::clone(&store);
            let options = PutOptions {
                content_type: Some(content_type),
                ..options.clone()
            };
            async move {
                match store.put(&path, data, &options).await {
                    Ok(()) => {
                        debug!(file = %file_name, path = %path, "Stored file");
                        UploadOutcome::success(file_name, identity)
                    }
                    Err(e) => {
                        warn!(file = %file_name, path = %path, error = %e, "Failed to store file");
                        UploadOutcome::failure(file_name, identity, e.to_string())
                    }
                }
            }
        });

        DispatchReport {
            generation,
            outcomes: join_all(writes).await,
        }
    }
}
