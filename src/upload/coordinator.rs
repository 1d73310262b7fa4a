use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dispatch::{DispatchPlan, DispatchReport, WriteJob};
use super::intake::{
    unique_storage_identity, Candidate, IntakePolicy, PendingFile, RejectedCandidate,
    RejectionReason,
};
use super::preview::PreviewPool;
use crate::object_store::{object_path, ObjectStore, PutOptions};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("No files to upload")]
    NoFiles,
    #[error("An upload is already in progress")]
    AlreadyUploading,
}

/// Where and how one upload session stores its files.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Bucket folder the files are written under, e.g. `courses/banners`.
    pub folder: String,
    pub policy: IntakePolicy,
    pub put: PutOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Rejected,
    Pending,
    Uploaded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub client_name: String,
    pub identity: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub preview: String,
    pub rejection_reasons: Vec<RejectionReason>,
    pub status: FileStatus,
}

/// Serializable view of a session's state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub folder: String,
    pub files: Vec<FileSummary>,
    pub successes: Vec<String>,
    pub failures: BTreeMap<String, String>,
    pub is_uploading: bool,
    pub overall_success: bool,
}

/// State machine for one upload session: intake, dispatch, aggregation, reset.
pub struct Coordinator {
    store: Arc<dyn ObjectStore>,
    previews: Arc<PreviewPool>,
    options: SessionOptions,
    files: Vec<PendingFile>,
    successes: BTreeSet<String>,
    failures: BTreeMap<String, String>,
    is_uploading: bool,
    /// Every storage identity handed out since the last reset, including
    /// those of removed files. Never reused, so a late outcome cannot be
    /// credited to a different file.
    issued_identities: HashSet<String>,
    /// Advanced by every reset; dispatch reports from an older generation are moot.
    generation: u64,
}

impl Coordinator {
    pub fn new(store: Arc<dyn ObjectStore>, options: SessionOptions) -> Self {
        Self::with_previews(store, options, Arc::new(PreviewPool::new()))
    }

    pub fn with_previews(
        store: Arc<dyn ObjectStore>,
        options: SessionOptions,
        previews: Arc<PreviewPool>,
    ) -> Self {
        Self {
            store,
            previews,
            options,
            files: Vec::new(),
            successes: BTreeSet::new(),
            failures: BTreeMap::new(),
            is_uploading: false,
            issued_identities: HashSet::new(),
            generation: 0,
        }
    }

    // ========================================================================
    // Session state
    // ========================================================================

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn successes(&self) -> &BTreeSet<String> {
        &self.successes
    }

    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }

    pub fn is_uploading(&self) -> bool {
        self.is_uploading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// True only when there is at least one file, no failures, and every file
    /// has been stored.
    pub fn overall_success(&self) -> bool {
        !self.files.is_empty()
            && self.failures.is_empty()
            && self
                .files
                .iter()
                .all(|f| self.successes.contains(&f.client_name))
    }

    /// Public URL of every stored file, in display order.
    pub fn public_urls(&self) -> Vec<(String, String)> {
        self.files
            .iter()
            .filter(|f| self.successes.contains(&f.client_name))
            .map(|f| {
                let path = object_path(&self.options.folder, &f.identity);
                (f.client_name.clone(), self.store.public_url(&path))
            })
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let files = self
            .files
            .iter()
            .map(|f| FileSummary {
                client_name: f.client_name.clone(),
                identity: f.identity.clone(),
                mime_type: f.mime_type.clone(),
                size_bytes: f.size_bytes,
                preview: f.preview_uri(),
                rejection_reasons: f.rejection_reasons.clone(),
                status: self.status_of(f),
            })
            .collect();

        SessionSnapshot {
            folder: self.options.folder.clone(),
            files,
            successes: self.successes.iter().cloned().collect(),
            failures: self.failures.clone(),
            is_uploading: self.is_uploading,
            overall_success: self.overall_success(),
        }
    }

    fn status_of(&self, file: &PendingFile) -> FileStatus {
        if file.is_rejected() {
            FileStatus::Rejected
        } else if self.successes.contains(&file.client_name) {
            FileStatus::Uploaded
        } else if self.failures.contains_key(&file.client_name) {
            FileStatus::Failed
        } else {
            FileStatus::Pending
        }
    }

    // ========================================================================
    // Intake
    // ========================================================================

    /// Classify a drop against the session's policy, then take it in.
    pub fn drop_files(&mut self, candidates: Vec<Candidate>) -> usize {
        let (accepted, rejected) = self
            .options
            .policy
            .classify(self.files.len(), candidates);
        self.intake(accepted, rejected)
    }

    /// Append accepted then rejected files, skipping any whose name is already
    /// present. Returns how many files were added.
    pub fn intake(&mut self, accepted: Vec<Candidate>, rejected: Vec<RejectedCandidate>) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut seen: HashSet<String> = self.files.iter().map(|f| f.client_name.clone()).collect();

        let incoming = accepted
            .into_iter()
            .map(|c| (c, Vec::new()))
            .chain(rejected.into_iter().map(|r| (r.file, r.reasons)));

        let mut added = Vec::new();
        for (candidate, reasons) in incoming {
            if !seen.insert(candidate.name.clone()) {
                debug!(file = %candidate.name, "Skipping duplicate file");
                continue;
            }
            let identity = unique_storage_identity(&candidate.name, now, &self.issued_identities);
            self.issued_identities.insert(identity.clone());
            let preview = self.previews.allocate();
            added.push(PendingFile::new(candidate, reasons, preview, identity));
        }

        let count = added.len();
        self.files.extend(added);
        self.reconcile_count_rejections();
        count
    }

    /// Remove one file and whatever outcome was recorded for it.
    pub fn remove_file(&mut self, client_name: &str) -> bool {
        let Some(index) = self.files.iter().position(|f| f.client_name == client_name) else {
            return false;
        };

        let file = self.files.remove(index);
        self.previews.release(file.preview);
        self.successes.remove(client_name);
        self.failures.remove(client_name);
        self.reconcile_count_rejections();
        true
    }

    /// Once the session is back within `max_files`, drop `too-many-files` from
    /// every file. Other reasons stay.
    fn reconcile_count_rejections(&mut self) {
        if self.files.len() > self.options.policy.max_files {
            return;
        }
        for file in &mut self.files {
            file.rejection_reasons
                .retain(|r| *r != RejectionReason::TooManyFiles);
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Mark the session as uploading and detach the work set: every file that
    /// failed before or has not been stored yet, skipping rejected files.
    pub fn begin_dispatch(&mut self) -> Result<DispatchPlan, CoordinatorError> {
        if self.files.is_empty() {
            return Err(CoordinatorError::NoFiles);
        }
        if self.is_uploading {
            return Err(CoordinatorError::AlreadyUploading);
        }

        let jobs: Vec<WriteJob> = self
            .files
            .iter()
            .filter(|f| !f.is_rejected())
            .filter(|f| {
                self.failures.contains_key(&f.client_name)
                    || !self.successes.contains(&f.client_name)
            })
            .map(|f| WriteJob {
                file_name: f.client_name.clone(),
                identity: f.identity.clone(),
                path: object_path(&self.options.folder, &f.identity),
                content_type: f.mime_type.clone(),
                data: f.data.clone(),
            })
            .collect();

        self.is_uploading = true;
        Ok(DispatchPlan {
            generation: self.generation,
            store: Arc::clone(&self.store),
            options: self.options.put.clone(),
            jobs,
        })
    }

    /// Fold a settled report into the session in one transition. Reports
    /// planned before the last reset are ignored; returns whether it applied.
    ///
    /// An outcome only counts for the file that still holds the identity it
    /// wrote. A file removed and re-added mid-flight has a fresh identity and
    /// stays pending.
    pub fn complete(&mut self, report: DispatchReport) -> bool {
        if report.generation != self.generation {
            warn!(
                report_generation = report.generation,
                generation = self.generation,
                "Ignoring upload results from a reset session"
            );
            return false;
        }

        let current: HashMap<&str, &str> = self
            .files
            .iter()
            .map(|f| (f.client_name.as_str(), f.identity.as_str()))
            .collect();
        let mut failures = BTreeMap::new();
        for outcome in report.outcomes {
            if current.get(outcome.file_name.as_str()) != Some(&outcome.identity.as_str()) {
                debug!(
                    file = %outcome.file_name,
                    identity = %outcome.identity,
                    "Dropping outcome for a replaced file"
                );
                continue;
            }
            match outcome.failure_message {
                None => {
                    self.successes.insert(outcome.file_name);
                }
                Some(message) => {
                    self.successes.remove(&outcome.file_name);
                    failures.insert(outcome.file_name, message);
                }
            }
        }

        self.failures = failures;
        self.is_uploading = false;
        true
    }

    /// Run a full dispatch round: plan, write concurrently, fold the outcomes.
    pub async fn upload(&mut self) -> Result<(), CoordinatorError> {
        let plan = self.begin_dispatch()?;
        let attempted = plan.jobs.len();
        let report = plan.execute().await;
        let failed = report.failed();
        self.complete(report);

        info!(
            folder = %self.options.folder,
            attempted,
            failed,
            overall_success = self.overall_success(),
            "Upload round finished"
        );
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release every preview and clear all state, starting a new logical session.
    pub fn reset(&mut self) {
        self.release_previews();
        self.successes.clear();
        self.failures.clear();
        self.issued_identities.clear();
        self.is_uploading = false;
        self.generation += 1;
    }

    fn release_previews(&mut self) {
        for file in self.files.drain(..) {
            self.previews.release(file.preview);
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.release_previews();
    }
}
