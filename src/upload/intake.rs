use std::collections::HashSet;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::preview::PreviewHandle;

/// Why a picked or dropped file cannot be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    FileInvalidType,
    FileTooLarge,
    FileTooSmall,
    TooManyFiles,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::FileInvalidType => "file-invalid-type",
            RejectionReason::FileTooLarge => "file-too-large",
            RejectionReason::FileTooSmall => "file-too-small",
            RejectionReason::TooManyFiles => "too-many-files",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            RejectionReason::FileInvalidType => "File type is not accepted",
            RejectionReason::FileTooLarge => "File is larger than the maximum size",
            RejectionReason::FileTooSmall => "File is smaller than the minimum size",
            RejectionReason::TooManyFiles => "Too many files",
        };
        f.write_str(message)
    }
}

/// A file as picked or dropped by the user, before intake.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    /// MIME type as reported by the client, if any.
    pub mime_type: Option<String>,
    pub data: Bytes,
}

impl Candidate {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data: data.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Client MIME type, or a guess from the file name, or the octet-stream fallback.
    pub fn resolved_mime_type(&self) -> String {
        self.mime_type
            .clone()
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| mime_guess::from_path(&self.name).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// A candidate the drop zone refused, with every reason it was refused for.
#[derive(Debug, Clone)]
pub struct RejectedCandidate {
    pub file: Candidate,
    pub reasons: Vec<RejectionReason>,
}

/// Type, size and count limits applied to picked or dropped files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePolicy {
    pub max_files: usize,
    pub max_size: u64,
    pub min_size: u64,
    /// Accepted MIME types; `image/*` style wildcards allowed. Empty accepts anything.
    pub allowed_mime_types: Vec<String>,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            max_files: 1,
            max_size: 50 * 1024 * 1024, // 50MB
            min_size: 0,
            allowed_mime_types: Vec::new(),
        }
    }
}

impl IntakePolicy {
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let mime_type = mime_type.to_lowercase();
        self.allowed_mime_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(primary) => mime_type
                    .split_once('/')
                    .is_some_and(|(p, _)| p == primary),
                None => *allowed == mime_type,
            }
        })
    }

    /// Type and size reasons for a single candidate, in a stable order.
    pub fn check(&self, candidate: &Candidate) -> Vec<RejectionReason> {
        let mut reasons = Vec::new();
        if !self.accepts_mime(&candidate.resolved_mime_type()) {
            reasons.push(RejectionReason::FileInvalidType);
        }
        let size = candidate.size();
        if size > self.max_size {
            reasons.push(RejectionReason::FileTooLarge);
        } else if size < self.min_size {
            reasons.push(RejectionReason::FileTooSmall);
        }
        reasons
    }

    /// Split a drop into accepted and rejected candidates.
    ///
    /// When `existing` plus the accepted files would exceed `max_files`, every
    /// otherwise accepted file of the batch is rejected as `too-many-files`.
    pub fn classify(
        &self,
        existing: usize,
        candidates: Vec<Candidate>,
    ) -> (Vec<Candidate>, Vec<RejectedCandidate>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for candidate in candidates {
            let reasons = self.check(&candidate);
            if reasons.is_empty() {
                accepted.push(candidate);
            } else {
                rejected.push(RejectedCandidate {
                    file: candidate,
                    reasons,
                });
            }
        }

        if existing + accepted.len() > self.max_files {
            rejected.extend(accepted.drain(..).map(|file| RejectedCandidate {
                file,
                reasons: vec![RejectionReason::TooManyFiles],
            }));
        }

        (accepted, rejected)
    }
}

/// A file held by an upload session, valid or rejected.
#[derive(Debug)]
pub struct PendingFile {
    /// Name the user picked the file under; unique within a session.
    pub client_name: String,
    /// Timestamp-suffixed name the object is stored under.
    pub identity: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub data: Bytes,
    pub rejection_reasons: Vec<RejectionReason>,
    pub(super) preview: PreviewHandle,
}

impl PendingFile {
    pub(super) fn new(
        candidate: Candidate,
        reasons: Vec<RejectionReason>,
        preview: PreviewHandle,
        identity: String,
    ) -> Self {
        let mime_type = candidate.resolved_mime_type();
        Self {
            identity,
            size_bytes: candidate.size(),
            client_name: candidate.name,
            mime_type,
            data: candidate.data,
            rejection_reasons: reasons,
            preview,
        }
    }

    pub fn is_rejected(&self) -> bool {
        !self.rejection_reasons.is_empty()
    }

    pub fn preview_uri(&self) -> String {
        self.preview.uri()
    }
}

/// Rename `Course Banner.png` to `Course-Banner-1700000000000.png` so repeated
/// uploads of the same name never collide in the bucket.
pub fn storage_identity(name: &str, timestamp_millis: i64) -> String {
    let (stem, ext) = split_sanitized(name);
    compose_identity(&stem, ext.as_deref(), timestamp_millis, 0)
}

/// Like [`storage_identity`], but appends a counter (`a-b-42-1.png`) until the
/// result is not in `taken`. Distinct names can sanitize to the same stem.
pub fn unique_storage_identity(
    name: &str,
    timestamp_millis: i64,
    taken: &HashSet<String>,
) -> String {
    let (stem, ext) = split_sanitized(name);
    let mut attempt = 0;
    loop {
        let identity = compose_identity(&stem, ext.as_deref(), timestamp_millis, attempt);
        if !taken.contains(&identity) {
            return identity;
        }
        attempt += 1;
    }
}

fn split_sanitized(name: &str) -> (String, Option<String>) {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();

    match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), Some(ext.to_string()))
        }
        _ => (sanitized, None),
    }
}

fn compose_identity(
    stem: &str,
    ext: Option<&str>,
    timestamp_millis: i64,
    attempt: u32,
) -> String {
    let base = match attempt {
        0 => format!("{stem}-{timestamp_millis}"),
        n => format!("{stem}-{timestamp_millis}-{n}"),
    };
    match ext {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
