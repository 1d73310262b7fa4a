//! Upload sessions for media attachment forms.
//!
//! A [`Coordinator`] owns one session: files are taken in through
//! [`Coordinator::drop_files`] or [`Coordinator::intake`], written to the
//! bucket by [`Coordinator::upload`], and judged by
//! [`Coordinator::overall_success`]. [`Coordinator::reset`] ends the session.

mod coordinator;
mod dispatch;
mod intake;
mod preview;

pub use coordinator::{
    Coordinator, CoordinatorError, FileStatus, FileSummary, SessionOptions, SessionSnapshot,
};
pub use dispatch::{DispatchPlan, DispatchReport, UploadOutcome};
pub use intake::{
    storage_identity, unique_storage_identity, Candidate, IntakePolicy, PendingFile,
    RejectedCandidate, RejectionReason,
};
pub use preview::{PreviewHandle, PreviewPool};
