mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_media::object_store::PutOptions;
use catalog_media::upload::{
    Candidate, Coordinator, CoordinatorError, FileStatus, PreviewPool, RejectedCandidate,
    RejectionReason, SessionOptions,
};
use common::{images_policy, png, ScriptedStore};

fn options(max_files: usize) -> SessionOptions {
    SessionOptions {
        folder: "courses/banners".to_string(),
        policy: images_policy(max_files),
        put: PutOptions {
            cache_control_secs: 3600,
            upsert: false,
            content_type: None,
        },
    }
}

fn names<'a>(set: impl IntoIterator<Item = &'a String>) -> Vec<&'a str> {
    set.into_iter().map(|s| s.as_str()).collect()
}

// ============================================================================
// Intake
// ============================================================================

#[test]
fn test_intake_dedups_by_display_name() {
    let store = ScriptedStore::new();
    let mut coordinator = Coordinator::new(store, options(5));

    let added = coordinator.drop_files(vec![png("a.png", 10), png("a.png", 20), png("b.png", 10)]);
    assert_eq!(added, 2);

    let added = coordinator.intake(
        vec![png("a.png", 30)],
        vec![RejectedCandidate {
            file: png("b.png", 4096),
            reasons: vec![RejectionReason::FileTooLarge],
        }],
    );
    assert_eq!(added, 0);

    let files: Vec<&str> = coordinator
        .files()
        .iter()
        .map(|f| f.client_name.as_str())
        .collect();
    assert_eq!(files, vec!["a.png", "b.png"]);
    assert_eq!(coordinator.files()[0].size_bytes, 10);
}

#[test]
fn test_intake_renames_with_timestamp_suffix() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    coordinator.drop_files(vec![png("Course Banner.png", 10)]);

    let file = &coordinator.files()[0];
    assert_eq!(file.client_name, "Course Banner.png");
    assert!(file.identity.starts_with("Course-Banner-"));
    assert!(file.identity.ends_with(".png"));
    assert_ne!(file.identity, file.client_name);
}

#[test]
fn test_intake_oversized_file_is_kept_with_reason() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(3));
    coordinator.drop_files(vec![png("ok.png", 10), png("huge.png", 2048)]);

    assert_eq!(coordinator.files().len(), 2);
    assert!(coordinator.files()[0].rejection_reasons.is_empty());
    assert_eq!(
        coordinator.files()[1].rejection_reasons,
        vec![RejectionReason::FileTooLarge]
    );
}

#[test]
fn test_too_many_files_stripped_once_back_under_limit() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    coordinator.drop_files(vec![png("one.png", 10), png("two.png", 10)]);

    assert!(coordinator
        .files()
        .iter()
        .all(|f| f.rejection_reasons == vec![RejectionReason::TooManyFiles]));

    assert!(coordinator.remove_file("one.png"));
    assert_eq!(coordinator.files().len(), 1);
    assert!(coordinator.files()[0].rejection_reasons.is_empty());
}

#[test]
fn test_too_many_files_strip_keeps_other_reasons() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    coordinator.intake(
        vec![png("fine.png", 10)],
        vec![RejectedCandidate {
            file: png("big.png", 4096),
            reasons: vec![RejectionReason::FileTooLarge, RejectionReason::TooManyFiles],
        }],
    );

    // Still over the limit: nothing stripped yet
    assert_eq!(
        coordinator.files()[1].rejection_reasons,
        vec![RejectionReason::FileTooLarge, RejectionReason::TooManyFiles]
    );

    coordinator.remove_file("fine.png");
    assert_eq!(
        coordinator.files()[0].rejection_reasons,
        vec![RejectionReason::FileTooLarge]
    );
}

#[test]
fn test_remove_unknown_file() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    assert!(!coordinator.remove_file("missing.png"));
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_upload_without_files_fails() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    assert_eq!(coordinator.upload().await, Err(CoordinatorError::NoFiles));
    assert!(!coordinator.is_uploading());
}

#[tokio::test]
async fn test_partial_failure_then_retry() {
    let store = ScriptedStore::new();
    store.fail_paths_containing(&["file2"]);
    let mut coordinator = Coordinator::new(store.clone(), options(3));
    coordinator.drop_files(vec![
        png("file1.png", 10),
        png("file2.png", 10),
        png("file3.png", 10),
    ]);

    coordinator.upload().await.unwrap();

    assert_eq!(names(coordinator.successes()), vec!["file1.png", "file3.png"]);
    assert_eq!(coordinator.failures().len(), 1);
    assert_eq!(
        coordinator.failures().get("file2.png").map(String::as_str),
        Some("write rejected: file2")
    );
    assert!(!coordinator.overall_success());
    assert!(!coordinator.is_uploading());

    // Retry only re-attempts the failed file
    store.fail_paths_containing(&[]);
    coordinator.upload().await.unwrap();

    let paths = store.put_paths();
    assert_eq!(paths.len(), 4);
    assert!(paths[3].contains("file2"));

    assert_eq!(
        names(coordinator.successes()),
        vec!["file1.png", "file2.png", "file3.png"]
    );
    assert!(coordinator.failures().is_empty());
    assert!(coordinator.overall_success());
}

#[tokio::test]
async fn test_every_work_set_file_lands_in_exactly_one_outcome() {
    let store = ScriptedStore::new();
    store.fail_paths_containing(&["b-", "d-"]);
    let mut coordinator = Coordinator::new(store, options(4));
    coordinator.drop_files(vec![
        png("a.png", 1),
        png("b.png", 1),
        png("c.png", 1),
        png("d.png", 1),
    ]);

    let plan = coordinator.begin_dispatch().unwrap();
    let work_set: Vec<String> = plan.file_names().iter().map(|s| s.to_string()).collect();
    let report = plan.execute().await;
    assert!(coordinator.complete(report));

    assert_eq!(work_set.len(), 4);
    for name in &work_set {
        let succeeded = coordinator.successes().contains(name);
        let failed = coordinator.failures().contains_key(name);
        assert!(succeeded ^ failed, "{name} must be in exactly one outcome set");
    }
}

#[tokio::test]
async fn test_rejected_files_are_not_dispatched() {
    let store = ScriptedStore::new();
    let mut coordinator = Coordinator::new(store.clone(), options(3));
    coordinator.drop_files(vec![png("ok.png", 10), png("huge.png", 2048)]);

    coordinator.upload().await.unwrap();

    let paths = store.put_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("courses/banners/ok-"));
    assert_eq!(names(coordinator.successes()), vec!["ok.png"]);
    // The rejected file keeps the session from succeeding
    assert!(!coordinator.overall_success());

    coordinator.remove_file("huge.png");
    assert!(coordinator.overall_success());
}

#[tokio::test]
async fn test_writes_carry_path_and_options() {
    let store = ScriptedStore::new();
    let mut coordinator = Coordinator::new(store.clone(), options(1));
    coordinator.drop_files(vec![png("thumb.png", 10)]);

    coordinator.upload().await.unwrap();

    let puts = store.puts();
    assert_eq!(puts.len(), 1);
    let (path, put_options) = &puts[0];
    let identity = &coordinator.files()[0].identity;
    assert_eq!(path, &format!("courses/banners/{identity}"));
    assert_eq!(put_options.cache_control_secs, 3600);
    assert!(!put_options.upsert);
    assert_eq!(put_options.content_type.as_deref(), Some("image/png"));

    let urls = coordinator.public_urls();
    assert_eq!(
        urls,
        vec![(
            "thumb.png".to_string(),
            format!("https://cdn.test/public/media/courses/banners/{identity}")
        )]
    );
}

#[tokio::test]
async fn test_writes_run_concurrently() {
    // Each write blocks until all three are in flight
    let store = ScriptedStore::gated(3);
    let mut coordinator = Coordinator::new(store.clone(), options(3));
    coordinator.drop_files(vec![png("x.png", 1), png("y.png", 1), png("z.png", 1)]);

    tokio::time::timeout(Duration::from_secs(5), coordinator.upload())
        .await
        .expect("writes should not run one after another")
        .unwrap();

    assert_eq!(store.puts().len(), 3);
    assert!(coordinator.overall_success());
}

#[tokio::test]
async fn test_second_dispatch_while_uploading_is_refused() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    coordinator.drop_files(vec![png("a.png", 1)]);

    let plan = coordinator.begin_dispatch().unwrap();
    assert!(coordinator.is_uploading());
    assert_eq!(
        coordinator.begin_dispatch().err(),
        Some(CoordinatorError::AlreadyUploading)
    );

    let report = plan.execute().await;
    assert!(coordinator.complete(report));
    assert!(!coordinator.is_uploading());
    assert!(coordinator.overall_success());
}

#[tokio::test]
async fn test_report_from_reset_session_is_ignored() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    coordinator.drop_files(vec![png("old.png", 1)]);

    let plan = coordinator.begin_dispatch().unwrap();
    coordinator.reset();
    coordinator.drop_files(vec![png("new.png", 1)]);

    let report = plan.execute().await;
    assert!(!coordinator.complete(report));

    assert!(coordinator.successes().is_empty());
    assert!(coordinator.failures().is_empty());
    assert!(!coordinator.is_uploading());
    assert_eq!(
        coordinator.snapshot().files[0].status,
        FileStatus::Pending
    );
}

#[tokio::test]
async fn test_removing_uploaded_file_drops_its_outcome() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(2));
    coordinator.drop_files(vec![png("a.png", 1), png("b.png", 1)]);
    coordinator.upload().await.unwrap();

    coordinator.remove_file("a.png");
    assert_eq!(names(coordinator.successes()), vec!["b.png"]);
    assert!(coordinator.overall_success());
}

// ============================================================================
// Aggregation and lifecycle
// ============================================================================

#[tokio::test]
async fn test_names_that_sanitize_alike_get_distinct_objects() {
    let store = ScriptedStore::new();
    let mut coordinator = Coordinator::new(store.clone(), options(3));
    coordinator.drop_files(vec![png("a b.png", 1), png("a-b.png", 1), png("a_b.png", 1)]);

    let identities: Vec<&str> = coordinator
        .files()
        .iter()
        .map(|f| f.identity.as_str())
        .collect();
    assert_ne!(identities[0], identities[1]);
    assert!(identities[1].ends_with("-1.png"), "{}", identities[1]);

    coordinator.upload().await.unwrap();

    let mut paths = store.put_paths();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 3);
    assert!(coordinator.overall_success());

    let urls: Vec<String> = coordinator.public_urls().into_iter().map(|(_, u)| u).collect();
    assert_ne!(urls[0], urls[1]);
}

#[tokio::test]
async fn test_outcome_is_not_credited_to_a_file_replaced_mid_flight() {
    let store = ScriptedStore::new();
    let mut coordinator = Coordinator::new(store.clone(), options(1));
    coordinator.drop_files(vec![png("a.png", 1)]);
    let first_identity = coordinator.files()[0].identity.clone();

    let plan = coordinator.begin_dispatch().unwrap();
    assert!(coordinator.remove_file("a.png"));
    coordinator.drop_files(vec![png("a.png", 99)]);
    let second_identity = coordinator.files()[0].identity.clone();
    assert_ne!(first_identity, second_identity);

    let report = plan.execute().await;
    assert!(coordinator.complete(report));

    assert_eq!(
        store.put_paths(),
        vec![format!("courses/banners/{first_identity}")]
    );
    assert!(coordinator.successes().is_empty());
    assert!(!coordinator.overall_success());
    assert!(coordinator.public_urls().is_empty());
    assert_eq!(coordinator.snapshot().files[0].status, FileStatus::Pending);

    // The replacement goes out on the next round
    coordinator.upload().await.unwrap();
    assert!(coordinator.overall_success());
    assert_eq!(
        store.put_paths().last().unwrap(),
        &format!("courses/banners/{second_identity}")
    );
}

#[test]
fn test_overall_success_false_without_files() {
    let coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    assert!(!coordinator.overall_success());
    assert!(!coordinator.snapshot().overall_success);
}

#[tokio::test]
async fn test_reset_clears_state_and_releases_previews_once() {
    let previews = Arc::new(PreviewPool::new());
    let store = ScriptedStore::new();
    store.fail_paths_containing(&["b-"]);
    let mut coordinator =
        Coordinator::with_previews(store, options(3), Arc::clone(&previews));

    coordinator.drop_files(vec![png("a.png", 1), png("b.png", 1), png("c.png", 4096)]);
    assert_eq!(previews.allocated(), 3);
    assert_eq!(previews.outstanding(), 3);

    coordinator.upload().await.unwrap();
    assert!(!coordinator.successes().is_empty());
    assert!(!coordinator.failures().is_empty());

    coordinator.reset();
    assert!(coordinator.files().is_empty());
    assert!(coordinator.successes().is_empty());
    assert!(coordinator.failures().is_empty());
    assert!(!coordinator.is_uploading());
    assert_eq!(previews.released(), 3);
    assert_eq!(previews.outstanding(), 0);

    // A second reset has nothing left to release
    coordinator.reset();
    assert_eq!(previews.released(), 3);
}

#[test]
fn test_remove_and_drop_release_previews() {
    let previews = Arc::new(PreviewPool::new());
    let mut coordinator = Coordinator::with_previews(
        ScriptedStore::new(),
        options(3),
        Arc::clone(&previews),
    );
    coordinator.drop_files(vec![png("a.png", 1), png("b.png", 1)]);

    coordinator.remove_file("a.png");
    assert_eq!(previews.released(), 1);

    drop(coordinator);
    assert_eq!(previews.released(), 2);
    assert_eq!(previews.outstanding(), 0);
}

#[test]
fn test_reset_starts_a_fresh_session() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(1));
    coordinator.drop_files(vec![png("a.png", 1)]);
    let generation = coordinator.generation();

    coordinator.reset();
    assert_eq!(coordinator.generation(), generation + 1);

    // The same name is accepted again in the new session
    assert_eq!(coordinator.drop_files(vec![png("a.png", 1)]), 1);
}

#[test]
fn test_snapshot_reports_file_statuses() {
    let mut coordinator = Coordinator::new(ScriptedStore::new(), options(2));
    coordinator.drop_files(vec![
        png("ok.png", 1),
        Candidate::new("notes.txt", "hello").with_mime_type("text/plain"),
    ]);

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.folder, "courses/banners");
    assert_eq!(snapshot.files[0].status, FileStatus::Pending);
    assert_eq!(snapshot.files[1].status, FileStatus::Rejected);
    assert_eq!(
        snapshot.files[1].rejection_reasons,
        vec![RejectionReason::FileInvalidType]
    );
    assert!(snapshot.files[0].preview.starts_with("preview:"));
}
