use crate::core::jobs::types::{JobProgress, JobSnapshot, JobStatus, can_transition};
use std::time::{Duration, Instant};

fn error() -> JobStatus {
    JobStatus::Error("boom".to_string())
}

#[test]
fn happy_path_transitions_are_allowed() {
    assert!(can_transition(&JobStatus::Init, &JobStatus::Running));
    assert!(can_transition(&JobStatus::Running, &JobStatus::Done));
    assert!(can_transition(&JobStatus::Running, &error()));
}

#[test]
fn failure_before_resolution_skips_running() {
    assert!(can_transition(&JobStatus::Init, &error()));
    assert!(!can_transition(&JobStatus::Init, &JobStatus::Done));
}

#[test]
fn terminal_states_are_final() {
    for from in [JobStatus::Done, error()] {
        for to in [JobStatus::Init, JobStatus::Running, JobStatus::Done, error()] {
            assert!(
                !can_transition(&from, &to),
                "expected {:?} -> {:?} to be rejected",
                from,
                to
            );
        }
    }
}

#[test]
fn no_transition_back_to_init() {
    assert!(!can_transition(&JobStatus::Running, &JobStatus::Init));
    assert!(!can_transition(&JobStatus::Running, &JobStatus::Running));
}

#[test]
fn labels_match_wire_format() {
    assert_eq!(JobStatus::Init.label(), "init");
    assert_eq!(JobStatus::Running.label(), "running");
    assert_eq!(JobStatus::Done.label(), "done");
    assert_eq!(
        JobStatus::Error("Expired invite link".to_string()).label(),
        "error: Expired invite link"
    );
}

#[test]
fn progress_rejects_illegal_transition_and_keeps_state() {
    let progress = JobProgress::new(1, "@chan");
    assert!(!progress.transition(JobStatus::Done));
    assert_eq!(progress.status(), JobStatus::Init);
    assert!(progress.finished_at().is_none());

    assert!(progress.transition(JobStatus::Running));
    assert!(progress.transition(JobStatus::Done));
    assert!(progress.finished_at().is_some());
    assert!(!progress.transition(error()));
    assert_eq!(progress.status(), JobStatus::Done);
}

#[test]
fn count_never_decreases() {
    let progress = JobProgress::new(1, "@chan");
    progress.record_count(200);
    progress.record_count(100);
    assert_eq!(progress.count(), 200);
    progress.record_count(250);
    assert_eq!(progress.count(), 250);
}

#[test]
fn expiry_only_applies_to_finished_jobs() {
    let progress = JobProgress::new(1, "@chan");
    let later = Instant::now() + Duration::from_secs(10);
    assert!(!progress.expired(Duration::ZERO, later));

    progress.transition(JobStatus::Error("x".to_string()));
    assert!(progress.expired(Duration::from_secs(5), later));
    assert!(!progress.expired(Duration::from_secs(60), later));
}

#[test]
fn snapshot_reports_status_and_count() {
    let progress = JobProgress::new(7, "@chan");
    progress.transition(JobStatus::Running);
    progress.record_count(100);
    let snap = progress.snapshot("abc");
    assert_eq!(snap.status, "running");
    assert_eq!(snap.count, 100);
    assert_eq!(snap.account_id, Some(7));
    assert_eq!(snap.group.as_deref(), Some("@chan"));
    assert!(!snap.is_terminal());
}

#[test]
fn unknown_snapshot_has_zero_count() {
    let snap = JobSnapshot::unknown("nope");
    assert_eq!(snap.status, "unknown");
    assert_eq!(snap.count, 0);
    assert!(!snap.is_terminal());
}
