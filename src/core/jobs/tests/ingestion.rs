use std::sync::atomic::Ordering;

use super::{harness, harness_with, wait_status, wait_terminal};
use crate::core::directory::DirectoryError;
use crate::core::directory::fake::{entity, member};
use crate::core::ingest::IngestError;

#[tokio::test]
async fn three_member_group_ends_done_with_three_rows() {
    let h = harness().await;
    h.dir.add_group(
        "chan",
        entity(100, "Chan"),
        vec![member(1), member(2), member(3)],
    );

    let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    assert_eq!(job_id.len(), 32);
    assert!(job_id.chars().all(|c| c.is_ascii_hexdigit()));

    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert_eq!(snap.status, "done");
    assert_eq!(snap.count, 3);

    let rows = h.storage.list_members(None).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.group_id == "100" && r.group_title == "Chan"));
    assert!(rows.iter().all(|r| r.account_id == h.account_id));
}

#[tokio::test]
async fn duplicate_remote_ids_are_absorbed() {
    let h = harness().await;
    h.dir.add_group(
        "chan",
        entity(100, "Chan"),
        vec![member(1), member(2), member(2), member(3), member(1)],
    );

    let job_id = h.orchestrator.submit(h.account_id, "chan").await.unwrap();
    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert_eq!(snap.status, "done");
    assert_eq!(snap.count, 5);
    assert_eq!(h.storage.count_members(h.account_id, "100").await.unwrap(), 3);
}

#[tokio::test]
async fn reingesting_unchanged_roster_inserts_nothing() {
    let h = harness().await;
    h.dir
        .add_group("chan", entity(100, "Chan"), vec![member(1), member(2), member(3)]);

    for _ in 0..2 {
        let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
        let snap = wait_terminal(&h.orchestrator, &job_id).await;
        assert_eq!(snap.status, "done");
        assert_eq!(snap.count, 3);
    }
    assert_eq!(h.storage.list_members(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn reingest_after_new_member_adds_one_row() {
    let h = harness().await;
    h.dir
        .add_group("chan", entity(100, "Chan"), vec![member(1), member(2), member(3)]);
    let first = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    wait_terminal(&h.orchestrator, &first).await;
    let before = h.storage.list_members(Some("100")).await.unwrap();

    h.dir
        .set_roster(100, vec![member(1), member(2), member(3), member(4)]);
    let second = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    let snap = wait_terminal(&h.orchestrator, &second).await;
    assert_eq!(snap.status, "done");
    assert_eq!(snap.count, 4);

    let after = h.storage.list_members(Some("100")).await.unwrap();
    assert_eq!(after.len(), 4);
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.tg_user_id, new.tg_user_id);
        assert_eq!(old.crawled_at, new.crawled_at);
    }
    assert_eq!(after[3].tg_user_id, 4);
}

#[tokio::test]
async fn expired_invite_ends_in_error_with_no_rows() {
    let h = harness().await;
    h.dir.add_invite("Old", Err(DirectoryError::InviteExpired));

    let job_id = h
        .orchestrator
        .submit(h.account_id, "https://t.me/+Old")
        .await
        .unwrap();
    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert!(snap.status.starts_with("error: "), "got {}", snap.status);
    assert!(snap.status.to_lowercase().contains("expired"));
    assert_eq!(snap.count, 0);
    assert!(h.storage.list_members(None).await.unwrap().is_empty());
    assert_eq!(h.dir.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invite_link_is_imported_and_ingested() {
    let h = harness().await;
    h.dir.add_invite("Secret", Ok(entity(200, "Private")));
    h.dir.set_roster(200, vec![member(5), member(6)]);

    let job_id = h
        .orchestrator
        .submit(h.account_id, "t.me/+Secret")
        .await
        .unwrap();
    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert_eq!(snap.status, "done");
    assert_eq!(h.storage.count_members(h.account_id, "200").await.unwrap(), 2);
    assert_eq!(h.dir.joins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn account_without_session_is_rejected_before_any_job() {
    let h = harness().await;
    let pending = h.accounts.register(1, "hash", "+19990000").await.unwrap();

    let err = h.orchestrator.submit(pending, "@chan").await.unwrap_err();
    assert!(matches!(err, IngestError::AccountNotReady(id) if id == pending));
    let err = h.orchestrator.submit(4242, "@chan").await.unwrap_err();
    assert!(matches!(err, IngestError::AccountNotReady(4242)));

    assert!(h.orchestrator.list().await.is_empty());
    assert_eq!(h.dir.resolves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_is_visible_before_completion() {
    let h = harness().await;
    h.dir
        .add_group("chan", entity(100, "Chan"), vec![member(1), member(2)]);
    let gate = h.dir.hold_streams();

    let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    let early = h.orchestrator.status(&job_id).await;
    assert!(early.status == "init" || early.status == "running");
    assert_eq!(early.count, 0);

    wait_status(&h.orchestrator, &job_id, "running").await;
    assert_eq!(h.orchestrator.active_count().await, 1);
    gate.notify_one();

    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert_eq!(snap.status, "done");
    assert_eq!(snap.count, 2);
}

#[tokio::test]
async fn progress_is_reported_while_streaming_large_rosters() {
    let h = harness().await;
    h.dir
        .add_group("big", entity(300, "Big"), (1..=250).map(member).collect());

    let job_id = h.orchestrator.submit(h.account_id, "@big").await.unwrap();
    let mut last = 0;
    loop {
        let snap = h.orchestrator.status(&job_id).await;
        assert!(snap.count >= last, "count went from {} to {}", last, snap.count);
        last = snap.count;
        if snap.is_terminal() {
            assert_eq!(snap.status, "done");
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(last, 250);
    assert_eq!(h.storage.count_members(h.account_id, "300").await.unwrap(), 250);
}

#[tokio::test]
async fn stream_failure_keeps_rows_written_so_far() {
    let h = harness().await;
    h.dir.add_group(
        "chan",
        entity(100, "Chan"),
        vec![member(1), member(2), member(3), member(4)],
    );
    h.dir
        .fail_stream_after(2, DirectoryError::Transient("connection reset".to_string()));

    let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert!(snap.status.contains("connection reset"), "got {}", snap.status);
    assert_eq!(h.storage.list_members(None).await.unwrap().len(), 2);
    assert_eq!(h.dir.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_limit_mid_stream_is_terminal() {
    let h = harness().await;
    h.dir
        .add_group("chan", entity(100, "Chan"), vec![member(1), member(2)]);
    h.dir
        .fail_stream_after(1, DirectoryError::RateLimited { retry_after: 30 });

    let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert_eq!(snap.status, "error: rate limited by remote, retry after 30s");
    assert_eq!(h.storage.list_members(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn connection_failure_ends_in_error() {
    let h = harness_with(
        std::time::Duration::from_secs(3600),
        Some(DirectoryError::Unauthorized),
    )
    .await;
    h.dir.add_group("chan", entity(100, "Chan"), vec![member(1)]);

    let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    let snap = wait_terminal(&h.orchestrator, &job_id).await;
    assert!(snap.status.contains("not authorized"), "got {}", snap.status);
    assert_eq!(h.dir.resolves.load(Ordering::SeqCst), 0);
    assert_eq!(h.dir.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_job_disconnects_its_client() {
    let h = harness().await;
    h.dir.add_group("chan", entity(100, "Chan"), vec![member(1)]);
    let job_id = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    wait_terminal(&h.orchestrator, &job_id).await;
    assert_eq!(h.dir.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_job_does_not_affect_others() {
    let h = harness().await;
    h.dir
        .add_group("good", entity(100, "Good"), vec![member(1), member(2)]);

    let bad = h.orchestrator.submit(h.account_id, "@missing").await.unwrap();
    let good = h.orchestrator.submit(h.account_id, "@good").await.unwrap();
    assert_ne!(bad, good);

    assert!(wait_terminal(&h.orchestrator, &bad).await.status.starts_with("error"));
    assert_eq!(wait_terminal(&h.orchestrator, &good).await.status, "done");
    assert_eq!(h.orchestrator.list().await.len(), 2);
}

#[tokio::test]
async fn concurrent_jobs_for_same_group_store_each_member_once() {
    let h = harness().await;
    h.dir.add_group(
        "chan",
        entity(100, "Chan"),
        (1..=50).map(member).collect(),
    );

    let a = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    let b = h.orchestrator.submit(h.account_id, "@chan").await.unwrap();
    assert_eq!(wait_terminal(&h.orchestrator, &a).await.status, "done");
    assert_eq!(wait_terminal(&h.orchestrator, &b).await.status, "done");
    assert_eq!(h.storage.count_members(h.account_id, "100").await.unwrap(), 50);
}

#[tokio::test]
async fn unknown_job_reports_unknown() {
    let h = harness().await;
    let snap = h.orchestrator.status("deadbeef").await;
    assert_eq!(snap.status, "unknown");
    assert_eq!(snap.count, 0);
}
