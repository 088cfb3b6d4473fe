mod ingestion;
mod state_machine;

use std::sync::Arc;
use std::time::Duration;

use super::{JobOrchestrator, JobSnapshot};
use crate::core::accounts::{AccountService, test_accounts};
use crate::core::directory::{DirectoryConnector, DirectoryError};
use crate::core::directory::fake::{FakeConnector, FakeDirectory};
use crate::core::storage::Storage;

pub(super) struct Harness {
    pub storage: Arc<Storage>,
    pub accounts: AccountService,
    pub dir: Arc<FakeDirectory>,
    pub orchestrator: JobOrchestrator,
    pub account_id: i64,
}

pub(super) async fn harness() -> Harness {
    harness_with(Duration::from_secs(3600), None).await
}

pub(super) async fn harness_with(
    ttl: Duration,
    connect_error: Option<DirectoryError>,
) -> Harness {
    let (storage, accounts) = test_accounts().await;
    let account_id = accounts.register(1001, "hash", "+15550100").await.unwrap();
    accounts.import_session(account_id, "session").await.unwrap();

    let dir = FakeDirectory::new();
    let connector: Arc<dyn DirectoryConnector> = match connect_error {
        Some(err) => Arc::new(FakeConnector::failing(dir.clone(), err)),
        None => Arc::new(FakeConnector::new(dir.clone())),
    };
    let orchestrator = JobOrchestrator::new(storage.clone(), accounts.clone(), connector, ttl);

    Harness {
        storage,
        accounts,
        dir,
        orchestrator,
        account_id,
    }
}

pub(super) async fn wait_terminal(orchestrator: &JobOrchestrator, job_id: &str) -> JobSnapshot {
    for _ in 0..500 {
        let snapshot = orchestrator.status(job_id).await;
        if snapshot.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish in time", job_id);
}

pub(super) async fn wait_status(orchestrator: &JobOrchestrator, job_id: &str, status: &str) {
    for _ in 0..500 {
        if orchestrator.status(job_id).await.status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached '{}'", job_id, status);
}
