use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::types::{JobProgress, JobStatus};
use crate::core::directory::{AccountCredentials, DirectoryClient, DirectoryConnector};
use crate::core::ingest::{IngestError, MemberStream, resolve_and_join};
use crate::core::storage::{GroupRef, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records delivered by the remote roster.
    pub total: u64,
    /// Records that produced a new row.
    pub inserted: u64,
    /// Rows held for this (account, group) once the run finished.
    pub stored: i64,
}

pub(super) struct JobContext {
    pub job_id: String,
    pub progress: Arc<JobProgress>,
    pub credentials: AccountCredentials,
    pub connector: Arc<dyn DirectoryConnector>,
    pub storage: Arc<Storage>,
}

/// Drives one job to a terminal state. Never panics outward and never returns an error:
/// every failure ends up in the job status.
pub(super) async fn run_job(ctx: JobContext) {
    let job_id = ctx.job_id.clone();
    let outcome = AssertUnwindSafe(connect_and_ingest(&ctx)).catch_unwind().await;

    let result = match outcome {
        Ok(result) => result,
        Err(panic) => Err(IngestError::Internal(panic_message(panic))),
    };

    match result {
        Ok(summary) => {
            ctx.progress.record_count(summary.total);
            ctx.progress.transition(JobStatus::Done);
            info!(
                "[job {}] done: {} member(s) seen, {} new, {} stored for the group",
                job_id, summary.total, summary.inserted, summary.stored
            );
        }
        Err(e) => {
            error!("[job {}] failed: {}", job_id, e);
            if !ctx.progress.transition(JobStatus::Error(e.to_string())) {
                warn!("[job {}] status already terminal, dropping error", job_id);
            }
        }
    }
}

async fn connect_and_ingest(ctx: &JobContext) -> Result<IngestSummary, IngestError> {
    let client = ctx.connector.connect(&ctx.credentials).await?;

    let outcome = AssertUnwindSafe(ingest(ctx, client.as_ref()))
        .catch_unwind()
        .await;
    client.disconnect().await;

    match outcome {
        Ok(result) => result,
        Err(panic) => Err(IngestError::Internal(panic_message(panic))),
    }
}

async fn ingest(ctx: &JobContext, client: &dyn DirectoryClient) -> Result<IngestSummary, IngestError> {
    let entity = resolve_and_join(client, &ctx.progress.group).await?;
    ctx.progress.transition(JobStatus::Running);
    info!(
        "[job {}] ingesting '{}' ({}{}, {:?}) for account {}",
        ctx.job_id,
        entity.title,
        entity.id,
        entity
            .username
            .as_deref()
            .map(|u| format!(" @{}", u))
            .unwrap_or_default(),
        entity.access,
        ctx.credentials.account_id
    );

    let group = GroupRef::from(&entity);
    let progress = ctx.progress.clone();
    let mut stream = MemberStream::open(client, &entity, move |count| {
        progress.record_count(count);
        Ok(())
    });

    let mut inserted = 0;
    while let Some(record) = stream.next().await {
        let record = record?;
        let is_new = ctx
            .storage
            .insert_member_if_absent(ctx.credentials.account_id, &group, &record)
            .await
            .map_err(IngestError::Persistence)?;
        if is_new {
            inserted += 1;
        }
    }

    let stored = ctx
        .storage
        .count_members(ctx.credentials.account_id, &group.id)
        .await
        .map_err(IngestError::Persistence)?;

    Ok(IngestSummary {
        total: stream.consumed(),
        inserted,
        stored,
    })
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("ingestion panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("ingestion panicked: {}", msg)
    } else {
        "ingestion panicked".to_string()
    }
}
