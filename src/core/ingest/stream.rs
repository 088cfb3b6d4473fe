use futures_util::StreamExt;
use tracing::warn;

use crate::core::directory::{DirectoryClient, DirectoryError, Entity, MemberRecord, MemberStreamBox};

/// Records consumed between two progress callbacks.
pub const PROGRESS_EVERY: u64 = 100;

type ProgressFn<'a> = Box<dyn FnMut(u64) -> anyhow::Result<()> + Send + 'a>;

/// Single-pass cursor over a group's roster with periodic progress reporting.
pub struct MemberStream<'a> {
    inner: MemberStreamBox<'a>,
    on_progress: ProgressFn<'a>,
    consumed: u64,
}

impl<'a> MemberStream<'a> {
    pub fn new<F>(inner: MemberStreamBox<'a>, on_progress: F) -> Self
    where
        F: FnMut(u64) -> anyhow::Result<()> + Send + 'a,
    {
        Self {
            inner,
            on_progress: Box::new(on_progress),
            consumed: 0,
        }
    }

    /// Starts a fresh remote enumeration of `entity`.
    pub fn open<F>(client: &'a dyn DirectoryClient, entity: &'a Entity, on_progress: F) -> Self
    where
        F: FnMut(u64) -> anyhow::Result<()> + Send + 'a,
    {
        Self::new(client.stream_members(entity), on_progress)
    }

    pub async fn next(&mut self) -> Option<Result<MemberRecord, DirectoryError>> {
        let record = match self.inner.next().await? {
            Ok(record) => normalize(record),
            Err(e) => return Some(Err(e)),
        };

        self.consumed += 1;
        if self.consumed % PROGRESS_EVERY == 0
            && let Err(e) = (self.on_progress)(self.consumed)
        {
            warn!("Progress callback failed at {} records: {:#}", self.consumed, e);
        }
        Some(Ok(record))
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

fn normalize(mut record: MemberRecord) -> MemberRecord {
    record.username = clean(record.username);
    record.first_name = clean(record.first_name);
    record.last_name = clean(record.last_name);
    record
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
