use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Init,
    Running,
    Done,
    Error(String),
}

impl JobStatus {
    /// Wire form: `init`, `running`, `done` or `error: <message>`.
    pub fn label(&self) -> String {
        match self {
            JobStatus::Init => "init".to_string(),
            JobStatus::Running => "running".to_string(),
            JobStatus::Done => "done".to_string(),
            JobStatus::Error(msg) => format!("error: {}", msg),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error(_))
    }
}

/// Read-only view handed to status callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
}

impl JobSnapshot {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn unknown(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: Self::UNKNOWN.to_string(),
            count: 0,
            group: None,
            account_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status == "done" || self.status.starts_with("error")
    }
}

/// Live state of one job. Shared between the ingestion task and status readers.
#[derive(Debug)]
pub struct JobProgress {
    pub account_id: i64,
    pub group: String,
    count: AtomicU64,
    status: Mutex<JobStatus>,
    submitted_at: Instant,
    finished_at: Mutex<Option<Instant>>,
}

impl JobProgress {
    pub fn new(account_id: i64, group: &str) -> Self {
        Self {
            account_id,
            group: group.to_string(),
            count: AtomicU64::new(0),
            status: Mutex::new(JobStatus::Init),
            submitted_at: Instant::now(),
            finished_at: Mutex::new(None),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Never lowers the count.
    pub fn record_count(&self, count: u64) {
        self.count.fetch_max(count, Ordering::SeqCst);
    }

    pub fn status(&self) -> JobStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Applies `next` if the state machine allows it. Returns whether it was applied.
    pub fn transition(&self, next: JobStatus) -> bool {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if !can_transition(&status, &next) {
            return false;
        }
        let terminal = next.is_terminal();
        *status = next;
        drop(status);

        if terminal {
            *self.finished_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        }
        true
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    pub fn finished_at(&self) -> Option<Instant> {
        *self.finished_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Terminal for at least `ttl` as of `now`.
    pub fn expired(&self, ttl: Duration, now: Instant) -> bool {
        self.finished_at()
            .is_some_and(|finished| now.saturating_duration_since(finished) >= ttl)
    }

    pub fn snapshot(&self, job_id: &str) -> JobSnapshot {
        let status = self.status();
        JobSnapshot {
            job_id: job_id.to_string(),
            status: status.label(),
            count: self.count(),
            group: Some(self.group.clone()),
            account_id: Some(self.account_id),
        }
    }
}

/// `init -> running -> {done | error}` plus `init -> error`. Terminal states are final.
pub fn can_transition(from: &JobStatus, to: &JobStatus) -> bool {
    match from {
        JobStatus::Init => matches!(to, JobStatus::Running | JobStatus::Error(_)),
        JobStatus::Running => matches!(to, JobStatus::Done | JobStatus::Error(_)),
        JobStatus::Done | JobStatus::Error(_) => false,
    }
}
