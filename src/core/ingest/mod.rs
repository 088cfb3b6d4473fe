pub mod resolver;
pub mod stream;

pub use resolver::{GroupReference, resolve_and_join};
pub use stream::MemberStream;

use crate::core::directory::DirectoryError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("account {0} is not ready, authorize it first")]
    AccountNotReady(i64),
    #[error("unable to resolve group: {0}")]
    UnresolvableGroup(#[source] DirectoryError),
    #[error("rate limited by remote, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("directory error: {0}")]
    Directory(#[source] DirectoryError),
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DirectoryError> for IngestError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::RateLimited { retry_after } => IngestError::RateLimited { retry_after },
            other => IngestError::Directory(other),
        }
    }
}
