//! Remote directory surface: group resolution and member enumeration
//! against the messaging network.

#[cfg(test)]
pub mod fake;
mod http;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::sync::Arc;

pub use http::HttpConnector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    #[default]
    Public,
    InviteOnly,
}

/// A resolved group or channel handle.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Entity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub access: AccessKind,
}

/// One participant as delivered by the remote roster.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemberRecord {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("already a participant")]
    AlreadyMember,
    #[error("Invalid invite link")]
    InviteInvalid,
    #[error("Expired invite link")]
    InviteExpired,
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("session is not authorized")]
    Unauthorized,
    #[error("transient failure: {0}")]
    Transient(String),
}

pub type MemberStreamBox<'a> = BoxStream<'a, Result<MemberRecord, DirectoryError>>;

/// Connected client acting on behalf of one account.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<Entity, DirectoryError>;

    async fn join(&self, entity: &Entity) -> Result<(), DirectoryError>;

    /// Accepts a private invite. Importing implies membership.
    async fn import_invite(&self, token: &str) -> Result<Entity, DirectoryError>;

    /// Lazily pages through the roster. Every call issues a fresh remote query.
    fn stream_members<'a>(&'a self, entity: &'a Entity) -> MemberStreamBox<'a>;

    async fn disconnect(&self);
}

/// Everything needed to open a client session for an account.
#[derive(Clone)]
pub struct AccountCredentials {
    pub account_id: i64,
    pub api_id: i64,
    pub api_hash: String,
    pub session: String,
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("account_id", &self.account_id)
            .field("api_id", &self.api_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &AccountCredentials,
    ) -> Result<Arc<dyn DirectoryClient>, DirectoryError>;
}
