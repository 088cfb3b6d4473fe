use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    AccountCredentials, DirectoryClient, DirectoryConnector, DirectoryError, Entity,
    MemberRecord, MemberStreamBox,
};

const PAGE_SIZE: u64 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ── Bridge wire types ──

#[derive(Deserialize, Default)]
struct BridgeError {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct ParticipantsPage {
    #[serde(default)]
    users: Vec<MemberRecord>,
    #[serde(default)]
    next_offset: Option<u64>,
}

/// Paging state: next offset (`None` once the bridge reports the end), the buffered page and
/// an error to surface once the buffer drains.
struct Pager {
    offset: Option<u64>,
    buffer: VecDeque<MemberRecord>,
    failure: Option<DirectoryError>,
}

impl Default for Pager {
    fn default() -> Self {
        Self {
            offset: Some(0),
            buffer: VecDeque::new(),
            failure: None,
        }
    }
}

impl Pager {
    fn finished() -> Self {
        Self {
            offset: None,
            buffer: VecDeque::new(),
            failure: None,
        }
    }
}

/// Client for an MTProto bridge exposing the account's user session over JSON/HTTP.
pub struct HttpDirectoryClient {
    base_url: String,
    client: Client,
    credentials: AccountCredentials,
}

impl HttpDirectoryClient {
    pub fn new(base_url: &str, credentials: AccountCredentials) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Transient(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-tg-api-id", self.credentials.api_id.to_string())
            .header("x-tg-api-hash", &self.credentials.api_hash)
            .header("x-tg-session", &self.credentials.session)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, DirectoryError> {
        let res = self
            .authed(self.client.post(self.endpoint(path)))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        decode_response(res).await
    }

    async fn fetch_page(&self, entity_id: i64, offset: u64) -> Result<ParticipantsPage, DirectoryError> {
        debug!(
            "Fetching participants of {} from offset {} (account {})",
            entity_id, offset, self.credentials.account_id
        );
        let res = self
            .authed(self.client.get(self.endpoint("participants")))
            .query(&[
                ("entity_id", entity_id.to_string()),
                ("offset", offset.to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        decode_response(res).await
    }
}

fn transport_error(e: reqwest::Error) -> DirectoryError {
    DirectoryError::Transient(e.to_string())
}

async fn decode_response<T: DeserializeOwned>(res: Response) -> Result<T, DirectoryError> {
    let status = res.status();
    if status.is_success() {
        return res
            .json::<T>()
            .await
            .map_err(|e| DirectoryError::Transient(format!("Malformed bridge response: {}", e)));
    }
    let text = res.text().await.unwrap_or_default();
    let body = serde_json::from_str::<BridgeError>(&text).unwrap_or_else(|_| BridgeError {
        error: Some(text),
        ..BridgeError::default()
    });
    Err(map_bridge_error(status, body))
}

fn map_bridge_error(status: StatusCode, body: BridgeError) -> DirectoryError {
    let message = body
        .error
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.to_string());

    match body.kind.as_deref() {
        Some("already_participant") => return DirectoryError::AlreadyMember,
        Some("invite_invalid") => return DirectoryError::InviteInvalid,
        Some("invite_expired") => return DirectoryError::InviteExpired,
        Some("flood_wait") => {
            return DirectoryError::RateLimited {
                retry_after: body.retry_after.unwrap_or(0),
            };
        }
        _ => {}
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => DirectoryError::RateLimited {
            retry_after: body.retry_after.unwrap_or(0),
        },
        StatusCode::NOT_FOUND => DirectoryError::NotFound(message),
        StatusCode::FORBIDDEN => DirectoryError::PermissionDenied(message),
        StatusCode::UNAUTHORIZED => DirectoryError::Unauthorized,
        StatusCode::CONFLICT => DirectoryError::AlreadyMember,
        _ => DirectoryError::Transient(message),
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn resolve(&self, reference: &str) -> Result<Entity, DirectoryError> {
        self.post_json("resolve", serde_json::json!({ "reference": reference }))
            .await
    }

    async fn join(&self, entity: &Entity) -> Result<(), DirectoryError> {
        let _: serde_json::Value = self
            .post_json("join", serde_json::json!({ "entity_id": entity.id }))
            .await?;
        Ok(())
    }

    async fn import_invite(&self, token: &str) -> Result<Entity, DirectoryError> {
        self.post_json("import_invite", serde_json::json!({ "hash": token }))
            .await
    }

    fn stream_members<'a>(&'a self, entity: &'a Entity) -> MemberStreamBox<'a> {
        stream::unfold(Pager::default(), move |mut pager| async move {
            loop {
                if let Some(record) = pager.buffer.pop_front() {
                    return Some((Ok(record), pager));
                }
                if let Some(err) = pager.failure.take() {
                    return Some((Err(err), Pager::finished()));
                }
                let current = pager.offset?;
                match self.fetch_page(entity.id, current).await {
                    Ok(page) => {
                        if page.users.is_empty() {
                            return None;
                        }
                        pager.buffer.extend(page.users);
                        pager.offset = page.next_offset;
                        // A repeated or rewound offset would re-fetch the same page forever.
                        if let Some(next) = page.next_offset
                            && next <= current
                        {
                            pager.offset = None;
                            pager.failure = Some(DirectoryError::Transient(format!(
                                "bridge returned non-advancing offset {} after {}",
                                next, current
                            )));
                        }
                    }
                    Err(e) => return Some((Err(e), Pager::finished())),
                }
            }
        })
        .boxed()
    }

    async fn disconnect(&self) {
        let res = self
            .authed(self.client.post(self.endpoint("disconnect")))
            .send()
            .await;
        if let Err(e) = res {
            warn!(
                "Failed to release bridge session for account {}: {}",
                self.credentials.account_id, e
            );
        }
    }
}

/// Opens `HttpDirectoryClient`s against a fixed bridge URL.
pub struct HttpConnector {
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DirectoryConnector for HttpConnector {
    async fn connect(
        &self,
        credentials: &AccountCredentials,
    ) -> Result<Arc<dyn DirectoryClient>, DirectoryError> {
        let client = HttpDirectoryClient::new(&self.base_url, credentials.clone())?;
        Ok(Arc::new(client))
    }
}
