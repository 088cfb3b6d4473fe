//! In-memory directory used by unit tests.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{
    AccessKind, AccountCredentials, DirectoryClient, DirectoryConnector, DirectoryError, Entity,
    MemberRecord, MemberStreamBox,
};

#[derive(Default)]
pub struct FakeDirectory {
    groups: Mutex<HashMap<String, Entity>>,
    invites: Mutex<HashMap<String, Result<Entity, DirectoryError>>>,
    rosters: Mutex<HashMap<i64, Vec<MemberRecord>>>,
    join_error: Mutex<Option<DirectoryError>>,
    resolve_error: Mutex<Option<DirectoryError>>,
    stream_failure: Mutex<Option<(usize, DirectoryError)>>,
    gate: Mutex<Option<Arc<Notify>>>,
    pub resolves: AtomicUsize,
    pub joins: AtomicUsize,
    pub imports: AtomicUsize,
    pub disconnects: AtomicUsize,
}

pub fn member(user_id: i64) -> MemberRecord {
    MemberRecord {
        user_id,
        username: Some(format!("u{}", user_id)),
        first_name: None,
        last_name: None,
        is_bot: false,
        is_verified: false,
    }
}

pub fn entity(id: i64, title: &str) -> Entity {
    Entity {
        id,
        title: title.to_string(),
        username: None,
        access: AccessKind::Public,
    }
}

impl FakeDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_group(&self, handle: &str, entity: Entity, members: Vec<MemberRecord>) {
        self.rosters.lock().unwrap().insert(entity.id, members);
        self.groups
            .lock()
            .unwrap()
            .insert(handle.to_string(), entity);
    }

    pub fn add_invite(&self, token: &str, outcome: Result<Entity, DirectoryError>) {
        if let Ok(entity) = &outcome {
            self.rosters
                .lock()
                .unwrap()
                .entry(entity.id)
                .or_default();
        }
        self.invites
            .lock()
            .unwrap()
            .insert(token.to_string(), outcome);
    }

    pub fn set_roster(&self, entity_id: i64, members: Vec<MemberRecord>) {
        self.rosters.lock().unwrap().insert(entity_id, members);
    }

    pub fn fail_join(&self, err: DirectoryError) {
        *self.join_error.lock().unwrap() = Some(err);
    }

    pub fn fail_resolve(&self, err: DirectoryError) {
        *self.resolve_error.lock().unwrap() = Some(err);
    }

    /// Yield `after` records, then fail the stream with `err`.
    pub fn fail_stream_after(&self, after: usize, err: DirectoryError) {
        *self.stream_failure.lock().unwrap() = Some((after, err));
    }

    /// Hold every member stream before its first record until the returned notifier fires.
    pub fn hold_streams(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn resolve(&self, reference: &str) -> Result<Entity, DirectoryError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.resolve_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.groups
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(reference.to_string()))
    }

    async fn join(&self, _entity: &Entity) -> Result<(), DirectoryError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        match self.join_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn import_invite(&self, token: &str) -> Result<Entity, DirectoryError> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        self.invites
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .unwrap_or(Err(DirectoryError::InviteInvalid))
    }

    fn stream_members<'a>(&'a self, entity: &'a Entity) -> MemberStreamBox<'a> {
        let roster: Arc<Vec<MemberRecord>> = Arc::new(
            self.rosters
                .lock()
                .unwrap()
                .get(&entity.id)
                .cloned()
                .unwrap_or_default(),
        );
        let failure = self.stream_failure.lock().unwrap().clone();
        let gate = self.gate.lock().unwrap().clone();

        stream::unfold(Some(0usize), move |state| {
            let roster = roster.clone();
            let failure = failure.clone();
            let gate = gate.clone();
            async move {
                let idx = state?;
                if idx == 0
                    && let Some(gate) = gate
                {
                    gate.notified().await;
                }
                if let Some((after, err)) = failure
                    && idx == after
                {
                    return Some((Err(err), None));
                }
                roster
                    .get(idx)
                    .cloned()
                    .map(|record| (Ok(record), Some(idx + 1)))
            }
        })
        .boxed()
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out the shared fake for every account, or fails every connection attempt.
pub struct FakeConnector {
    directory: Arc<FakeDirectory>,
    connect_error: Option<DirectoryError>,
}

impl FakeConnector {
    pub fn new(directory: Arc<FakeDirectory>) -> Self {
        Self {
            directory,
            connect_error: None,
        }
    }

    pub fn failing(directory: Arc<FakeDirectory>, err: DirectoryError) -> Self {
        Self {
            directory,
            connect_error: Some(err),
        }
    }
}

#[async_trait]
impl DirectoryConnector for FakeConnector {
    async fn connect(
        &self,
        _credentials: &AccountCredentials,
    ) -> Result<Arc<dyn DirectoryClient>, DirectoryError> {
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        Ok(self.directory.clone())
    }
}
