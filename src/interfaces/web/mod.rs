pub(crate) mod auth;
mod handlers;
mod router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::accounts::AccountService;
use crate::core::jobs::JobOrchestrator;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::storage::Storage;

pub(crate) use auth::is_loopback;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the HTTP surface needs from the rest of the daemon.
pub struct ApiServerConfig {
    pub storage: Arc<Storage>,
    pub accounts: AccountService,
    pub orchestrator: JobOrchestrator,
    pub log_tx: broadcast::Sender<String>,
    pub api_host: String,
    pub api_port: u16,
}

/// Shared by every handler and the auth middleware.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) storage: Arc<Storage>,
    pub(crate) accounts: AccountService,
    pub(crate) orchestrator: JobOrchestrator,
    pub(crate) log_tx: broadcast::Sender<String>,
    pub(crate) api_host: String,
    pub(crate) api_port: u16,
}

impl From<ApiServerConfig> for AppState {
    fn from(config: ApiServerConfig) -> Self {
        let ApiServerConfig {
            storage,
            accounts,
            orchestrator,
            log_tx,
            api_host,
            api_port,
        } = config;
        Self {
            storage,
            accounts,
            orchestrator,
            log_tx,
            api_host,
            api_port,
        }
    }
}

/// The roster HTTP API as a lifecycle component: binds on start, drains on shutdown.
pub struct ApiServer {
    state: AppState,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            state: config.into(),
            stop: None,
            task: None,
        }
    }
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        let auth = match self.state.storage.has_any_api_tokens().await? {
            true => "bearer tokens",
            false if is_loopback(&self.state.api_host) => "open (loopback only)",
            false => "closed until a token exists",
        };
        info!(
            "API server configured for {}:{} (auth: {})",
            self.state.api_host, self.state.api_port, auth
        );
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.state.api_host, self.state.api_port);
        // A port already in use fails startup instead of a background task.
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind API server to {}", addr))?;
        let bound: SocketAddr = listener.local_addr()?;
        let app = router::build_api_router(self.state.clone());

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        self.stop = Some(stop_tx);
        self.task = Some(tokio::spawn(async move {
            info!("API server listening on http://{}", bound);
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!("API server stopped with error: {}", e);
            }
        }));
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            // Open SSE log tails never finish on their own.
            match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("API server task ended abnormally: {}", e),
                Err(_) => warn!("API server still draining after {:?}, dropping it", DRAIN_TIMEOUT),
            }
        }
        info!("API server stopped");
        Ok(())
    }
}
