use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::JobScheduler;
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq)]
pub enum LifecycleState {
    Init,
    Start,
    Ready,
    Shutdown,
}

#[async_trait::async_trait]
pub trait LifecycleComponent {
    async fn on_init(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

type SharedComponent = Arc<Mutex<dyn LifecycleComponent + Send + Sync>>;

/// Drives attached components through init, start and shutdown, and owns the cron scheduler
/// used for background maintenance. Components start in attach order and stop in reverse.
pub struct LifecycleManager {
    state: LifecycleState,
    components: Vec<(&'static str, SharedComponent)>,
    pub scheduler: JobScheduler,
}

impl LifecycleManager {
    pub async fn new() -> Result<Self> {
        Ok(Self {
            state: LifecycleState::Init,
            components: Vec::new(),
            scheduler: JobScheduler::new().await?,
        })
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn attach(&mut self, name: &'static str, component: SharedComponent) {
        self.components.push((name, component));
    }

    pub async fn start(&mut self) -> Result<()> {
        self.state = LifecycleState::Init;
        for (name, comp) in &self.components {
            comp.lock()
                .await
                .on_init()
                .await
                .with_context(|| format!("{} failed to initialize", name))?;
        }

        self.state = LifecycleState::Start;
        for (name, comp) in &self.components {
            comp.lock()
                .await
                .on_start()
                .await
                .with_context(|| format!("{} failed to start", name))?;
            debug!("{} started", name);
        }

        self.scheduler.start().await?;
        self.state = LifecycleState::Ready;
        info!("{} components ready", self.components.len());
        Ok(())
    }

    /// Never fails: errors from individual components are logged and the rest still stop.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.state = LifecycleState::Shutdown;

        for (name, comp) in self.components.iter().rev() {
            match comp.lock().await.on_shutdown().await {
                Ok(()) => debug!("{} stopped", name),
                Err(e) => warn!("{} did not stop cleanly: {:#}", name, e),
            }
        }

        if let Err(e) = self.scheduler.shutdown().await {
            warn!("scheduler did not stop cleanly: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        tag: &'static str,
        calls: Arc<std::sync::Mutex<Vec<String>>>,
        fail_start: bool,
    }

    #[async_trait::async_trait]
    impl LifecycleComponent for Recorder {
        async fn on_init(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push(format!("{}:init", self.tag));
            Ok(())
        }
        async fn on_start(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push(format!("{}:start", self.tag));
            if self.fail_start {
                anyhow::bail!("port taken");
            }
            Ok(())
        }
        async fn on_shutdown(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push(format!("{}:shutdown", self.tag));
            anyhow::bail!("ignored on shutdown")
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn components_stop_in_reverse_order() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut manager = LifecycleManager::new().await.unwrap();
        for tag in ["jobs", "api"] {
            manager.attach(
                tag,
                Arc::new(Mutex::new(Recorder {
                    tag,
                    calls: calls.clone(),
                    fail_start: false,
                })),
            );
        }

        manager.start().await.unwrap();
        assert_eq!(manager.state(), &LifecycleState::Ready);

        manager.shutdown().await.unwrap();
        assert_eq!(manager.state(), &LifecycleState::Shutdown);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "jobs:init",
                "api:init",
                "jobs:start",
                "api:start",
                "api:shutdown",
                "jobs:shutdown"
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_failure_names_the_component() {
        let mut manager = LifecycleManager::new().await.unwrap();
        manager.attach(
            "api",
            Arc::new(Mutex::new(Recorder {
                fail_start: true,
                ..Default::default()
            })),
        );

        let err = manager.start().await.unwrap_err();
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("api failed to start"));
        assert!(rendered.contains("port taken"));
        assert_eq!(manager.state(), &LifecycleState::Start);
    }
}
