use anyhow::Result;
use console::style;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::Context;
use crate::core::directory::HttpConnector;
use crate::core::jobs::JobOrchestrator;
use crate::core::lifecycle::LifecycleManager;
use crate::core::terminal::{print_goodbye, print_link, print_status, print_step, print_warn};
use crate::interfaces::web::{ApiServer, ApiServerConfig};

/// Boots storage, the job orchestrator and the HTTP API, then blocks until Ctrl+C.
pub async fn run_serve(args: &[String]) -> Result<()> {
    let (log_tx, _) = tokio::sync::broadcast::channel::<String>(256);
    crate::logging::init(log_tx.clone(), tracing::Level::INFO, false);

    let mut ctx = Context::open().await?;
    ctx.settings.apply_flags(args, 2);
    let settings = ctx.settings.clone();

    let orchestrator = JobOrchestrator::new(
        ctx.storage.clone(),
        ctx.accounts.clone(),
        Arc::new(HttpConnector::new(settings.directory_url.clone())),
        settings.job_ttl,
    );

    let api = ApiServer::new(ApiServerConfig {
        storage: ctx.storage.clone(),
        accounts: ctx.accounts.clone(),
        orchestrator: orchestrator.clone(),
        log_tx,
        api_host: settings.api_host.clone(),
        api_port: settings.api_port,
    });

    let mut lifecycle = LifecycleManager::new().await?;
    orchestrator.register_sweeper(&lifecycle.scheduler).await?;
    lifecycle.attach("job orchestrator", Arc::new(Mutex::new(orchestrator)));
    lifecycle.attach("api server", Arc::new(Mutex::new(api)));
    lifecycle.start().await?;
    debug!("Lifecycle state: {:?}", lifecycle.state());

    print_step("tgroster is running");
    print_link(
        "API Endpoint",
        &format!("http://{}:{}", settings.api_host, settings.api_port),
    );
    print_status("Directory bridge", &settings.directory_url);
    print_status("Data directory", &ctx.storage.data_dir().display().to_string());
    if !crate::interfaces::web::is_loopback(&settings.api_host)
        && !ctx.storage.has_any_api_tokens().await?
    {
        print_warn(&format!(
            "No API tokens exist; requests to {} will be refused. Run {}.",
            settings.api_host,
            style("tgroster token create <name>").cyan().bold()
        ));
    }
    println!("  Press {} to stop.\n", style("Ctrl+C").bold().yellow());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    lifecycle.shutdown().await?;
    print_goodbye();
    Ok(())
}
