use anyhow::{Context as _, Result, bail};
use console::style;
use std::sync::Arc;
use std::time::Duration;

use super::{Context, flag_value};
use crate::core::directory::HttpConnector;
use crate::core::jobs::JobOrchestrator;
use crate::core::terminal::{print_info, print_status, print_success};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs one ingestion job in this process and follows it to completion.
pub async fn run_parse(args: &[String]) -> Result<()> {
    let (log_tx, _) = tokio::sync::broadcast::channel::<String>(16);
    crate::logging::init(log_tx, tracing::Level::WARN, false);

    let account = flag_value(args, 2, &["--account", "-a"]);
    let group = flag_value(args, 2, &["--group", "-g"]);
    let (Some(account), Some(group)) = (account, group) else {
        println!(
            "{}",
            style("Usage: tgroster parse --account <id> --group <link|@handle>").bold()
        );
        return Ok(());
    };
    let account_id: i64 = account
        .trim()
        .parse()
        .context("--account must be an account id")?;

    let mut ctx = Context::open().await?;
    ctx.settings.apply_flags(args, 2);

    let orchestrator = JobOrchestrator::new(
        ctx.storage.clone(),
        ctx.accounts.clone(),
        Arc::new(HttpConnector::new(ctx.settings.directory_url.clone())),
        ctx.settings.job_ttl,
    );
    let job_id = orchestrator.submit(account_id, &group).await?;
    print_info(&format!("Job {} started for '{}'", style(&job_id).dim(), group.trim()));

    let mut last_count = 0;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let snapshot = orchestrator.status(&job_id).await;
        if snapshot.count != last_count {
            last_count = snapshot.count;
            print_status("Members seen", &last_count.to_string());
        }
        if snapshot.is_terminal() {
            if snapshot.status == "done" {
                print_success(&format!("Done: {} member(s) enumerated", snapshot.count));
                return Ok(());
            }
            bail!("job failed: {}", snapshot.status);
        }
    }
}
