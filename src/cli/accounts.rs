use anyhow::{Context as _, Result};
use console::style;

use super::{Context, flag_value, positionals};
use crate::core::terminal::{print_error, print_info, print_success, print_warn};

pub async fn run_account_command(args: &[String]) -> Result<()> {
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");
    let ctx = Context::open().await?;

    match sub_cmd {
        "add" => {
            let api_id = flag_value(args, 3, &["--api-id"]);
            let api_hash = flag_value(args, 3, &["--api-hash"]);
            let phone = flag_value(args, 3, &["--phone"]);
            let (Some(api_id), Some(api_hash), Some(phone)) = (api_id, api_hash, phone) else {
                println!(
                    "{}",
                    style("Usage: tgroster account add --api-id <id> --api-hash <hash> --phone <phone>")
                        .bold()
                );
                return Ok(());
            };
            let api_id: i64 = api_id
                .trim()
                .parse()
                .context("--api-id must be an integer")?;
            let id = ctx.accounts.register(api_id, &api_hash, &phone).await?;
            print_success(&format!("Account {} registered for {}", id, phone.trim()));
            print_info(&format!(
                "Import a session next: {}",
                style(format!("tgroster account session {} <string>", id)).cyan()
            ));
        }
        "session" => {
            let rest = positionals(args, 3);
            let Some(id) = rest.first().and_then(|s| s.parse::<i64>().ok()) else {
                println!(
                    "{}",
                    style("Usage: tgroster account session <id> <string> | --file <path>").bold()
                );
                return Ok(());
            };
            let session = match flag_value(args, 3, &["--file", "-f"]) {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read session file {}", path))?,
                None => rest.get(1).cloned().unwrap_or_default(),
            };
            if ctx.accounts.import_session(id, &session).await? {
                print_success(&format!("Account {} is ready", id));
            } else {
                print_error(&format!("Account {} not found", id));
            }
        }
        "list" | "ls" => {
            let accounts = ctx.accounts.list().await?;
            if accounts.is_empty() {
                print_info("No accounts registered.");
                return Ok(());
            }
            println!(
                "  {:<6} {:<18} {:<10} {:<8} {}",
                style("ID").bold(),
                style("PHONE").bold(),
                style("API ID").bold(),
                style("READY").bold(),
                style("CREATED").bold()
            );
            for account in accounts {
                let ready = if account.is_ready {
                    style("yes").green()
                } else {
                    style("no").yellow()
                };
                println!(
                    "  {:<6} {:<18} {:<10} {:<8} {}",
                    account.id, account.phone, account.api_id, ready, account.created_at
                );
            }
        }
        "delete" | "rm" => {
            let Some(id) = positionals(args, 3)
                .first()
                .and_then(|s| s.parse::<i64>().ok())
            else {
                println!("{}", style("Usage: tgroster account delete <id>").bold());
                return Ok(());
            };
            if ctx.accounts.delete(id).await? {
                print_success(&format!("Account {} and its stored members deleted", id));
            } else {
                print_warn(&format!("Account {} not found", id));
            }
        }
        _ => {
            print_error("Unknown or missing account command. Expected: add, session, list, delete");
        }
    }
    Ok(())
}
