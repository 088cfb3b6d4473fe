use anyhow::Result;
use console::style;

use super::{Context, positionals};
use crate::core::terminal::{print_error, print_info, print_success, print_warn};

pub async fn run_token_command(args: &[String]) -> Result<()> {
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");
    let rest = positionals(args, 3);
    let ctx = Context::open().await?;

    match sub_cmd {
        "create" => {
            let Some(name) = rest.first().filter(|n| !n.trim().is_empty()) else {
                println!("{}", style("Usage: tgroster token create <name>").bold());
                println!("  Example: tgroster token create my-integration");
                return Ok(());
            };
            let (raw_token, record) = ctx.storage.create_api_token(name.trim()).await?;
            print_success(&format!("Token '{}' created (id {})", record.name, record.id));
            println!("\n  {}\n", style(&raw_token).bold().yellow());
            print_warn("Save the token value - it will not be shown again.");
        }
        "list" | "ls" => {
            let tokens = ctx.storage.list_api_tokens().await?;
            if tokens.is_empty() {
                print_info("No API tokens. Loopback requests are allowed without one.");
                return Ok(());
            }
            for token in tokens {
                println!(
                    "  {}  {}  {}",
                    style(&token.id).dim(),
                    style(&token.name).bold(),
                    token.created_at
                );
            }
        }
        "delete" | "revoke" | "rm" => {
            let Some(id) = rest.first() else {
                println!("{}", style("Usage: tgroster token delete <id>").bold());
                return Ok(());
            };
            if ctx.storage.delete_api_token(id).await? {
                print_success("Token revoked");
            } else {
                print_error(&format!("Token {} not found", id));
            }
        }
        _ => print_error("Unknown token command. Expected: create, list, delete"),
    }
    Ok(())
}
