mod accounts;
mod config;
mod export;
mod parse;
mod serve;
mod tokens;

use anyhow::Result;
use console::style;
use std::sync::Arc;

use crate::core::accounts::AccountService;
use crate::core::settings::Settings;
use crate::core::storage::Storage;
use crate::core::terminal::{self, print_command, print_error, print_section};
use crate::core::vault::SecretsVault;
use crate::platform::{NativePlatform, Platform};

/// Everything a command needs from the data directory.
pub(crate) struct Context {
    pub storage: Arc<Storage>,
    pub vault: Arc<SecretsVault>,
    pub accounts: AccountService,
    pub settings: Settings,
}

impl Context {
    pub async fn open() -> Result<Self> {
        let storage = Arc::new(Storage::open(NativePlatform::data_dir()).await?);
        let vault = Arc::new(SecretsVault::new(storage.get_db())?);
        vault.initialize().await?;
        let settings = Settings::load(&vault).await?;
        let accounts = AccountService::new(storage.clone(), vault.clone());
        Ok(Self {
            storage,
            vault,
            accounts,
            settings,
        })
    }
}

/// Value following the first of `names` in `args[start..]`.
pub(crate) fn flag_value(args: &[String], start: usize, names: &[&str]) -> Option<String> {
    let mut i = start;
    while i < args.len() {
        if names.contains(&args[i].as_str()) {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

/// Arguments in `args[start..]` that are neither flags nor flag values.
pub(crate) fn positionals(args: &[String], start: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = start;
    while i < args.len() {
        if args[i].starts_with("--") {
            i += 2;
        } else {
            out.push(args[i].clone());
            i += 1;
        }
    }
    out
}

fn print_help() {
    terminal::print_banner();

    print_section("Service");
    print_command("serve", "Run the HTTP API and job runner in the foreground");

    print_section("Accounts");
    print_command("account add", "Register an account (--api-id, --api-hash, --phone)");
    print_command("account session <id> <string>", "Import a session string (or --file)");
    print_command("account list", "List registered accounts");
    print_command("account delete <id>", "Delete an account and its members");

    print_section("Rosters");
    print_command("parse --account <id> --group <ref>", "Ingest one group in-process");
    print_command("export [--group <id>] [--out <file>]", "Write stored members as CSV");

    print_section("Administration");
    print_command("config get [key]", "Show persisted settings");
    print_command("config set <key> <value>", "Persist a setting");
    print_command("token create <name>", "Create an API token");
    print_command("token list", "List API tokens");
    print_command("token delete <id>", "Revoke an API token");

    println!(
        "\n {} {} <command> [subcommand]\n",
        style("Usage:").bold(),
        style("tgroster").green()
    );
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("help");

    match cmd {
        "serve" => serve::run_serve(&args).await,
        "account" | "accounts" => accounts::run_account_command(&args).await,
        "parse" => parse::run_parse(&args).await,
        "export" => export::run_export(&args).await,
        "config" => config::run_config_command(&args).await,
        "token" | "tokens" => tokens::run_token_command(&args).await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command '{}'", other));
            print_help();
            Ok(())
        }
    }
}
