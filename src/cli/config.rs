use anyhow::Result;
use console::style;

use super::{Context, positionals};
use crate::core::settings::{SETTING_KEYS, validate_setting};
use crate::core::terminal::{print_error, print_status, print_success};

pub async fn run_config_command(args: &[String]) -> Result<()> {
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");
    let rest = positionals(args, 3);
    let ctx = Context::open().await?;

    match sub_cmd {
        "set" => {
            let (Some(key), Some(value)) = (rest.first(), rest.get(1)) else {
                println!("{}", style("Usage: tgroster config set <key> <value>").bold());
                println!("  Keys: {}", SETTING_KEYS.join(", "));
                return Ok(());
            };
            if !SETTING_KEYS.contains(&key.as_str()) {
                print_error(&format!(
                    "Unknown key '{}'. Expected one of: {}",
                    key,
                    SETTING_KEYS.join(", ")
                ));
                return Ok(());
            }
            validate_setting(key, value)?;
            ctx.vault.set_secret(key, value.trim()).await?;
            print_success(&format!("{} = {}", key, value.trim()));
        }
        "get" | "" => {
            let stored = ctx.vault.list_keys().await?;
            let settings = &ctx.settings;
            let effective = [
                ("api_host", settings.api_host.clone()),
                ("api_port", settings.api_port.to_string()),
                ("directory_url", settings.directory_url.clone()),
                ("job_ttl_secs", settings.job_ttl.as_secs().to_string()),
            ];
            for (key, value) in effective {
                if rest.first().is_none_or(|wanted| wanted == key) {
                    if stored.iter().any(|k| k == key) {
                        print_status(key, &value);
                    } else {
                        print_status(key, &format!("{} {}", value, style("(default)").dim()));
                    }
                }
            }
        }
        _ => print_error("Unknown config command. Expected: get, set"),
    }
    Ok(())
}
