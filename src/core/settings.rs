use anyhow::{Result, bail};
use std::time::Duration;
use tracing::warn;

use crate::core::vault::SecretsVault;

pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 18470;
pub const DEFAULT_DIRECTORY_URL: &str = "http://127.0.0.1:8081";
pub const DEFAULT_JOB_TTL_SECS: u64 = 3600;

/// Keys accepted by `config set` / `config get`.
pub const SETTING_KEYS: &[&str] = &["api_host", "api_port", "directory_url", "job_ttl_secs"];

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_host: String,
    pub api_port: u16,
    /// Base URL of the MTProto bridge.
    pub directory_url: String,
    /// How long finished jobs stay queryable.
    pub job_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
        }
    }
}

impl Settings {
    /// Reads persisted settings from the vault. Unparseable values fall back to defaults.
    pub async fn load(vault: &SecretsVault) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(host) = vault.get_secret("api_host").await?
            && !host.trim().is_empty()
        {
            settings.api_host = host.trim().to_string();
        }
        if let Some(port) = vault.get_secret("api_port").await? {
            match port.trim().parse() {
                Ok(p) => settings.api_port = p,
                Err(_) => warn!("Ignoring invalid api_port '{}' in vault", port),
            }
        }
        if let Some(url) = vault.get_secret("directory_url").await?
            && !url.trim().is_empty()
        {
            settings.directory_url = url.trim().to_string();
        }
        if let Some(ttl) = vault.get_secret("job_ttl_secs").await? {
            match ttl.trim().parse() {
                Ok(secs) => settings.job_ttl = Duration::from_secs(secs),
                Err(_) => warn!("Ignoring invalid job_ttl_secs '{}' in vault", ttl),
            }
        }

        Ok(settings)
    }

    /// Layers `--api-host`, `--api-port` and `--directory-url` found in `args[start..]`.
    pub fn apply_flags(&mut self, args: &[String], start: usize) {
        let mut i = start;
        while i < args.len() {
            match args[i].as_str() {
                "--api-port" => {
                    if i + 1 < args.len() {
                        match args[i + 1].parse() {
                            Ok(p) => self.api_port = p,
                            Err(_) => warn!("Ignoring invalid --api-port '{}'", args[i + 1]),
                        }
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--api-host" => {
                    if i + 1 < args.len() {
                        self.api_host = args[i + 1].clone();
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--directory-url" => {
                    if i + 1 < args.len() {
                        self.directory_url = args[i + 1].clone();
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
    }
}

/// Checks a `config set` pair before it is written to the vault.
pub fn validate_setting(key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match key {
        "api_host" => {
            if value.is_empty() {
                bail!("api_host cannot be empty");
            }
        }
        "api_port" => {
            let port: u16 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("api_port must be a number between 1 and 65535"))?;
            if port == 0 {
                bail!("api_port must be a number between 1 and 65535");
            }
        }
        "directory_url" => {
            let url = url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("directory_url is not a valid URL: {}", e))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                bail!("directory_url must use http or https");
            }
        }
        "job_ttl_secs" => {
            value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("job_ttl_secs must be a whole number of seconds"))?;
        }
        other => bail!(
            "Unknown setting '{}'. Known settings: {}",
            other,
            SETTING_KEYS.join(", ")
        ),
    }
    Ok(())
}
