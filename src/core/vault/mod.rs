use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::Mac;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::Mutex;

type HmacSha256 = hmac::Hmac<Sha256>;

const KEY_LABEL: &[u8] = b"tgroster-vault-v1";
const SEALED_PREFIX: &str = "v1:";
const NONCE_LEN: usize = 12;

pub fn account_api_hash_key(account_id: i64) -> String {
    format!("account:{}:api_hash", account_id)
}

pub fn account_session_key(account_id: i64) -> String {
    format!("account:{}:session", account_id)
}

/// Common prefix of every secret belonging to one account.
pub fn account_prefix(account_id: i64) -> String {
    format!("account:{}:", account_id)
}

/// HMAC-SHA256 of host and user name under a fixed label: a copied database does not open
/// for another machine or login.
fn machine_key() -> Result<[u8; 32]> {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let user = whoami::username();

    let mut mac = <HmacSha256 as Mac>::new_from_slice(KEY_LABEL)
        .map_err(|e| anyhow!("vault key derivation failed: {}", e))?;
    mac.update(host.as_bytes());
    mac.update(b"/");
    mac.update(user.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

/// Encrypted key/value store sharing the roster database.
///
/// Holds account secrets (`account:{id}:api_hash`, `account:{id}:session`) and persisted
/// settings. Values are stored as `v1:` + base64(nonce || AES-256-GCM ciphertext).
pub struct SecretsVault {
    db: Arc<Mutex<Connection>>,
    cipher: Aes256Gcm,
}

impl SecretsVault {
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(&machine_key()?)
            .map_err(|e| anyhow!("invalid vault key: {}", e))?;
        Ok(Self { db, cipher })
    }

    pub async fn initialize(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "CREATE TABLE IF NOT EXISTS vault_entries (
                key TEXT PRIMARY KEY,
                sealed TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }

    fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| anyhow!("encryption failed: {}", e))?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", SEALED_PREFIX, B64.encode(blob)))
    }

    fn unseal(&self, sealed: &str) -> Result<String> {
        let Some(encoded) = sealed.strip_prefix(SEALED_PREFIX) else {
            bail!("unknown sealing format");
        };
        let blob = B64.decode(encoded).context("corrupt base64")?;
        if blob.len() <= NONCE_LEN {
            bail!("sealed value too short");
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("decryption failed (wrong machine key or tampered value)"))?;
        String::from_utf8(plaintext).context("decrypted value is not UTF-8")
    }

    pub async fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let sealed = self.seal(value)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO vault_entries (key, sealed) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET sealed = excluded.sealed, updated_at = CURRENT_TIMESTAMP",
            params![key, sealed],
        )?;
        Ok(())
    }

    pub async fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let sealed: Option<String> = {
            let db = self.db.lock().await;
            db.query_row(
                "SELECT sealed FROM vault_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?
        };

        sealed
            .map(|s| {
                self.unseal(&s)
                    .with_context(|| format!("vault entry '{}' is unreadable", key))
            })
            .transpose()
    }

    /// Stored keys in lexical order. Values stay sealed.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT key FROM vault_entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    pub async fn remove_secret(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.execute("DELETE FROM vault_entries WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Removes every key starting with `prefix`. Returns how many were removed.
    pub async fn remove_prefixed(&self, prefix: &str) -> Result<usize> {
        let db = self.db.lock().await;
        let removed = db.execute(
            "DELETE FROM vault_entries WHERE substr(key, 1, length(?1)) = ?1",
            [prefix],
        )?;
        Ok(removed)
    }
}
