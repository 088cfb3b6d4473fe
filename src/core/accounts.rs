use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::info;

use crate::core::directory::AccountCredentials;
use crate::core::storage::{AccountRecord, Storage};
use crate::core::vault::{SecretsVault, account_api_hash_key, account_prefix, account_session_key};

/// Account registry: public fields in the `accounts` table, secrets in the vault.
#[derive(Clone)]
pub struct AccountService {
    storage: Arc<Storage>,
    vault: Arc<SecretsVault>,
}

impl AccountService {
    pub fn new(storage: Arc<Storage>, vault: Arc<SecretsVault>) -> Self {
        Self { storage, vault }
    }

    /// Registers (or re-registers) an account by phone. The account is not ready until a
    /// session is imported; re-registration drops any previous session.
    pub async fn register(&self, api_id: i64, api_hash: &str, phone: &str) -> Result<i64> {
        let phone = phone.trim();
        let api_hash = api_hash.trim();
        if phone.is_empty() {
            bail!("phone is required");
        }
        if api_hash.is_empty() {
            bail!("api_hash is required");
        }
        if api_id <= 0 {
            bail!("api_id must be a positive integer");
        }

        let id = self.storage.create_account(api_id, phone).await?;
        self.vault
            .set_secret(&account_api_hash_key(id), api_hash)
            .await?;
        self.vault.remove_secret(&account_session_key(id)).await?;
        info!("Registered account {} ({})", id, phone);
        Ok(id)
    }

    /// Stores an already-issued session string and marks the account ready.
    /// Returns `false` when the account does not exist.
    pub async fn import_session(&self, account_id: i64, session: &str) -> Result<bool> {
        let session = session.trim();
        if session.is_empty() {
            bail!("session string is empty");
        }
        if self.storage.get_account(account_id).await?.is_none() {
            return Ok(false);
        }
        self.vault
            .set_secret(&account_session_key(account_id), session)
            .await?;
        self.storage.set_account_ready(account_id, true).await?;
        info!("Session imported for account {}", account_id);
        Ok(true)
    }

    pub async fn list(&self) -> Result<Vec<AccountRecord>> {
        self.storage.list_accounts().await
    }

    pub async fn get(&self, account_id: i64) -> Result<Option<AccountRecord>> {
        self.storage.get_account(account_id).await
    }

    /// Deletes the account, its membership rows and its vault secrets.
    pub async fn delete(&self, account_id: i64) -> Result<bool> {
        let deleted = self.storage.delete_account(account_id).await?;
        self.vault.remove_prefixed(&account_prefix(account_id)).await?;
        if deleted {
            info!("Deleted account {}", account_id);
        }
        Ok(deleted)
    }

    /// Credentials of a ready account, `None` when it is missing, not ready, or has no
    /// stored session.
    pub async fn credentials(&self, account_id: i64) -> Result<Option<AccountCredentials>> {
        let Some(account) = self.storage.get_account(account_id).await? else {
            return Ok(None);
        };
        if !account.is_ready {
            return Ok(None);
        }
        let api_hash = self.vault.get_secret(&account_api_hash_key(account_id)).await?;
        let session = self.vault.get_secret(&account_session_key(account_id)).await?;
        match (api_hash, session) {
            (Some(api_hash), Some(session)) if !session.is_empty() => Ok(Some(AccountCredentials {
                account_id,
                api_id: account.api_id,
                api_hash,
                session,
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
pub async fn test_accounts() -> (Arc<Storage>, AccountService) {
    let storage = Arc::new(crate::core::storage::test_storage().await);
    let vault = SecretsVault::new(storage.get_db()).expect("vault");
    vault.initialize().await.expect("init vault");
    let accounts = AccountService::new(storage.clone(), Arc::new(vault));
    (storage, accounts)
}
