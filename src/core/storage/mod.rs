mod accounts;
mod members;
mod tokens;
pub mod types;

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::platform::{NativePlatform, Platform};

pub use members::DEFAULT_RECENT_LIMIT;
pub use types::{AccountRecord, ApiTokenRecord, GroupRef, MembershipRow};

pub struct Storage {
    db: Arc<Mutex<Connection>>,
    data_dir: PathBuf,
}

impl Storage {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }
        NativePlatform::restrict_dir_permissions(&data_dir);

        let db_path = data_dir.join("roster.db");
        let db = Connection::open(&db_path)?;
        NativePlatform::restrict_file_permissions(&db_path);
        init_schema(&db)?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            data_dir,
        })
    }

    pub fn get_db(&self) -> Arc<Mutex<Connection>> {
        self.db.clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn init_schema(db: &Connection) -> Result<()> {
    // Cascading deletes from accounts rely on this, and it is per-connection.
    db.execute_batch("PRAGMA foreign_keys = ON;")?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id INTEGER NOT NULL,
            phone TEXT NOT NULL UNIQUE,
            is_ready INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            tg_user_id INTEGER NOT NULL,
            username TEXT,
            first_name TEXT,
            last_name TEXT,
            is_bot INTEGER NOT NULL DEFAULT 0,
            is_verified INTEGER NOT NULL DEFAULT 0,
            group_id TEXT NOT NULL,
            group_title TEXT NOT NULL DEFAULT '',
            crawled_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            CONSTRAINT uq_member_account_user_group UNIQUE (account_id, tg_user_id, group_id)
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_group_id ON members(group_id)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_username ON members(username)",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS api_tokens (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

/// In-memory store for tests. Avoids filesystem side-effects.
#[cfg(test)]
pub async fn test_storage() -> Storage {
    let db = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&db).expect("init schema");
    Storage {
        db: Arc::new(Mutex::new(db)),
        data_dir: std::env::temp_dir().join(format!("tgroster-test-{}", uuid::Uuid::new_v4())),
    }
}

impl Storage {
    /// Number of accounts and membership rows currently stored.
    pub async fn stats(&self) -> Result<(i64, i64)> {
        let db = self.db.lock().await;
        let accounts: i64 = db.query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))?;
        let members: i64 = db.query_row("SELECT COUNT(*) FROM members", [], |r| r.get(0))?;
        Ok((accounts, members))
    }
}
