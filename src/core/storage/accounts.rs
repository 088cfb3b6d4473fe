use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::Storage;
use super::types::AccountRecord;

const ACCOUNT_COLUMNS: &str = "id, api_id, phone, is_ready, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<AccountRecord> {
    Ok(AccountRecord {
        id: row.get(0)?,
        api_id: row.get(1)?,
        phone: row.get(2)?,
        is_ready: row.get::<_, i32>(3)? != 0,
        created_at: row.get(4)?,
    })
}

impl Storage {
    /// Upsert by phone. Re-registering an existing phone resets it to not ready.
    pub async fn create_account(&self, api_id: i64, phone: &str) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO accounts (api_id, phone, is_ready) VALUES (?1, ?2, 0)
             ON CONFLICT(phone) DO UPDATE SET api_id = excluded.api_id, is_ready = 0",
            params![api_id, phone],
        )?;
        let id = db.query_row(
            "SELECT id FROM accounts WHERE phone = ?1",
            params![phone],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub async fn get_account(&self, id: i64) -> Result<Option<AccountRecord>> {
        let db = self.db.lock().await;
        let account = db
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM accounts ORDER BY created_at DESC, id DESC",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map([], account_from_row)?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }

    pub async fn set_account_ready(&self, id: i64, ready: bool) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE accounts SET is_ready = ?1 WHERE id = ?2",
            params![ready as i32, id],
        )?;
        Ok(rows > 0)
    }

    /// Removes the account and, through the foreign key, all of its membership rows.
    pub async fn delete_account(&self, id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
