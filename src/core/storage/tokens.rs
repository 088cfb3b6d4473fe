use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::Storage;
use super::types::ApiTokenRecord;

const TOKEN_PREFIX: &str = "tgr_";

/// Hex SHA-256 of the raw bearer value. This is all that reaches the database.
fn fingerprint(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

fn mint() -> String {
    let entropy: [u8; 16] = rand::random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(entropy))
}

impl Storage {
    /// Returns the raw token once. Only its fingerprint is persisted.
    pub async fn create_api_token(&self, name: &str) -> Result<(String, ApiTokenRecord)> {
        let raw = mint();
        let record_id = uuid::Uuid::new_v4().to_string();

        let db = self.db.lock().await;
        let created_at: String = db.query_row(
            "INSERT INTO api_tokens (id, name, token_hash) VALUES (?1, ?2, ?3)
             RETURNING created_at",
            params![record_id, name, fingerprint(&raw)],
            |row| row.get(0),
        )?;

        let record = ApiTokenRecord {
            id: record_id,
            name: name.to_string(),
            created_at,
        };
        Ok((raw, record))
    }

    /// Newest first.
    pub async fn list_api_tokens(&self) -> Result<Vec<ApiTokenRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, name, created_at FROM api_tokens ORDER BY created_at DESC, rowid DESC",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(ApiTokenRecord {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    created_at: row.get("created_at")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub async fn delete_api_token(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        Ok(db.execute("DELETE FROM api_tokens WHERE id = ?1", [id])? == 1)
    }

    pub async fn validate_api_token(&self, raw: &str) -> Result<bool> {
        if !raw.starts_with(TOKEN_PREFIX) {
            return Ok(false);
        }
        let db = self.db.lock().await;
        let hit = db
            .query_row(
                "SELECT 1 FROM api_tokens WHERE token_hash = ?1 LIMIT 1",
                [fingerprint(raw)],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    pub async fn has_any_api_tokens(&self) -> Result<bool> {
        let db = self.db.lock().await;
        let present: bool =
            db.query_row("SELECT EXISTS(SELECT 1 FROM api_tokens)", [], |row| row.get(0))?;
        Ok(present)
    }
}
