use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;

use super::Storage;
use super::types::{GroupRef, MembershipRow};
use crate::core::directory::MemberRecord;

pub const DEFAULT_RECENT_LIMIT: usize = 200;

const MEMBER_COLUMNS: &str = "id, account_id, tg_user_id, username, first_name, last_name, \
     is_bot, is_verified, group_id, group_title, crawled_at";

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MembershipRow> {
    Ok(MembershipRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        tg_user_id: row.get(2)?,
        username: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        is_bot: row.get::<_, i32>(6)? != 0,
        is_verified: row.get::<_, i32>(7)? != 0,
        group_id: row.get(8)?,
        group_title: row.get(9)?,
        crawled_at: row.get(10)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Plain insert where a unique violation means another writer stored the row first.
fn insert_row(
    db: &Connection,
    account_id: i64,
    group: &GroupRef,
    record: &MemberRecord,
) -> rusqlite::Result<bool> {
    let res = db.execute(
        "INSERT INTO members (account_id, tg_user_id, username, first_name, last_name,
                              is_bot, is_verified, group_id, group_title)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            account_id,
            record.user_id,
            record.username,
            record.first_name,
            record.last_name,
            record.is_bot as i32,
            record.is_verified as i32,
            group.id,
            group.title,
        ],
    );
    match res {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

impl Storage {
    /// Check-then-insert on (account, remote user, group).
    ///
    /// Returns `true` when a new row was written. An existing row is left untouched and a
    /// concurrent writer winning the race surfaces as `false`, not as an error. Every insert
    /// commits on its own.
    pub async fn insert_member_if_absent(
        &self,
        account_id: i64,
        group: &GroupRef,
        record: &MemberRecord,
    ) -> Result<bool> {
        let db = self.db.lock().await;

        let existing: Option<i64> = db
            .query_row(
                "SELECT id FROM members WHERE account_id = ?1 AND tg_user_id = ?2 AND group_id = ?3",
                params![account_id, record.user_id, group.id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }

        let inserted = insert_row(&db, account_id, group, record)?;
        if !inserted {
            debug!(
                "Member {} of group {} already stored for account {}",
                record.user_id, group.id, account_id
            );
        }
        Ok(inserted)
    }

    /// All rows, optionally restricted to one group, oldest first.
    pub async fn list_members(&self, group_id: Option<&str>) -> Result<Vec<MembershipRow>> {
        let db = self.db.lock().await;
        let mut rows_out = Vec::new();
        match group_id {
            Some(gid) => {
                let mut stmt = db.prepare(&format!(
                    "SELECT {} FROM members WHERE group_id = ?1 ORDER BY id",
                    MEMBER_COLUMNS
                ))?;
                let rows = stmt.query_map(params![gid], member_from_row)?;
                for row in rows {
                    rows_out.push(row?);
                }
            }
            None => {
                let mut stmt =
                    db.prepare(&format!("SELECT {} FROM members ORDER BY id", MEMBER_COLUMNS))?;
                let rows = stmt.query_map([], member_from_row)?;
                for row in rows {
                    rows_out.push(row?);
                }
            }
        }
        Ok(rows_out)
    }

    pub async fn recent_members(&self, limit: usize) -> Result<Vec<MembershipRow>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM members ORDER BY id DESC LIMIT ?1",
            MEMBER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], member_from_row)?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    pub async fn count_members(&self, account_id: i64, group_id: &str) -> Result<i64> {
        let db = self.db.lock().await;
        let count = db.query_row(
            "SELECT COUNT(*) FROM members WHERE account_id = ?1 AND group_id = ?2",
            params![account_id, group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
