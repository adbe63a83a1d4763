//! The award ledger.
//!
//! Rows are only ever inserted (and flagged as seen). The unique index on
//! `(user_id, badge_id)` turns a duplicate grant into [`StoreError::Conflict`]
//! no matter how many processes race on it.

use laurel_shared::{AwardId, AwardRecord, BadgeId, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows::{encode_ts, now, ts_at, uuid_at};

impl Database {
    pub fn has_award(&self, user: UserId, badge: BadgeId) -> Result<bool> {
        let held: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM user_badges WHERE user_id = ?1 AND badge_id = ?2)",
            params![user.to_string(), badge.to_string()],
            |row| row.get(0),
        )?;
        Ok(held)
    }

    /// Record that `user` earned `badge`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if the pair is already recorded,
    /// [`StoreError::NotFound`] if the badge does not exist.
    pub fn grant_award(&self, user: UserId, badge: BadgeId) -> Result<AwardRecord> {
        let record = AwardRecord {
            id: AwardId::new(),
            user_id: user,
            badge_id: badge,
            awarded_at: now(),
            is_seen: false,
        };

        self.conn()
            .execute(
                "INSERT INTO user_badges (id, user_id, badge_id, awarded_at, is_seen)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![
                    record.id.to_string(),
                    record.user_id.to_string(),
                    record.badge_id.to_string(),
                    encode_ts(&record.awarded_at),
                ],
            )
            .map_err(StoreError::from_write)?;

        Ok(record)
    }

    /// Every award held by `user`, newest first.
    pub fn user_badges(&self, user: UserId) -> Result<Vec<AwardRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, badge_id, awarded_at, is_seen
             FROM user_badges
             WHERE user_id = ?1
             ORDER BY awarded_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], row_to_award)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Flag awards as acknowledged. `None` marks all of the user's unseen
    /// awards. Returns how many rows changed.
    pub fn mark_seen(&self, user: UserId, badges: Option<&[BadgeId]>) -> Result<usize> {
        let user = user.to_string();

        let Some(badges) = badges else {
            let changed = self.conn().execute(
                "UPDATE user_badges SET is_seen = 1 WHERE user_id = ?1 AND is_seen = 0",
                params![user],
            )?;
            return Ok(changed);
        };

        let mut stmt = self.conn().prepare(
            "UPDATE user_badges SET is_seen = 1
             WHERE user_id = ?1 AND badge_id = ?2 AND is_seen = 0",
        )?;
        let mut changed = 0;
        for badge in badges {
            changed += stmt.execute(params![user, badge.to_string()])?;
        }
        Ok(changed)
    }

    /// Number of users holding `badge`.
    pub fn award_count(&self, badge: BadgeId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM user_badges WHERE badge_id = ?1",
            params![badge.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn row_to_award(row: &rusqlite::Row<'_>) -> rusqlite::Result<AwardRecord> {
    Ok(AwardRecord {
        id: AwardId(uuid_at(row, 0)?),
        user_id: UserId(uuid_at(row, 1)?),
        badge_id: BadgeId(uuid_at(row, 2)?),
        awarded_at: ts_at(row, 3)?,
        is_seen: row.get(4)?,
    })
}
