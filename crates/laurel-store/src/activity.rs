//! Activity tables of the learning and community subsystems.
//!
//! The count queries are what the awarding engine reads. The write helpers
//! belong to the owning subsystems: they commit the activity first and only
//! then fire the matching trigger.

use laurel_shared::UserId;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::rows::{encode_ts, now};

impl Database {
    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    pub fn count_completed_enrollments(&self, user: UserId) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM enrollments WHERE user_id = ?1 AND completed_at IS NOT NULL",
            user,
        )
    }

    /// Completed lessons summed over every enrollment of the user.
    pub fn count_completed_lessons(&self, user: UserId) -> Result<u64> {
        self.count(
            "SELECT COUNT(*)
             FROM lesson_progress lp
             JOIN enrollments e ON e.id = lp.enrollment_id
             WHERE e.user_id = ?1",
            user,
        )
    }

    pub fn count_authored_posts(&self, user: UserId) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM posts WHERE author_id = ?1", user)
    }

    pub fn count_space_memberships(&self, user: UserId) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM space_members WHERE user_id = ?1", user)
    }

    fn count(&self, sql: &str, user: UserId) -> Result<u64> {
        let n: i64 = self
            .conn()
            .query_row(sql, params![user.to_string()], |row| row.get(0))?;
        Ok(n as u64)
    }

    // ------------------------------------------------------------------
    // Writes (owning subsystems)
    // ------------------------------------------------------------------

    /// Enroll `user` in `course_id`, returning the enrollment id. Enrolling
    /// twice returns the existing enrollment.
    pub fn enroll(&self, user: UserId, course_id: &str) -> Result<Uuid> {
        let existing: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
                params![user.to_string(), course_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(Uuid::parse_str(&id)?);
        }

        let id = Uuid::new_v4();
        self.conn().execute(
            "INSERT INTO enrollments (id, user_id, course_id, enrolled_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), user.to_string(), course_id, encode_ts(&now())],
        )?;
        Ok(id)
    }

    /// Mark the user's enrollment in `course_id` completed, enrolling first
    /// if needed. Returns `false` when it was already completed.
    pub fn complete_course(&self, user: UserId, course_id: &str) -> Result<bool> {
        let enrollment = self.enroll(user, course_id)?;
        let changed = self.conn().execute(
            "UPDATE enrollments SET completed_at = ?1 WHERE id = ?2 AND completed_at IS NULL",
            params![encode_ts(&now()), enrollment.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Record a completed lesson. Returns `false` for a repeat completion.
    pub fn complete_lesson(&self, user: UserId, course_id: &str, lesson_id: &str) -> Result<bool> {
        let enrollment = self.enroll(user, course_id)?;
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO lesson_progress (enrollment_id, lesson_id, completed_at)
             VALUES (?1, ?2, ?3)",
            params![enrollment.to_string(), lesson_id, encode_ts(&now())],
        )?;
        Ok(inserted > 0)
    }

    pub fn record_post(&self, author: UserId, space_id: Option<&str>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn().execute(
            "INSERT INTO posts (id, author_id, space_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), author.to_string(), space_id, encode_ts(&now())],
        )?;
        Ok(id)
    }

    /// Add `user` to `space_id`. Returns `false` if already a member.
    pub fn join_space(&self, user: UserId, space_id: &str) -> Result<bool> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO space_members (space_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![space_id, user.to_string(), encode_ts(&now())],
        )?;
        Ok(inserted > 0)
    }
}
