//! v002 -- Activity tables owned by the learning and community subsystems.
//!
//! The awarding engine only reads counts from these tables.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS enrollments (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id      TEXT NOT NULL,
    course_id    TEXT NOT NULL,
    enrolled_at  TEXT NOT NULL,
    completed_at TEXT,                        -- NULL while in progress

    UNIQUE (user_id, course_id)
);

CREATE TABLE IF NOT EXISTS lesson_progress (
    enrollment_id TEXT NOT NULL,              -- FK -> enrollments(id)
    lesson_id     TEXT NOT NULL,
    completed_at  TEXT NOT NULL,

    PRIMARY KEY (enrollment_id, lesson_id),
    FOREIGN KEY (enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    author_id  TEXT NOT NULL,
    space_id   TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);

CREATE TABLE IF NOT EXISTS space_members (
    space_id  TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    joined_at TEXT NOT NULL,

    PRIMARY KEY (space_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_space_members_user ON space_members(user_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
