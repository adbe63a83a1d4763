//! v001 -- Badge catalog and award ledger.
//!
//! Creates `badge_categories`, `badges` and `user_badges`. The unique index
//! on `user_badges (user_id, badge_id)` is the storage-level guard that makes
//! concurrent grants of the same badge collapse to a single row.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Categories
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS badge_categories (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL                 -- RFC-3339, microsecond precision
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_badge_categories_slug ON badge_categories(slug);

-- ----------------------------------------------------------------
-- Badges (rule descriptors)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS badges (
    id                 TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name               TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    icon               TEXT NOT NULL DEFAULT '',
    category_id        TEXT,                          -- nullable FK -> badge_categories(id)
    rarity             TEXT NOT NULL DEFAULT 'common'
        CHECK (rarity IN ('common', 'uncommon', 'rare', 'epic', 'legendary')),
    points             INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    trigger_type       TEXT NOT NULL DEFAULT 'manual',
    requirement_count  INTEGER NOT NULL DEFAULT 1 CHECK (requirement_count >= 1),
    specific_entity_id TEXT,
    is_hidden          INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    created_at         TEXT NOT NULL,

    FOREIGN KEY (category_id) REFERENCES badge_categories(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_badges_trigger ON badges(trigger_type, is_hidden);

-- ----------------------------------------------------------------
-- Award ledger
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_badges (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_id    TEXT NOT NULL,                 -- UUID owned by the account subsystem
    badge_id   TEXT NOT NULL,                 -- FK -> badges(id)
    awarded_at TEXT NOT NULL,
    is_seen    INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1

    FOREIGN KEY (badge_id) REFERENCES badges(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_user_badges_unique ON user_badges(user_id, badge_id);
CREATE INDEX IF NOT EXISTS idx_user_badges_user_awarded
    ON user_badges(user_id, awarded_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
