//! Schema migrations, tracked through SQLite's `user_version` pragma.
//!
//! [`Database::new`] and [`Database::open_at`] apply whatever is pending;
//! each step bumps `user_version` so it never runs twice.
//!
//! [`Database::new`]: crate::Database::new
//! [`Database::open_at`]: crate::Database::open_at

pub mod v001_catalog_ledger;
pub mod v002_activity;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Version reached once every entry of `MIGRATIONS` has been applied.
pub const CURRENT_VERSION: u32 = 2;

type Migration = fn(&Connection) -> std::result::Result<(), rusqlite::Error>;

const MIGRATIONS: [(u32, &str, Migration); 2] = [
    (1, "v001_catalog_ledger", v001_catalog_ledger::up),
    (2, "v002_activity", v002_activity::up),
];

/// Apply, in order, every migration newer than the stored `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::info!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking database migrations"
    );

    for (version, name, up) in MIGRATIONS {
        if current < version {
            tracing::info!(migration = name, "applying migration");
            up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    Ok(())
}
