//! Opening the SQLite file and bringing its schema up to date.
//!
//! A [`Database`] is only handed out after every pending migration has run,
//! so the CRUD modules can assume the current schema.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use laurel_shared::constants::DB_FILE_NAME;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// One open SQLite connection with foreign keys enforced.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at [`default_path`], creating it on first run:
    /// - Linux:   `~/.local/share/laurel/laurel.db`
    /// - macOS:   `~/Library/Application Support/org.laurel.laurel/laurel.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\laurel\laurel\data\laurel.db`
    pub fn new() -> Result<Self> {
        Self::open_at(&default_path()?)
    }

    /// Open `path`, creating the file and its parent directories if needed.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        // Award grants rely on the badge foreign key to detect dangling
        // references; SQLite leaves enforcement off by default.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Raw connection, for the CRUD modules and ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// `None` for in-memory databases.
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

/// Platform data directory path of the default database file.
pub fn default_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("org", "laurel", "laurel").ok_or(StoreError::NoDataDir)?;
    Ok(project_dirs.data_dir().join(DB_FILE_NAME))
}
