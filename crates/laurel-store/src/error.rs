use laurel_engine::EngineError;
use laurel_shared::SharedError;
use thiserror::Error;

/// Failures of the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No home directory to derive the default database path from.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Creating the database's parent directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none, or a foreign key
    /// pointed at a row that does not exist.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("Record already exists")]
    Conflict,

    /// Input rejected before it reached SQLite.
    #[error("Invalid input: {0}")]
    Invalid(#[from] SharedError),

    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored id column did not hold a UUID.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    /// The shared connection mutex was poisoned by a panicking holder.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// A blocking database task could not be joined.
    #[error("Database task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Classify a failed write: unique/primary-key violations become
    /// [`StoreError::Conflict`], foreign-key violations [`StoreError::NotFound`].
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict;
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::NotFound,
                _ => {}
            }
        }
        Self::Sqlite(err)
    }

    /// Map `QueryReturnedNoRows` to [`StoreError::NotFound`].
    pub(crate) fn from_lookup(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound,
            other => Self::Sqlite(other),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => EngineError::NotFound("record not found".into()),
            StoreError::Invalid(e) => EngineError::Validation(e.to_string()),
            // Conflicts that carry (user, badge) are built by the ledger
            // itself; anything else reaching here is a storage fault.
            other => EngineError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
