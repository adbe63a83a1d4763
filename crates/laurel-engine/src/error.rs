use laurel_shared::{BadgeId, UserId};
use thiserror::Error;

/// Failures the awarding engine distinguishes.
///
/// How each one is treated by the orchestrator:
/// - `Validation`: not eligible, never fatal
/// - `NotFound`: fatal for one grant only
/// - `Conflict`: absorbed as "already awarded"
/// - `Storage`: fatal for the whole call
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Badge {badge} already awarded to user {user}")]
    Conflict { user: UserId, badge: BadgeId },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
