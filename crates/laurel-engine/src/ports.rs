//! Collaborator interfaces the engine is built against.
//!
//! The orchestrator only ever sees these traits. Production wiring hands it
//! the SQLite store; tests hand it in-memory fakes.

use async_trait::async_trait;
use laurel_shared::{AwardRecord, Badge, BadgeId, TriggerType, UserId};

use crate::error::Result;

/// Read access to badge rule descriptors.
#[async_trait]
pub trait BadgeCatalog: Send + Sync {
    /// Every badge the engine should evaluate for `trigger`.
    ///
    /// Hidden badges are left out unless the implementation was configured
    /// to include them. An empty list is a normal answer.
    async fn candidates_for(&self, trigger: &TriggerType) -> Result<Vec<Badge>>;

    /// Look up a single badge. Unknown ids are `EngineError::NotFound`.
    async fn badge(&self, id: BadgeId) -> Result<Badge>;
}

/// The append-only store of grants.
///
/// Implementations must enforce at most one record per (user, badge) at the
/// storage level and report a duplicate as `EngineError::Conflict`.
#[async_trait]
pub trait AwardLedger: Send + Sync {
    async fn has_award(&self, user: UserId, badge: BadgeId) -> Result<bool>;

    async fn grant(&self, user: UserId, badge: BadgeId) -> Result<AwardRecord>;

    /// All records held by `user`, newest first.
    async fn user_badges(&self, user: UserId) -> Result<Vec<AwardRecord>>;
}

/// Counts owned by the learning and community subsystems.
///
/// Every call must read through to the owning store; the engine relies on
/// fresh values and never caches them.
#[async_trait]
pub trait ActivityAggregates: Send + Sync {
    async fn completed_enrollments(&self, user: UserId) -> Result<u64>;

    /// Completed lessons summed across all of the user's enrollments.
    async fn completed_lessons(&self, user: UserId) -> Result<u64>;

    async fn authored_posts(&self, user: UserId) -> Result<u64>;

    async fn space_memberships(&self, user: UserId) -> Result<u64>;
}
