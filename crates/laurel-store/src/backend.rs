//! SQLite implementation of the engine's collaborator traits.
//!
//! [`StoreBackend`] shares one [`Database`] behind a mutex and runs every
//! statement on tokio's blocking pool. The lock is held for a single
//! operation only, so `has_award` followed by `grant` is not atomic: races
//! between concurrent triggers are settled by the ledger's unique index,
//! exactly as they would be across separate processes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use laurel_engine::{ActivityAggregates, AwardLedger, BadgeCatalog, EngineError};
use laurel_shared::{AwardRecord, Badge, BadgeId, TriggerType, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

type EngineResult<T> = laurel_engine::Result<T>;

#[derive(Clone)]
pub struct StoreBackend {
    db: Arc<Mutex<Database>>,
    include_hidden: bool,
}

impl StoreBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            include_hidden: false,
        }
    }

    /// Whether hidden badges take part in automatic evaluation.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Run `f` against the database on the blocking pool.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl BadgeCatalog for StoreBackend {
    async fn candidates_for(&self, trigger: &TriggerType) -> EngineResult<Vec<Badge>> {
        let trigger = trigger.clone();
        let include_hidden = self.include_hidden;
        Ok(self
            .with_db(move |db| db.candidates_for(&trigger, include_hidden))
            .await?)
    }

    async fn badge(&self, id: BadgeId) -> EngineResult<Badge> {
        self.with_db(move |db| db.get_badge(id))
            .await
            .map_err(|e| match e {
                StoreError::NotFound => EngineError::NotFound(format!("badge {id}")),
                other => other.into(),
            })
    }
}

#[async_trait]
impl AwardLedger for StoreBackend {
    async fn has_award(&self, user: UserId, badge: BadgeId) -> EngineResult<bool> {
        Ok(self.with_db(move |db| db.has_award(user, badge)).await?)
    }

    async fn grant(&self, user: UserId, badge: BadgeId) -> EngineResult<AwardRecord> {
        self.with_db(move |db| db.grant_award(user, badge))
            .await
            .map_err(|e| match e {
                StoreError::Conflict => EngineError::Conflict { user, badge },
                StoreError::NotFound => EngineError::NotFound(format!("badge {badge}")),
                other => other.into(),
            })
    }

    async fn user_badges(&self, user: UserId) -> EngineResult<Vec<AwardRecord>> {
        Ok(self.with_db(move |db| db.user_badges(user)).await?)
    }
}

#[async_trait]
impl ActivityAggregates for StoreBackend {
    async fn completed_enrollments(&self, user: UserId) -> EngineResult<u64> {
        Ok(self
            .with_db(move |db| db.count_completed_enrollments(user))
            .await?)
    }

    async fn completed_lessons(&self, user: UserId) -> EngineResult<u64> {
        Ok(self.with_db(move |db| db.count_completed_lessons(user)).await?)
    }

    async fn authored_posts(&self, user: UserId) -> EngineResult<u64> {
        Ok(self.with_db(move |db| db.count_authored_posts(user)).await?)
    }

    async fn space_memberships(&self, user: UserId) -> EngineResult<u64> {
        Ok(self.with_db(move |db| db.count_space_memberships(user)).await?)
    }
}
