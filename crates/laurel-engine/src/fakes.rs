//! In-memory collaborators for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use laurel_shared::{AwardId, AwardRecord, Badge, BadgeId, Rarity, TriggerType, UserId};

use crate::error::{EngineError, Result};
use crate::evaluator::Aggregate;
use crate::ports::{ActivityAggregates, AwardLedger, BadgeCatalog};

pub fn badge(
    name: &str,
    trigger_type: TriggerType,
    requirement_count: u32,
    specific_entity_id: Option<&str>,
) -> Badge {
    Badge {
        id: BadgeId::new(),
        name: name.to_string(),
        description: String::new(),
        icon: String::new(),
        category_id: None,
        rarity: Rarity::Common,
        points: 10,
        trigger_type,
        requirement_count,
        specific_entity_id: specific_entity_id.map(str::to_string),
        is_hidden: false,
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCatalog {
    badges: Mutex<Vec<Badge>>,
    reads: AtomicUsize,
    unreachable: AtomicBool,
}

impl MemoryCatalog {
    pub fn with_badges(badges: Vec<Badge>) -> Self {
        Self {
            badges: Mutex::new(badges),
            ..Self::default()
        }
    }

    pub fn remove(&self, id: BadgeId) {
        self.badges.lock().unwrap().retain(|b| b.id != id);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn go_down(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BadgeCatalog for MemoryCatalog {
    async fn candidates_for(&self, trigger: &TriggerType) -> Result<Vec<Badge>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EngineError::Storage("catalog unreachable".into()));
        }
        Ok(self
            .badges
            .lock()
            .unwrap()
            .iter()
            .filter(|b| &b.trigger_type == trigger && !b.is_hidden)
            .cloned()
            .collect())
    }

    async fn badge(&self, id: BadgeId) -> Result<Badge> {
        self.badges
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("badge {id}")))
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ledger with a uniqueness check inside `grant`, mirroring a storage-level
/// constraint.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<AwardRecord>>,
    /// When set, `has_award` always says no, so every caller reaches `grant`.
    blind: AtomicBool,
    failing: Mutex<HashSet<BadgeId>>,
    writes: AtomicUsize,
}

impl MemoryLedger {
    /// A ledger whose pre-check never sees existing awards.
    pub fn blind() -> Self {
        let ledger = Self::default();
        ledger.blind.store(true, Ordering::SeqCst);
        ledger
    }

    pub fn fail_grants_for(&self, badge: BadgeId) {
        self.failing.lock().unwrap().insert(badge);
    }

    pub fn count(&self, user: UserId, badge: BadgeId) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user && r.badge_id == badge)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AwardLedger for MemoryLedger {
    async fn has_award(&self, user: UserId, badge: BadgeId) -> Result<bool> {
        if self.blind.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.count(user, badge) > 0)
    }

    async fn grant(&self, user: UserId, badge: BadgeId) -> Result<AwardRecord> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&badge) {
            return Err(EngineError::Storage("disk I/O error".into()));
        }

        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.user_id == user && r.badge_id == badge)
        {
            return Err(EngineError::Conflict { user, badge });
        }
        let record = AwardRecord {
            id: AwardId::new(),
            user_id: user,
            badge_id: badge,
            awarded_at: Utc::now(),
            is_seen: false,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn user_badges(&self, user: UserId) -> Result<Vec<AwardRecord>> {
        let mut held: Vec<AwardRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect();
        held.reverse();
        Ok(held)
    }
}

/// Ledger that rejects every grant as referring to an unknown badge.
#[derive(Default)]
pub struct DanglingLedger;

#[async_trait]
impl AwardLedger for DanglingLedger {
    async fn has_award(&self, _user: UserId, _badge: BadgeId) -> Result<bool> {
        Ok(false)
    }

    async fn grant(&self, _user: UserId, badge: BadgeId) -> Result<AwardRecord> {
        Err(EngineError::NotFound(format!("badge {badge}")))
    }

    async fn user_badges(&self, _user: UserId) -> Result<Vec<AwardRecord>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAggregates {
    counts: Mutex<HashMap<(UserId, Aggregate), u64>>,
    reads: AtomicUsize,
    unreachable: AtomicBool,
}

impl MemoryAggregates {
    pub fn set(&self, user: UserId, aggregate: Aggregate, value: u64) {
        self.counts.lock().unwrap().insert((user, aggregate), value);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    fn read(&self, user: UserId, aggregate: Aggregate) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EngineError::Storage("aggregate source unreachable".into()));
        }
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&(user, aggregate))
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl ActivityAggregates for MemoryAggregates {
    async fn completed_enrollments(&self, user: UserId) -> Result<u64> {
        self.read(user, Aggregate::CompletedEnrollments)
    }

    async fn completed_lessons(&self, user: UserId) -> Result<u64> {
        self.read(user, Aggregate::CompletedLessons)
    }

    async fn authored_posts(&self, user: UserId) -> Result<u64> {
        self.read(user, Aggregate::AuthoredPosts)
    }

    async fn space_memberships(&self, user: UserId) -> Result<u64> {
        self.read(user, Aggregate::SpaceMemberships)
    }
}
