//! The awarding entry point.
//!
//! Every triggering subsystem calls [`Orchestrator::check_and_award_badges`]
//! after its own state change has committed. The call loads the candidate
//! badges for the trigger, skips the ones the user already holds, evaluates
//! the rest and grants the eligible ones.
//!
//! There is no in-process locking. Two calls racing on the same
//! (user, badge) can both pass the `has_award` check; the ledger's uniqueness
//! constraint lets exactly one `grant` through and the loser sees a
//! conflict, which is absorbed here as "already awarded".

use std::sync::Arc;

use futures::future::try_join_all;
use laurel_shared::{AwardRecord, Badge, BadgeId, TriggerContext, TriggerType, UserId};
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Result};
use crate::evaluator::{Evaluator, EvaluatorRegistry};
use crate::ports::{ActivityAggregates, AwardLedger, BadgeCatalog};

pub struct Orchestrator {
    catalog: Arc<dyn BadgeCatalog>,
    ledger: Arc<dyn AwardLedger>,
    aggregates: Arc<dyn ActivityAggregates>,
    registry: EvaluatorRegistry,
}

impl Orchestrator {
    /// Wire the orchestrator to its collaborators with the default rules.
    pub fn new(
        catalog: Arc<dyn BadgeCatalog>,
        ledger: Arc<dyn AwardLedger>,
        aggregates: Arc<dyn ActivityAggregates>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            aggregates,
            registry: EvaluatorRegistry::default(),
        }
    }

    /// Replace the rule registry.
    pub fn with_registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    /// Grant every badge `user` newly qualifies for after `trigger` fired.
    ///
    /// Returns the badges granted by *this* call, in catalog order. Repeating
    /// a call with the same arguments returns an empty list.
    ///
    /// # Errors
    ///
    /// A catalog or `has_award` failure, or an aggregate that cannot be read,
    /// fails the whole call. A failed `grant` only drops that one badge.
    pub async fn check_and_award_badges(
        &self,
        user: UserId,
        trigger: &TriggerType,
        context: &TriggerContext,
    ) -> Result<Vec<Badge>> {
        let Some(evaluator) = self.registry.get(trigger) else {
            debug!(user = %user, trigger = %trigger, "no evaluator registered, nothing to award");
            return Ok(Vec::new());
        };

        let candidates = self.catalog.candidates_for(trigger).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            user = %user,
            trigger = %trigger,
            candidates = candidates.len(),
            "evaluating badge candidates"
        );

        let mut pending = Vec::with_capacity(candidates.len());
        for badge in candidates {
            pending.push(self.process_candidate(user, badge, evaluator.as_ref(), context));
        }

        let awarded: Vec<Badge> = try_join_all(pending).await?.into_iter().flatten().collect();

        if !awarded.is_empty() {
            info!(
                user = %user,
                trigger = %trigger,
                awarded = awarded.len(),
                "badges awarded"
            );
        }

        Ok(awarded)
    }

    /// [`check_and_award_badges`](Self::check_and_award_badges) for callers
    /// whose own action has already committed.
    ///
    /// Failures are logged and turned into an empty list so the caller's
    /// success never depends on awarding.
    pub async fn award_best_effort(
        &self,
        user: UserId,
        trigger: &TriggerType,
        context: &TriggerContext,
    ) -> Vec<Badge> {
        match self.check_and_award_badges(user, trigger, context).await {
            Ok(awarded) => awarded,
            Err(e) => {
                warn!(user = %user, trigger = %trigger, error = %e, "badge awarding failed");
                Vec::new()
            }
        }
    }

    /// Administrative grant, used for `manual` badges.
    ///
    /// Unlike the automatic path a duplicate is reported to the caller as
    /// [`EngineError::Conflict`].
    pub async fn grant_manual(&self, user: UserId, badge: BadgeId) -> Result<AwardRecord> {
        let badge = self.catalog.badge(badge).await?;
        let record = self.ledger.grant(user, badge.id).await?;
        info!(user = %user, badge = %badge.id, name = %badge.name, "badge granted manually");
        Ok(record)
    }

    /// Award records held by `user`, newest first.
    pub async fn user_badges(&self, user: UserId) -> Result<Vec<AwardRecord>> {
        self.ledger.user_badges(user).await
    }

    /// One candidate: skip if held, evaluate, grant.
    ///
    /// `Ok(None)` covers every "not granted by this call" outcome, including
    /// a contained grant failure.
    async fn process_candidate(
        &self,
        user: UserId,
        badge: Badge,
        evaluator: &dyn Evaluator,
        context: &TriggerContext,
    ) -> Result<Option<Badge>> {
        if self.ledger.has_award(user, badge.id).await? {
            debug!(user = %user, badge = %badge.id, "already held");
            return Ok(None);
        }

        if !evaluator
            .evaluate(user, &badge, context, self.aggregates.as_ref())
            .await?
        {
            return Ok(None);
        }

        match self.ledger.grant(user, badge.id).await {
            Ok(record) => {
                info!(
                    user = %user,
                    badge = %badge.id,
                    award = %record.id,
                    name = %badge.name,
                    points = badge.points,
                    "badge granted"
                );
                Ok(Some(badge))
            }
            Err(EngineError::Conflict { .. }) => {
                debug!(user = %user, badge = %badge.id, "granted concurrently, skipping");
                Ok(None)
            }
            Err(e) => {
                error!(user = %user, badge = %badge.id, error = %e, "grant failed");
                Ok(None)
            }
        }
    }
}
