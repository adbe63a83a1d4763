//! Eligibility rules, one per trigger type.
//!
//! Rules share the [`Evaluator`] contract and live in an
//! [`EvaluatorRegistry`] keyed by [`TriggerType`]. Supporting a new trigger
//! means registering another evaluator; existing rules are never touched.
//!
//! Two building blocks cover the built-in triggers:
//! - [`ThresholdEvaluator`] compares one aggregate count with the badge's
//!   `requirement_count`.
//! - [`ScopedEvaluator`] handles badges bound to a single entity by matching
//!   the entity named in the *current* event, and otherwise falls back to a
//!   threshold rule. Past activity is never re-scanned for scoped badges.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use laurel_shared::constants::{CONTEXT_COURSE_ID, CONTEXT_SPACE_ID};
use laurel_shared::{Badge, TriggerContext, TriggerType, UserId};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::ports::ActivityAggregates;

/// Decides whether `user` qualifies for `badge` given the event that fired.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        user: UserId,
        badge: &Badge,
        context: &TriggerContext,
        aggregates: &dyn ActivityAggregates,
    ) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Which collaborator count a threshold rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    CompletedEnrollments,
    CompletedLessons,
    AuthoredPosts,
    SpaceMemberships,
}

impl Aggregate {
    pub async fn read(self, aggregates: &dyn ActivityAggregates, user: UserId) -> Result<u64> {
        match self {
            Self::CompletedEnrollments => aggregates.completed_enrollments(user).await,
            Self::CompletedLessons => aggregates.completed_lessons(user).await,
            Self::AuthoredPosts => aggregates.authored_posts(user).await,
            Self::SpaceMemberships => aggregates.space_memberships(user).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold rule
// ---------------------------------------------------------------------------

/// Eligible once the chosen aggregate reaches `badge.requirement_count`.
///
/// `specific_entity_id` is not consulted.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator {
    aggregate: Aggregate,
}

impl ThresholdEvaluator {
    pub fn new(aggregate: Aggregate) -> Self {
        Self { aggregate }
    }
}

#[async_trait]
impl Evaluator for ThresholdEvaluator {
    async fn evaluate(
        &self,
        user: UserId,
        badge: &Badge,
        _context: &TriggerContext,
        aggregates: &dyn ActivityAggregates,
    ) -> Result<bool> {
        let count = self.aggregate.read(aggregates, user).await?;
        let required = u64::from(badge.requirement_count);
        debug!(
            user = %user,
            badge = %badge.id,
            aggregate = ?self.aggregate,
            count,
            required,
            "threshold check"
        );
        Ok(count >= required)
    }
}

// ---------------------------------------------------------------------------
// Scoped rule
// ---------------------------------------------------------------------------

/// Single-event match for scoped badges, threshold otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ScopedEvaluator {
    context_key: &'static str,
    fallback: ThresholdEvaluator,
}

impl ScopedEvaluator {
    pub fn new(context_key: &'static str, fallback: Aggregate) -> Self {
        Self {
            context_key,
            fallback: ThresholdEvaluator::new(fallback),
        }
    }

    fn event_entity(&self, context: &TriggerContext) -> Result<String> {
        context.entity_ref(self.context_key).ok_or_else(|| {
            EngineError::Validation(format!(
                "context has no usable `{}` field",
                self.context_key
            ))
        })
    }
}

#[async_trait]
impl Evaluator for ScopedEvaluator {
    async fn evaluate(
        &self,
        user: UserId,
        badge: &Badge,
        context: &TriggerContext,
        aggregates: &dyn ActivityAggregates,
    ) -> Result<bool> {
        let Some(target) = badge.specific_entity_id.as_deref() else {
            return self.fallback.evaluate(user, badge, context, aggregates).await;
        };

        match self.event_entity(context) {
            Ok(entity) => Ok(entity == target),
            Err(EngineError::Validation(reason)) => {
                debug!(user = %user, badge = %badge.id, %reason, "scoped badge not eligible");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps trigger types to their rule.
///
/// A trigger with no entry is a legal no-op for the orchestrator. `manual`
/// has no entry in the default registry: those badges are only handed out
/// through the administrative grant path.
#[derive(Clone)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<TriggerType, Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    /// A registry with no rules at all.
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// Install `evaluator` for `trigger`, returning the rule it replaced.
    pub fn register(
        &mut self,
        trigger: TriggerType,
        evaluator: Arc<dyn Evaluator>,
    ) -> Option<Arc<dyn Evaluator>> {
        self.evaluators.insert(trigger, evaluator)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, trigger: TriggerType, evaluator: Arc<dyn Evaluator>) -> Self {
        self.register(trigger, evaluator);
        self
    }

    pub fn get(&self, trigger: &TriggerType) -> Option<&Arc<dyn Evaluator>> {
        self.evaluators.get(trigger)
    }

    pub fn handles(&self, trigger: &TriggerType) -> bool {
        self.evaluators.contains_key(trigger)
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::empty()
            .with(
                TriggerType::CourseCompletion,
                Arc::new(ScopedEvaluator::new(
                    CONTEXT_COURSE_ID,
                    Aggregate::CompletedEnrollments,
                )),
            )
            .with(
                TriggerType::LessonCompletion,
                Arc::new(ThresholdEvaluator::new(Aggregate::CompletedLessons)),
            )
            .with(
                TriggerType::CommunityPost,
                Arc::new(ThresholdEvaluator::new(Aggregate::AuthoredPosts)),
            )
            .with(
                TriggerType::CommunityJoin,
                Arc::new(ScopedEvaluator::new(
                    CONTEXT_SPACE_ID,
                    Aggregate::SpaceMemberships,
                )),
            )
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut triggers: Vec<&str> = self.evaluators.keys().map(TriggerType::as_str).collect();
        triggers.sort_unstable();
        f.debug_struct("EvaluatorRegistry")
            .field("triggers", &triggers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{badge, MemoryAggregates};
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> TriggerContext {
        serde_json::from_value(value).unwrap()
    }

    async fn eval(
        registry: &EvaluatorRegistry,
        user: UserId,
        badge: &Badge,
        context: &TriggerContext,
        aggregates: &MemoryAggregates,
    ) -> Result<bool> {
        registry
            .get(&badge.trigger_type)
            .expect("evaluator registered")
            .evaluate(user, badge, context, aggregates)
            .await
    }

    #[test]
    fn default_registry_leaves_manual_unregistered() {
        let registry = EvaluatorRegistry::default();
        assert_eq!(registry.len(), 4);
        assert!(!registry.handles(&TriggerType::Manual));
        assert!(!registry.handles(&TriggerType::from("quiz_passed")));
        assert!(registry.handles(&TriggerType::CommunityJoin));
    }

    #[tokio::test]
    async fn course_threshold_boundary() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        let user = UserId::new();
        let b = badge("Five courses", TriggerType::CourseCompletion, 5, None);

        aggregates.set(user, Aggregate::CompletedEnrollments, 4);
        assert!(!eval(&registry, user, &b, &TriggerContext::new(), &aggregates).await.unwrap());

        aggregates.set(user, Aggregate::CompletedEnrollments, 5);
        assert!(eval(&registry, user, &b, &TriggerContext::new(), &aggregates).await.unwrap());
    }

    #[tokio::test]
    async fn scoped_course_matches_only_the_current_event() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        let user = UserId::new();
        let b = badge("Course X", TriggerType::CourseCompletion, 1, Some("courseX"));

        // A large history does not help when the event names another course.
        aggregates.set(user, Aggregate::CompletedEnrollments, 50);
        let other = ctx(json!({"courseId": "courseY"}));
        assert!(!eval(&registry, user, &b, &other, &aggregates).await.unwrap());

        // No history is needed when the event is the scoped course.
        aggregates.set(user, Aggregate::CompletedEnrollments, 0);
        let this = ctx(json!({"courseId": "courseX"}));
        assert!(eval(&registry, user, &b, &this, &aggregates).await.unwrap());

        // Scoped rules never read aggregates.
        assert_eq!(aggregates.reads(), 0);
    }

    #[tokio::test]
    async fn scoped_rule_with_missing_context_is_not_eligible() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        let user = UserId::new();
        let b = badge("Course X", TriggerType::CourseCompletion, 1, Some("courseX"));

        let missing = TriggerContext::new();
        assert!(!eval(&registry, user, &b, &missing, &aggregates).await.unwrap());

        let wrong_shape = ctx(json!({"courseId": ["courseX"]}));
        assert!(!eval(&registry, user, &b, &wrong_shape, &aggregates).await.unwrap());
    }

    #[tokio::test]
    async fn numeric_context_ids_compare_as_text() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        let b = badge("Space 42", TriggerType::CommunityJoin, 1, Some("42"));

        let joined = ctx(json!({"spaceId": 42}));
        assert!(eval(&registry, UserId::new(), &b, &joined, &aggregates).await.unwrap());
    }

    #[tokio::test]
    async fn community_join_falls_back_to_membership_count() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        let user = UserId::new();
        let b = badge("Joiner", TriggerType::CommunityJoin, 3, None);
        let joined = ctx(json!({"spaceId": "s-1"}));

        aggregates.set(user, Aggregate::SpaceMemberships, 2);
        assert!(!eval(&registry, user, &b, &joined, &aggregates).await.unwrap());
        aggregates.set(user, Aggregate::SpaceMemberships, 3);
        assert!(eval(&registry, user, &b, &joined, &aggregates).await.unwrap());
    }

    #[tokio::test]
    async fn lesson_and_post_rules_ignore_specific_entity() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        let user = UserId::new();

        let lesson = badge("Lessons", TriggerType::LessonCompletion, 10, Some("lesson-1"));
        let post = badge("Posts", TriggerType::CommunityPost, 2, Some("thread-9"));
        let unrelated = ctx(json!({"lessonId": "lesson-7"}));

        aggregates.set(user, Aggregate::CompletedLessons, 10);
        aggregates.set(user, Aggregate::AuthoredPosts, 1);

        assert!(eval(&registry, user, &lesson, &unrelated, &aggregates).await.unwrap());
        assert!(!eval(&registry, user, &post, &unrelated, &aggregates).await.unwrap());

        aggregates.set(user, Aggregate::AuthoredPosts, 2);
        assert!(eval(&registry, user, &post, &unrelated, &aggregates).await.unwrap());
    }

    #[tokio::test]
    async fn aggregate_failure_propagates() {
        let registry = EvaluatorRegistry::default();
        let aggregates = MemoryAggregates::default();
        aggregates.fail_reads();
        let b = badge("Posts", TriggerType::CommunityPost, 1, None);

        let result = eval(&registry, UserId::new(), &b, &TriggerContext::new(), &aggregates).await;
        assert!(matches!(result, Err(EngineError::Storage(_))));
    }
}
