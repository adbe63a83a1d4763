//! Records of the badge catalog and the award ledger.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to HTTP clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_NAME_LEN, MIN_REQUIREMENT_COUNT};
use crate::error::SharedError;
use crate::types::{AwardId, BadgeId, CategoryId, Rarity, TriggerType, UserId};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Admin-managed grouping of badges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BadgeCategory {
    pub id: CategoryId,
    pub name: String,
    /// Unique, derived from `name` at creation time.
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Fields an administrator supplies when creating or editing a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<(), SharedError> {
        validate_name(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Badge
// ---------------------------------------------------------------------------

/// A badge rule descriptor.
///
/// Read-only from the awarding engine's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    /// Icon reference (asset key or URL), opaque to the engine.
    pub icon: String,
    pub category_id: Option<CategoryId>,
    pub rarity: Rarity,
    pub points: u32,
    pub trigger_type: TriggerType,
    /// Threshold for aggregate rules, at least 1. Ignored for manual badges.
    pub requirement_count: u32,
    /// Scopes the rule to one named target (a course, a space).
    pub specific_entity_id: Option<String>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

fn default_requirement_count() -> u32 {
    MIN_REQUIREMENT_COUNT
}

fn default_trigger_type() -> TriggerType {
    TriggerType::Manual
}

/// Fields an administrator supplies when creating or editing a badge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BadgeDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub points: u32,
    #[serde(default = "default_trigger_type")]
    pub trigger_type: TriggerType,
    #[serde(default = "default_requirement_count")]
    pub requirement_count: u32,
    #[serde(default)]
    pub specific_entity_id: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl BadgeDraft {
    /// Minimal draft for the given trigger; the remaining fields take their
    /// defaults and can be adjusted with struct update syntax.
    pub fn new(name: impl Into<String>, trigger_type: TriggerType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            category_id: None,
            rarity: Rarity::Common,
            points: 0,
            trigger_type,
            requirement_count: MIN_REQUIREMENT_COUNT,
            specific_entity_id: None,
            is_hidden: false,
        }
    }

    pub fn validate(&self) -> Result<(), SharedError> {
        validate_name(&self.name)?;

        if self.requirement_count < MIN_REQUIREMENT_COUNT {
            return Err(SharedError::InvalidField {
                field: "requirement_count",
                reason: format!("must be at least {MIN_REQUIREMENT_COUNT}"),
            });
        }

        if let Some(entity) = &self.specific_entity_id {
            if entity.trim().is_empty() {
                return Err(SharedError::InvalidField {
                    field: "specific_entity_id",
                    reason: "must not be blank when present".into(),
                });
            }
        }

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), SharedError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SharedError::InvalidField {
            field: "name",
            reason: "must not be empty".into(),
        });
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(SharedError::InvalidField {
            field: "name",
            reason: format!("longer than {MAX_NAME_LEN} characters"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Award record
// ---------------------------------------------------------------------------

/// One granted badge. At most one exists per (user, badge) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwardRecord {
    pub id: AwardId,
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub awarded_at: DateTime<Utc>,
    /// Set once the user has acknowledged the award in a UI.
    pub is_seen: bool,
}
