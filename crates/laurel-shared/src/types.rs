use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::SharedError;

// UUID-backed identifiers. Each is a distinct type so a badge id can never be
// passed where a user id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SharedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| SharedError::InvalidId(s.to_string()))
            }
        }
    };
}

uuid_id!(
    /// Identity of a user, owned by the account subsystem.
    UserId
);
uuid_id!(BadgeId);
uuid_id!(CategoryId);
uuid_id!(AwardId);

// ---------------------------------------------------------------------------
// Rarity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Self::Common),
            "uncommon" => Ok(Self::Uncommon),
            "rare" => Ok(Self::Rare),
            "epic" => Ok(Self::Epic),
            "legendary" => Ok(Self::Legendary),
            other => Err(SharedError::UnknownRarity(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger type
// ---------------------------------------------------------------------------

/// Category of user activity that can make a badge eligible.
///
/// The set is open: identifiers this build does not know are kept verbatim in
/// [`TriggerType::Other`] so they survive a round trip through storage and can
/// be picked up by an evaluator registered later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerType {
    Manual,
    CourseCompletion,
    LessonCompletion,
    CommunityPost,
    CommunityJoin,
    Other(String),
}

impl TriggerType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::CourseCompletion => "course_completion",
            Self::LessonCompletion => "lesson_completion",
            Self::CommunityPost => "community_post",
            Self::CommunityJoin => "community_join",
            Self::Other(name) => name,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl From<&str> for TriggerType {
    fn from(s: &str) -> Self {
        match s {
            "manual" => Self::Manual,
            "course_completion" => Self::CourseCompletion,
            "lesson_completion" => Self::LessonCompletion,
            "community_post" => Self::CommunityPost,
            "community_join" => Self::CommunityJoin,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TriggerType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<TriggerType> for String {
    fn from(t: TriggerType) -> Self {
        match t {
            TriggerType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trigger context
// ---------------------------------------------------------------------------

/// Opaque event payload supplied by the triggering subsystem.
///
/// Fields are interpreted per trigger type (e.g. `courseId`, `spaceId`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerContext(pub Map<String, Value>);

impl TriggerContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read `key` as an entity reference.
    ///
    /// Strings are returned as-is and numbers by their decimal text, so a
    /// caller sending `"courseId": 42` matches a badge scoped to `"42"`.
    /// Anything else (missing, null, bool, array, object) yields `None`.
    pub fn entity_ref(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
