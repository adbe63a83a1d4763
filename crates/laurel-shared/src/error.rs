use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Unknown rarity: {0}")]
    UnknownRarity(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
