//! # laurel-engine
//!
//! The badge awarding engine. Given a user activity event it decides which
//! badge definitions the user newly qualifies for and grants each of them
//! exactly once.
//!
//! The engine owns no storage. Catalog, ledger and activity counts are
//! reached through the traits in [`ports`], which the store crate implements
//! over SQLite and the tests implement with in-memory fakes.

pub mod error;
pub mod evaluator;
pub mod orchestrator;
pub mod ports;

#[cfg(test)]
mod fakes;

pub use error::{EngineError, Result};
pub use evaluator::{Evaluator, EvaluatorRegistry};
pub use orchestrator::Orchestrator;
pub use ports::{ActivityAggregates, AwardLedger, BadgeCatalog};
