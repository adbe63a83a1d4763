//! # laurel-store
//!
//! SQLite persistence for Laurel: the badge catalog, the award ledger and
//! the activity tables the learning and community subsystems write to.
//!
//! [`Database`] is a synchronous handle over a `rusqlite::Connection` with
//! typed CRUD helpers. [`StoreBackend`] shares one `Database` across tasks
//! and implements the engine's collaborator traits on top of it.

pub mod activity;
pub mod awards;
pub mod backend;
pub mod badges;
pub mod categories;
pub mod database;
pub mod migrations;

mod error;
mod rows;

pub use backend::StoreBackend;
pub use database::Database;
pub use error::{Result, StoreError};
