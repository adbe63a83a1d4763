//! # laurel-shared
//!
//! Domain vocabulary shared by every Laurel crate: identifiers, the badge
//! rule descriptor, award records, trigger types and the opaque trigger
//! context handed over by the subsystems that fire triggers.

pub mod constants;
pub mod error;
pub mod models;
pub mod slug;
pub mod types;

pub use error::SharedError;
pub use models::*;
pub use types::*;
