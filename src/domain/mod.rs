//! Domain layer: pure types and business rules, no I/O.

pub mod error;
pub mod models;

pub use error::{EventError, FatalError, PersistenceError, RlError, ValidationError};
