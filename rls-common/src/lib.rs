//! IR Scripting Toolkit - Common Types and Utilities
//!
//! This crate contains shared identifiers, the error taxonomy, and the
//! diagnostic reporter used by the IR crate, the generation engine and
//! the driver.

pub mod error;
pub mod types;

pub use error::{Diagnostic, ErrorReporter, ScriptError};
pub use types::*;

/// Result alias used across the generation engine
pub type Result<T, E = ScriptError> = std::result::Result<T, E>;
