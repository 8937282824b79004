//! Error handling for the IR scripting toolkit
//!
//! `ScriptError` is the single error type surfaced to authors of function
//! bodies. Lower layers (IR builder, verifier, linker, interpreter) define
//! their own enums and convert into it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while generating, linking or running IR
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Value passed to generator should be a {expected}. {value} given.")]
    TypeMismatch { value: String, expected: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Wrong number of arguments for {name} ({given} for {expected})")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("Undefined function, macro or global '{name}'")]
    UnresolvedCallable { name: String },

    #[error("Argument error: {message}")]
    ArgumentError { message: String },

    #[error("Failed to link library, {library}: {message}")]
    LinkFailure { library: String, message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Execution error: {message}")]
    Execution { message: String },
}

impl ScriptError {
    /// Create a type mismatch error from an inferred type-name and the expected name
    pub fn type_mismatch(value: impl Into<String>, expected: impl Into<String>) -> Self {
        ScriptError::TypeMismatch {
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create an argument error
    pub fn argument(message: impl Into<String>) -> Self {
        ScriptError::ArgumentError {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        ScriptError::Backend {
            message: message.into(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        ScriptError::UnresolvedCallable { name: name.into() }
    }
}

/// A non-fatal message produced while building a library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    /// Library-qualified symbol the diagnostic is about, when known
    pub symbol: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: String) -> Self {
        Self {
            message,
            symbol: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)?;
        if let Some(symbol) = &self.symbol {
            write!(f, " [{symbol}]")?;
        }
        Ok(())
    }
}

/// Collects the warnings of one library
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn warning(&mut self, message: String) {
        self.report(Diagnostic::warning(message));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr
    pub fn print_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_mismatch_message() {
        let err = ScriptError::type_mismatch("String", "Int32");
        assert_eq!(
            err.to_string(),
            "Value passed to generator should be a Int32. String given."
        );
    }

    #[test]
    fn test_arity_message() {
        let err = ScriptError::ArgumentCountMismatch {
            name: "twice".to_string(),
            expected: 0,
            given: 1,
        };
        assert_eq!(err.to_string(), "Wrong number of arguments for twice (1 for 0)");
    }

    #[test]
    fn test_reporter_collects_warnings() {
        let mut reporter = ErrorReporter::new();
        reporter.warning("missing return".to_string());
        let kept = Diagnostic::warning("kept rls.lib.f".to_string()).with_symbol("rls.lib.f");
        reporter.report(kept);

        assert_eq!(reporter.diagnostics().len(), 2);
        assert_eq!(reporter.diagnostics()[0].to_string(), "warning: missing return");
        assert_eq!(
            reporter.diagnostics()[1].to_string(),
            "warning: kept rls.lib.f [rls.lib.f]"
        );
    }
}
