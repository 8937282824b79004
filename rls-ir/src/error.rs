//! IR construction, verification and linking errors

use rls_common::{BlockId, ScriptError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrError {
    #[error("Block {block} not found in function '{function}'")]
    UnknownBlock { function: String, block: BlockId },

    #[error("Function '{name}' not found")]
    UnknownFunction { name: String },

    #[error("{operation}: expected {expected}, found {found}")]
    TypeMismatch {
        operation: String,
        expected: String,
        found: String,
    },

    #[error("{operation}: {message}")]
    InvalidOperand { operation: String, message: String },

    #[error("Block {block} of function '{function}' is already terminated")]
    BlockTerminated { function: String, block: BlockId },

    #[error("Symbol '{symbol}' is defined more than once")]
    LinkConflict { symbol: String },

    #[error("Verification failed in '{function}' at {block}: {message}")]
    Verification {
        function: String,
        block: BlockId,
        message: String,
    },
}

impl IrError {
    pub fn unknown_block(function: &str, block: BlockId) -> Self {
        IrError::UnknownBlock {
            function: function.to_string(),
            block,
        }
    }

    pub fn type_mismatch(operation: &str, expected: impl ToString, found: impl ToString) -> Self {
        IrError::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn invalid(operation: &str, message: impl Into<String>) -> Self {
        IrError::InvalidOperand {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

impl From<IrError> for ScriptError {
    fn from(err: IrError) -> Self {
        match err {
            IrError::LinkConflict { symbol } => ScriptError::LinkFailure {
                library: String::new(),
                message: format!("symbol '{symbol}' is defined more than once"),
            },
            other => ScriptError::Backend {
                message: other.to_string(),
            },
        }
    }
}
