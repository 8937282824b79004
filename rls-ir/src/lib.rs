//! Typed, SSA-like Intermediate Representation
//!
//! The backend the generation engine drives: typed values, basic blocks
//! ended by terminators, functions and modules. Also provides a structural
//! verifier, a module linker and a reference interpreter.
//!
//! ## Architecture
//!
//! - `types` - Type system (IrType, Kind)
//! - `values` - Values and constants
//! - `ops` - Binary operators, predicates and casts
//! - `instructions` - IR instructions
//! - `blocks` - Basic block management
//! - `function` - Function definitions
//! - `module` - Module, globals and linking
//! - `builder` - Type-checked instruction construction
//! - `verify` - Structural verification
//! - `interp` - Reference interpreter

pub use self::blocks::BasicBlock;
pub use self::builder::IrBuilder;
pub use self::error::IrError;
pub use self::function::Function;
pub use self::instructions::Instruction;
pub use self::interp::{ExecConfig, ExecError, HostFn, Interpreter, Pointer, RuntimeValue};
pub use self::module::{GlobalVariable, Linkage, Module};
pub use self::ops::{BinaryOp, CastOp, FloatPredicate, IntPredicate};
pub use self::types::{IrType, Kind};
pub use self::values::{normalize_int, unsigned_bits, Constant, Value};
pub use self::verify::{verify_function, verify_module};

mod blocks;
mod builder;
mod error;
mod function;
mod instructions;
pub mod interp;
mod module;
mod ops;
mod types;
mod values;
mod verify;

#[cfg(test)]
mod tests;
