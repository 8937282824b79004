//! IR Generation Engine
//!
//! Builds functions of the typed IR from closures instead of manual block
//! and instruction plumbing. Literals are converted to typed values under a
//! hint, conditionals and loops are synthesized as blocks and branches, and
//! every function funnels its returns through one shared return block.
//!
//! ## Architecture
//!
//! - `operand` - Host-side operands (literals, lists, IR values)
//! - `convert` - Hint-driven conversion of operands to typed values
//! - `types` - Common C-like type aliases
//! - `signature` - Function signatures
//! - `generator` - The per-block cursor and every emitting operation
//! - `library` - Symbol tables for functions, macros and globals
//! - `program` - A library with a `main` that can be executed
//! - `session` - Namespaces, libraries and programs of one build
//! - `struct_layout` - Named struct layouts with keyed field lookup

pub mod convert;
pub mod function;
pub mod generator;
pub mod library;
pub mod operand;
pub mod program;
pub mod session;
pub mod signature;
pub mod struct_layout;
pub mod types;

pub use convert::{convert, typename, Hint};
pub use function::ScriptFunction;
pub use generator::{Arm, BlockHandle, Callable, Cond, GepIndex, Generator, Loop, Opr};
pub use library::{Library, Macro, Symbol};
pub use operand::Operand;
pub use program::Program;
pub use session::{NodeId, Session};
pub use signature::Signature;
pub use struct_layout::{Field, FieldType, StructDef};

pub use rls_common::{Lookup, Result, ScriptError, Signedness, Visibility};
