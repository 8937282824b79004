//! IR Instructions
//!
//! Defines all instruction types available in the IR.

use rls_common::{BlockId, TempId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ops::{BinaryOp, CastOp, FloatPredicate, IntPredicate};
use crate::types::IrType;
use crate::values::Value;

/// IR Instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Binary operation: result = op lhs, rhs
    Binary {
        result: TempId,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        result_type: IrType,
    },

    /// Integer comparison, result is i1
    ICmp {
        result: TempId,
        predicate: IntPredicate,
        lhs: Value,
        rhs: Value,
    },

    /// Float comparison, result is i1
    FCmp {
        result: TempId,
        predicate: FloatPredicate,
        lhs: Value,
        rhs: Value,
    },

    /// Type cast: result = op value to target_type
    Cast {
        result: TempId,
        op: CastOp,
        value: Value,
        target_type: IrType,
    },

    /// Allocate stack memory: result = alloca type, count
    Alloca {
        result: TempId,
        alloc_type: IrType,
        count: Option<Value>,
    },

    /// Allocate heap memory: result = malloc type, count
    Malloc {
        result: TempId,
        alloc_type: IrType,
        count: Option<Value>,
    },

    /// Release heap memory
    Free { ptr: Value },

    /// Load from memory: result = load ptr
    Load {
        result: TempId,
        ptr: Value,
        result_type: IrType,
    },

    /// Store to memory: store value, ptr
    Store { value: Value, ptr: Value },

    /// Get element pointer: result = getelementptr ptr, indices...
    GetElementPtr {
        result: TempId,
        ptr: Value,
        indices: Vec<Value>,
        result_type: IrType,
    },

    /// Read a member of a struct or array value
    ExtractValue {
        result: TempId,
        aggregate: Value,
        indices: Vec<u32>,
        result_type: IrType,
    },

    /// Replace a member of a struct or array value
    InsertValue {
        result: TempId,
        aggregate: Value,
        element: Value,
        indices: Vec<u32>,
    },

    ExtractElement {
        result: TempId,
        vector: Value,
        index: Value,
        result_type: IrType,
    },

    InsertElement {
        result: TempId,
        vector: Value,
        element: Value,
        index: Value,
    },

    /// Build a vector from lanes of two vectors; mask indexes their concatenation
    ShuffleVector {
        result: TempId,
        lhs: Value,
        rhs: Value,
        mask: Vec<u32>,
        result_type: IrType,
    },

    /// Element distance between two pointers, result is i64
    PtrDiff {
        result: TempId,
        lhs: Value,
        rhs: Value,
    },

    /// Select (ternary): result = select condition, true_value, false_value
    Select {
        result: TempId,
        condition: Value,
        true_value: Value,
        false_value: Value,
    },

    /// Function call, direct or through a pointer: result = call callee(args...)
    Call {
        result: Option<TempId>,
        callee: Value,
        args: Vec<Value>,
        result_type: IrType,
    },

    /// Return: ret value or ret void
    Return(Option<Value>),

    /// Unconditional branch: br label
    Branch(BlockId),

    /// Conditional branch: br condition, true_block, false_block
    BranchCond {
        condition: Value,
        true_block: BlockId,
        false_block: BlockId,
    },

    Unreachable,

    /// Comment (for debugging)
    Comment(String),
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_)
                | Instruction::Branch(_)
                | Instruction::BranchCond { .. }
                | Instruction::Unreachable
        )
    }

    /// Temporary defined by this instruction
    pub fn result(&self) -> Option<TempId> {
        match self {
            Instruction::Binary { result, .. }
            | Instruction::ICmp { result, .. }
            | Instruction::FCmp { result, .. }
            | Instruction::Cast { result, .. }
            | Instruction::Alloca { result, .. }
            | Instruction::Malloc { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::GetElementPtr { result, .. }
            | Instruction::ExtractValue { result, .. }
            | Instruction::InsertValue { result, .. }
            | Instruction::ExtractElement { result, .. }
            | Instruction::InsertElement { result, .. }
            | Instruction::ShuffleVector { result, .. }
            | Instruction::PtrDiff { result, .. }
            | Instruction::Select { result, .. } => Some(*result),
            Instruction::Call { result, .. } => *result,
            _ => None,
        }
    }

    /// Blocks this terminator may transfer control to
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Instruction::Branch(target) => vec![*target],
            Instruction::BranchCond {
                true_block,
                false_block,
                ..
            } => vec![*true_block, *false_block],
            _ => Vec::new(),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Value]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {arg}", arg.ty())?;
    }
    Ok(())
}

fn write_indices(f: &mut fmt::Formatter<'_>, indices: &[u32]) -> fmt::Result {
    for index in indices {
        write!(f, ", {index}")?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Binary {
                result,
                op,
                lhs,
                rhs,
                result_type,
            } => write!(f, "%{result} = {op} {result_type} {lhs}, {rhs}"),
            Instruction::ICmp {
                result,
                predicate,
                lhs,
                rhs,
            } => write!(f, "%{result} = icmp {predicate} {} {lhs}, {rhs}", lhs.ty()),
            Instruction::FCmp {
                result,
                predicate,
                lhs,
                rhs,
            } => write!(f, "%{result} = fcmp {predicate} {} {lhs}, {rhs}", lhs.ty()),
            Instruction::Cast {
                result,
                op,
                value,
                target_type,
            } => write!(f, "%{result} = {op} {} {value} to {target_type}", value.ty()),
            Instruction::Alloca {
                result,
                alloc_type,
                count,
            } => {
                write!(f, "%{result} = alloca {alloc_type}")?;
                if let Some(count) = count {
                    write!(f, ", {} {count}", count.ty())?;
                }
                Ok(())
            }
            Instruction::Malloc {
                result,
                alloc_type,
                count,
            } => {
                write!(f, "%{result} = malloc {alloc_type}")?;
                if let Some(count) = count {
                    write!(f, ", {} {count}", count.ty())?;
                }
                Ok(())
            }
            Instruction::Free { ptr } => write!(f, "free {} {ptr}", ptr.ty()),
            Instruction::Load {
                result,
                ptr,
                result_type,
            } => write!(f, "%{result} = load {result_type}* {ptr}"),
            Instruction::Store { value, ptr } => {
                write!(f, "store {} {value}, {} {ptr}", value.ty(), ptr.ty())
            }
            Instruction::GetElementPtr {
                result, ptr, indices, ..
            } => {
                write!(f, "%{result} = getelementptr {} {ptr}", ptr.ty())?;
                for index in indices {
                    write!(f, ", {} {index}", index.ty())?;
                }
                Ok(())
            }
            Instruction::ExtractValue {
                result,
                aggregate,
                indices,
                ..
            } => {
                write!(f, "%{result} = extractvalue {} {aggregate}", aggregate.ty())?;
                write_indices(f, indices)
            }
            Instruction::InsertValue {
                result,
                aggregate,
                element,
                indices,
            } => {
                write!(
                    f,
                    "%{result} = insertvalue {} {aggregate}, {} {element}",
                    aggregate.ty(),
                    element.ty()
                )?;
                write_indices(f, indices)
            }
            Instruction::ExtractElement {
                result,
                vector,
                index,
                ..
            } => write!(
                f,
                "%{result} = extractelement {} {vector}, {} {index}",
                vector.ty(),
                index.ty()
            ),
            Instruction::InsertElement {
                result,
                vector,
                element,
                index,
            } => write!(
                f,
                "%{result} = insertelement {} {vector}, {} {element}, {} {index}",
                vector.ty(),
                element.ty(),
                index.ty()
            ),
            Instruction::ShuffleVector {
                result,
                lhs,
                rhs,
                mask,
                ..
            } => {
                write!(
                    f,
                    "%{result} = shufflevector {} {lhs}, {} {rhs}, <",
                    lhs.ty(),
                    rhs.ty()
                )?;
                for (i, lane) in mask.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "i32 {lane}")?;
                }
                write!(f, ">")
            }
            Instruction::PtrDiff { result, lhs, rhs } => {
                write!(f, "%{result} = ptrdiff {} {lhs}, {rhs}", lhs.ty())
            }
            Instruction::Select {
                result,
                condition,
                true_value,
                false_value,
            } => write!(
                f,
                "%{result} = select i1 {condition}, {} {true_value}, {} {false_value}",
                true_value.ty(),
                false_value.ty()
            ),
            Instruction::Call {
                result,
                callee,
                args,
                result_type,
            } => {
                if let Some(result) = result {
                    write!(f, "%{result} = ")?;
                }
                write!(f, "call {result_type} {callee}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Instruction::Return(Some(value)) => write!(f, "ret {} {value}", value.ty()),
            Instruction::Return(None) => write!(f, "ret void"),
            Instruction::Branch(label) => write!(f, "br label %{label}"),
            Instruction::BranchCond {
                condition,
                true_block,
                false_block,
            } => write!(
                f,
                "br i1 {condition}, label %{true_block}, label %{false_block}"
            ),
            Instruction::Unreachable => write!(f, "unreachable"),
            Instruction::Comment(text) => write!(f, "; {text}"),
        }
    }
}
