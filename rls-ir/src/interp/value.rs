//! Runtime values of the reference interpreter

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::IrType;
use crate::values::normalize_int;

/// Address inside interpreter memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pointer {
    Null,
    /// `path[0]` selects an element of the allocation, later entries index into aggregates
    Memory { alloc: usize, path: Vec<i64> },
}

impl Pointer {
    pub fn is_null(&self) -> bool {
        matches!(self, Pointer::Null)
    }

    /// Same pointer with the last path component moved by `offset`
    pub fn offset(&self, offset: i64) -> Pointer {
        match self {
            Pointer::Null => Pointer::Null,
            Pointer::Memory { alloc, path } => {
                let mut path = path.clone();
                if let Some(last) = path.last_mut() {
                    *last += offset;
                }
                Pointer::Memory { alloc: *alloc, path }
            }
        }
    }

    /// Pointer one level deeper into the pointee
    pub fn child(&self, index: i64) -> Pointer {
        match self {
            Pointer::Null => Pointer::Null,
            Pointer::Memory { alloc, path } => {
                let mut path = path.clone();
                path.push(index);
                Pointer::Memory { alloc: *alloc, path }
            }
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Null => write!(f, "null"),
            Pointer::Memory { alloc, path } => {
                write!(f, "&{alloc}")?;
                for index in path {
                    write!(f, "[{index}]")?;
                }
                Ok(())
            }
        }
    }
}

/// Value held in a temporary or memory cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeValue {
    /// Integer, sign-normalised to the width of its type (`i1` holds 0 or 1)
    Int(i64),
    Float(f64),
    Pointer(Pointer),
    Function(String),
    Aggregate(Vec<RuntimeValue>),
    Undef,
    Void,
}

impl RuntimeValue {
    /// Zero-initialised value of `ty`
    pub fn zero(ty: &IrType) -> RuntimeValue {
        match ty {
            t if t.is_integer() => RuntimeValue::Int(0),
            t if t.is_decimal() => RuntimeValue::Float(0.0),
            IrType::Pointer(_) => RuntimeValue::Pointer(Pointer::Null),
            IrType::Array { size, element_type } | IrType::Vector { size, element_type } => {
                let zeros = (0..*size).map(|_| RuntimeValue::zero(element_type));
                RuntimeValue::Aggregate(zeros.collect())
            }
            IrType::Struct { fields, .. } => {
                RuntimeValue::Aggregate(fields.iter().map(RuntimeValue::zero).collect())
            }
            _ => RuntimeValue::Undef,
        }
    }

    /// Integer argument of the given type
    pub fn int(ty: &IrType, value: i64) -> RuntimeValue {
        RuntimeValue::Int(normalize_int(ty.bit_width().unwrap_or(64), value))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RuntimeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            RuntimeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match self {
            RuntimeValue::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&[RuntimeValue]> {
        match self {
            RuntimeValue::Aggregate(elements) => Some(elements),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Int(v) => write!(f, "{v}"),
            RuntimeValue::Float(v) => write!(f, "{v}"),
            RuntimeValue::Pointer(p) => write!(f, "{p}"),
            RuntimeValue::Function(name) => write!(f, "@{name}"),
            RuntimeValue::Aggregate(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            RuntimeValue::Undef => write!(f, "undef"),
            RuntimeValue::Void => write!(f, "void"),
        }
    }
}
