//! IR Type System
//!
//! Defines the type system for the IR: integers of fixed width, single and
//! double precision floats, pointers, arrays, vectors, structs and functions.
//! `Kind` is the coarse category used for hint matching.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::values::Constant;

/// IR Type system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrType {
    /// Void type
    Void,

    /// Integer types with bit width
    I1,
    I8,
    I16,
    I32,
    I64,

    /// Single precision float
    F32,
    /// Double precision float
    F64,

    /// Pointer type
    Pointer(Box<IrType>),

    /// Array type [size x element_type]
    Array { size: u64, element_type: Box<IrType> },

    /// Vector type <size x element_type>
    Vector { size: u64, element_type: Box<IrType> },

    /// Struct type
    Struct {
        name: Option<String>,
        fields: Vec<IrType>,
        packed: bool,
    },

    /// Function type
    Function {
        return_type: Box<IrType>,
        param_types: Vec<IrType>,
        is_vararg: bool,
    },

    /// Label type (for basic block addresses)
    Label,
}

/// Coarse type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Void,
    Integer,
    Decimal,
    /// Either `Integer` or `Decimal`; only ever used as a hint
    Numeric,
    Pointer,
    Array,
    Vector,
    Struct,
    Function,
    Label,
}

impl Kind {
    /// Whether a value of kind `actual` satisfies this kind used as a hint
    pub fn accepts(self, actual: Kind) -> bool {
        match self {
            Kind::Numeric => matches!(actual, Kind::Integer | Kind::Decimal),
            kind => kind == actual,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Void => "void",
            Kind::Integer => "integer",
            Kind::Decimal => "decimal",
            Kind::Numeric => "numeric",
            Kind::Pointer => "pointer",
            Kind::Array => "array",
            Kind::Vector => "vector",
            Kind::Struct => "struct",
            Kind::Function => "function",
            Kind::Label => "label",
        };
        write!(f, "{name}")
    }
}

impl IrType {
    pub fn pointer_to(pointee: IrType) -> IrType {
        IrType::Pointer(Box::new(pointee))
    }

    pub fn array_of(element_type: IrType, size: u64) -> IrType {
        IrType::Array {
            size,
            element_type: Box::new(element_type),
        }
    }

    pub fn vector_of(element_type: IrType, size: u64) -> IrType {
        IrType::Vector {
            size,
            element_type: Box::new(element_type),
        }
    }

    pub fn function(return_type: IrType, param_types: Vec<IrType>, is_vararg: bool) -> IrType {
        IrType::Function {
            return_type: Box::new(return_type),
            param_types,
            is_vararg,
        }
    }

    /// Integer type of the given width, if one exists
    pub fn int(width: u32) -> Option<IrType> {
        match width {
            1 => Some(IrType::I1),
            8 => Some(IrType::I8),
            16 => Some(IrType::I16),
            32 => Some(IrType::I32),
            64 => Some(IrType::I64),
            _ => None,
        }
    }

    /// Pointer to this type
    pub fn pointer(&self) -> IrType {
        IrType::pointer_to(self.clone())
    }

    pub fn kind(&self) -> Kind {
        match self {
            IrType::Void => Kind::Void,
            IrType::I1 | IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64 => Kind::Integer,
            IrType::F32 | IrType::F64 => Kind::Decimal,
            IrType::Pointer(_) => Kind::Pointer,
            IrType::Array { .. } => Kind::Array,
            IrType::Vector { .. } => Kind::Vector,
            IrType::Struct { .. } => Kind::Struct,
            IrType::Function { .. } => Kind::Function,
            IrType::Label => Kind::Label,
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        self.kind() == Kind::Integer
    }

    /// Check if this is a float type of any precision
    pub fn is_decimal(&self) -> bool {
        self.kind() == Kind::Decimal
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_decimal()
    }

    /// Check if this is a pointer type
    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Pointer(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    /// Bit width of integer and float types
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            IrType::I1 => Some(1),
            IrType::I8 => Some(8),
            IrType::I16 => Some(16),
            IrType::I32 | IrType::F32 => Some(32),
            IrType::I64 | IrType::F64 => Some(64),
            _ => None,
        }
    }

    /// Get the element type for pointers, arrays and vectors
    pub fn element_type(&self) -> Option<&IrType> {
        match self {
            IrType::Pointer(elem) => Some(elem),
            IrType::Array { element_type, .. } | IrType::Vector { element_type, .. } => {
                Some(element_type)
            }
            _ => None,
        }
    }

    /// Pointee of a pointer type
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Pointer(elem) => Some(elem),
            _ => None,
        }
    }

    /// Type reached by indexing into an aggregate with a constant index
    pub fn field_type(&self, index: u64) -> Option<&IrType> {
        match self {
            IrType::Struct { fields, .. } => fields.get(usize::try_from(index).ok()?),
            IrType::Array { element_type, .. } | IrType::Vector { element_type, .. } => {
                Some(element_type)
            }
            _ => None,
        }
    }

    /// Number of elements of an array, vector or struct
    pub fn len(&self) -> Option<u64> {
        match self {
            IrType::Array { size, .. } | IrType::Vector { size, .. } => Some(*size),
            IrType::Struct { fields, .. } => Some(fields.len() as u64),
            _ => None,
        }
    }

    /// Function type behind a function or function-pointer type
    pub fn callable_signature(&self) -> Option<(&IrType, &[IrType], bool)> {
        match self {
            IrType::Function {
                return_type,
                param_types,
                is_vararg,
            } => Some((return_type, param_types, *is_vararg)),
            IrType::Pointer(inner) => match inner.as_ref() {
                IrType::Function { .. } => inner.callable_signature(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Zero value of this type (null for pointers)
    pub fn null(&self) -> Constant {
        Constant::zero(self)
    }

    /// Null pointer constant of a pointer to this type
    pub fn null_pointer(&self) -> Constant {
        Constant::Null(self.pointer())
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I1 => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::F32 => write!(f, "float"),
            IrType::F64 => write!(f, "double"),
            IrType::Pointer(target) => write!(f, "{target}*"),
            IrType::Array { size, element_type } => write!(f, "[{size} x {element_type}]"),
            IrType::Vector { size, element_type } => write!(f, "<{size} x {element_type}>"),
            IrType::Function {
                return_type,
                param_types,
                is_vararg,
            } => {
                write!(f, "{return_type} (")?;
                for (i, param) in param_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                if *is_vararg {
                    if !param_types.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            IrType::Struct { name: Some(name), .. } => write!(f, "%{name}"),
            IrType::Struct {
                name: None,
                fields,
                packed,
            } => {
                if *packed {
                    write!(f, "<")?;
                }
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")?;
                if *packed {
                    write!(f, ">")?;
                }
                Ok(())
            }
            IrType::Label => write!(f, "label"),
        }
    }
}
