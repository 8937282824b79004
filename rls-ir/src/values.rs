//! IR Value Representations
//!
//! Every value carries its type: a temporary produced by an instruction or
//! parameter, or a constant.

use rls_common::TempId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::IrType;

/// IR Value - represents operands in IR instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Instruction result or function parameter
    Temp { id: TempId, ty: IrType },

    /// Constant of any type
    Constant(Constant),
}

/// Constant values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// Integer, sign-normalised to the width of `ty` (`i1` holds 0 or 1)
    Int { ty: IrType, value: i64 },

    /// Float or double, rounded to the precision of `ty`
    Float { ty: IrType, value: f64 },

    /// Null pointer of pointer type `ty`
    Null(IrType),

    Undef(IrType),

    Array { ty: IrType, elements: Vec<Constant> },

    Vector { ty: IrType, elements: Vec<Constant> },

    Struct { ty: IrType, fields: Vec<Constant> },

    /// Address of a global; `ty` is the pointer type
    GlobalAddr { name: String, ty: IrType },

    /// Address of a function; `ty` is the function pointer type
    FunctionAddr { name: String, ty: IrType },

    /// Constant bit-cast of another constant
    BitCast { value: Box<Constant>, ty: IrType },
}

/// Sign-normalise an integer to `width` bits
pub fn normalize_int(width: u32, value: i64) -> i64 {
    match width {
        0 => 0,
        1 => value & 1,
        w if w >= 64 => value,
        w => {
            let shift = 64 - w;
            (value << shift) >> shift
        }
    }
}

/// Low `width` bits of an integer, zero-extended
pub fn unsigned_bits(width: u32, value: i64) -> u64 {
    if width >= 64 {
        value as u64
    } else {
        (value as u64) & ((1u64 << width) - 1)
    }
}

impl Constant {
    /// Integer constant; `ty` must be an integer type
    pub fn int(ty: IrType, value: i64) -> Constant {
        let width = ty.bit_width().unwrap_or(64);
        Constant::Int {
            value: normalize_int(width, value),
            ty,
        }
    }

    /// Float constant; `F32` values are rounded to single precision
    pub fn float(ty: IrType, value: f64) -> Constant {
        let value = if ty == IrType::F32 {
            value as f32 as f64
        } else {
            value
        };
        Constant::Float { ty, value }
    }

    pub fn bool(value: bool) -> Constant {
        Constant::Int {
            ty: IrType::I1,
            value: value as i64,
        }
    }

    /// Zero value of `ty`
    pub fn zero(ty: &IrType) -> Constant {
        match ty {
            t if t.is_integer() => Constant::int(t.clone(), 0),
            t if t.is_decimal() => Constant::float(t.clone(), 0.0),
            IrType::Pointer(_) => Constant::Null(ty.clone()),
            IrType::Array { size, element_type } => Constant::Array {
                ty: ty.clone(),
                elements: (0..*size).map(|_| Constant::zero(element_type)).collect(),
            },
            IrType::Vector { size, element_type } => Constant::Vector {
                ty: ty.clone(),
                elements: (0..*size).map(|_| Constant::zero(element_type)).collect(),
            },
            IrType::Struct { fields, .. } => Constant::Struct {
                ty: ty.clone(),
                fields: fields.iter().map(Constant::zero).collect(),
            },
            _ => Constant::Undef(ty.clone()),
        }
    }

    pub fn ty(&self) -> &IrType {
        match self {
            Constant::Int { ty, .. }
            | Constant::Float { ty, .. }
            | Constant::Null(ty)
            | Constant::Undef(ty)
            | Constant::Array { ty, .. }
            | Constant::Vector { ty, .. }
            | Constant::Struct { ty, .. }
            | Constant::GlobalAddr { ty, .. }
            | Constant::FunctionAddr { ty, .. }
            | Constant::BitCast { ty, .. } => ty,
        }
    }

    /// Whether this constant equals the zero constant of its type
    pub fn is_zero(&self) -> bool {
        match self {
            Constant::Int { value, .. } => *value == 0,
            Constant::Float { value, .. } => *value == 0.0,
            Constant::Null(_) => true,
            Constant::Array { elements, .. } | Constant::Vector { elements, .. } => {
                elements.iter().all(Constant::is_zero)
            }
            Constant::Struct { fields, .. } => fields.iter().all(Constant::is_zero),
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl Value {
    pub fn temp(id: TempId, ty: IrType) -> Value {
        Value::Temp { id, ty }
    }

    pub fn int(ty: IrType, value: i64) -> Value {
        Value::Constant(Constant::int(ty, value))
    }

    pub fn float(ty: IrType, value: f64) -> Value {
        Value::Constant(Constant::float(ty, value))
    }

    pub fn bool(value: bool) -> Value {
        Value::Constant(Constant::bool(value))
    }

    pub fn ty(&self) -> &IrType {
        match self {
            Value::Temp { ty, .. } => ty,
            Value::Constant(constant) => constant.ty(),
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Value::Constant(constant) => Some(constant),
            Value::Temp { .. } => None,
        }
    }

    /// Whether this value is statically the zero constant of its type
    pub fn is_zero(&self) -> bool {
        self.as_constant().is_some_and(Constant::is_zero)
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        Value::Constant(constant)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int { ty: IrType::I1, value } => {
                write!(f, "{}", if *value != 0 { "true" } else { "false" })
            }
            Constant::Int { value, .. } => write!(f, "{value}"),
            Constant::Float { value, .. } => write!(f, "{value:?}"),
            Constant::Null(_) => write!(f, "null"),
            Constant::Undef(_) => write!(f, "undef"),
            Constant::Array { elements, .. } => {
                write!(f, "[")?;
                write_elements(f, elements)?;
                write!(f, "]")
            }
            Constant::Vector { elements, .. } => {
                write!(f, "<")?;
                write_elements(f, elements)?;
                write!(f, ">")
            }
            Constant::Struct { fields, .. } => {
                write!(f, "{{ ")?;
                write_elements(f, fields)?;
                write!(f, " }}")
            }
            Constant::GlobalAddr { name, .. } | Constant::FunctionAddr { name, .. } => {
                write!(f, "@{name}")
            }
            Constant::BitCast { value, ty } => {
                write!(f, "bitcast ({} {value} to {ty})", value.ty())
            }
        }
    }
}

fn write_elements(f: &mut fmt::Formatter<'_>, elements: &[Constant]) -> fmt::Result {
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {element}", element.ty())?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Temp { id, .. } => write!(f, "%{id}"),
            Value::Constant(constant) => write!(f, "{constant}"),
        }
    }
}
