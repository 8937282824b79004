//! Host-side operands
//!
//! Everything a generator operation accepts before conversion: typed IR
//! values, literals, lists of operands and references to script functions.

use rls_ir::{Constant, Value};

use crate::convert::typename;
use crate::function::ScriptFunction;

/// A value handed to the generator
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Already typed IR value
    Value(Value),
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Operand>),
    /// Absent value; converts to zero, a null pointer, or means "no value"
    Null,
    /// Reference to a function built by a library
    Function(ScriptFunction),
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Null)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Unwrap a typed value, failing for literals
    pub fn into_value(self) -> Option<Value> {
        match self {
            Operand::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Integer reading of a literal. Strings read their leading integer and
    /// fall back to zero; booleans, lists and functions have none.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Operand::Int(n) => Some(*n),
            Operand::Float(f) => Some(f.trunc() as i64),
            Operand::Str(s) => Some(leading_int(s)),
            Operand::Null => Some(0),
            _ => None,
        }
    }

    /// Floating reading of a literal, with the same fallbacks as `to_i64`
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Operand::Int(n) => Some(*n as f64),
            Operand::Float(f) => Some(*f),
            Operand::Str(s) => Some(leading_float(s)),
            Operand::Null => Some(0.0),
            _ => None,
        }
    }

    /// Name of the operand's inferred type, as used in mismatch errors
    pub fn type_name(&self) -> String {
        match self {
            Operand::Value(value) => typename(value.ty()),
            Operand::Bool(_) => "Boolean".to_string(),
            Operand::Int(_) => "Integer".to_string(),
            Operand::Float(_) => "Float".to_string(),
            Operand::Str(_) => "String".to_string(),
            Operand::List(_) => "Array".to_string(),
            Operand::Null => "Nil".to_string(),
            Operand::Function(_) => "Function".to_string(),
        }
    }
}

/// End of the run of ASCII digits starting at `from`
fn digits_end(bytes: &[u8], from: usize) -> usize {
    let mut end = from;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    end
}

fn sign_end(bytes: &[u8], from: usize) -> usize {
    match bytes.get(from) {
        Some(b'+') | Some(b'-') => from + 1,
        _ => from,
    }
}

fn leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let start = sign_end(bytes, 0);
    let end = digits_end(bytes, start);
    if end == start {
        return 0;
    }
    text[..end].parse().unwrap_or(0)
}

fn leading_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let start = sign_end(bytes, 0);
    let mut end = digits_end(bytes, start);
    if end == start {
        return 0.0;
    }
    if bytes.get(end) == Some(&b'.') {
        let fraction = digits_end(bytes, end + 1);
        if fraction > end + 1 {
            end = fraction;
        }
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let exp_start = sign_end(bytes, end + 1);
        let exp_end = digits_end(bytes, exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    text[..end].parse().unwrap_or(0.0)
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        Operand::Value(value.clone())
    }
}

impl From<Constant> for Operand {
    fn from(constant: Constant) -> Self {
        Operand::Value(constant.into())
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Bool(value)
    }
}

macro_rules! int_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Int(value as i64)
                }
            }
        )*
    };
}

int_operand!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f32> for Operand {
    fn from(value: f32) -> Self {
        Operand::Float(value as f64)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Float(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Str(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Str(value)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(value: Option<T>) -> Self {
        value.map_or(Operand::Null, Into::into)
    }
}

impl From<()> for Operand {
    fn from(_: ()) -> Self {
        Operand::Null
    }
}

impl From<ScriptFunction> for Operand {
    fn from(function: ScriptFunction) -> Self {
        Operand::Function(function)
    }
}

impl From<&ScriptFunction> for Operand {
    fn from(function: &ScriptFunction) -> Self {
        Operand::Function(function.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rls_ir::IrType;

    #[test]
    fn test_string_integer_reading() {
        assert_eq!(Operand::from("42abc").to_i64(), Some(42));
        assert_eq!(Operand::from("  -7").to_i64(), Some(-7));
        assert_eq!(Operand::from("non").to_i64(), Some(0));
        assert_eq!(Operand::from(3.9).to_i64(), Some(3));
        assert_eq!(Operand::Null.to_i64(), Some(0));
        assert_eq!(Operand::from(true).to_i64(), None);
    }

    #[test]
    fn test_string_float_reading() {
        assert_eq!(Operand::from("2.5x").to_f64(), Some(2.5));
        assert_eq!(Operand::from("1e3").to_f64(), Some(1000.0));
        assert_eq!(Operand::from("3.").to_f64(), Some(3.0));
        assert_eq!(Operand::from("abc").to_f64(), Some(0.0));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Operand::from(vec![1, 2]).type_name(), "Array");
        assert_eq!(Operand::from(()).type_name(), "Nil");
        assert_eq!(Operand::from(Value::int(IrType::I16, 1)).type_name(), "Int16");
    }
}
