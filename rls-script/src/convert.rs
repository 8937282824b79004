//! Value Conversion
//!
//! Maps an operand and an optional hint onto a typed IR value. The rules are
//! tried in order and the first applicable one wins:
//!
//! 1. typed values pass when they satisfy the hint, and fail otherwise
//! 2. function references become their address
//! 3. zero or null under a pointer hint becomes a null pointer
//! 4. booleans become `i1` (or the hinted integer width)
//! 5. decimal hints and unhinted floats become float constants
//! 6. integer hints and unhinted integers become integer constants
//! 7. strings become interned byte arrays (or pointers to them)
//! 8. lists become array constants
//! 9. lists under a vector hint become vector constants
//!
//! Anything else is a `TypeMismatch` naming both sides.

use rls_common::{Result, ScriptError};
use rls_ir::{Constant, IrType, Kind, Module, Value};

use crate::operand::Operand;
use crate::types;

/// What a conversion should produce: an exact type or a type category
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    Type(IrType),
    Kind(Kind),
}

impl Hint {
    pub fn kind(&self) -> Kind {
        match self {
            Hint::Type(ty) => ty.kind(),
            Hint::Kind(kind) => *kind,
        }
    }

    pub fn ty(&self) -> Option<&IrType> {
        match self {
            Hint::Type(ty) => Some(ty),
            Hint::Kind(_) => None,
        }
    }

    /// Name of the hint as shown in mismatch errors
    pub fn expected_name(&self) -> String {
        match self {
            Hint::Type(ty) => typename(ty),
            Hint::Kind(kind) => capitalize(&kind.to_string()),
        }
    }

    fn is_kind(&self, kind: Kind) -> bool {
        self.kind() == kind
    }
}

impl From<IrType> for Hint {
    fn from(ty: IrType) -> Self {
        Hint::Type(ty)
    }
}

impl From<&IrType> for Hint {
    fn from(ty: &IrType) -> Self {
        Hint::Type(ty.clone())
    }
}

impl From<Kind> for Hint {
    fn from(kind: Kind) -> Self {
        Hint::Kind(kind)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Human readable name of a type: `Int32`, `Float`, `Double`,
/// `Integer pointer`, `Array`, ...
pub fn typename(ty: &IrType) -> String {
    match ty {
        IrType::Pointer(_) => {
            let mut inner = ty;
            while let Some(pointee) = inner.pointee() {
                inner = pointee;
            }
            format!("{} pointer", capitalize(&inner.kind().to_string()))
        }
        IrType::F32 => "Float".to_string(),
        IrType::F64 => "Double".to_string(),
        ty if ty.is_integer() => format!("Int{}", ty.bit_width().unwrap_or(0)),
        ty => capitalize(&ty.kind().to_string()),
    }
}

fn expected(hint: Option<&Hint>) -> String {
    match hint {
        Some(hint) => hint.expected_name(),
        None => "IR value, number, list, string or boolean".to_string(),
    }
}

fn mismatch(operand: &Operand, hint: Option<&Hint>) -> ScriptError {
    ScriptError::type_mismatch(operand.type_name(), expected(hint))
}

/// Convert `operand` to a typed value satisfying `hint`.
///
/// Strings are interned into `module`; everything else becomes a constant.
pub fn convert(module: &mut Module, operand: Operand, hint: Option<&Hint>) -> Result<Value> {
    let hint_kind = hint.map(Hint::kind);

    // 1 and 2
    match operand {
        Operand::Value(value) => {
            let accepted = match hint {
                None => true,
                Some(Hint::Type(ty)) => ty == value.ty(),
                Some(Hint::Kind(kind)) => kind.accepts(value.ty().kind()),
            };
            return if accepted {
                Ok(value)
            } else {
                Err(mismatch(&Operand::Value(value), hint))
            };
        }
        Operand::Function(function) => return Ok(function.address()),
        _ => {}
    }

    // 3
    if hint_kind == Some(Kind::Pointer) && matches!(operand, Operand::Null | Operand::Int(0)) {
        let ty = hint.and_then(Hint::ty).cloned().unwrap_or_else(types::void_ptr);
        return Ok(Constant::Null(ty).into());
    }

    // 4
    if let Operand::Bool(flag) = operand {
        if matches!(hint_kind, None | Some(Kind::Numeric) | Some(Kind::Integer)) {
            let ty = hint
                .and_then(Hint::ty)
                .filter(|ty| ty.is_integer())
                .cloned()
                .unwrap_or(types::BOOL);
            return Ok(Value::int(ty, flag as i64));
        }
    }

    // 5
    let float_literal = matches!(operand, Operand::Float(_));
    if hint_kind == Some(Kind::Decimal)
        || (float_literal && matches!(hint_kind, None | Some(Kind::Numeric)))
    {
        let ty = match hint.and_then(Hint::ty) {
            Some(IrType::F64) => types::DOUBLE,
            _ => types::FLOAT,
        };
        let value = operand.to_f64().ok_or_else(|| mismatch(&operand, hint))?;
        return Ok(Value::float(ty, value));
    }

    // 6
    let int_literal = matches!(operand, Operand::Int(_));
    if matches!(hint_kind, Some(Kind::Integer) | Some(Kind::Numeric))
        || (int_literal && hint.is_none())
    {
        let ty = hint
            .and_then(Hint::ty)
            .filter(|ty| ty.is_integer())
            .cloned()
            .unwrap_or(types::INT);
        let value = operand.to_i64().ok_or_else(|| mismatch(&operand, hint))?;
        return Ok(Value::int(ty, value));
    }

    // 7
    if let Operand::Str(text) = &operand {
        match hint_kind {
            None | Some(Kind::Pointer) => {
                let target = hint.and_then(Hint::ty).cloned().unwrap_or_else(types::void_ptr);
                let address = module.intern_string(text);
                return Ok(Constant::BitCast {
                    value: Box::new(address),
                    ty: target,
                }
                .into());
            }
            Some(Kind::Array) => {
                let elements: Vec<Constant> = text
                    .bytes()
                    .chain(std::iter::once(0))
                    .map(|b| Constant::int(types::CHAR, b as i64))
                    .collect();
                let ty = IrType::array_of(types::CHAR, elements.len() as u64);
                if hint.and_then(Hint::ty).is_some_and(|hinted| hinted != &ty) {
                    return Err(mismatch(&operand, hint));
                }
                return Ok(Constant::Array { ty, elements }.into());
            }
            _ => {}
        }
    }

    // 8 and 9
    if let Operand::List(items) = operand {
        return match hint_kind {
            None | Some(Kind::Array) => convert_list(module, items, hint, Kind::Array),
            Some(Kind::Vector) => convert_list(module, items, hint, Kind::Vector),
            _ => Err(mismatch(&Operand::List(items), hint)),
        };
    }

    Err(mismatch(&operand, hint))
}

/// Build an array or vector constant from a list of operands
fn convert_list(
    module: &mut Module,
    items: Vec<Operand>,
    hint: Option<&Hint>,
    kind: Kind,
) -> Result<Value> {
    let hinted = hint.and_then(Hint::ty).cloned();
    if let Some(ty) = &hinted {
        if ty.len() != Some(items.len() as u64) {
            return Err(mismatch(&Operand::List(items), hint));
        }
    }

    let mut element_hint = hinted.as_ref().and_then(IrType::element_type).cloned().map(Hint::Type);
    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        let value = convert(module, item, element_hint.as_ref())?;
        let constant = match value {
            Value::Constant(constant) => constant,
            other => {
                return Err(ScriptError::argument(format!(
                    "{} elements must be constants, found {}",
                    kind,
                    typename(other.ty())
                )))
            }
        };
        if element_hint.is_none() {
            element_hint = Some(Hint::Type(constant.ty().clone()));
        }
        elements.push(constant);
    }

    let element_type = match element_hint {
        Some(Hint::Type(ty)) => ty,
        _ => {
            return Err(ScriptError::argument(format!(
                "cannot infer the element type of an empty {kind}"
            )))
        }
    };
    let size = elements.len() as u64;
    let constant = if kind == Kind::Vector {
        Constant::Vector {
            ty: IrType::vector_of(element_type, size),
            elements,
        }
    } else {
        Constant::Array {
            ty: IrType::array_of(element_type, size),
            elements,
        }
    };
    Ok(constant.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hint(ty: IrType) -> Option<Hint> {
        Some(Hint::Type(ty))
    }

    #[test]
    fn test_typename() {
        assert_eq!(typename(&IrType::I32), "Int32");
        assert_eq!(typename(&IrType::F64), "Double");
        assert_eq!(typename(&IrType::I32.pointer().pointer()), "Integer pointer");
        assert_eq!(typename(&IrType::array_of(IrType::I8, 3)), "Array");
    }

    #[test]
    fn test_literal_defaults() {
        let mut module = Module::new("test");
        assert_eq!(convert(&mut module, 5.into(), None).unwrap(), Value::int(IrType::I32, 5));
        assert_eq!(convert(&mut module, true.into(), None).unwrap(), Value::bool(true));
        assert_eq!(convert(&mut module, 1.5.into(), None).unwrap(), Value::float(IrType::F32, 1.5));
    }

    #[test]
    fn test_hinted_widths() {
        let mut module = Module::new("test");
        let byte = convert(&mut module, 300.into(), hint(IrType::I8).as_ref()).unwrap();
        assert_eq!(byte, Value::int(IrType::I8, 44));
        let wide = convert(&mut module, true.into(), hint(IrType::I64).as_ref()).unwrap();
        assert_eq!(wide, Value::int(IrType::I64, 1));
        let double = convert(&mut module, 2.into(), hint(IrType::F64).as_ref()).unwrap();
        assert_eq!(double, Value::float(IrType::F64, 2.0));
    }

    #[test]
    fn test_typed_value_must_match_hint() {
        let mut module = Module::new("test");
        let value = Value::int(IrType::I16, 3);
        let err =
            convert(&mut module, value.clone().into(), hint(IrType::I32).as_ref()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value passed to generator should be a Int32. Int16 given."
        );
        let numeric = Hint::Kind(Kind::Numeric);
        let ok = convert(&mut module, value.clone().into(), Some(&numeric)).unwrap();
        assert_eq!(ok, value);
    }

    #[test]
    fn test_idempotent() {
        let mut module = Module::new("test");
        let h = hint(IrType::I16);
        let once = convert(&mut module, 345.into(), h.as_ref()).unwrap();
        let twice = convert(&mut module, once.clone().into(), h.as_ref()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_null_pointer() {
        let mut module = Module::new("test");
        let ptr = IrType::I32.pointer();
        let null = convert(&mut module, 0.into(), hint(ptr.clone()).as_ref()).unwrap();
        assert_eq!(null, Value::Constant(Constant::Null(ptr)));
    }

    #[test]
    fn test_strings() {
        let mut module = Module::new("test");
        let ptr = convert(&mut module, "hi".into(), None).unwrap();
        assert_eq!(ptr.ty(), &IrType::I8.pointer());
        let again = convert(&mut module, "hi".into(), None).unwrap();
        assert_eq!(ptr, again);
        assert_eq!(module.globals.len(), 1);

        let array = convert(&mut module, "hi".into(), Some(&Hint::Kind(Kind::Array))).unwrap();
        assert_eq!(array.ty(), &IrType::array_of(IrType::I8, 3));
    }

    #[test]
    fn test_lists() {
        let mut module = Module::new("test");
        let array = convert(&mut module, vec![1, 2, 3].into(), None).unwrap();
        assert_eq!(array.ty(), &IrType::array_of(IrType::I32, 3));

        let vector_hint = Hint::Kind(Kind::Vector);
        let vector = convert(&mut module, vec![1.0, 2.0].into(), Some(&vector_hint)).unwrap();
        assert_eq!(vector.ty(), &IrType::vector_of(IrType::F32, 2));

        let sized = IrType::array_of(IrType::I8, 2);
        let err = convert(&mut module, vec![1, 2, 3].into(), hint(sized).as_ref()).unwrap_err();
        assert!(matches!(err, ScriptError::TypeMismatch { .. }));
    }

    #[test]
    fn test_mismatch_without_hint() {
        let mut module = Module::new("test");
        let err = convert(&mut module, Operand::Null, None).unwrap_err();
        assert_eq!(
            err,
            ScriptError::type_mismatch("Nil", "IR value, number, list, string or boolean")
        );
        let err =
            convert(&mut module, true.into(), hint(IrType::I8.pointer()).as_ref()).unwrap_err();
        assert_eq!(err, ScriptError::type_mismatch("Boolean", "Integer pointer"));
    }
}
