//! Struct Layouts
//!
//! A struct layout owns its fields. Nested layouts are owned by the field
//! that holds them, so a keyed lookup walks the tree and returns the path
//! of field indices leading to the named field.

use rls_common::{Result, ScriptError};
use rls_ir::{Constant, IrType};
use serde::{Deserialize, Serialize};

/// Type of a struct field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Plain(IrType),
    Nested(StructDef),
}

impl FieldType {
    pub fn ir_type(&self) -> IrType {
        match self {
            FieldType::Plain(ty) => ty.clone(),
            FieldType::Nested(layout) => layout.ir_type(),
        }
    }
}

impl From<IrType> for FieldType {
    fn from(ty: IrType) -> Self {
        FieldType::Plain(ty)
    }
}

impl From<StructDef> for FieldType {
    fn from(layout: StructDef) -> Self {
        FieldType::Nested(layout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Option<String>,
    pub ty: FieldType,
}

/// Layout of a struct type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    name: Option<String>,
    fields: Vec<Field>,
    packed: bool,
}

impl StructDef {
    /// Named struct, registered under `name` when defined in a library
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            fields: Vec::new(),
            packed: false,
        }
    }

    /// Literal struct type without a name
    pub fn anonymous() -> Self {
        Self {
            name: None,
            fields: Vec::new(),
            packed: false,
        }
    }

    /// Append a named field
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.fields.push(Field {
            name: Some(name.into()),
            ty: ty.into(),
        });
        self
    }

    /// Append a field without a name
    pub fn element(mut self, ty: impl Into<FieldType>) -> Self {
        self.fields.push(Field {
            name: None,
            ty: ty.into(),
        });
        self
    }

    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Named layouts nested anywhere below this one
    pub fn nested(&self) -> Vec<&StructDef> {
        let mut found = Vec::new();
        for field in &self.fields {
            if let FieldType::Nested(layout) = &field.ty {
                if layout.name.is_some() {
                    found.push(layout);
                }
                found.extend(layout.nested());
            }
        }
        found
    }

    pub fn ir_type(&self) -> IrType {
        IrType::Struct {
            name: self.name.clone(),
            fields: self.fields.iter().map(|f| f.ty.ir_type()).collect(),
            packed: self.packed,
        }
    }

    pub fn pointer(&self) -> IrType {
        self.ir_type().pointer()
    }

    /// Zero-initialized struct constant
    pub fn null(&self) -> Constant {
        self.ir_type().null()
    }

    pub fn null_pointer(&self) -> Constant {
        self.ir_type().null_pointer()
    }

    fn has_names(&self) -> bool {
        self.fields.iter().any(|f| f.name.is_some())
    }

    fn require_names(&self, query: &str) -> Result<()> {
        if self.has_names() {
            Ok(())
        } else {
            Err(ScriptError::argument(format!(
                "Cannot call {query} on a struct without element names"
            )))
        }
    }

    /// Depth-first search for `element`; direct fields win over nested ones
    fn find(&self, element: &str) -> Option<(Vec<u32>, &FieldType)> {
        if !self.has_names() {
            return None;
        }
        if let Some(i) = self.fields.iter().position(|f| f.name.as_deref() == Some(element)) {
            return Some((vec![i as u32], &self.fields[i].ty));
        }
        self.fields.iter().enumerate().find_map(|(i, field)| match &field.ty {
            FieldType::Nested(layout) => layout.find(element).map(|(mut path, ty)| {
                path.insert(0, i as u32);
                (path, ty)
            }),
            FieldType::Plain(_) => None,
        })
    }

    fn unknown(element: &str) -> ScriptError {
        ScriptError::argument(format!("Unknown element, {element}."))
    }

    /// Field indices leading to `element`
    pub fn index(&self, element: &str) -> Result<Vec<u32>> {
        self.require_names("index")?;
        self.find(element).map(|(path, _)| path).ok_or_else(|| Self::unknown(element))
    }

    /// Type of `element`
    pub fn field_type(&self, element: &str) -> Result<IrType> {
        self.require_names("field_type")?;
        self.find(element)
            .map(|(_, ty)| ty.ir_type())
            .ok_or_else(|| Self::unknown(element))
    }

    pub fn contains(&self, element: &str) -> Result<bool> {
        self.require_names("contains")?;
        Ok(self.find(element).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shape() -> StructDef {
        let point = StructDef::named("point").field("x", IrType::I32).field("y", IrType::I32);
        StructDef::named("shape")
            .field("kind", IrType::I8)
            .field("origin", point)
            .field("scale", IrType::F64)
    }

    #[test]
    fn test_index_paths() {
        let shape = shape();
        assert_eq!(shape.index("kind").unwrap(), vec![0]);
        assert_eq!(shape.index("y").unwrap(), vec![1, 1]);
        assert_eq!(shape.index("scale").unwrap(), vec![2]);
        assert!(shape.contains("x").unwrap());
        assert!(!shape.contains("z").unwrap());
    }

    #[test]
    fn test_field_types() {
        let shape = shape();
        assert_eq!(shape.field_type("scale").unwrap(), IrType::F64);
        assert_eq!(shape.field_type("origin").unwrap().to_string(), "%point");
        assert_eq!(shape.ir_type().len(), Some(3));
    }

    #[test]
    fn test_unknown_and_unnamed() {
        let shape = shape();
        assert!(matches!(shape.index("z"), Err(ScriptError::ArgumentError { .. })));

        let pair = StructDef::anonymous().element(IrType::I32).element(IrType::I32);
        assert!(matches!(pair.index("x"), Err(ScriptError::ArgumentError { .. })));
        assert_eq!(pair.ir_type().to_string(), "{ i32, i32 }");
    }

    #[test]
    fn test_nested_layouts() {
        let names: Vec<_> = shape()
            .nested()
            .iter()
            .filter_map(|l| l.name())
            .map(str::to_string)
            .collect();
        assert_eq!(names, vec!["point".to_string()]);
    }
}
