//! Memory and aggregate operations
//!
//! Stack and heap allocation, loads and stores, element addressing (with
//! struct fields addressable by name) and element access on arrays,
//! structs and vectors.

use rls_common::{Result, ScriptError};
use rls_ir::{Constant, IrType, Kind, Value};

use super::Generator;
use crate::convert::typename;
use crate::operand::Operand;

/// One step of an element address computation
#[derive(Debug, Clone, PartialEq)]
pub enum GepIndex {
    /// Numeric index, converted as an integer
    Index(Operand),
    /// Field of a registered struct layout, expanded to its index path
    Field(String),
}

macro_rules! gep_index {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for GepIndex {
                fn from(value: $ty) -> Self {
                    GepIndex::Index(value.into())
                }
            }
        )*
    };
}

gep_index!(i32, i64, u32, u64, usize, Value, Operand);

impl From<&Value> for GepIndex {
    fn from(value: &Value) -> Self {
        GepIndex::Index(value.into())
    }
}

impl From<&str> for GepIndex {
    fn from(name: &str) -> Self {
        GepIndex::Field(name.to_string())
    }
}

impl From<String> for GepIndex {
    fn from(name: String) -> Self {
        GepIndex::Field(name)
    }
}

/// Constant, non-negative integer value of an index
fn constant_index(value: &Value) -> Option<u32> {
    value
        .as_constant()
        .and_then(Constant::as_int)
        .and_then(|n| u32::try_from(n).ok())
}

/// Type one further index steps into
fn step_into(ty: &IrType, index: &Value) -> Option<IrType> {
    match ty {
        IrType::Struct { .. } => {
            constant_index(index).and_then(|i| ty.field_type(i as u64)).cloned()
        }
        other => other.field_type(0).cloned(),
    }
}

impl Generator<'_> {
    pub fn alloca(&mut self, ty: &IrType) -> Result<Value> {
        Ok(self.builder()?.build_alloca(ty.clone(), None)?)
    }

    /// Stack array of `size` elements
    pub fn array_alloca(&mut self, ty: &IrType, size: impl Into<Operand>) -> Result<Value> {
        let size = self.convert_kind(size, Kind::Integer)?;
        Ok(self.builder()?.build_alloca(ty.clone(), Some(size))?)
    }

    pub fn malloc(&mut self, ty: &IrType) -> Result<Value> {
        Ok(self.builder()?.build_malloc(ty.clone(), None)?)
    }

    /// Heap array of `size` elements
    pub fn array_malloc(&mut self, ty: &IrType, size: impl Into<Operand>) -> Result<Value> {
        let size = self.convert_kind(size, Kind::Integer)?;
        Ok(self.builder()?.build_malloc(ty.clone(), Some(size))?)
    }

    pub fn free(&mut self, ptr: impl Into<Operand>) -> Result<()> {
        let ptr = self.pointer("free", ptr)?;
        self.builder()?.build_free(ptr)?;
        Ok(())
    }

    pub fn load(&mut self, ptr: impl Into<Operand>) -> Result<Value> {
        let ptr = self.pointer("load", ptr)?;
        Ok(self.builder()?.build_load(ptr)?)
    }

    /// Store `value`, converted to the pointee type, through `ptr`
    pub fn store(&mut self, value: impl Into<Operand>, ptr: impl Into<Operand>) -> Result<()> {
        let ptr = self.pointer("store", ptr)?;
        let pointee = ptr.ty().pointee().cloned().unwrap_or(IrType::Void);
        let value = self.convert_to(value, &pointee)?;
        self.builder()?.build_store(value, ptr)?;
        Ok(())
    }

    fn gep_indices(&mut self, ptr_type: &IrType, indices: Vec<GepIndex>) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(indices.len());
        let mut current = ptr_type.pointee().cloned();
        for (position, index) in indices.into_iter().enumerate() {
            match index {
                GepIndex::Index(operand) => {
                    let value = self.convert_kind(operand, Kind::Integer)?;
                    if position > 0 {
                        current = current.and_then(|ty| step_into(&ty, &value));
                    }
                    values.push(value);
                }
                GepIndex::Field(name) if position == 0 => {
                    return Err(ScriptError::argument(format!(
                        "gep cannot start with field '{name}'; \
                         the first index steps over the pointer"
                    )));
                }
                GepIndex::Field(name) => {
                    let layout = match &current {
                        Some(IrType::Struct { name: Some(layout), .. }) => layout.clone(),
                        other => {
                            let found = other.as_ref().map_or("Void".to_string(), typename);
                            return Err(ScriptError::argument(format!(
                                "field '{name}' requires a named struct, {found} given"
                            )));
                        }
                    };
                    let path = self
                        .library
                        .struct_def(&layout)
                        .ok_or_else(|| ScriptError::argument(format!("Unknown struct '{layout}'")))?
                        .index(&name)?;
                    for field in path {
                        let value = Value::int(IrType::I32, field as i64);
                        current = current.and_then(|ty| step_into(&ty, &value));
                        values.push(value);
                    }
                }
            }
        }
        Ok(values)
    }

    /// Address of an element inside the aggregate `ptr` points to
    pub fn gep(&mut self, ptr: impl Into<Operand>, indices: Vec<GepIndex>) -> Result<Value> {
        let ptr = self.pointer("gep", ptr)?;
        let indices = self.gep_indices(ptr.ty(), indices)?;
        Ok(self.builder()?.build_gep(ptr, indices)?)
    }

    /// Load the element `gep` addresses
    pub fn gev(&mut self, ptr: impl Into<Operand>, indices: Vec<GepIndex>) -> Result<Value> {
        let element = self.gep(ptr, indices)?;
        self.load(element)
    }

    /// Store into the element `gep` addresses, returning the element pointer
    pub fn sep(
        &mut self,
        ptr: impl Into<Operand>,
        indices: Vec<GepIndex>,
        value: impl Into<Operand>,
    ) -> Result<Value> {
        let element = self.gep(ptr, indices)?;
        self.store(value, element.clone())?;
        Ok(element)
    }

    fn aggregate_index(&mut self, operation: &str, index: impl Into<Operand>) -> Result<u32> {
        let index = self.convert_kind(index, Kind::Integer)?;
        constant_index(&index).ok_or_else(|| {
            ScriptError::argument(format!(
                "{operation} on an aggregate needs a constant, non-negative index"
            ))
        })
    }

    /// Element `index` of a vector, array or struct value
    pub fn extract(
        &mut self,
        collection: impl Into<Operand>,
        index: impl Into<Operand>,
    ) -> Result<Value> {
        let collection = self.convert(collection)?;
        if collection.ty().kind() == Kind::Vector {
            let index = self.convert_kind(index, Kind::Integer)?;
            return Ok(self.builder()?.build_extract_element(collection, index)?);
        }
        let index = self.aggregate_index("extract", index)?;
        Ok(self.builder()?.build_extract_value(collection, vec![index])?)
    }

    /// Copy of `collection` with element `index` replaced by `element`
    pub fn insert(
        &mut self,
        collection: impl Into<Operand>,
        element: impl Into<Operand>,
        index: impl Into<Operand>,
    ) -> Result<Value> {
        let collection = self.convert(collection)?;
        if let IrType::Vector { element_type, .. } = collection.ty() {
            let element_type = (**element_type).clone();
            let element = self.convert_to(element, &element_type)?;
            let index = self.convert_kind(index, Kind::Integer)?;
            return Ok(self.builder()?.build_insert_element(collection, element, index)?);
        }
        let index = self.aggregate_index("insert", index)?;
        let member = collection.ty().field_type(index as u64).cloned().ok_or_else(|| {
            ScriptError::argument(format!(
                "insert needs an array or struct with an element {index}, {} given",
                typename(collection.ty())
            ))
        })?;
        let element = self.convert_to(element, &member)?;
        Ok(self.builder()?.build_insert_value(collection, element, vec![index])?)
    }

    /// Lanes of `lhs` and `rhs` picked by a constant `mask`
    pub fn shuffle(
        &mut self,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        mask: impl Into<Operand>,
    ) -> Result<Value> {
        let lhs = self.convert_kind(lhs, Kind::Vector)?;
        let rhs = self.convert_to(rhs, lhs.ty())?;
        let mask = self.convert_kind(mask, Kind::Vector)?;
        let lanes = match mask.as_constant() {
            Some(Constant::Vector { elements, .. }) => elements
                .iter()
                .map(|lane| lane.as_int().and_then(|n| u32::try_from(n).ok()))
                .collect::<Option<Vec<u32>>>(),
            _ => None,
        }
        .ok_or_else(|| {
            ScriptError::argument("shuffle mask must be a constant vector of lane numbers")
        })?;
        Ok(self.builder()?.build_shuffle(lhs, rhs, lanes)?)
    }
}
