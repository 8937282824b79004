//! Interpreter memory: a list of typed allocations

use super::value::{Pointer, RuntimeValue};
use super::ExecError;
use crate::types::IrType;

#[derive(Debug, Default)]
pub struct Memory {
    /// Freed allocations become `None`
    allocations: Vec<Option<Vec<RuntimeValue>>>,
}

fn invalid(message: impl Into<String>) -> ExecError {
    ExecError::InvalidPointer {
        message: message.into(),
    }
}

fn index(i: i64, len: usize, ptr: &Pointer) -> Result<usize, ExecError> {
    usize::try_from(i)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| invalid(format!("{ptr} is out of bounds")))
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `count` zeroed elements of `ty`, returning a pointer to the first
    pub fn allocate(&mut self, ty: &IrType, count: usize) -> Pointer {
        let elements = (0..count).map(|_| RuntimeValue::zero(ty)).collect();
        self.allocations.push(Some(elements));
        Pointer::Memory {
            alloc: self.allocations.len() - 1,
            path: vec![0],
        }
    }

    pub fn free(&mut self, ptr: &Pointer) -> Result<(), ExecError> {
        match ptr {
            Pointer::Null => Ok(()),
            Pointer::Memory { alloc, .. } => {
                let slot = self
                    .allocations
                    .get_mut(*alloc)
                    .ok_or_else(|| invalid(format!("{ptr} was never allocated")))?;
                if slot.take().is_none() {
                    return Err(invalid(format!("{ptr} freed twice")));
                }
                Ok(())
            }
        }
    }

    pub fn is_live(&self, alloc: usize) -> bool {
        self.allocations.get(alloc).is_some_and(Option::is_some)
    }

    fn cell(&self, ptr: &Pointer) -> Result<&RuntimeValue, ExecError> {
        let Pointer::Memory { alloc, path } = ptr else {
            return Err(invalid("null pointer dereference"));
        };
        let elements = self
            .allocations
            .get(*alloc)
            .and_then(Option::as_ref)
            .ok_or_else(|| invalid(format!("{ptr} refers to freed memory")))?;
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| invalid(format!("{ptr} has an empty path")))?;
        let mut current = &elements[index(*first, elements.len(), ptr)?];
        for i in rest {
            let RuntimeValue::Aggregate(members) = current else {
                return Err(invalid(format!("{ptr} indexes into a scalar")));
            };
            current = &members[index(*i, members.len(), ptr)?];
        }
        Ok(current)
    }

    fn cell_mut(&mut self, ptr: &Pointer) -> Result<&mut RuntimeValue, ExecError> {
        let Pointer::Memory { alloc, path } = ptr else {
            return Err(invalid("null pointer dereference"));
        };
        let elements = self
            .allocations
            .get_mut(*alloc)
            .and_then(Option::as_mut)
            .ok_or_else(|| invalid(format!("{ptr} refers to freed memory")))?;
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| invalid(format!("{ptr} has an empty path")))?;
        let at = index(*first, elements.len(), ptr)?;
        let mut current = &mut elements[at];
        for i in rest {
            let RuntimeValue::Aggregate(members) = current else {
                return Err(invalid(format!("{ptr} indexes into a scalar")));
            };
            let at = index(*i, members.len(), ptr)?;
            current = &mut members[at];
        }
        Ok(current)
    }

    pub fn load(&self, ptr: &Pointer) -> Result<RuntimeValue, ExecError> {
        self.cell(ptr).cloned()
    }

    pub fn store(&mut self, ptr: &Pointer, value: RuntimeValue) -> Result<(), ExecError> {
        *self.cell_mut(ptr)? = value;
        Ok(())
    }

    /// Read bytes from `ptr` up to (not including) the first zero byte
    pub fn read_c_string(&self, ptr: &Pointer) -> Result<String, ExecError> {
        let mut bytes = Vec::new();
        let mut cursor = ptr.clone();
        loop {
            match self.load(&cursor)? {
                RuntimeValue::Int(0) => break,
                RuntimeValue::Int(b) => bytes.push(b as u8),
                other => return Err(invalid(format!("{cursor} holds {other}, not a byte"))),
            }
            cursor = cursor.offset(1);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load_nested() {
        let mut memory = Memory::new();
        let ty = IrType::array_of(IrType::I32, 3);
        let ptr = memory.allocate(&ty, 1);
        let element = ptr.child(2);

        memory.store(&element, RuntimeValue::Int(7)).unwrap();
        assert_eq!(memory.load(&element).unwrap(), RuntimeValue::Int(7));
        assert_eq!(
            memory.load(&ptr).unwrap(),
            RuntimeValue::Aggregate(vec![
                RuntimeValue::Int(0),
                RuntimeValue::Int(0),
                RuntimeValue::Int(7)
            ])
        );
    }

    #[test]
    fn test_out_of_bounds_and_free() {
        let mut memory = Memory::new();
        let ptr = memory.allocate(&IrType::I8, 2);

        assert!(memory.load(&ptr.offset(2)).is_err());
        memory.free(&ptr).unwrap();
        assert!(memory.load(&ptr).is_err());
        assert!(memory.free(&ptr).is_err());
    }
}
