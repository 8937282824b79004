//! IR Builder
//!
//! A cursor over one block of one function. Every `build_*` method checks
//! operand types and returns the typed result value.

use rls_common::BlockId;

use crate::function::Function;
use crate::instructions::Instruction;
use crate::ops::{BinaryOp, CastOp, FloatPredicate, IntPredicate};
use crate::types::{IrType, Kind};
use crate::values::{Constant, Value};
use crate::IrError;

/// Builder for emitting instructions into a block
pub struct IrBuilder<'f> {
    function: &'f mut Function,
    block: BlockId,
    /// Insertion index; `None` appends
    position: Option<usize>,
}

/// Scalar kind of a type, looking through vectors
fn scalar_kind(ty: &IrType) -> Kind {
    match ty {
        IrType::Vector { element_type, .. } => element_type.kind(),
        other => other.kind(),
    }
}

fn same_type(operation: &str, lhs: &Value, rhs: &Value) -> Result<(), IrError> {
    if lhs.ty() != rhs.ty() {
        return Err(IrError::type_mismatch(operation, lhs.ty(), rhs.ty()));
    }
    Ok(())
}

impl<'f> IrBuilder<'f> {
    /// Builder appending to the end of `block`
    pub fn at_end(function: &'f mut Function, block: BlockId) -> Self {
        Self {
            function,
            block,
            position: None,
        }
    }

    /// Builder inserting before the instruction at `index` in `block`
    pub fn at(function: &'f mut Function, block: BlockId, index: usize) -> Self {
        Self {
            function,
            block,
            position: Some(index),
        }
    }

    pub fn function(&self) -> &Function {
        self.function
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    fn emit(&mut self, instr: Instruction) -> Result<(), IrError> {
        let function_name = self.function.name.clone();
        let block = self.function.block_mut(self.block)?;
        match self.position.as_mut() {
            Some(index) => {
                let at = (*index).min(block.instructions.len());
                block.instructions.insert(at, instr);
                *index = at + 1;
            }
            None => {
                if block.has_terminator() {
                    return Err(IrError::BlockTerminated {
                        function: function_name,
                        block: block.id,
                    });
                }
                block.add_instruction(instr);
            }
        }
        Ok(())
    }

    fn emit_value(
        &mut self,
        ty: IrType,
        make: impl FnOnce(u32) -> Instruction,
    ) -> Result<Value, IrError> {
        let result = self.function.new_temp();
        self.emit(make(result))?;
        Ok(Value::temp(result, ty))
    }

    pub fn build_binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        let name = op.to_string();
        same_type(&name, &lhs, &rhs)?;
        let expected = if op.is_float() { Kind::Decimal } else { Kind::Integer };
        if scalar_kind(lhs.ty()) != expected {
            return Err(IrError::type_mismatch(&name, expected, lhs.ty()));
        }
        let result_type = lhs.ty().clone();
        self.emit_value(result_type.clone(), |result| Instruction::Binary {
            result,
            op,
            lhs,
            rhs,
            result_type,
        })
    }

    pub fn build_icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, IrError> {
        same_type("icmp", &lhs, &rhs)?;
        if !matches!(scalar_kind(lhs.ty()), Kind::Integer | Kind::Pointer) {
            return Err(IrError::type_mismatch("icmp", "integer or pointer", lhs.ty()));
        }
        self.emit_value(IrType::I1, |result| Instruction::ICmp {
            result,
            predicate,
            lhs,
            rhs,
        })
    }

    pub fn build_fcmp(
        &mut self,
        predicate: FloatPredicate,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, IrError> {
        same_type("fcmp", &lhs, &rhs)?;
        if scalar_kind(lhs.ty()) != Kind::Decimal {
            return Err(IrError::type_mismatch("fcmp", Kind::Decimal, lhs.ty()));
        }
        self.emit_value(IrType::I1, |result| Instruction::FCmp {
            result,
            predicate,
            lhs,
            rhs,
        })
    }

    pub fn build_cast(
        &mut self,
        op: CastOp,
        value: Value,
        target_type: IrType,
    ) -> Result<Value, IrError> {
        let name = op.to_string();
        let from = value.ty();
        let from_width = from.bit_width().unwrap_or(0);
        let to_width = target_type.bit_width().unwrap_or(0);
        let valid = match op {
            CastOp::Trunc => {
                from.is_integer() && target_type.is_integer() && to_width <= from_width
            }
            CastOp::ZExt | CastOp::SExt => {
                from.is_integer() && target_type.is_integer() && to_width >= from_width
            }
            CastOp::FPTrunc => {
                from.is_decimal() && target_type.is_decimal() && to_width <= from_width
            }
            CastOp::FPExt => {
                from.is_decimal() && target_type.is_decimal() && to_width >= from_width
            }
            CastOp::FPToSI | CastOp::FPToUI => from.is_decimal() && target_type.is_integer(),
            CastOp::SIToFP | CastOp::UIToFP => from.is_integer() && target_type.is_decimal(),
            CastOp::PtrToInt => from.is_pointer() && target_type.is_integer(),
            CastOp::IntToPtr => from.is_integer() && target_type.is_pointer(),
            CastOp::BitCast => {
                (from.is_pointer() && target_type.is_pointer())
                    || (from_width != 0 && from_width == to_width)
                    || from == &target_type
            }
        };
        if !valid {
            return Err(IrError::invalid(&name, format!("cannot cast {from} to {target_type}")));
        }
        self.emit_value(target_type.clone(), |result| Instruction::Cast {
            result,
            op,
            value,
            target_type,
        })
    }

    fn check_count(operation: &str, count: &Option<Value>) -> Result<(), IrError> {
        match count {
            Some(count) if !count.ty().is_integer() => {
                Err(IrError::type_mismatch(operation, Kind::Integer, count.ty()))
            }
            _ => Ok(()),
        }
    }

    pub fn build_alloca(
        &mut self,
        alloc_type: IrType,
        count: Option<Value>,
    ) -> Result<Value, IrError> {
        Self::check_count("alloca", &count)?;
        self.emit_value(alloc_type.pointer(), |result| Instruction::Alloca {
            result,
            alloc_type,
            count,
        })
    }

    pub fn build_malloc(
        &mut self,
        alloc_type: IrType,
        count: Option<Value>,
    ) -> Result<Value, IrError> {
        Self::check_count("malloc", &count)?;
        self.emit_value(alloc_type.pointer(), |result| Instruction::Malloc {
            result,
            alloc_type,
            count,
        })
    }

    pub fn build_free(&mut self, ptr: Value) -> Result<(), IrError> {
        if !ptr.ty().is_pointer() {
            return Err(IrError::type_mismatch("free", Kind::Pointer, ptr.ty()));
        }
        self.emit(Instruction::Free { ptr })
    }

    pub fn build_load(&mut self, ptr: Value) -> Result<Value, IrError> {
        let result_type = ptr
            .ty()
            .pointee()
            .cloned()
            .ok_or_else(|| IrError::type_mismatch("load", Kind::Pointer, ptr.ty()))?;
        self.emit_value(result_type.clone(), |result| Instruction::Load {
            result,
            ptr,
            result_type,
        })
    }

    pub fn build_store(&mut self, value: Value, ptr: Value) -> Result<(), IrError> {
        match ptr.ty().pointee() {
            Some(pointee) if pointee == value.ty() => self.emit(Instruction::Store { value, ptr }),
            Some(pointee) => Err(IrError::type_mismatch("store", pointee, value.ty())),
            None => Err(IrError::type_mismatch("store", Kind::Pointer, ptr.ty())),
        }
    }

    /// Element type reached by a getelementptr index list
    pub fn gep_type(ptr_type: &IrType, indices: &[Value]) -> Result<IrType, IrError> {
        let mut current = ptr_type
            .pointee()
            .ok_or_else(|| IrError::type_mismatch("getelementptr", Kind::Pointer, ptr_type))?;
        if indices.is_empty() {
            return Err(IrError::invalid("getelementptr", "at least one index is required"));
        }
        for index in &indices[1..] {
            if !index.ty().is_integer() {
                return Err(IrError::type_mismatch("getelementptr", Kind::Integer, index.ty()));
            }
            current = match current {
                IrType::Struct { fields, .. } => {
                    let field = index
                        .as_constant()
                        .and_then(Constant::as_int)
                        .ok_or_else(|| {
                            IrError::invalid("getelementptr", "struct index must be a constant")
                        })?;
                    usize::try_from(field)
                        .ok()
                        .and_then(|i| fields.get(i))
                        .ok_or_else(|| {
                            let message = format!("no field {field} in {current}");
                            IrError::invalid("getelementptr", message)
                        })?
                }
                IrType::Array { element_type, .. } | IrType::Vector { element_type, .. } => {
                    element_type
                }
                other => {
                    let message = format!("cannot index into {other}");
                    return Err(IrError::invalid("getelementptr", message));
                }
            };
        }
        if !indices[0].ty().is_integer() {
            return Err(IrError::type_mismatch("getelementptr", Kind::Integer, indices[0].ty()));
        }
        Ok(current.clone())
    }

    pub fn build_gep(&mut self, ptr: Value, indices: Vec<Value>) -> Result<Value, IrError> {
        let element = Self::gep_type(ptr.ty(), &indices)?;
        let result_type = element.pointer();
        self.emit_value(result_type.clone(), |result| Instruction::GetElementPtr {
            result,
            ptr,
            indices,
            result_type,
        })
    }

    fn aggregate_member(
        operation: &str,
        aggregate: &IrType,
        indices: &[u32],
    ) -> Result<IrType, IrError> {
        if !matches!(aggregate.kind(), Kind::Struct | Kind::Array) {
            return Err(IrError::type_mismatch(operation, "struct or array", aggregate));
        }
        let mut current = aggregate;
        for index in indices {
            current = current
                .field_type(*index as u64)
                .filter(|_| current.len().is_some_and(|len| (*index as u64) < len))
                .ok_or_else(|| {
                    let message = format!("index {index} out of range for {current}");
                    IrError::invalid(operation, message)
                })?;
        }
        Ok(current.clone())
    }

    pub fn build_extract_value(
        &mut self,
        aggregate: Value,
        indices: Vec<u32>,
    ) -> Result<Value, IrError> {
        let result_type = Self::aggregate_member("extractvalue", aggregate.ty(), &indices)?;
        self.emit_value(result_type.clone(), |result| Instruction::ExtractValue {
            result,
            aggregate,
            indices,
            result_type,
        })
    }

    pub fn build_insert_value(
        &mut self,
        aggregate: Value,
        element: Value,
        indices: Vec<u32>,
    ) -> Result<Value, IrError> {
        let member = Self::aggregate_member("insertvalue", aggregate.ty(), &indices)?;
        if &member != element.ty() {
            return Err(IrError::type_mismatch("insertvalue", member, element.ty()));
        }
        self.emit_value(aggregate.ty().clone(), |result| Instruction::InsertValue {
            result,
            aggregate,
            element,
            indices,
        })
    }

    fn vector_element(operation: &str, vector: &Value, index: &Value) -> Result<IrType, IrError> {
        if !index.ty().is_integer() {
            return Err(IrError::type_mismatch(operation, Kind::Integer, index.ty()));
        }
        match vector.ty() {
            IrType::Vector { element_type, .. } => Ok((**element_type).clone()),
            other => Err(IrError::type_mismatch(operation, Kind::Vector, other)),
        }
    }

    pub fn build_extract_element(&mut self, vector: Value, index: Value) -> Result<Value, IrError> {
        let result_type = Self::vector_element("extractelement", &vector, &index)?;
        self.emit_value(result_type.clone(), |result| Instruction::ExtractElement {
            result,
            vector,
            index,
            result_type,
        })
    }

    pub fn build_insert_element(
        &mut self,
        vector: Value,
        element: Value,
        index: Value,
    ) -> Result<Value, IrError> {
        let element_type = Self::vector_element("insertelement", &vector, &index)?;
        if &element_type != element.ty() {
            return Err(IrError::type_mismatch("insertelement", element_type, element.ty()));
        }
        self.emit_value(vector.ty().clone(), |result| Instruction::InsertElement {
            result,
            vector,
            element,
            index,
        })
    }

    pub fn build_shuffle(
        &mut self,
        lhs: Value,
        rhs: Value,
        mask: Vec<u32>,
    ) -> Result<Value, IrError> {
        same_type("shufflevector", &lhs, &rhs)?;
        let (size, element_type) = match lhs.ty() {
            IrType::Vector { size, element_type } => (*size, (**element_type).clone()),
            other => return Err(IrError::type_mismatch("shufflevector", Kind::Vector, other)),
        };
        if let Some(lane) = mask.iter().find(|lane| (**lane as u64) >= size * 2) {
            return Err(IrError::invalid("shufflevector", format!("mask lane {lane} out of range")));
        }
        let result_type = IrType::vector_of(element_type, mask.len() as u64);
        self.emit_value(result_type.clone(), |result| Instruction::ShuffleVector {
            result,
            lhs,
            rhs,
            mask,
            result_type,
        })
    }

    pub fn build_ptr_diff(&mut self, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        same_type("ptrdiff", &lhs, &rhs)?;
        if !lhs.ty().is_pointer() {
            return Err(IrError::type_mismatch("ptrdiff", Kind::Pointer, lhs.ty()));
        }
        self.emit_value(IrType::I64, |result| Instruction::PtrDiff { result, lhs, rhs })
    }

    pub fn build_select(
        &mut self,
        condition: Value,
        true_value: Value,
        false_value: Value,
    ) -> Result<Value, IrError> {
        if condition.ty() != &IrType::I1 {
            return Err(IrError::type_mismatch("select", IrType::I1, condition.ty()));
        }
        same_type("select", &true_value, &false_value)?;
        let result_type = true_value.ty().clone();
        self.emit_value(result_type, |result| Instruction::Select {
            result,
            condition,
            true_value,
            false_value,
        })
    }

    /// Direct or indirect call; returns `None` for void callees
    pub fn build_call(
        &mut self,
        callee: Value,
        args: Vec<Value>,
    ) -> Result<Option<Value>, IrError> {
        let (return_type, params, is_vararg) = callee
            .ty()
            .callable_signature()
            .ok_or_else(|| IrError::type_mismatch("call", "function pointer", callee.ty()))?;
        let arity_ok = if is_vararg {
            args.len() >= params.len()
        } else {
            args.len() == params.len()
        };
        if !arity_ok {
            return Err(IrError::invalid(
                "call",
                format!("expected {} arguments, found {}", params.len(), args.len()),
            ));
        }
        for (param, arg) in params.iter().zip(&args) {
            if param != arg.ty() {
                return Err(IrError::type_mismatch("call", param, arg.ty()));
            }
        }
        let result_type = return_type.clone();
        if result_type.is_void() {
            self.emit(Instruction::Call {
                result: None,
                callee,
                args,
                result_type,
            })?;
            return Ok(None);
        }
        self.emit_value(result_type.clone(), |result| Instruction::Call {
            result: Some(result),
            callee,
            args,
            result_type,
        })
        .map(Some)
    }

    pub fn build_return(&mut self, value: Option<Value>) -> Result<(), IrError> {
        let expected = &self.function.return_type;
        match &value {
            Some(v) if v.ty() != expected => {
                return Err(IrError::type_mismatch("ret", expected, v.ty()));
            }
            None if !expected.is_void() => {
                return Err(IrError::type_mismatch("ret", expected, IrType::Void));
            }
            _ => {}
        }
        self.emit(Instruction::Return(value))
    }

    pub fn build_branch(&mut self, target: BlockId) -> Result<(), IrError> {
        self.function.block(target)?;
        self.emit(Instruction::Branch(target))
    }

    pub fn build_branch_cond(
        &mut self,
        condition: Value,
        true_block: BlockId,
        false_block: BlockId,
    ) -> Result<(), IrError> {
        if condition.ty() != &IrType::I1 {
            return Err(IrError::type_mismatch("br", IrType::I1, condition.ty()));
        }
        self.function.block(true_block)?;
        self.function.block(false_block)?;
        self.emit(Instruction::BranchCond {
            condition,
            true_block,
            false_block,
        })
    }

    pub fn build_unreachable(&mut self) -> Result<(), IrError> {
        self.emit(Instruction::Unreachable)
    }

    pub fn build_comment(&mut self, text: impl Into<String>) -> Result<(), IrError> {
        self.emit(Instruction::Comment(text.into()))
    }
}
