//! Instruction semantics

use rls_common::{BlockId, TempId};

use super::value::{Pointer, RuntimeValue};
use super::{ExecError, Interpreter};
use crate::function::Function;
use crate::instructions::Instruction;
use crate::ops::{BinaryOp, CastOp, IntPredicate};
use crate::types::IrType;
use crate::values::{normalize_int, unsigned_bits, Value};

enum Flow {
    Next,
    Jump(BlockId),
    Return(RuntimeValue),
}

struct Frame<'m> {
    function: &'m Function,
    temps: Vec<Option<RuntimeValue>>,
}

fn type_error(message: impl Into<String>) -> ExecError {
    ExecError::TypeError {
        message: message.into(),
    }
}

/// Interpret `value` as a signed integer of `width` bits (`i1` true is -1)
fn signed(width: u32, value: i64) -> i64 {
    if width == 1 {
        -(value & 1)
    } else {
        normalize_int(width, value)
    }
}

fn width_of(ty: &IrType) -> u32 {
    ty.bit_width().unwrap_or(64)
}

/// Round to the precision of a float type
fn round(ty: &IrType, value: f64) -> f64 {
    if *ty == IrType::F32 {
        value as f32 as f64
    } else {
        value
    }
}

fn int(value: &RuntimeValue) -> Result<i64, ExecError> {
    value.as_int().ok_or_else(|| type_error(format!("expected integer, found {value}")))
}

fn float(value: &RuntimeValue) -> Result<f64, ExecError> {
    value.as_float().ok_or_else(|| type_error(format!("expected float, found {value}")))
}

fn pointer(value: &RuntimeValue) -> Result<&Pointer, ExecError> {
    value.as_pointer().ok_or_else(|| type_error(format!("expected pointer, found {value}")))
}

fn elements(value: &RuntimeValue) -> Result<&[RuntimeValue], ExecError> {
    value.as_aggregate().ok_or_else(|| type_error(format!("expected aggregate, found {value}")))
}

/// Pointer to integer encoding: allocation in the high half, element offset in the low half
fn encode_pointer(ptr: &Pointer) -> Result<i64, ExecError> {
    match ptr {
        Pointer::Null => Ok(0),
        Pointer::Memory { alloc, path } if path.len() == 1 => {
            Ok(((*alloc as i64 + 1) << 32) + path[0])
        }
        other => Err(type_error(format!("cannot convert interior pointer {other} to an integer"))),
    }
}

fn decode_pointer(value: i64) -> Pointer {
    if value == 0 {
        return Pointer::Null;
    }
    let alloc = (value >> 32) - 1;
    Pointer::Memory {
        alloc: alloc.max(0) as usize,
        path: vec![value & 0xffff_ffff],
    }
}

/// Bit-cast a runtime value between two types of equal size
pub(super) fn bit_cast(
    value: RuntimeValue,
    from: &IrType,
    to: &IrType,
) -> Result<RuntimeValue, ExecError> {
    if from == to {
        return Ok(value);
    }
    match (from, to) {
        (IrType::Pointer(source), IrType::Pointer(target)) => {
            let RuntimeValue::Pointer(mut ptr) = value else {
                return Ok(value);
            };
            // Casting an aggregate pointer to a pointer to its leading member
            let mut current = source.as_ref();
            while current != target.as_ref() {
                match current.field_type(0) {
                    Some(first) => {
                        ptr = ptr.child(0);
                        current = first;
                    }
                    None => break,
                }
            }
            Ok(RuntimeValue::Pointer(ptr))
        }
        (IrType::I32, IrType::F32) => {
            Ok(RuntimeValue::Float(f32::from_bits(int(&value)? as u32) as f64))
        }
        (IrType::F32, IrType::I32) => {
            Ok(RuntimeValue::Int((float(&value)? as f32).to_bits() as i32 as i64))
        }
        (IrType::I64, IrType::F64) => Ok(RuntimeValue::Float(f64::from_bits(int(&value)? as u64))),
        (IrType::F64, IrType::I64) => Ok(RuntimeValue::Int(float(&value)?.to_bits() as i64)),
        _ => Ok(value),
    }
}

fn int_binary(op: BinaryOp, width: u32, a: i64, b: i64, function: &str) -> Result<i64, ExecError> {
    let ua = unsigned_bits(width, a);
    let ub = unsigned_bits(width, b);
    let sa = signed(width, a);
    let sb = signed(width, b);
    let division_by_zero = || ExecError::DivisionByZero {
        function: function.to_string(),
    };
    let result = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::SDiv => {
            if sb == 0 {
                return Err(division_by_zero());
            }
            sa.wrapping_div(sb)
        }
        BinaryOp::SRem => {
            if sb == 0 {
                return Err(division_by_zero());
            }
            sa.wrapping_rem(sb)
        }
        BinaryOp::UDiv => {
            if ub == 0 {
                return Err(division_by_zero());
            }
            (ua / ub) as i64
        }
        BinaryOp::URem => {
            if ub == 0 {
                return Err(division_by_zero());
            }
            (ua % ub) as i64
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl => {
            if ub >= width as u64 {
                0
            } else {
                a.wrapping_shl(ub as u32)
            }
        }
        BinaryOp::LShr => {
            if ub >= width as u64 {
                0
            } else {
                (ua >> ub) as i64
            }
        }
        BinaryOp::AShr => {
            if ub >= width as u64 {
                if sa < 0 {
                    -1
                } else {
                    0
                }
            } else {
                sa >> ub
            }
        }
        other => return Err(type_error(format!("{other} is not an integer operation"))),
    };
    Ok(normalize_int(width, result))
}

fn float_binary(op: BinaryOp, a: f64, b: f64) -> Result<f64, ExecError> {
    Ok(match op {
        BinaryOp::FAdd => a + b,
        BinaryOp::FSub => a - b,
        BinaryOp::FMul => a * b,
        BinaryOp::FDiv => a / b,
        BinaryOp::FRem => a % b,
        other => return Err(type_error(format!("{other} is not a float operation"))),
    })
}

fn compare_ints(predicate: IntPredicate, width: u32, a: i64, b: i64) -> bool {
    let (ua, ub) = (unsigned_bits(width, a), unsigned_bits(width, b));
    let (sa, sb) = (signed(width, a), signed(width, b));
    match predicate {
        IntPredicate::Eq => ua == ub,
        IntPredicate::Ne => ua != ub,
        IntPredicate::Ugt => ua > ub,
        IntPredicate::Uge => ua >= ub,
        IntPredicate::Ult => ua < ub,
        IntPredicate::Ule => ua <= ub,
        IntPredicate::Sgt => sa > sb,
        IntPredicate::Sge => sa >= sb,
        IntPredicate::Slt => sa < sb,
        IntPredicate::Sle => sa <= sb,
    }
}

fn compare_pointers(predicate: IntPredicate, a: &Pointer, b: &Pointer) -> bool {
    let key = |p: &Pointer| match p {
        Pointer::Null => (-1i64, Vec::new()),
        Pointer::Memory { alloc, path } => (*alloc as i64, path.clone()),
    };
    let (ka, kb) = (key(a), key(b));
    match predicate {
        IntPredicate::Eq => ka == kb,
        IntPredicate::Ne => ka != kb,
        IntPredicate::Ugt | IntPredicate::Sgt => ka > kb,
        IntPredicate::Uge | IntPredicate::Sge => ka >= kb,
        IntPredicate::Ult | IntPredicate::Slt => ka < kb,
        IntPredicate::Ule | IntPredicate::Sle => ka <= kb,
    }
}

fn member_mut<'v>(
    mut value: &'v mut RuntimeValue,
    indices: &[u32],
) -> Result<&'v mut RuntimeValue, ExecError> {
    for index in indices {
        let RuntimeValue::Aggregate(members) = value else {
            return Err(type_error("insertvalue into a scalar"));
        };
        value = members
            .get_mut(*index as usize)
            .ok_or_else(|| type_error(format!("aggregate index {index} out of range")))?;
    }
    Ok(value)
}

impl<'m> Interpreter<'m> {
    pub(super) fn execute_function(
        &mut self,
        function: &'m Function,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, ExecError> {
        let mut frame = Frame {
            function,
            temps: vec![None; function.temp_count() as usize],
        };
        for (i, arg) in args.into_iter().take(function.params.len()).enumerate() {
            frame.temps[i] = Some(arg);
        }

        let mut current = function.entry_block().ok_or_else(|| ExecError::UnknownFunction {
            name: function.name.clone(),
        })?;
        loop {
            let block = function.blocks.iter().find(|b| b.id == current).ok_or_else(|| {
                ExecError::MissingTerminator {
                    function: function.name.clone(),
                    block: current,
                }
            })?;
            let mut next = None;
            for instr in &block.instructions {
                self.steps += 1;
                if self.steps > self.config.step_limit {
                    return Err(ExecError::StepLimit {
                        limit: self.config.step_limit,
                    });
                }
                match self.execute(&mut frame, instr)? {
                    Flow::Next => {}
                    Flow::Jump(target) => {
                        next = Some(target);
                        break;
                    }
                    Flow::Return(value) => return Ok(value),
                }
            }
            current = next.ok_or_else(|| ExecError::MissingTerminator {
                function: function.name.clone(),
                block: current,
            })?;
        }
    }

    fn value(&self, frame: &Frame<'_>, value: &Value) -> Result<RuntimeValue, ExecError> {
        match value {
            Value::Temp { id, .. } => frame
                .temps
                .get(*id as usize)
                .and_then(Option::clone)
                .ok_or_else(|| {
                    let name = &frame.function.name;
                    type_error(format!("%{id} used before definition in '{name}'"))
                }),
            Value::Constant(constant) => self.constant(constant),
        }
    }

    fn set(frame: &mut Frame<'_>, id: TempId, value: RuntimeValue) -> Result<(), ExecError> {
        let slot = frame
            .temps
            .get_mut(id as usize)
            .ok_or_else(|| type_error(format!("%{id} out of range")))?;
        *slot = Some(value);
        Ok(())
    }

    fn binary(
        &self,
        op: BinaryOp,
        ty: &IrType,
        a: RuntimeValue,
        b: RuntimeValue,
        function: &str,
    ) -> Result<RuntimeValue, ExecError> {
        if let IrType::Vector { element_type, .. } = ty {
            let lanes = elements(&a)?
                .iter()
                .zip(elements(&b)?)
                .map(|(x, y)| self.binary(op, element_type, x.clone(), y.clone(), function))
                .collect::<Result<_, _>>()?;
            return Ok(RuntimeValue::Aggregate(lanes));
        }
        if op.is_float() {
            Ok(RuntimeValue::Float(round(ty, float_binary(op, float(&a)?, float(&b)?)?)))
        } else {
            Ok(RuntimeValue::Int(int_binary(op, width_of(ty), int(&a)?, int(&b)?, function)?))
        }
    }

    fn cast(
        &self,
        op: CastOp,
        value: RuntimeValue,
        from: &IrType,
        to: &IrType,
    ) -> Result<RuntimeValue, ExecError> {
        let from_width = width_of(from);
        let to_width = width_of(to);
        let wrap = |n: i64| RuntimeValue::Int(normalize_int(to_width, n));
        Ok(match op {
            CastOp::Trunc => wrap(int(&value)?),
            CastOp::ZExt => wrap(unsigned_bits(from_width, int(&value)?) as i64),
            CastOp::SExt => wrap(signed(from_width, int(&value)?)),
            CastOp::FPTrunc | CastOp::FPExt => RuntimeValue::Float(round(to, float(&value)?)),
            CastOp::FPToSI => wrap(float(&value)?.trunc() as i64),
            CastOp::FPToUI => wrap(float(&value)?.trunc() as u64 as i64),
            CastOp::SIToFP => {
                RuntimeValue::Float(round(to, signed(from_width, int(&value)?) as f64))
            }
            CastOp::UIToFP => {
                RuntimeValue::Float(round(to, unsigned_bits(from_width, int(&value)?) as f64))
            }
            CastOp::PtrToInt => wrap(encode_pointer(pointer(&value)?)?),
            CastOp::IntToPtr => RuntimeValue::Pointer(decode_pointer(int(&value)?)),
            CastOp::BitCast => bit_cast(value, from, to)?,
        })
    }

    fn execute(&mut self, frame: &mut Frame<'m>, instr: &Instruction) -> Result<Flow, ExecError> {
        let function: &'m Function = frame.function;
        let name = function.name.as_str();
        match instr {
            Instruction::Binary {
                result,
                op,
                lhs,
                rhs,
                result_type,
            } => {
                let a = self.value(frame, lhs)?;
                let b = self.value(frame, rhs)?;
                let v = self.binary(*op, result_type, a, b, name)?;
                Self::set(frame, *result, v)?;
            }
            Instruction::ICmp {
                result,
                predicate,
                lhs,
                rhs,
            } => {
                let a = self.value(frame, lhs)?;
                let b = self.value(frame, rhs)?;
                let outcome = match (&a, &b) {
                    (RuntimeValue::Pointer(pa), RuntimeValue::Pointer(pb)) => {
                        compare_pointers(*predicate, pa, pb)
                    }
                    _ => compare_ints(*predicate, width_of(lhs.ty()), int(&a)?, int(&b)?),
                };
                Self::set(frame, *result, RuntimeValue::Int(outcome as i64))?;
            }
            Instruction::FCmp {
                result,
                predicate,
                lhs,
                rhs,
            } => {
                let a = float(&self.value(frame, lhs)?)?;
                let b = float(&self.value(frame, rhs)?)?;
                Self::set(frame, *result, RuntimeValue::Int(predicate.evaluate(a, b) as i64))?;
            }
            Instruction::Cast {
                result,
                op,
                value,
                target_type,
            } => {
                let v = self.value(frame, value)?;
                let cast = self.cast(*op, v, value.ty(), target_type)?;
                Self::set(frame, *result, cast)?;
            }
            Instruction::Alloca {
                result,
                alloc_type,
                count,
            }
            | Instruction::Malloc {
                result,
                alloc_type,
                count,
            } => {
                let count = match count {
                    Some(count) => usize::try_from(int(&self.value(frame, count)?)?)
                        .map_err(|_| type_error("negative allocation count"))?,
                    None => 1,
                };
                let ptr = self.memory.allocate(alloc_type, count);
                Self::set(frame, *result, RuntimeValue::Pointer(ptr))?;
            }
            Instruction::Free { ptr } => {
                let p = self.value(frame, ptr)?;
                self.memory.free(pointer(&p)?)?;
            }
            Instruction::Load { result, ptr, .. } => {
                let p = self.value(frame, ptr)?;
                let loaded = self.memory.load(pointer(&p)?)?;
                Self::set(frame, *result, loaded)?;
            }
            Instruction::Store { value, ptr } => {
                let v = self.value(frame, value)?;
                let p = self.value(frame, ptr)?;
                self.memory.store(pointer(&p)?, v)?;
            }
            Instruction::GetElementPtr {
                result, ptr, indices, ..
            } => {
                let base = self.value(frame, ptr)?;
                let mut p = pointer(&base)?.clone();
                for (i, index) in indices.iter().enumerate() {
                    let offset = int(&self.value(frame, index)?)?;
                    p = if i == 0 { p.offset(offset) } else { p.child(offset) };
                }
                Self::set(frame, *result, RuntimeValue::Pointer(p))?;
            }
            Instruction::ExtractValue {
                result,
                aggregate,
                indices,
                ..
            } => {
                let mut v = self.value(frame, aggregate)?;
                for index in indices {
                    v = elements(&v)?
                        .get(*index as usize)
                        .cloned()
                        .ok_or_else(|| {
                            type_error(format!("aggregate index {index} out of range"))
                        })?;
                }
                Self::set(frame, *result, v)?;
            }
            Instruction::InsertValue {
                result,
                aggregate,
                element,
                indices,
            } => {
                let mut v = self.value(frame, aggregate)?;
                let e = self.value(frame, element)?;
                *member_mut(&mut v, indices)? = e;
                Self::set(frame, *result, v)?;
            }
            Instruction::ExtractElement {
                result, vector, index, ..
            } => {
                let v = self.value(frame, vector)?;
                let i = int(&self.value(frame, index)?)?;
                let lane = elements(&v)?
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| type_error(format!("vector lane {i} out of range")))?;
                Self::set(frame, *result, lane)?;
            }
            Instruction::InsertElement {
                result,
                vector,
                element,
                index,
            } => {
                let mut v = self.value(frame, vector)?;
                let e = self.value(frame, element)?;
                let i = int(&self.value(frame, index)?)?;
                let RuntimeValue::Aggregate(lanes) = &mut v else {
                    return Err(type_error("insertelement into a scalar"));
                };
                let slot = lanes
                    .get_mut(i as usize)
                    .ok_or_else(|| type_error(format!("vector lane {i} out of range")))?;
                *slot = e;
                Self::set(frame, *result, v)?;
            }
            Instruction::ShuffleVector {
                result, lhs, rhs, mask, ..
            } => {
                let a = self.value(frame, lhs)?;
                let b = self.value(frame, rhs)?;
                let lanes: Vec<RuntimeValue> =
                    elements(&a)?.iter().chain(elements(&b)?).cloned().collect();
                let shuffled = mask
                    .iter()
                    .map(|m| {
                        lanes
                            .get(*m as usize)
                            .cloned()
                            .ok_or_else(|| type_error(format!("mask lane {m} out of range")))
                    })
                    .collect::<Result<_, _>>()?;
                Self::set(frame, *result, RuntimeValue::Aggregate(shuffled))?;
            }
            Instruction::PtrDiff { result, lhs, rhs } => {
                let a = self.value(frame, lhs)?;
                let b = self.value(frame, rhs)?;
                let diff = match (pointer(&a)?, pointer(&b)?) {
                    (
                        Pointer::Memory { alloc: x, path: px },
                        Pointer::Memory { alloc: y, path: py },
                    ) if x == y
                        && px.len() == py.len()
                        && px[..px.len() - 1] == py[..py.len() - 1] =>
                    {
                        px[px.len() - 1] - py[py.len() - 1]
                    }
                    (Pointer::Null, Pointer::Null) => 0,
                    _ => return Err(type_error("ptrdiff between unrelated pointers")),
                };
                Self::set(frame, *result, RuntimeValue::Int(diff))?;
            }
            Instruction::Select {
                result,
                condition,
                true_value,
                false_value,
            } => {
                let chosen = if int(&self.value(frame, condition)?)? != 0 {
                    self.value(frame, true_value)?
                } else {
                    self.value(frame, false_value)?
                };
                Self::set(frame, *result, chosen)?;
            }
            Instruction::Call {
                result, callee, args, ..
            } => {
                let target = match self.value(frame, callee)? {
                    RuntimeValue::Function(target) => target,
                    other => {
                        let message = format!("call through non-function value {other}");
                        return Err(type_error(message));
                    }
                };
                let args = args
                    .iter()
                    .map(|arg| self.value(frame, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let returned = self.call(&target, args)?;
                if let Some(result) = result {
                    Self::set(frame, *result, returned)?;
                }
            }
            Instruction::Return(value) => {
                let returned = match value {
                    Some(value) => self.value(frame, value)?,
                    None => RuntimeValue::Void,
                };
                return Ok(Flow::Return(returned));
            }
            Instruction::Branch(target) => return Ok(Flow::Jump(*target)),
            Instruction::BranchCond {
                condition,
                true_block,
                false_block,
            } => {
                let taken = int(&self.value(frame, condition)?)? != 0;
                return Ok(Flow::Jump(if taken { *true_block } else { *false_block }));
            }
            Instruction::Unreachable => {
                return Err(ExecError::Unreachable {
                    function: name.to_string(),
                })
            }
            Instruction::Comment(_) => {}
        }
        Ok(Flow::Next)
    }
}
