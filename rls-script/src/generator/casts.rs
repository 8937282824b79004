//! Casts between integer, float and pointer types

use std::cmp::Ordering;

use rls_common::{Result, ScriptError, Signedness};
use rls_ir::{CastOp, IrType, Kind, Value};

use super::Generator;
use crate::convert::typename;
use crate::operand::Operand;

impl Generator<'_> {
    fn cast_value(&mut self, op: CastOp, value: Value, ty: &IrType) -> Result<Value> {
        Ok(self.builder()?.build_cast(op, value, ty.clone())?)
    }

    /// Reinterpret the bits of a value as another type of the same size
    pub fn bitcast(&mut self, value: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let value = self.convert(value)?;
        self.cast_value(CastOp::BitCast, value, ty)
    }

    /// Drop the high bits of an integer
    pub fn trunc(&mut self, value: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Integer)?;
        self.cast_value(CastOp::Trunc, value, ty)
    }

    /// Widen an integer, copying its sign bit
    pub fn sext(&mut self, value: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Integer)?;
        self.cast_value(CastOp::SExt, value, ty)
    }

    /// Widen an integer, filling with zeros
    pub fn zext(&mut self, value: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Integer)?;
        self.cast_value(CastOp::ZExt, value, ty)
    }

    /// Float to integer
    pub fn ftoi(
        &mut self,
        value: impl Into<Operand>,
        ty: &IrType,
        signedness: Signedness,
    ) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Decimal)?;
        let op = if signedness.is_signed() { CastOp::FPToSI } else { CastOp::FPToUI };
        self.cast_value(op, value, ty)
    }

    /// Integer to float
    pub fn itof(
        &mut self,
        value: impl Into<Operand>,
        ty: &IrType,
        signedness: Signedness,
    ) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Integer)?;
        let op = if signedness.is_signed() { CastOp::SIToFP } else { CastOp::UIToFP };
        self.cast_value(op, value, ty)
    }

    pub fn ptrtoint(&mut self, ptr: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let ptr = self.pointer("ptrtoint", ptr)?;
        self.cast_value(CastOp::PtrToInt, ptr, ty)
    }

    pub fn inttoptr(&mut self, value: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Integer)?;
        self.cast_value(CastOp::IntToPtr, value, ty)
    }

    /// Resize within one family: integers (sign-extending), floats or
    /// pointers. Casting to the same type returns the value unchanged.
    pub fn cast(&mut self, value: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        let value = self.convert(value)?;
        let from = value.ty();
        if from == ty {
            return Ok(value);
        }
        let op = if from.is_integer() && ty.is_integer() {
            match from.bit_width().cmp(&ty.bit_width()) {
                Ordering::Greater => CastOp::Trunc,
                _ => CastOp::SExt,
            }
        } else if from.is_decimal() && ty.is_decimal() {
            match from.bit_width().cmp(&ty.bit_width()) {
                Ordering::Greater => CastOp::FPTrunc,
                _ => CastOp::FPExt,
            }
        } else if from.is_pointer() && ty.is_pointer() {
            CastOp::BitCast
        } else {
            return Err(ScriptError::argument(format!(
                "cannot cast {} to {}",
                typename(from),
                typename(ty)
            )));
        };
        self.cast_value(op, value, ty)
    }

    /// Distance between two pointers, in elements
    pub fn diff(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        let lhs = self.pointer("diff", lhs)?;
        let rhs = self.pointer("diff", rhs)?;
        Ok(self.builder()?.build_ptr_diff(lhs, rhs)?)
    }
}
