//! Arithmetic, bitwise and comparison operations

use std::fmt;
use std::str::FromStr;

use rls_common::{Result, ScriptError, Signedness};
use rls_ir::{BinaryOp, Constant, FloatPredicate, IntPredicate, Kind, Value};

use super::Generator;
use crate::convert::typename;
use crate::operand::Operand;

/// Operator accepted by `Generator::opr`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opr {
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Uno,
    Ueq,
    Une,
}

impl Opr {
    const ALL: [Opr; 23] = [
        Opr::And,
        Opr::Or,
        Opr::Xor,
        Opr::Eq,
        Opr::Ne,
        Opr::Ugt,
        Opr::Uge,
        Opr::Ult,
        Opr::Ule,
        Opr::Sgt,
        Opr::Sge,
        Opr::Slt,
        Opr::Sle,
        Opr::Oeq,
        Opr::Ogt,
        Opr::Oge,
        Opr::Olt,
        Opr::Ole,
        Opr::One,
        Opr::Ord,
        Opr::Uno,
        Opr::Ueq,
        Opr::Une,
    ];

    fn name(self) -> &'static str {
        match self {
            Opr::And => "and",
            Opr::Or => "or",
            Opr::Xor => "xor",
            Opr::Eq => "eq",
            Opr::Ne => "ne",
            Opr::Ugt => "ugt",
            Opr::Uge => "uge",
            Opr::Ult => "ult",
            Opr::Ule => "ule",
            Opr::Sgt => "sgt",
            Opr::Sge => "sge",
            Opr::Slt => "slt",
            Opr::Sle => "sle",
            Opr::Oeq => "oeq",
            Opr::Ogt => "ogt",
            Opr::Oge => "oge",
            Opr::Olt => "olt",
            Opr::Ole => "ole",
            Opr::One => "one",
            Opr::Ord => "ord",
            Opr::Uno => "uno",
            Opr::Ueq => "ueq",
            Opr::Une => "une",
        }
    }
}

impl fmt::Display for Opr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Opr {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self> {
        Opr::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ScriptError::argument(format!("Invalid operator '{s}'")))
    }
}

/// Instruction family an operator lowers to for a given operand category
enum Lowering {
    Bitwise(BinaryOp),
    Int(IntPredicate),
    Float(FloatPredicate),
}

fn lower(op: Opr, is_float: bool) -> Option<Lowering> {
    use Lowering::*;
    let lowering = match (op, is_float) {
        (Opr::And, false) => Bitwise(BinaryOp::And),
        (Opr::Or, false) => Bitwise(BinaryOp::Or),
        (Opr::Xor, false) => Bitwise(BinaryOp::Xor),
        (Opr::Eq, false) => Int(IntPredicate::Eq),
        (Opr::Ne, false) => Int(IntPredicate::Ne),
        (Opr::Eq, true) => Float(FloatPredicate::Oeq),
        (Opr::Ne, true) => Float(FloatPredicate::Une),
        (Opr::Sgt, false) => Int(IntPredicate::Sgt),
        (Opr::Sge, false) => Int(IntPredicate::Sge),
        (Opr::Slt, false) => Int(IntPredicate::Slt),
        (Opr::Sle, false) => Int(IntPredicate::Sle),
        (Opr::Ugt, false) => Int(IntPredicate::Ugt),
        (Opr::Uge, false) => Int(IntPredicate::Uge),
        (Opr::Ult, false) => Int(IntPredicate::Ult),
        (Opr::Ule, false) => Int(IntPredicate::Ule),
        (Opr::Ugt, true) => Float(FloatPredicate::Ugt),
        (Opr::Uge, true) => Float(FloatPredicate::Uge),
        (Opr::Ult, true) => Float(FloatPredicate::Ult),
        (Opr::Ule, true) => Float(FloatPredicate::Ule),
        (Opr::Oeq, true) => Float(FloatPredicate::Oeq),
        (Opr::Ogt, true) => Float(FloatPredicate::Ogt),
        (Opr::Oge, true) => Float(FloatPredicate::Oge),
        (Opr::Olt, true) => Float(FloatPredicate::Olt),
        (Opr::Ole, true) => Float(FloatPredicate::Ole),
        (Opr::One, true) => Float(FloatPredicate::One),
        (Opr::Ord, true) => Float(FloatPredicate::Ord),
        (Opr::Uno, true) => Float(FloatPredicate::Uno),
        (Opr::Ueq, true) => Float(FloatPredicate::Ueq),
        (Opr::Une, true) => Float(FloatPredicate::Une),
        _ => return None,
    };
    Some(lowering)
}

impl Generator<'_> {
    /// Convert `lhs` as a number and `rhs` to the exact type of `lhs`
    fn numeric_operands(
        &mut self,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<(Value, Value)> {
        let lhs = self.convert_kind(lhs, Kind::Numeric)?;
        let rhs = self.convert_to(rhs, lhs.ty())?;
        Ok((lhs, rhs))
    }

    /// Like `numeric_operands`, but `lhs` is read as an integer, so a
    /// float literal is truncated
    fn integer_operands(
        &mut self,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<(Value, Value)> {
        let lhs = self.convert_kind(lhs, Kind::Integer)?;
        let rhs = self.convert_to(rhs, lhs.ty())?;
        Ok((lhs, rhs))
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
        Ok(self.builder()?.build_binary(op, lhs, rhs)?)
    }

    /// Integer or float flavour of an arithmetic operation, chosen by the
    /// left operand
    fn arithmetic(
        &mut self,
        int_op: BinaryOp,
        float_op: BinaryOp,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<Value> {
        let (lhs, rhs) = self.numeric_operands(lhs, rhs)?;
        let op = if lhs.ty().is_decimal() { float_op } else { int_op };
        self.binary(op, lhs, rhs)
    }

    pub fn add(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        self.arithmetic(BinaryOp::Add, BinaryOp::FAdd, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        self.arithmetic(BinaryOp::Sub, BinaryOp::FSub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        self.arithmetic(BinaryOp::Mul, BinaryOp::FMul, lhs, rhs)
    }

    fn division(
        &mut self,
        ops: (BinaryOp, BinaryOp, BinaryOp),
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        signedness: Signedness,
    ) -> Result<Value> {
        let (lhs, rhs) = self.numeric_operands(lhs, rhs)?;
        if rhs.is_zero() {
            return Err(ScriptError::DivisionByZero);
        }
        let (signed, unsigned, float) = ops;
        let op = if lhs.ty().is_decimal() {
            float
        } else if signedness.is_signed() {
            signed
        } else {
            unsigned
        };
        self.binary(op, lhs, rhs)
    }

    /// Quotient; a constant zero divisor fails before anything is emitted
    pub fn div(
        &mut self,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        signedness: Signedness,
    ) -> Result<Value> {
        self.division((BinaryOp::SDiv, BinaryOp::UDiv, BinaryOp::FDiv), lhs, rhs, signedness)
    }

    /// Remainder; a constant zero divisor fails before anything is emitted
    pub fn rem(
        &mut self,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        signedness: Signedness,
    ) -> Result<Value> {
        self.division((BinaryOp::SRem, BinaryOp::URem, BinaryOp::FRem), lhs, rhs, signedness)
    }

    pub fn shl(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        let (lhs, rhs) = self.integer_operands(lhs, rhs)?;
        self.binary(BinaryOp::Shl, lhs, rhs)
    }

    /// Arithmetic (sign-filling) right shift
    pub fn ashr(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        let (lhs, rhs) = self.integer_operands(lhs, rhs)?;
        self.binary(BinaryOp::AShr, lhs, rhs)
    }

    /// Logical (zero-filling) right shift
    pub fn lshr(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Value> {
        let (lhs, rhs) = self.integer_operands(lhs, rhs)?;
        self.binary(BinaryOp::LShr, lhs, rhs)
    }

    /// Two's complement negation (`0 - value`)
    pub fn neg(&mut self, value: impl Into<Operand>) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Numeric)?;
        let zero: Value = Constant::zero(value.ty()).into();
        let op = if value.ty().is_decimal() { BinaryOp::FSub } else { BinaryOp::Sub };
        self.binary(op, zero, value)
    }

    /// Bitwise not
    pub fn invert(&mut self, value: impl Into<Operand>) -> Result<Value> {
        let value = self.convert_kind(value, Kind::Integer)?;
        let ones = Value::int(value.ty().clone(), -1);
        self.binary(BinaryOp::Xor, value, ones)
    }

    /// Add one to the value behind `ptr`, returning `ptr`
    pub fn inc(&mut self, ptr: impl Into<Operand>) -> Result<Value> {
        self.inc_by(ptr, 1)
    }

    pub fn inc_by(&mut self, ptr: impl Into<Operand>, amount: impl Into<Operand>) -> Result<Value> {
        self.step(ptr, amount, "inc", (BinaryOp::Add, BinaryOp::FAdd))
    }

    /// Subtract one from the value behind `ptr`, returning `ptr`
    pub fn dec(&mut self, ptr: impl Into<Operand>) -> Result<Value> {
        self.dec_by(ptr, 1)
    }

    pub fn dec_by(&mut self, ptr: impl Into<Operand>, amount: impl Into<Operand>) -> Result<Value> {
        self.step(ptr, amount, "dec", (BinaryOp::Sub, BinaryOp::FSub))
    }

    fn step(
        &mut self,
        ptr: impl Into<Operand>,
        amount: impl Into<Operand>,
        operation: &str,
        (int_op, float_op): (BinaryOp, BinaryOp),
    ) -> Result<Value> {
        let ptr = self.pointer(operation, ptr)?;
        let current = self.builder()?.build_load(ptr.clone())?;
        let updated = self.arithmetic(int_op, float_op, current, amount)?;
        self.builder()?.build_store(updated, ptr.clone())?;
        Ok(ptr)
    }

    /// Compare or combine two operands with the named operator.
    ///
    /// `eq`/`ne` and the `u*` family work on integers and floats; the
    /// remaining `o*`, `ord` and `uno` predicates need floats and the signed
    /// and bitwise operators need integers.
    pub fn opr(
        &mut self,
        op: Opr,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<Value> {
        let (lhs, rhs) = self.numeric_operands(lhs, rhs)?;
        let is_float = lhs.ty().is_decimal();
        let lowering = lower(op, is_float).ok_or_else(|| {
            let given = typename(lhs.ty());
            ScriptError::argument(format!("operator '{op}' cannot be applied to {given}"))
        })?;
        let mut builder = self.builder()?;
        let result = match lowering {
            Lowering::Bitwise(op) => builder.build_binary(op, lhs, rhs)?,
            Lowering::Int(predicate) => builder.build_icmp(predicate, lhs, rhs)?,
            Lowering::Float(predicate) => builder.build_fcmp(predicate, lhs, rhs)?,
        };
        Ok(result)
    }

    /// `cond ? if_true : if_false`
    pub fn select(
        &mut self,
        cond: impl Into<Operand>,
        if_true: impl Into<Operand>,
        if_false: impl Into<Operand>,
    ) -> Result<Value> {
        let if_true = self.convert(if_true)?;
        let cond = self.convert_to(cond, &crate::types::BOOL)?;
        let if_false = self.convert_to(if_false, if_true.ty())?;
        Ok(self.builder()?.build_select(cond, if_true, if_false)?)
    }

    fn null_check(
        &mut self,
        operation: &str,
        value: Operand,
        predicate: IntPredicate,
    ) -> Result<Value> {
        let value = value
            .into_value()
            .ok_or_else(|| ScriptError::argument(format!("{operation} requires an IR value")))?;
        let null: Value = value.ty().null().into();
        Ok(self.builder()?.build_icmp(predicate, value, null)?)
    }

    pub fn is_null(&mut self, value: impl Into<Operand>) -> Result<Value> {
        self.null_check("is_null", value.into(), IntPredicate::Eq)
    }

    pub fn is_not_null(&mut self, value: impl Into<Operand>) -> Result<Value> {
        self.null_check("is_not_null", value.into(), IntPredicate::Ne)
    }
}
