//! Common type aliases
//!
//! C-like names for the IR types generated code uses most.

use rls_ir::IrType;

pub const VOID: IrType = IrType::Void;
pub const BOOL: IrType = IrType::I1;
pub const CHAR: IrType = IrType::I8;
pub const SHORT: IrType = IrType::I16;
pub const INT: IrType = IrType::I32;
pub const LONG: IrType = IrType::I64;
pub const FLOAT: IrType = IrType::F32;
pub const DOUBLE: IrType = IrType::F64;

/// `i8*`, the untyped pointer
pub fn void_ptr() -> IrType {
    CHAR.pointer()
}

/// `i8**`, as taken by `main` for its argument vector
pub fn void_ptr_ptr() -> IrType {
    void_ptr().pointer()
}
