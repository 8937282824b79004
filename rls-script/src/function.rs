//! Script functions
//!
//! `ScriptFunction` is the handle a library hands out for a declared
//! function. `FunctionState` holds what one build pass tracks per function:
//! the entry block and the lazily created return slot and return block.

use rls_common::BlockId;
use rls_ir::{Constant, IrType, Value};

use crate::signature::Signature;

/// A function declared in a library
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFunction {
    /// Name inside its library
    pub name: String,
    /// Symbol of the IR function (address-prefixed unless external)
    pub symbol: String,
    pub signature: Signature,
}

impl ScriptFunction {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            signature,
        }
    }

    pub fn pointer_type(&self) -> IrType {
        self.signature.fn_type().pointer()
    }

    /// Address of the function as a callable value
    pub fn address(&self) -> Value {
        Constant::FunctionAddr {
            name: self.symbol.clone(),
            ty: self.pointer_type(),
        }
        .into()
    }
}

/// Per-function state shared by every generator of one build pass
#[derive(Debug)]
pub(crate) struct FunctionState {
    pub name: String,
    pub symbol: String,
    pub return_type: IrType,
    pub entry: BlockId,
    pub return_slot: Option<Value>,
    pub return_block: Option<BlockId>,
}

impl FunctionState {
    pub fn new(function: &ScriptFunction, entry: BlockId) -> Self {
        Self {
            name: function.name.clone(),
            symbol: function.symbol.clone(),
            return_type: function.signature.ret.clone(),
            entry,
            return_slot: None,
            return_block: None,
        }
    }
}
