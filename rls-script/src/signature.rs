//! Function signatures

use rls_ir::IrType;
use serde::{Deserialize, Serialize};

/// Parameter and return types of a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<IrType>,
    pub ret: IrType,
    pub varargs: bool,
}

impl Signature {
    pub fn new(params: Vec<IrType>, ret: IrType) -> Self {
        Self {
            params,
            ret,
            varargs: false,
        }
    }

    /// Accept extra arguments after the declared parameters
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn fn_type(&self) -> IrType {
        IrType::function(self.ret.clone(), self.params.clone(), self.varargs)
    }
}
