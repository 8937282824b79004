//! Structural verification of modules
//!
//! A defined function is well formed when every block is non-empty, ends in
//! exactly one terminator, and only branches to blocks of the same function.

use crate::function::Function;
use crate::module::Module;
use crate::IrError;

pub fn verify_module(module: &Module) -> Result<(), IrError> {
    for function in &module.functions {
        verify_function(function)?;
    }
    Ok(())
}

pub fn verify_function(function: &Function) -> Result<(), IrError> {
    if function.is_declaration() {
        return Ok(());
    }

    for block in &function.blocks {
        let fail = |message: String| IrError::Verification {
            function: function.name.clone(),
            block: block.id,
            message,
        };

        let Some(last) = block.instructions.last() else {
            return Err(fail("block is empty".to_string()));
        };
        if !last.is_terminator() {
            return Err(fail("block does not end in a terminator".to_string()));
        }
        let early = block.instructions[..block.instructions.len() - 1]
            .iter()
            .filter(|instr| instr.is_terminator())
            .count();
        if early > 0 {
            return Err(fail(format!("{early} terminator(s) before the end of the block")));
        }
        for target in last.successors() {
            if function.position(target).is_none() {
                return Err(fail(format!("branch to unknown block {target}")));
            }
        }
    }

    log::trace!("verified function '{}'", function.name);
    Ok(())
}
