//! Return Protocol
//!
//! Every `ret` of a non-void function stores into one stack slot and
//! branches to one shared return block that loads the slot and returns it.
//! Slot and block are created on first use. `sret` bypasses them with a
//! direct return.

use rls_common::{BlockId, Result, ScriptError};
use rls_ir::{IrBuilder, Value};

use super::Generator;
use crate::operand::Operand;
use crate::types;

impl Generator<'_> {
    /// Create the return slot and return block if they do not exist yet.
    ///
    /// The slot is allocated at the very start of the entry block so it
    /// dominates every store. Void functions get a bare `ret void` block
    /// and no slot.
    pub(crate) fn setup_return(&mut self) -> Result<BlockId> {
        if let Some(block) = self.state.return_block {
            return Ok(block);
        }
        let return_type = self.state.return_type.clone();
        let entry = self.state.entry;
        let function = self.function_mut()?;
        let block = function.add_block("return");
        let slot = if return_type.is_void() {
            IrBuilder::at_end(function, block).build_return(None)?;
            None
        } else {
            let slot = IrBuilder::at(function, entry, 0).build_alloca(return_type, None)?;
            let mut builder = IrBuilder::at_end(function, block);
            let value = builder.build_load(slot.clone())?;
            builder.build_return(Some(value))?;
            Some(slot)
        };
        log::trace!("{}: return block {}", self.state.name, block);
        self.state.return_slot = slot;
        self.state.return_block = Some(block);
        Ok(block)
    }

    /// The shared return block, created on demand
    pub fn return_block(&mut self) -> Result<BlockId> {
        self.setup_return()
    }

    fn store_return(&mut self, value: Operand) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let slot = match &self.state.return_slot {
            Some(slot) => slot.clone(),
            None => return Ok(()),
        };
        let return_type = self.state.return_type.clone();
        let value = self.convert_to(value, &return_type)?;
        self.builder()?.build_store(value, slot)?;
        Ok(())
    }

    /// Return `value` (`Operand::Null` for none) through the return block.
    /// Void functions return directly. Does nothing once terminated.
    pub fn ret(&mut self, value: impl Into<Operand>) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.state.return_type.is_void() {
            self.builder()?.build_return(None)?;
            self.finished = true;
            return Ok(());
        }
        let block = self.setup_return()?;
        self.store_return(value.into())?;
        self.builder()?.build_branch(block)?;
        self.finished = true;
        Ok(())
    }

    /// Return `value` if `cond` holds, otherwise continue at `else_block`
    /// (finishing this generator) or at a fresh block (staying open)
    pub fn cret(
        &mut self,
        cond: impl Into<Operand>,
        value: impl Into<Operand>,
        else_block: Option<BlockId>,
    ) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let cond = self.convert_to(cond, &types::BOOL)?;
        let block = self.setup_return()?;
        self.store_return(value.into())?;
        let continuation = match else_block {
            Some(block) => block,
            None => self.add_block("block")?,
        };
        self.builder()?.build_branch_cond(cond, block, continuation)?;
        if else_block.is_some() {
            self.finished = true;
        } else {
            self.block = continuation;
        }
        Ok(())
    }

    /// Direct `ret` instruction, bypassing the shared return block
    pub fn sret(&mut self, value: impl Into<Operand>) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let value = value.into();
        let return_type = self.state.return_type.clone();
        let value: Option<Value> = if return_type.is_void() {
            None
        } else if value.is_null() {
            return Err(ScriptError::argument(format!(
                "{} must return a value",
                self.state.name
            )));
        } else {
            Some(self.convert_to(value, &return_type)?)
        };
        self.builder()?.build_return(value)?;
        self.finished = true;
        Ok(())
    }

    /// Store the return value without leaving the block; a later branch to
    /// `return_block()` completes the return
    pub fn pret(&mut self, value: impl Into<Operand>) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.setup_return()?;
        self.store_return(value.into())
    }
}
