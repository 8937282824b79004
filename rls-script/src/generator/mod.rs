//! Generator
//!
//! A cursor bound to one basic block of the function being built. Every
//! operation converts its operands, emits through an `IrBuilder` and keeps
//! track of whether the current block has been terminated. Combinators
//! (`block`, `cond`, `lp`) hand child generators to closures; a child shares
//! the library and the function state with its parent and must be done
//! before the parent continues.

mod arith;
mod call;
mod casts;
mod control_flow;
mod memory;
mod returns;

pub use arith::Opr;
pub use call::Callable;
pub use control_flow::{Arm, Cond, Loop};
pub use memory::GepIndex;

use rls_common::{BlockId, Result, ScriptError};
use rls_ir::{Function, IrBuilder, IrType, Kind, Value};

use crate::convert::{convert, Hint};
use crate::function::FunctionState;
use crate::library::Library;
use crate::operand::Operand;

/// Where a generator ended up after its body ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    /// Block the generator was created for
    pub start: BlockId,
    /// Block it was positioned at when the body returned
    pub current: BlockId,
    pub finished: bool,
}

/// Instruction emitter for one function body
pub struct Generator<'a> {
    library: &'a mut Library,
    state: &'a mut FunctionState,
    start_block: BlockId,
    block: BlockId,
    finished: bool,
    loop_block: Option<BlockId>,
    break_block: Option<BlockId>,
}

impl<'a> Generator<'a> {
    pub(crate) fn new(
        library: &'a mut Library,
        state: &'a mut FunctionState,
        block: BlockId,
    ) -> Self {
        Self {
            library,
            state,
            start_block: block,
            block,
            finished: false,
            loop_block: None,
            break_block: None,
        }
    }

    /// Generator for another block of the same function, inheriting the
    /// enclosing loop targets
    fn child(&mut self, block: BlockId) -> Generator<'_> {
        Generator {
            library: &mut *self.library,
            state: &mut *self.state,
            start_block: block,
            block,
            finished: false,
            loop_block: self.loop_block,
            break_block: self.break_block,
        }
    }

    fn handle(&self) -> BlockHandle {
        BlockHandle {
            start: self.start_block,
            current: self.block,
            finished: self.finished,
        }
    }

    /// Parameters of the function being built
    pub fn args(&self) -> Result<Vec<Value>> {
        Ok(self.function()?.param_values())
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Mark the generator as terminated without emitting anything
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Block instructions are currently emitted into
    pub fn basic_block(&self) -> BlockId {
        self.block
    }

    pub fn start_block(&self) -> BlockId {
        self.start_block
    }

    /// Continue target of the innermost enclosing loop
    pub fn loop_block(&self) -> Option<BlockId> {
        self.loop_block
    }

    /// Exit of the innermost enclosing loop
    pub fn break_block(&self) -> Option<BlockId> {
        self.break_block
    }

    /// The library the function belongs to
    pub fn library(&self) -> &Library {
        &*self.library
    }

    /// Name of the function being built, as declared in its library
    pub fn function_name(&self) -> &str {
        &self.state.name
    }

    pub fn return_type(&self) -> &IrType {
        &self.state.return_type
    }

    pub(crate) fn function(&self) -> Result<&Function> {
        self.library
            .module
            .function(&self.state.symbol)
            .ok_or_else(|| ScriptError::unresolved(self.state.symbol.clone()))
    }

    pub(crate) fn function_mut(&mut self) -> Result<&mut Function> {
        let symbol = &self.state.symbol;
        self.library
            .module
            .function_mut(symbol)
            .ok_or_else(|| ScriptError::unresolved(symbol.clone()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(ScriptError::argument(format!(
                "cannot emit into {} of {}: the block is already terminated",
                self.block, self.state.name
            )));
        }
        Ok(())
    }

    /// Builder appending to the current block
    pub(crate) fn builder(&mut self) -> Result<IrBuilder<'_>> {
        self.ensure_open()?;
        let block = self.block;
        let function = self.function_mut()?;
        Ok(IrBuilder::at_end(function, block))
    }

    pub(crate) fn add_block(&mut self, name: &str) -> Result<BlockId> {
        let id = self.function_mut()?.add_block(name);
        log::trace!("{}: new block {} ({})", self.state.name, id, name);
        Ok(id)
    }

    pub(crate) fn is_block_empty(&self, block: BlockId) -> Result<bool> {
        Ok(self.function()?.block(block)?.is_empty())
    }

    /// Convert with an optional hint
    pub fn convert_hint(
        &mut self,
        operand: impl Into<Operand>,
        hint: Option<&Hint>,
    ) -> Result<Value> {
        convert(&mut self.library.module, operand.into(), hint)
    }

    /// Convert without a hint
    pub fn convert(&mut self, operand: impl Into<Operand>) -> Result<Value> {
        self.convert_hint(operand, None)
    }

    /// Convert to an exact type
    pub fn convert_to(&mut self, operand: impl Into<Operand>, ty: &IrType) -> Result<Value> {
        self.convert_hint(operand, Some(&Hint::Type(ty.clone())))
    }

    /// Convert to a type category
    pub fn convert_kind(&mut self, operand: impl Into<Operand>, kind: Kind) -> Result<Value> {
        self.convert_hint(operand, Some(&Hint::Kind(kind)))
    }

    /// Convert and require a pointer
    pub(crate) fn pointer(
        &mut self,
        operation: &str,
        operand: impl Into<Operand>,
    ) -> Result<Value> {
        let operand = operand.into();
        let value = match operand {
            Operand::Value(value) => value,
            other => self.convert(other)?,
        };
        if !value.ty().is_pointer() {
            return Err(ScriptError::argument(format!(
                "{operation} requires a pointer, {} given",
                crate::convert::typename(value.ty())
            )));
        }
        Ok(value)
    }

    /// Run `body` on a generator for a new block named `name`.
    ///
    /// The child is left as the body left it; the returned handle tells
    /// where it ended up and whether it was terminated.
    pub fn block<F>(&mut self, name: &str, body: F) -> Result<BlockHandle>
    where
        F: FnOnce(&mut Generator<'_>) -> Result<()>,
    {
        let id = self.add_block(name)?;
        let mut child = self.child(id);
        body(&mut child)?;
        Ok(child.handle())
    }

    /// Emit a comment line into the current block
    pub fn comment(&mut self, text: &str) -> Result<()> {
        self.builder()?.build_comment(text)?;
        Ok(())
    }
}
