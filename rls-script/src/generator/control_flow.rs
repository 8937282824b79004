//! Structured Control Flow
//!
//! Conditionals and loops lowered to blocks and branches. Each arm or loop
//! part runs on a child generator bound to its own block; afterwards the
//! exit block is moved behind the last block that was filled, so the
//! emitted IR reads top to bottom.
//!
//! Without an explicit exit block the parent continues at the exit. With
//! one, control never falls back into the parent and it is finished.

use rls_common::{BlockId, Result, ScriptError};
use rls_ir::Value;

use super::{BlockHandle, Generator};
use crate::operand::Operand;
use crate::types;

type Body<'c> = Box<dyn FnOnce(&mut Generator<'_>) -> Result<()> + 'c>;
type VarsFn<'c, T> = Box<dyn FnOnce(&mut Generator<'_>, &[Value]) -> Result<T> + 'c>;

/// One arm of a conditional
pub enum Arm<'c> {
    /// Run on a new block
    Body(Body<'c>),
    /// A block already filled through `Generator::block`
    Block(BlockHandle),
}

/// Arguments of `Generator::cond`
pub struct Cond<'c> {
    then: Arm<'c>,
    otherwise: Option<Arm<'c>>,
    exit: Option<BlockId>,
}

impl<'c> Cond<'c> {
    pub fn new<F>(then: F) -> Self
    where
        F: FnOnce(&mut Generator<'_>) -> Result<()> + 'c,
    {
        Self::with_arm(Arm::Body(Box::new(then)))
    }

    /// Take the then arm from a block built beforehand
    pub fn with_block(then: BlockHandle) -> Self {
        Self::with_arm(Arm::Block(then))
    }

    fn with_arm(then: Arm<'c>) -> Self {
        Self {
            then,
            otherwise: None,
            exit: None,
        }
    }

    pub fn otherwise<F>(mut self, body: F) -> Self
    where
        F: FnOnce(&mut Generator<'_>) -> Result<()> + 'c,
    {
        self.otherwise = Some(Arm::Body(Box::new(body)));
        self
    }

    pub fn otherwise_block(mut self, block: BlockHandle) -> Self {
        self.otherwise = Some(Arm::Block(block));
        self
    }

    /// Continue at `block` instead of a fresh exit block
    pub fn exit(mut self, block: BlockId) -> Self {
        self.exit = Some(block);
        self
    }
}

/// Arguments of `Generator::lp`
#[derive(Default)]
pub struct Loop<'c> {
    vars: Vec<Operand>,
    compare: Option<VarsFn<'c, Operand>>,
    increment: Option<VarsFn<'c, ()>>,
    body: Option<VarsFn<'c, ()>>,
    exit: Option<BlockId>,
}

impl<'c> Loop<'c> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loop variable, stored in its own stack slot
    pub fn var(mut self, value: impl Into<Operand>) -> Self {
        self.vars.push(value.into());
        self
    }

    pub fn vars<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Operand>,
    {
        self.vars.extend(values.into_iter().map(Into::into));
        self
    }

    /// Loop condition, evaluated on the current variable values before
    /// every iteration
    pub fn compare<F>(mut self, compare: F) -> Self
    where
        F: FnOnce(&mut Generator<'_>, &[Value]) -> Result<Operand> + 'c,
    {
        self.compare = Some(Box::new(compare));
        self
    }

    /// Step run after every iteration, given the variable slots
    pub fn increment<F>(mut self, increment: F) -> Self
    where
        F: FnOnce(&mut Generator<'_>, &[Value]) -> Result<()> + 'c,
    {
        self.increment = Some(Box::new(increment));
        self
    }

    /// Loop body, given the current variable values
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: FnOnce(&mut Generator<'_>, &[Value]) -> Result<()> + 'c,
    {
        self.body = Some(Box::new(body));
        self
    }

    pub fn exit(mut self, block: BlockId) -> Self {
        self.exit = Some(block);
        self
    }
}

impl Generator<'_> {
    /// Branch to `target`; nothing happens once the block is terminated
    pub fn br(&mut self, target: BlockId) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.builder()?.build_branch(target)?;
        self.finished = true;
        Ok(())
    }

    pub fn unreachable(&mut self) -> Result<()> {
        self.builder()?.build_unreachable()?;
        self.finished = true;
        Ok(())
    }

    /// Run an arm, returning where it ended
    fn run_arm(&mut self, name: &str, arm: Arm<'_>) -> Result<BlockHandle> {
        match arm {
            Arm::Body(body) => self.block(name, body),
            Arm::Block(handle) => Ok(handle),
        }
    }

    /// Branch from wherever an arm ended to `exit`, unless it is terminated
    fn close_arm(&mut self, arm: BlockHandle, exit: BlockId) -> Result<()> {
        if arm.current == exit {
            return Ok(());
        }
        let mut child = self.child(arm.current);
        child.finished = arm.finished;
        child.br(exit)
    }

    fn place_after(&mut self, block: BlockId, after: BlockId) -> Result<()> {
        if block != after {
            self.function_mut()?.move_block_after(block, after)?;
        }
        Ok(())
    }

    /// Continue in the parent after a combinator
    fn resume_at(&mut self, exit: BlockId, explicit_exit: bool) {
        if explicit_exit {
            self.finished = true;
        } else {
            self.block = exit;
            self.finished = false;
        }
    }

    /// Two-way conditional on `cond`
    pub fn cond(&mut self, cond: impl Into<Operand>, arms: Cond<'_>) -> Result<()> {
        self.ensure_open()?;
        let cond = self.convert_to(cond, &types::BOOL)?;
        let Cond { then, otherwise, exit } = arms;
        let explicit_exit = exit.is_some();
        let then_is_body = matches!(then, Arm::Body(_));

        let then = self.run_arm("then", then)?;
        let exit = match exit {
            Some(exit) => exit,
            None if then_is_body
                && !then.finished
                && then.start == then.current
                && self.is_block_empty(then.start)? =>
            {
                then.start
            }
            None => self.add_block("exit")?,
        };
        self.close_arm(then, exit)?;

        let mut last = then.current;
        let else_block = match otherwise {
            Some(arm) => {
                let arm = self.run_arm("else", arm)?;
                self.close_arm(arm, exit)?;
                last = arm.current;
                arm.start
            }
            None => exit,
        };
        self.place_after(exit, last)?;

        log::trace!(
            "{}: cond in {} -> {} / {}, exit {}",
            self.state.name,
            self.block,
            then.start,
            else_block,
            exit
        );
        self.builder()?.build_branch_cond(cond, then.start, else_block)?;
        self.resume_at(exit, explicit_exit);
        Ok(())
    }

    fn load_vars(&mut self, ptrs: &[Value]) -> Result<Vec<Value>> {
        ptrs.iter().map(|ptr| self.load(ptr.clone())).collect()
    }

    /// Loop over variables kept in stack slots, returning the slots.
    ///
    /// The header evaluates `compare` and leaves for the exit once it is
    /// false; the body runs next, then the increment, then the header
    /// again. Parts that were not given are folded into the header, so a
    /// loop without `compare` runs until something branches out of it.
    pub fn lp(&mut self, parts: Loop<'_>) -> Result<Vec<Value>> {
        let Loop {
            vars,
            compare,
            increment,
            body,
            exit,
        } = parts;
        if compare.is_none() && increment.is_none() && body.is_none() {
            return Err(ScriptError::argument(
                "a loop needs at least one of a body, a comparison or an increment",
            ));
        }
        self.ensure_open()?;

        let mut ptrs = Vec::with_capacity(vars.len());
        for var in vars {
            let value = self.convert(var)?;
            let ptr = self.alloca(value.ty())?;
            self.builder()?.build_store(value, ptr.clone())?;
            ptrs.push(ptr);
        }

        let header = if self.block != self.state.entry && self.is_block_empty(self.block)? {
            self.block
        } else {
            let header = self.add_block("loop")?;
            self.br(header)?;
            header
        };
        let body_block = if compare.is_some() {
            self.add_block("body")?
        } else {
            header
        };
        let increment_block = if increment.is_some() && (compare.is_some() || body.is_some()) {
            self.add_block("increment")?
        } else {
            header
        };
        let explicit_exit = exit.is_some();
        let exit = match exit {
            Some(exit) => exit,
            None => self.add_block("break")?,
        };
        log::trace!(
            "{}: loop header {}, body {}, increment {}, exit {}",
            self.state.name,
            header,
            body_block,
            increment_block,
            exit
        );

        let mut last = header;
        if body.is_some() || compare.is_some() {
            let mut child = self.child(body_block);
            child.loop_block = Some(increment_block);
            child.break_block = Some(exit);
            if let Some(body) = body {
                let values = child.load_vars(&ptrs)?;
                body(&mut child, &values)?;
            }
            child.br(increment_block)?;
            last = child.block;
        }

        if let Some(compare) = compare {
            let mut child = self.child(header);
            child.loop_block = Some(increment_block);
            child.break_block = Some(exit);
            let values = child.load_vars(&ptrs)?;
            let condition = compare(&mut child, &values)?;
            let condition = child.convert_to(condition, &types::BOOL)?;
            child.builder()?.build_branch_cond(condition, body_block, exit)?;
            child.finished = true;
            if last == header {
                last = child.block;
            }
        }

        if let Some(increment) = increment {
            let mut child = self.child(increment_block);
            child.loop_block = Some(increment_block);
            child.break_block = Some(exit);
            increment(&mut child, &ptrs)?;
            child.br(header)?;
            last = child.block;
        }

        self.place_after(exit, last)?;
        self.resume_at(exit, explicit_exit);
        Ok(ptrs)
    }
}
