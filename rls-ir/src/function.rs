//! Function Definitions
//!
//! A function owns its blocks in layout order. Parameters occupy the first
//! temporaries, so `%0..%n` are always the arguments.

use rls_common::{BlockId, TempGenerator, TempId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blocks::BasicBlock;
use crate::instructions::Instruction;
use crate::module::Linkage;
use crate::types::IrType;
use crate::values::{Constant, Value};
use crate::IrError;

/// Function in IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub return_type: IrType,
    pub params: Vec<IrType>,
    pub is_vararg: bool,
    pub linkage: Linkage,
    pub blocks: Vec<BasicBlock>,
    temps: TempGenerator,
    next_block: u32,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        return_type: IrType,
        params: Vec<IrType>,
        is_vararg: bool,
    ) -> Self {
        let temps = TempGenerator::starting_at(params.len() as TempId);
        Self {
            name: name.into(),
            return_type,
            params,
            is_vararg,
            linkage: Linkage::External,
            blocks: Vec::new(),
            temps,
            next_block: 0,
        }
    }

    /// A function without blocks is an external declaration
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn fn_type(&self) -> IrType {
        IrType::function(self.return_type.clone(), self.params.clone(), self.is_vararg)
    }

    /// Address of this function as a constant function pointer
    pub fn address(&self) -> Constant {
        Constant::FunctionAddr {
            name: self.name.clone(),
            ty: self.fn_type().pointer(),
        }
    }

    pub fn param(&self, index: usize) -> Option<Value> {
        self.params
            .get(index)
            .map(|ty| Value::temp(index as TempId, ty.clone()))
    }

    pub fn param_values(&self) -> Vec<Value> {
        (0..self.params.len()).filter_map(|i| self.param(i)).collect()
    }

    pub fn new_temp(&mut self) -> TempId {
        self.temps.new_temp()
    }

    pub fn temp_count(&self) -> TempId {
        self.temps.count()
    }

    /// Append a new empty block
    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.push(BasicBlock::new(id, name));
        id
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().map(|b| b.id)
    }

    pub fn last_block(&self) -> Option<BlockId> {
        self.blocks.last().map(|b| b.id)
    }

    pub fn position(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn block(&self, id: BlockId) -> Result<&BasicBlock, IrError> {
        self.blocks
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| IrError::unknown_block(&self.name, id))
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock, IrError> {
        let name = &self.name;
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| IrError::unknown_block(name, id))
    }

    /// Insert an instruction at `index` within a block
    pub fn insert_instruction(
        &mut self,
        id: BlockId,
        index: usize,
        instr: Instruction,
    ) -> Result<(), IrError> {
        let block = self.block_mut(id)?;
        let index = index.min(block.instructions.len());
        block.instructions.insert(index, instr);
        Ok(())
    }

    /// Place block `id` directly after block `after`
    pub fn move_block_after(&mut self, id: BlockId, after: BlockId) -> Result<(), IrError> {
        if id == after {
            return Ok(());
        }
        let from = self.position(id).ok_or_else(|| IrError::unknown_block(&self.name, id))?;
        let block = self.blocks.remove(from);
        match self.position(after) {
            Some(to) => {
                self.blocks.insert(to + 1, block);
                Ok(())
            }
            None => {
                self.blocks.insert(from, block);
                Err(IrError::unknown_block(&self.name, after))
            }
        }
    }

    /// Place block `id` directly before block `before`
    pub fn move_block_before(&mut self, id: BlockId, before: BlockId) -> Result<(), IrError> {
        if id == before {
            return Ok(());
        }
        let from = self.position(id).ok_or_else(|| IrError::unknown_block(&self.name, id))?;
        let block = self.blocks.remove(from);
        match self.position(before) {
            Some(to) => {
                self.blocks.insert(to, block);
                Ok(())
            }
            None => {
                self.blocks.insert(from, block);
                Err(IrError::unknown_block(&self.name, before))
            }
        }
    }

    /// Drop every block and restart block and temp numbering, turning the
    /// function back into a declaration
    pub fn clear_body(&mut self) {
        self.blocks.clear();
        self.temps = TempGenerator::starting_at(self.params.len() as TempId);
        self.next_block = 0;
    }

    pub fn remove_block(&mut self, id: BlockId) -> Option<BasicBlock> {
        let index = self.position(id)?;
        Some(self.blocks.remove(index))
    }

    /// Blocks whose terminator targets `id`
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.successors().contains(&id))
            .map(|b| b.id)
            .collect()
    }

    pub fn is_referenced(&self, id: BlockId) -> bool {
        self.blocks
            .iter()
            .flat_map(|b| b.instructions.iter())
            .any(|instr| instr.successors().contains(&id))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.is_declaration() { "declare" } else { "define" };
        write!(f, "{keyword} ")?;
        if self.linkage == Linkage::Private {
            write!(f, "private ")?;
        }
        write!(f, "{} @{}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param} %{i}")?;
        }
        if self.is_vararg {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")?;
        if self.is_declaration() {
            return writeln!(f);
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        writeln!(f, "}}")
    }
}
