//! Reference interpreter
//!
//! Executes the functions of a module directly. Used to run programs and to
//! check the behaviour of generated IR in tests.

mod exec;
mod host;
mod memory;
mod value;

use rls_common::{BlockId, ScriptError};
use std::collections::HashMap;
use thiserror::Error;

pub use host::HostFn;
pub use memory::Memory;
pub use value::{Pointer, RuntimeValue};

use crate::module::Module;
use crate::values::Constant;

/// Interpreter limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecConfig {
    /// Maximum number of executed instructions per run
    pub step_limit: u64,
    /// Maximum call depth
    pub max_depth: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            step_limit: 10_000_000,
            max_depth: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("Function '{name}' not found")]
    UnknownFunction { name: String },

    #[error("External function '{name}' has no host implementation")]
    UnresolvedExternal { name: String },

    #[error("Function '{function}' expects {expected} arguments, {given} given")]
    ArgumentCount {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("Invalid pointer: {message}")]
    InvalidPointer { message: String },

    #[error("Division by zero in '{function}'")]
    DivisionByZero { function: String },

    #[error("Type error: {message}")]
    TypeError { message: String },

    #[error("Reached unreachable instruction in '{function}'")]
    Unreachable { function: String },

    #[error("Block {block} of '{function}' has no terminator")]
    MissingTerminator { function: String, block: BlockId },

    #[error("Step limit of {limit} instructions exceeded")]
    StepLimit { limit: u64 },

    #[error("Call depth limit of {depth} exceeded")]
    StackOverflow { depth: usize },
}

impl From<ExecError> for ScriptError {
    fn from(err: ExecError) -> Self {
        ScriptError::Execution {
            message: err.to_string(),
        }
    }
}

/// Interpreter over one module
pub struct Interpreter<'m> {
    module: &'m Module,
    config: ExecConfig,
    memory: Memory,
    globals: HashMap<String, Pointer>,
    host: HashMap<String, HostFn>,
    output: String,
    steps: u64,
    depth: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Result<Self, ExecError> {
        Self::with_config(module, ExecConfig::default())
    }

    pub fn with_config(module: &'m Module, config: ExecConfig) -> Result<Self, ExecError> {
        let mut interp = Self {
            module,
            config,
            memory: Memory::new(),
            globals: HashMap::new(),
            host: host::default_host_functions(),
            output: String::new(),
            steps: 0,
            depth: 0,
        };
        interp.initialize_globals()?;
        Ok(interp)
    }

    /// Allocate every global first so initializers may refer to each other
    fn initialize_globals(&mut self) -> Result<(), ExecError> {
        for global in &self.module.globals {
            let ptr = self.memory.allocate(&global.ty, 1);
            self.globals.insert(global.name.clone(), ptr);
        }
        for global in &self.module.globals {
            if let Some(init) = &global.initializer {
                let value = self.constant(init)?;
                let ptr = self.global_pointer(&global.name)?;
                self.memory.store(&ptr, value)?;
            }
        }
        Ok(())
    }

    fn global_pointer(&self, name: &str) -> Result<Pointer, ExecError> {
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| ExecError::InvalidPointer {
                message: format!("unknown global @{name}"),
            })
    }

    /// Register or replace a host implementation for an external function
    pub fn register_host(&mut self, name: impl Into<String>, function: HostFn) {
        self.host.insert(name.into(), function);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Everything the program printed so far
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Value stored in a global
    pub fn read_global(&self, name: &str) -> Result<RuntimeValue, ExecError> {
        let ptr = self.global_pointer(name)?;
        self.memory.load(&ptr)
    }

    /// Run a function by name
    pub fn run(&mut self, name: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue, ExecError> {
        self.steps = 0;
        self.call(name, args)
    }

    pub(crate) fn call(
        &mut self,
        name: &str,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, ExecError> {
        let module = self.module;
        let function = module.function(name).ok_or_else(|| ExecError::UnknownFunction {
            name: name.to_string(),
        })?;

        let arity_ok = if function.is_vararg {
            args.len() >= function.params.len()
        } else {
            args.len() == function.params.len()
        };
        if !arity_ok {
            return Err(ExecError::ArgumentCount {
                function: name.to_string(),
                expected: function.params.len(),
                given: args.len(),
            });
        }

        if function.is_declaration() {
            let host = self.host.get(name).copied().ok_or_else(|| ExecError::UnresolvedExternal {
                name: name.to_string(),
            })?;
            return host(self, &args);
        }

        if self.depth >= self.config.max_depth {
            return Err(ExecError::StackOverflow {
                depth: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = self.execute_function(function, args);
        self.depth -= 1;
        result
    }

    fn constant(&self, constant: &Constant) -> Result<RuntimeValue, ExecError> {
        Ok(match constant {
            Constant::Int { value, .. } => RuntimeValue::Int(*value),
            Constant::Float { value, .. } => RuntimeValue::Float(*value),
            Constant::Null(_) => RuntimeValue::Pointer(Pointer::Null),
            Constant::Undef(_) => RuntimeValue::Undef,
            Constant::Array { elements, .. } | Constant::Vector { elements, .. } => {
                RuntimeValue::Aggregate(
                    elements.iter().map(|e| self.constant(e)).collect::<Result<_, _>>()?,
                )
            }
            Constant::Struct { fields, .. } => RuntimeValue::Aggregate(
                fields.iter().map(|e| self.constant(e)).collect::<Result<_, _>>()?,
            ),
            Constant::GlobalAddr { name, .. } => RuntimeValue::Pointer(self.global_pointer(name)?),
            Constant::FunctionAddr { name, .. } => RuntimeValue::Function(name.clone()),
            Constant::BitCast { value, ty } => {
                let inner = self.constant(value)?;
                exec::bit_cast(inner, value.ty(), ty)?
            }
        })
    }
}
