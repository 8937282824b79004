//! Program
//!
//! A library whose symbols keep their plain names and which can define a
//! `main` function and execute it on the reference interpreter.

use std::ops::{Deref, DerefMut};

use rls_common::{Lookup, Result, ScriptError};
use rls_ir::{verify_module, ExecConfig, Interpreter, Pointer, RuntimeValue};

use crate::function::ScriptFunction;
use crate::generator::Generator;
use crate::library::Library;
use crate::signature::Signature;
use crate::types;

/// Executable library
#[derive(Debug, Clone)]
pub struct Program {
    library: Library,
    output: String,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let address = name.replace(' ', "");
        Self::with_address(name, address)
    }

    pub fn with_address(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            library: Library::unprefixed(name, address),
            output: String::new(),
        }
    }

    /// Define `main(i32 argc, i8** argv) -> i32`
    pub fn main<F>(&mut self, body: F) -> Result<ScriptFunction>
    where
        F: FnOnce(&mut Generator<'_>) -> Result<()>,
    {
        let signature = Signature::new(vec![types::INT, types::void_ptr_ptr()], types::INT);
        self.library.function("main", signature, body)
    }

    /// Run `main` with no arguments and return its exit code
    pub fn run(&mut self) -> Result<i64> {
        self.run_with(ExecConfig::default())
    }

    pub fn run_with(&mut self, config: ExecConfig) -> Result<i64> {
        if self.library.lookup_function("main", Lookup::IncludePrivate).is_none() {
            return Err(ScriptError::argument(format!(
                "{} has no main function",
                self.library.name()
            )));
        }
        let args = vec![RuntimeValue::Int(0), RuntimeValue::Pointer(Pointer::Null)];
        let result = self.execute("main", args, config)?;
        result
            .as_int()
            .ok_or_else(|| ScriptError::backend(format!("main returned {result:?}")))
    }

    /// Run the function `name` of this program with `args`
    pub fn run_function(&mut self, name: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue> {
        let symbol = self
            .library
            .lookup_function(name, Lookup::IncludePrivate)
            .map(|function| function.symbol.clone())
            .ok_or_else(|| ScriptError::unresolved(name))?;
        self.execute(&symbol, args, ExecConfig::default())
    }

    fn execute(
        &mut self,
        symbol: &str,
        args: Vec<RuntimeValue>,
        config: ExecConfig,
    ) -> Result<RuntimeValue> {
        let mut interpreter = Interpreter::with_config(self.library.module(), config)?;
        let result = interpreter.run(symbol, args);
        self.output = interpreter.output().to_string();
        log::debug!("{}: ran {symbol}", self.library.name());
        Ok(result?)
    }

    /// Structural check of every function built so far
    pub fn verify(&self) -> Result<()> {
        verify_module(self.library.module())?;
        Ok(())
    }

    /// Output captured during the last run
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }
}

impl Deref for Program {
    type Target = Library;

    fn deref(&self) -> &Library {
        &self.library
    }
}

impl DerefMut for Program {
    fn deref_mut(&mut self) -> &mut Library {
        &mut self.library
    }
}
