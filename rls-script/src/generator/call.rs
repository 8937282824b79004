//! Call Dispatch
//!
//! A name resolves to a macro first, then to a function of the library.
//! Macros expand inline on the calling generator; functions and function
//! pointers become call instructions.

use rls_common::{Lookup, Result, ScriptError};
use rls_ir::Value;

use super::Generator;
use crate::convert::{typename, Hint};
use crate::function::ScriptFunction;
use crate::library::Symbol;
use crate::operand::Operand;

/// Something `Generator::call` can invoke
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// Macro or function looked up in the library
    Name(String),
    Function(ScriptFunction),
    /// Function or function-pointer value, called indirectly
    Value(Value),
}

impl From<&str> for Callable {
    fn from(name: &str) -> Self {
        Callable::Name(name.to_string())
    }
}

impl From<String> for Callable {
    fn from(name: String) -> Self {
        Callable::Name(name)
    }
}

impl From<ScriptFunction> for Callable {
    fn from(function: ScriptFunction) -> Self {
        Callable::Function(function)
    }
}

impl From<&ScriptFunction> for Callable {
    fn from(function: &ScriptFunction) -> Self {
        Callable::Function(function.clone())
    }
}

impl From<Value> for Callable {
    fn from(value: Value) -> Self {
        Callable::Value(value)
    }
}

impl From<&Value> for Callable {
    fn from(value: &Value) -> Self {
        Callable::Value(value.clone())
    }
}

fn returned(value: Option<Value>) -> Operand {
    value.map_or(Operand::Null, Operand::Value)
}

impl Generator<'_> {
    /// Call a macro, function or function pointer.
    ///
    /// Macro calls return whatever the macro produced; calls of void
    /// functions return `Operand::Null`.
    pub fn call(&mut self, callable: impl Into<Callable>, args: Vec<Operand>) -> Result<Operand> {
        match callable.into() {
            Callable::Name(name) => match self.library.resolve(&name, Lookup::IncludePrivate) {
                Some(Symbol::Macro(mac)) => {
                    if mac.arity != args.len() {
                        return Err(ScriptError::ArgumentCountMismatch {
                            name,
                            expected: mac.arity,
                            given: args.len(),
                        });
                    }
                    log::trace!("{}: expanding macro {}", self.state.name, name);
                    mac.expand(self, &args)
                }
                Some(Symbol::Function(function)) => self.call_function(&function, args),
                _ => Err(ScriptError::unresolved(name)),
            },
            Callable::Function(function) => self.call_function(&function, args),
            Callable::Value(callee) => {
                if callee.ty().callable_signature().is_none() {
                    return Err(ScriptError::argument(format!(
                        "cannot call a value of type {}",
                        typename(callee.ty())
                    )));
                }
                let args = args
                    .into_iter()
                    .map(|arg| self.convert(arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(returned(self.builder()?.build_call(callee, args)?))
            }
        }
    }

    fn call_function(&mut self, function: &ScriptFunction, args: Vec<Operand>) -> Result<Operand> {
        let params = &function.signature.params;
        let mut values = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let hint = params.get(i).map(Hint::from);
            values.push(self.convert_hint(arg, hint.as_ref())?);
        }
        Ok(returned(self.builder()?.build_call(function.address(), values)?))
    }

    /// Address of a global of the library
    pub fn global(&mut self, name: &str) -> Result<Value> {
        match self.library.resolve(name, Lookup::IncludePrivate) {
            Some(Symbol::Global(value)) => Ok(value),
            _ => Err(ScriptError::unresolved(name)),
        }
    }

    /// Interned string as an `i8*`
    pub fn string(&mut self, text: &str) -> Result<Value> {
        self.convert(text)
    }
}
