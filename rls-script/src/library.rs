//! Library
//!
//! The symbol container generated code is built in. A library owns one IR
//! module and three tables (functions, macros, globals), each split by
//! visibility. Names inside a library are short; IR symbols carry the
//! library's address as a prefix so libraries can be linked together.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use rls_common::{BlockId, Diagnostic, ErrorReporter, Lookup, Result, ScriptError, Visibility};
use rls_ir::{Constant, Function, GlobalVariable, IrType, Linkage, Module, Value};

use crate::convert::convert;
use crate::function::{FunctionState, ScriptFunction};
use crate::generator::Generator;
use crate::operand::Operand;
use crate::signature::Signature;
use crate::struct_layout::StructDef;

type MacroBody = Rc<dyn Fn(&mut Generator<'_>, &[Operand]) -> Result<Operand>>;

/// A procedure expanded inline wherever it is called
#[derive(Clone)]
pub struct Macro {
    pub name: String,
    pub arity: usize,
    body: MacroBody,
}

impl Macro {
    /// Run the macro on `generator`
    pub fn expand(&self, generator: &mut Generator<'_>, args: &[Operand]) -> Result<Operand> {
        (self.body)(generator, args)
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// What a name resolves to
#[derive(Debug, Clone)]
pub enum Symbol {
    Macro(Macro),
    Function(ScriptFunction),
    /// Address of a global variable
    Global(Value),
}

/// Name table split by visibility
#[derive(Debug, Clone)]
struct SymbolTable<T> {
    public: BTreeMap<String, T>,
    private: BTreeMap<String, T>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self {
            public: BTreeMap::new(),
            private: BTreeMap::new(),
        }
    }
}

impl<T> SymbolTable<T> {
    fn get(&self, name: &str, lookup: Lookup) -> Option<&T> {
        self.public
            .get(name)
            .or_else(|| self.private.get(name).filter(|_| lookup.includes(Visibility::Private)))
    }

    fn insert(&mut self, name: String, visibility: Visibility, item: T) {
        let (target, other) = match visibility {
            Visibility::Public => (&mut self.public, &mut self.private),
            Visibility::Private => (&mut self.private, &mut self.public),
        };
        other.remove(&name);
        target.insert(name, item);
    }

    fn remove(&mut self, name: &str) -> Option<T> {
        self.public.remove(name).or_else(|| self.private.remove(name))
    }

    fn names(&self, lookup: Lookup) -> Vec<String> {
        let mut names: Vec<String> = self.public.keys().cloned().collect();
        if lookup.includes(Visibility::Private) {
            names.extend(self.private.keys().cloned());
            names.sort();
        }
        names
    }
}

fn linkage(visibility: Visibility) -> Linkage {
    match visibility {
        Visibility::Public => Linkage::External,
        Visibility::Private => Linkage::Private,
    }
}

/// Container of functions, macros, globals and struct layouts
#[derive(Clone)]
pub struct Library {
    name: String,
    address: String,
    prefixed: bool,
    pub(crate) module: Module,
    functions: SymbolTable<ScriptFunction>,
    macros: SymbolTable<Macro>,
    globals: SymbolTable<Value>,
    structs: BTreeMap<String, StructDef>,
    visibility: Visibility,
    reporter: ErrorReporter,
    built: BTreeSet<String>,
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("functions", &self.functions.names(Lookup::IncludePrivate))
            .field("macros", &self.macros.names(Lookup::IncludePrivate))
            .field("globals", &self.globals.names(Lookup::IncludePrivate))
            .finish_non_exhaustive()
    }
}

impl Library {
    /// Standalone library whose address is its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let address = name.replace(' ', "");
        Self::with_address(name, address)
    }

    /// Library whose symbols are prefixed with `address`
    pub fn with_address(name: impl Into<String>, address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            name: name.into(),
            module: Module::new(address.clone()),
            address,
            prefixed: true,
            functions: SymbolTable::default(),
            macros: SymbolTable::default(),
            globals: SymbolTable::default(),
            structs: BTreeMap::new(),
            visibility: Visibility::Public,
            reporter: ErrorReporter::new(),
            built: BTreeSet::new(),
        }
    }

    /// Library whose symbols keep their plain names
    pub(crate) fn unprefixed(name: impl Into<String>, address: impl Into<String>) -> Self {
        let mut library = Self::with_address(name, address);
        library.prefixed = false;
        library
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Warnings recorded while building
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.reporter.diagnostics()
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Textual IR of the library's module
    pub fn dump(&self) -> String {
        self.module.to_string()
    }

    fn symbol_name(&self, name: &str) -> String {
        if self.prefixed {
            format!("{}.{}", self.address, name)
        } else {
            name.to_string()
        }
    }

    // Visibility ---------------------------------------------------------

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Visibility of everything defined from now on
    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    /// Run `f` with `visibility` in effect, restoring the previous one
    pub fn with_visibility<T>(
        &mut self,
        visibility: Visibility,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.visibility, visibility);
        let result = f(self);
        self.visibility = previous;
        result
    }

    /// Move existing symbols to another visibility
    pub fn change_visibility(&mut self, names: &[&str], visibility: Visibility) -> Result<()> {
        for name in names {
            let mut found = false;
            if let Some(function) = self.functions.remove(name) {
                if let Some(ir) = self.module.function_mut(&function.symbol) {
                    ir.linkage = linkage(visibility);
                }
                self.functions.insert(name.to_string(), visibility, function);
                found = true;
            }
            if let Some(mac) = self.macros.remove(name) {
                self.macros.insert(name.to_string(), visibility, mac);
                found = true;
            }
            if let Some(global) = self.globals.remove(name) {
                if let Some(symbol) = global_symbol(&global) {
                    if let Some(ir) = self.module.global_mut(&symbol) {
                        ir.linkage = linkage(visibility);
                    }
                }
                self.globals.insert(name.to_string(), visibility, global);
                found = true;
            }
            if !found {
                return Err(ScriptError::argument(format!(
                    "Unknown function, macro or global {name}"
                )));
            }
        }
        Ok(())
    }

    // Lookup -------------------------------------------------------------

    /// Resolve a name; macros shadow functions, which shadow globals
    pub fn resolve(&self, name: &str, lookup: Lookup) -> Option<Symbol> {
        if let Some(mac) = self.macros.get(name, lookup) {
            return Some(Symbol::Macro(mac.clone()));
        }
        if let Some(function) = self.functions.get(name, lookup) {
            return Some(Symbol::Function(function.clone()));
        }
        self.globals.get(name, lookup).cloned().map(Symbol::Global)
    }

    pub fn lookup_function(&self, name: &str, lookup: Lookup) -> Option<&ScriptFunction> {
        self.functions.get(name, lookup)
    }

    pub fn lookup_macro(&self, name: &str, lookup: Lookup) -> Option<&Macro> {
        self.macros.get(name, lookup)
    }

    pub fn lookup_global(&self, name: &str, lookup: Lookup) -> Option<&Value> {
        self.globals.get(name, lookup)
    }

    pub fn functions(&self, lookup: Lookup) -> Vec<String> {
        self.functions.names(lookup)
    }

    pub fn macros(&self, lookup: Lookup) -> Vec<String> {
        self.macros.names(lookup)
    }

    pub fn globals(&self, lookup: Lookup) -> Vec<String> {
        self.globals.names(lookup)
    }

    // Functions ----------------------------------------------------------

    /// Declare a function without building it
    pub fn declare(&mut self, name: &str, signature: Signature) -> Result<ScriptFunction> {
        if let Some(existing) = self.functions.get(name, Lookup::IncludePrivate) {
            if existing.signature != signature {
                return Err(ScriptError::argument(format!(
                    "{name} is already declared as {}",
                    existing.signature.fn_type()
                )));
            }
            return Ok(existing.clone());
        }

        let symbol = self.symbol_name(name);
        let mut ir = Function::new(
            symbol.clone(),
            signature.ret.clone(),
            signature.params.clone(),
            signature.varargs,
        );
        ir.linkage = linkage(self.visibility);
        self.module.add_function(ir);

        let function = ScriptFunction::new(name, symbol, signature);
        self.functions.insert(name.to_string(), self.visibility, function.clone());
        log::debug!("{}: declared {}", self.address, function.symbol);
        Ok(function)
    }

    /// Declare and build a function
    pub fn function<F>(
        &mut self,
        name: &str,
        signature: Signature,
        body: F,
    ) -> Result<ScriptFunction>
    where
        F: FnOnce(&mut Generator<'_>) -> Result<()>,
    {
        let function = self.declare(name, signature)?;
        self.build(name, body)?;
        Ok(function)
    }

    /// Generate the body of a declared function. A function is built at
    /// most once; later calls do nothing.
    pub fn build<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut Generator<'_>) -> Result<()>,
    {
        let function = self
            .functions
            .get(name, Lookup::IncludePrivate)
            .cloned()
            .ok_or_else(|| ScriptError::unresolved(name))?;
        if self.built.contains(&function.symbol) {
            log::debug!("{}: {} is already built", self.address, function.symbol);
            return Ok(());
        }
        let entry = self.ir_function_mut(&function.symbol)?.add_block("entry");
        let mut state = FunctionState::new(&function, entry);
        let outcome = {
            let mut generator = Generator::new(self, &mut state, entry);
            body(&mut generator).map(|()| (generator.basic_block(), generator.finished()))
        };
        let (last, finished) = match outcome {
            Ok(end) => end,
            Err(e) => {
                log::debug!("{}: discarding body of {}: {}", self.address, function.symbol, e);
                self.ir_function_mut(&function.symbol)?.clear_body();
                return Err(e);
            }
        };
        self.built.insert(function.symbol.clone());
        self.finish_function(&function, &state, last, finished)?;
        log::debug!("{}: built {}", self.address, function.symbol);
        Ok(())
    }

    fn ir_function_mut(&mut self, symbol: &str) -> Result<&mut Function> {
        self.module
            .function_mut(symbol)
            .ok_or_else(|| ScriptError::unresolved(symbol))
    }

    /// Tidy the block layout after the body ran and warn about a missing
    /// return
    fn finish_function(
        &mut self,
        function: &ScriptFunction,
        state: &FunctionState,
        last: BlockId,
        finished: bool,
    ) -> Result<()> {
        let ir = self.ir_function_mut(&function.symbol)?;
        let mut terminated = finished;
        if !finished
            && last != state.entry
            && ir.block(last)?.is_empty()
            && !ir.is_referenced(last)
        {
            ir.remove_block(last);
            terminated = true;
        }
        if let (Some(block), Some(tail)) = (state.return_block, ir.last_block()) {
            ir.move_block_after(block, tail)?;
        }
        if !terminated {
            let message = format!("{} has no return at the end of the function!", function.name);
            log::warn!("{message}");
            self.reporter
                .report(Diagnostic::warning(message).with_symbol(function.symbol.clone()));
        }
        Ok(())
    }

    /// Declare a function defined elsewhere, under its plain name
    pub fn extern_fn(&mut self, name: &str, signature: Signature) -> Result<ScriptFunction> {
        if self.module.function(name).is_none() {
            self.module.add_function(Function::new(
                name,
                signature.ret.clone(),
                signature.params.clone(),
                signature.varargs,
            ));
        }
        let function = ScriptFunction::new(name, name, signature);
        self.functions.insert(name.to_string(), Visibility::Public, function.clone());
        Ok(function)
    }

    /// Register a macro taking exactly `arity` arguments
    pub fn macro_def<F>(&mut self, name: &str, arity: usize, body: F)
    where
        F: Fn(&mut Generator<'_>, &[Operand]) -> Result<Operand> + 'static,
    {
        let mac = Macro {
            name: name.to_string(),
            arity,
            body: Rc::new(body),
        };
        self.macros.insert(name.to_string(), self.visibility, mac);
    }

    // Globals ------------------------------------------------------------

    fn add_global(&mut self, name: &str, init: Operand, is_constant: bool) -> Result<Value> {
        let value = convert(&mut self.module, init, None)?;
        let initializer = value.as_constant().cloned().ok_or_else(|| {
            ScriptError::argument(format!("global {name} needs a constant initializer"))
        })?;
        let symbol = self.symbol_name(name);
        if self.module.global(&symbol).is_some() {
            return Err(ScriptError::argument(format!("global {name} is already defined")));
        }
        let mut global = GlobalVariable::new(symbol, value.ty().clone(), Some(initializer));
        global.is_constant = is_constant;
        global.linkage = linkage(self.visibility);
        let address: Value = global.address().into();
        self.module.add_global(global);
        self.globals.insert(name.to_string(), self.visibility, address.clone());
        Ok(address)
    }

    /// Define a global initialized with `init`, returning its address
    pub fn global(&mut self, name: &str, init: impl Into<Operand>) -> Result<Value> {
        self.add_global(name, init.into(), false)
    }

    /// Define a read-only global
    pub fn constant(&mut self, name: &str, init: impl Into<Operand>) -> Result<Value> {
        self.add_global(name, init.into(), true)
    }

    /// Declare a global defined elsewhere, under its plain name
    pub fn external_global(&mut self, name: &str, ty: &IrType) -> Result<Value> {
        let address: Value = match self.module.global(name) {
            Some(existing) => existing.address().into(),
            None => {
                let global = GlobalVariable::new(name, ty.clone(), None);
                let address: Value = global.address().into();
                self.module.add_global(global);
                address
            }
        };
        self.globals.insert(name.to_string(), Visibility::Public, address.clone());
        Ok(address)
    }

    /// Interned string as an `i8*`
    pub fn string(&mut self, text: &str) -> Result<Value> {
        convert(&mut self.module, text.into(), None)
    }

    // Structs ------------------------------------------------------------

    /// Register a named layout (and the named layouts nested in it)
    pub fn define_struct(&mut self, layout: StructDef) -> Result<IrType> {
        let name = layout
            .name()
            .map(str::to_string)
            .ok_or_else(|| ScriptError::argument("only named structs can be defined"))?;
        for nested in layout.nested() {
            self.register_struct(nested.clone());
        }
        let ty = layout.ir_type();
        self.register_struct(layout);
        log::debug!("{}: defined struct {name}", self.address);
        Ok(ty)
    }

    fn register_struct(&mut self, layout: StructDef) {
        let Some(name) = layout.name().map(str::to_string) else {
            return;
        };
        if let IrType::Struct { fields, packed, .. } = layout.ir_type() {
            self.module.type_definitions.insert(
                name.clone(),
                IrType::Struct {
                    name: None,
                    fields,
                    packed,
                },
            );
        }
        self.structs.insert(name, layout);
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    // Import -------------------------------------------------------------

    /// Merge the public symbols of `other` into this library and link its
    /// module into ours
    pub fn import(&mut self, other: &Library) -> Result<()> {
        for (name, mac) in &other.macros.public {
            self.macros.insert(name.clone(), self.visibility, mac.clone());
        }

        for (name, function) in &other.functions.public {
            if self.module.function(&function.symbol).is_some() {
                self.warn(format!(
                    "{} already defines {}; keeping the existing definition",
                    self.address, function.symbol
                ));
            } else {
                let signature = &function.signature;
                self.module.add_function(Function::new(
                    function.symbol.clone(),
                    signature.ret.clone(),
                    signature.params.clone(),
                    signature.varargs,
                ));
            }
            self.functions.insert(name.clone(), self.visibility, function.clone());
        }

        for (name, address) in &other.globals.public {
            let Some(symbol) = global_symbol(address) else {
                continue;
            };
            if self.module.global(&symbol).is_some() {
                self.warn(format!(
                    "{} already defines {}; keeping the existing definition",
                    self.address, symbol
                ));
            } else if let Some(ty) = address.ty().pointee() {
                self.module.add_global(GlobalVariable::new(symbol, ty.clone(), None));
            }
            self.globals.insert(name.clone(), self.visibility, address.clone());
        }

        for (name, layout) in &other.structs {
            self.structs.entry(name.clone()).or_insert_with(|| layout.clone());
        }

        self.module
            .link(&other.module)
            .map_err(|err| ScriptError::LinkFailure {
                library: other.name.clone(),
                message: err.to_string(),
            })?;
        log::debug!("{}: imported {}", self.address, other.address);
        Ok(())
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.reporter.warning(message);
    }
}

/// IR symbol behind a global's address
fn global_symbol(address: &Value) -> Option<String> {
    match address.as_constant() {
        Some(Constant::GlobalAddr { name, .. }) => Some(name.clone()),
        _ => None,
    }
}
