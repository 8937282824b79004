//! Module and Global Variables
//!
//! Defines the top-level module structure, global variables, string
//! interning and module linking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::function::Function;
use crate::types::IrType;
use crate::values::Constant;
use crate::IrError;

/// Linkage types for global symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Linkage {
    /// Visible to other modules
    #[default]
    External,
    /// Only visible within this module
    Private,
}

/// Global variable definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    /// Type of the stored value; the global itself is a pointer to it
    pub ty: IrType,
    pub is_constant: bool,
    pub initializer: Option<Constant>,
    pub linkage: Linkage,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, ty: IrType, initializer: Option<Constant>) -> Self {
        Self {
            name: name.into(),
            ty,
            is_constant: false,
            initializer,
            linkage: Linkage::External,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.initializer.is_none()
    }

    pub fn address(&self) -> Constant {
        Constant::GlobalAddr {
            name: self.name.clone(),
            ty: self.ty.pointer(),
        }
    }
}

impl fmt::Display for GlobalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} = ", self.name)?;
        if self.linkage == Linkage::Private {
            write!(f, "private ")?;
        }
        if self.initializer.is_none() {
            write!(f, "external ")?;
        }
        write!(f, "{} {}", if self.is_constant { "constant" } else { "global" }, self.ty)?;
        if let Some(init) = &self.initializer {
            write!(f, " {init}")?;
        }
        Ok(())
    }
}

/// IR Module - a complete compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
    pub type_definitions: BTreeMap<String, IrType>,
    /// Interned text to the global holding it
    strings: BTreeMap<String, String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            globals: Vec::new(),
            type_definitions: BTreeMap::new(),
            strings: BTreeMap::new(),
        }
    }

    /// Add a function, returning its index
    pub fn add_function(&mut self, function: Function) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    pub fn add_global(&mut self, global: GlobalVariable) -> usize {
        self.globals.push(global);
        self.globals.len() - 1
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn global_mut(&mut self, name: &str) -> Option<&mut GlobalVariable> {
        self.globals.iter_mut().find(|g| g.name == name)
    }

    /// Intern a nul-terminated byte string, returning the address of its global
    pub fn intern_string(&mut self, text: &str) -> Constant {
        if let Some(global) = self.strings.get(text).and_then(|name| self.global(name)) {
            return global.address();
        }

        let name = format!("{}.str.{}", self.name, self.strings.len());
        let bytes: Vec<Constant> = text
            .bytes()
            .chain(std::iter::once(0))
            .map(|b| Constant::int(IrType::I8, b as i64))
            .collect();
        let ty = IrType::array_of(IrType::I8, bytes.len() as u64);
        let mut global = GlobalVariable::new(
            name.clone(),
            ty.clone(),
            Some(Constant::Array { ty, elements: bytes }),
        );
        global.is_constant = true;
        global.linkage = Linkage::Private;
        let address = global.address();
        self.add_global(global);
        self.strings.insert(text.to_string(), name);
        address
    }

    /// Merge `other` into this module.
    ///
    /// Declarations are replaced by definitions. Two definitions of the same
    /// symbol cannot be resolved and fail with `LinkConflict`.
    pub fn link(&mut self, other: &Module) -> Result<(), IrError> {
        for function in &other.functions {
            match self.function_index(&function.name) {
                Some(index) => {
                    let existing = &self.functions[index];
                    if !existing.is_declaration() && !function.is_declaration() {
                        return Err(IrError::LinkConflict {
                            symbol: function.name.clone(),
                        });
                    }
                    if existing.is_declaration() && !function.is_declaration() {
                        self.functions[index] = function.clone();
                    }
                }
                None => {
                    self.functions.push(function.clone());
                }
            }
        }

        for global in &other.globals {
            match self.globals.iter().position(|g| g.name == global.name) {
                Some(index) => {
                    let existing = &self.globals[index];
                    if !existing.is_declaration() && !global.is_declaration() {
                        return Err(IrError::LinkConflict {
                            symbol: global.name.clone(),
                        });
                    }
                    if existing.is_declaration() && !global.is_declaration() {
                        self.globals[index] = global.clone();
                    }
                }
                None => self.globals.push(global.clone()),
            }
        }

        for (name, ty) in &other.type_definitions {
            self.type_definitions
                .entry(name.clone())
                .or_insert_with(|| ty.clone());
        }

        log::debug!("linked module '{}' into '{}'", other.name, self.name);
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        for (name, ty) in &self.type_definitions {
            if let IrType::Struct { fields, .. } = ty {
                write!(f, "%{name} = type {{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                writeln!(f, " }}")?;
            }
        }
        for global in &self.globals {
            writeln!(f, "{global}")?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
