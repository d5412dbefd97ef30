//! Module-level containers: globals, aliases, ifuncs, functions.

use super::constant::Constant;
use super::function::{Function, Linkage};
use super::types::{StructDef, Type};

/// A global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariable {
    pub name: Option<String>,
    /// Value type of the global (not the pointer type of its symbol).
    pub ty: Type,
    pub linkage: Linkage,
    pub is_const: bool,
    pub is_thread_local: bool,
    pub is_externally_initialized: bool,
    pub address_space: u32,
    pub initializer: Option<Constant>,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            linkage: Linkage::External,
            is_const: false,
            is_thread_local: false,
            is_externally_initialized: false,
            address_space: 0,
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, init: Constant) -> Self {
        self.initializer = Some(init);
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn is_defined(&self) -> bool {
        self.initializer.is_some()
    }

    pub fn is_exact(&self) -> bool {
        self.is_defined() && self.linkage.is_exact_definition()
    }
}

/// A global alias; referenced from constants, never emitted standalone.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalAlias {
    pub name: String,
    pub aliasee: Constant,
}

/// An ifunc; referenced from constants as an interface symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalIfunc {
    pub name: String,
    pub resolver: Constant,
}

/// A fully-materialized IR module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    /// Module-level inline assembly, lines joined with `\n`.
    inline_asm: String,
    structs: Vec<StructDef>,
    globals: Vec<GlobalVariable>,
    aliases: Vec<GlobalAlias>,
    ifuncs: Vec<GlobalIfunc>,
    functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn inline_asm(&self) -> &str {
        &self.inline_asm
    }

    /// Append one module-level assembly line.
    pub fn append_inline_asm(&mut self, line: &str) {
        if !self.inline_asm.is_empty() {
            self.inline_asm.push('\n');
        }
        self.inline_asm.push_str(line);
    }

    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }

    pub fn register_struct(&mut self, def: StructDef) {
        self.structs.push(def);
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn globals(&self) -> &[GlobalVariable] {
        &self.globals
    }

    pub fn add_global(&mut self, global: GlobalVariable) {
        self.globals.push(global);
    }

    pub fn get_global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.iter().find(|g| g.name.as_deref() == Some(name))
    }

    pub fn aliases(&self) -> &[GlobalAlias] {
        &self.aliases
    }

    pub fn add_alias(&mut self, alias: GlobalAlias) {
        self.aliases.push(alias);
    }

    pub fn ifuncs(&self) -> &[GlobalIfunc] {
        &self.ifuncs
    }

    pub fn add_ifunc(&mut self, ifunc: GlobalIfunc) {
        self.ifuncs.push(ifunc);
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.name() == Some(name))
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions
            .iter_mut()
            .find(|f| f.name() == Some(name))
    }
}
