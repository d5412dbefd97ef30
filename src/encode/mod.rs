//! IR-to-JSON lowering.
//!
//! The encoder walks a materialized [`crate::ir::Module`] and produces the
//! [`crate::schema`] tree. All numbering contexts are built up front
//! (module preparation), then module children are emitted in declaration
//! order: identified structs, global variables, functions. Every reference
//! that crosses a function boundary resolves through the module context
//! built during preparation.
//!
//! # Error Handling
//!
//! Fatal conditions (dangling local or block references, a block address
//! into an unregistered function, a block without terminator) surface as
//! structured [`EncodeError`]s and abort the serialization; no partial
//! output is produced. Recoverable oddities (unnamed globals or functions,
//! duplicate function symbols) are logged and encoding proceeds.

mod constant;
mod context;
mod function;
mod instruction;
mod types;

pub use constant::encode_constant;
pub use context::{FunctionContext, LocalKind, LocalSlot, ModuleContext};
pub use function::{encode_function, encode_global_variable};
pub use instruction::{encode_instruction, encode_value};
pub use types::encode_type;

use thiserror::Error;

use crate::ir;
use crate::schema;

/// Errors that abort serialization.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A value operand names a local that the function never defines.
    #[error("unknown local %{name} in function '{func}'")]
    UnknownLocal { func: String, name: String },

    /// A block reference names a label that the function does not contain.
    #[error("unknown block label %{label} in function '{func}'")]
    UnknownBlock { func: String, label: String },

    /// A cross-function reference points at a function with no registered
    /// serialization context.
    #[error("no serialization context registered for function '{name}'")]
    MissingContext { name: String },

    /// A basic block of an unnamed function was used as a value; the wire
    /// format cannot address it.
    #[error("basic block of an unnamed function used as a value")]
    BlockValueInUnnamedFunction,

    /// A block reached the encoder without a terminator.
    #[error("block '{block}' of function '{func}' has no terminator")]
    MissingTerminator { func: String, block: String },

    /// The module is structurally broken in a way the upstream verifier
    /// should have rejected.
    #[error("malformed {what}: {detail}")]
    Malformed {
        what: &'static str,
        detail: String,
    },
}

impl EncodeError {
    pub fn unknown_local(func: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownLocal {
            func: func.into(),
            name: name.into(),
        }
    }

    pub fn unknown_block(func: impl Into<String>, label: impl Into<String>) -> Self {
        Self::UnknownBlock {
            func: func.into(),
            label: label.into(),
        }
    }

    pub fn missing_context(name: impl Into<String>) -> Self {
        Self::MissingContext { name: name.into() }
    }

    pub fn missing_terminator(func: impl Into<String>, block: impl Into<String>) -> Self {
        Self::MissingTerminator {
            func: func.into(),
            block: block.into(),
        }
    }

    pub fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            detail: detail.into(),
        }
    }
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// Encode a whole module.
///
/// Contexts for every non-debug function are registered before anything is
/// emitted, so block addresses in global initializers and cross-function
/// references inside bodies resolve no matter where they appear.
pub fn encode_module(module: &ir::Module) -> EncodeResult<schema::Module> {
    let mctx = ModuleContext::prepare(module);

    let structs = module
        .structs()
        .iter()
        .map(types::encode_struct_def)
        .collect();

    let mut global_variables = Vec::with_capacity(module.globals().len());
    for global in module.globals() {
        global_variables.push(encode_global_variable(global, &mctx)?);
    }

    let mut functions = Vec::new();
    for (position, func) in module.functions().iter().enumerate() {
        // debug intrinsics have no context and are not emitted
        let Some(fctx) = mctx.context_at(position) else {
            continue;
        };
        functions.push(encode_function(func, fctx, &mctx)?);
    }

    Ok(schema::Module {
        name: module.name().to_string(),
        assembly: module.inline_asm().to_string(),
        structs,
        global_variables,
        functions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, Function, Inst, InstKind, Module, Type, Value};

    fn ret_void() -> Inst {
        Inst::new(Type::Void, InstKind::Return { value: None })
    }

    #[test]
    fn empty_module_has_empty_sections() {
        let module = Module::new("m");
        let encoded = encode_module(&module).unwrap();
        assert_eq!(encoded.name, "m");
        assert!(encoded.structs.is_empty());
        assert!(encoded.global_variables.is_empty());
        assert!(encoded.functions.is_empty());
    }

    #[test]
    fn debug_intrinsic_functions_are_not_emitted() {
        let mut module = Module::new("m");
        module.add_function(Function::new("llvm.dbg.value", Type::Void, vec![]));

        let mut keep = Function::new("keep", Type::Void, vec![]);
        let mut entry = BasicBlock::new("entry");
        entry.set_terminator(ret_void());
        keep.add_block(entry);
        module.add_function(keep);

        let encoded = encode_module(&module).unwrap();
        assert_eq!(encoded.functions.len(), 1);
        assert_eq!(encoded.functions[0].name.as_deref(), Some("keep"));
    }

    #[test]
    fn dangling_local_reference_is_fatal() {
        let mut module = Module::new("m");
        let mut func = Function::new("f", Type::Void, vec![]);
        let mut entry = BasicBlock::new("entry");
        entry.push(Inst::new(
            Type::Void,
            InstKind::Freeze {
                operand: Value::local("ghost"),
            },
        ));
        entry.set_terminator(ret_void());
        func.add_block(entry);
        module.add_function(func);

        let err = encode_module(&module).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownLocal { .. }));
    }
}
