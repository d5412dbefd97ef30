//! In-memory LLVM IR model.
//!
//! The model mirrors the IR constructs the encoder understands: a module of
//! identified structs, globals and functions; functions of basic blocks;
//! instructions whose operands are [`Value`]s. Local references (arguments
//! and instruction results) and block targets are carried by name and are
//! resolved through the per-function numbering context when the module is
//! encoded.

pub mod block;
pub mod constant;
pub mod function;
pub mod instruction;
pub mod module;
pub mod types;

pub use block::BasicBlock;
pub use constant::{Constant, ConstExpr, ConstKind};
pub use function::{Function, Linkage, ParamAttrs, Parameter};
pub use instruction::{
    AtomicOrdering, BinaryOp, CallTarget, CastOp, CmpPredicate, InlineAsm, Inst, InstKind, PhiArm,
    RmwOp, SwitchArm, SyncScope, UnaryOp,
};
pub use module::{GlobalAlias, GlobalIfunc, GlobalVariable, Module};
pub use types::{gep_result_type, FloatKind, StructDef, Type};

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Reference to an argument or an instruction result by local name.
    Local(String),

    /// An immediate constant.
    Constant(Constant),

    /// A basic block used as a value (by label, in the current function).
    Block(String),

    /// Metadata operand; carried as an opaque placeholder.
    Metadata,
}

impl Value {
    pub fn local(name: impl Into<String>) -> Value {
        Value::Local(name.into())
    }

    pub fn constant(constant: Constant) -> Value {
        Value::Constant(constant)
    }

    pub fn const_int(width: u32, value: i128) -> Value {
        Value::Constant(Constant::int(width, value))
    }

    /// The symbol this value directly names, when it is a constant function
    /// reference. Used for call dispatch.
    pub fn callee_symbol(&self) -> Option<&str> {
        match self {
            Value::Constant(Constant {
                kind: ConstKind::Function { name },
                ..
            }) => Some(name.as_str()),
            _ => None,
        }
    }
}
