//! Numbering contexts.
//!
//! A [`FunctionContext`] is a pure preprocessing pass over one function: it
//! assigns dense indices to blocks (declaration order), instructions
//! (program order across all blocks, terminators included) and arguments
//! (parameter order), and records the name-to-slot tables later used to
//! resolve operand references. Numbering is complete before any encoding of
//! the function begins, which is what lets phi nodes and branches refer to
//! blocks declared later.
//!
//! The [`ModuleContext`] registry holds one context per non-debug function
//! and is fully populated before any module child is emitted, so block
//! addresses resolve regardless of which function (or global initializer)
//! they appear in.

use indexmap::IndexMap;

use super::{EncodeError, EncodeResult};
use crate::ir;

/// What a resolved local name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Argument,
    Instruction,
}

/// A resolved local: its kind, dense index, and result type.
#[derive(Debug, Clone)]
pub struct LocalSlot {
    pub kind: LocalKind,
    pub index: u64,
    pub ty: ir::Type,
}

/// Instruction indices of one block, positionally parallel to the block's
/// body. `None` marks a debug intrinsic, excluded from numbering and
/// emission alike.
#[derive(Debug, Clone)]
pub struct BlockNumbering {
    pub body: Vec<Option<u64>>,
    pub terminator: Option<u64>,
}

/// Per-function numbering tables.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    name: Option<String>,
    is_intrinsic: bool,
    locals: IndexMap<String, LocalSlot>,
    blocks_by_name: IndexMap<String, u64>,
    numbering: Vec<BlockNumbering>,
    arg_count: u64,
    inst_count: u64,
}

impl FunctionContext {
    /// Number one function. Deterministic: depends only on IR order.
    pub fn build(func: &ir::Function) -> Self {
        let mut locals = IndexMap::new();

        let mut arg_count = 0u64;
        for param in func.params() {
            if let Some(name) = &param.name {
                locals.insert(
                    name.clone(),
                    LocalSlot {
                        kind: LocalKind::Argument,
                        index: arg_count,
                        ty: param.ty.clone(),
                    },
                );
            }
            arg_count += 1;
        }

        let mut blocks_by_name = IndexMap::new();
        let mut numbering = Vec::with_capacity(func.blocks().len());
        let mut inst_count = 0u64;
        for (position, block) in func.blocks().iter().enumerate() {
            if let Some(name) = block.name() {
                blocks_by_name.insert(name.to_string(), position as u64);
            }

            let mut body = Vec::with_capacity(block.body().len());
            for inst in block.body() {
                if inst.is_debug_intrinsic() {
                    body.push(None);
                    continue;
                }
                body.push(Some(inst_count));
                if let Some(name) = &inst.name {
                    locals.insert(
                        name.clone(),
                        LocalSlot {
                            kind: LocalKind::Instruction,
                            index: inst_count,
                            ty: inst.ty.clone(),
                        },
                    );
                }
                inst_count += 1;
            }

            let terminator = block.terminator().map(|term| {
                let index = inst_count;
                if let Some(name) = &term.name {
                    locals.insert(
                        name.clone(),
                        LocalSlot {
                            kind: LocalKind::Instruction,
                            index,
                            ty: term.ty.clone(),
                        },
                    );
                }
                inst_count += 1;
                index
            });
            numbering.push(BlockNumbering { body, terminator });
        }

        Self {
            name: func.name().map(str::to_string),
            is_intrinsic: func.is_intrinsic(),
            locals,
            blocks_by_name,
            numbering,
            arg_count,
            inst_count,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Function name for diagnostics.
    pub fn describe(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<anonymous>".to_string())
    }

    pub fn is_intrinsic(&self) -> bool {
        self.is_intrinsic
    }

    pub fn lookup_local(&self, name: &str) -> Option<&LocalSlot> {
        self.locals.get(name)
    }

    pub fn block_index(&self, label: &str) -> Option<u64> {
        self.blocks_by_name.get(label).copied()
    }

    pub fn block_numbering(&self, position: usize) -> &BlockNumbering {
        &self.numbering[position]
    }

    pub fn block_count(&self) -> u64 {
        self.numbering.len() as u64
    }

    pub fn inst_count(&self) -> u64 {
        self.inst_count
    }

    pub fn arg_count(&self) -> u64 {
        self.arg_count
    }
}

/// Module-wide registry of function contexts.
#[derive(Debug)]
pub struct ModuleContext {
    /// Parallel to the module's function list; `None` for debug intrinsics.
    contexts: Vec<Option<FunctionContext>>,
    by_name: IndexMap<String, usize>,
}

impl ModuleContext {
    /// Build and register a context for every non-debug function.
    pub fn prepare(module: &ir::Module) -> Self {
        let mut contexts = Vec::with_capacity(module.functions().len());
        let mut by_name = IndexMap::new();

        for (position, func) in module.functions().iter().enumerate() {
            if func.is_debug() {
                contexts.push(None);
                continue;
            }
            match func.name() {
                Some(name) => {
                    if by_name.insert(name.to_string(), position).is_some() {
                        log::warn!("duplicate function symbol '{}'", name);
                    }
                }
                None => log::warn!("unnamed function at module position {}", position),
            }
            contexts.push(Some(FunctionContext::build(func)));
        }

        Self { contexts, by_name }
    }

    /// Context of the function at the given module position, if it gets one.
    pub fn context_at(&self, position: usize) -> Option<&FunctionContext> {
        self.contexts.get(position)?.as_ref()
    }

    /// Context of the named function; a missing entry is fatal.
    pub fn context_for(&self, name: &str) -> EncodeResult<&FunctionContext> {
        self.by_name
            .get(name)
            .and_then(|position| self.contexts[*position].as_ref())
            .ok_or_else(|| EncodeError::missing_context(name))
    }

    /// Whether the symbol names an intrinsic, judged by the registered
    /// function or by the reserved prefix for unregistered callees.
    pub fn is_intrinsic_symbol(&self, name: &str) -> bool {
        if ir::function::is_reserved_symbol(name) {
            return true;
        }
        self.by_name
            .get(name)
            .and_then(|position| self.contexts[*position].as_ref())
            .is_some_and(FunctionContext::is_intrinsic)
    }
}
