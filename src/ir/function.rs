//! Function, parameter and linkage representations.

use super::block::BasicBlock;
use super::types::Type;

/// The reserved prefix of compiler-known symbols.
const RESERVED_PREFIX: &str = "llvm.";

/// The prefix shared by all debug-info intrinsics.
const DEBUG_PREFIX: &str = "llvm.dbg.";

/// Whether a symbol belongs to the reserved intrinsic namespace.
pub fn is_reserved_symbol(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Whether a symbol names a debug-info intrinsic.
pub fn is_debug_symbol(name: &str) -> bool {
    name.starts_with(DEBUG_PREFIX)
}

/// Linkage of a global value, reduced to the kinds that influence the
/// encoding (definition exactness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    #[default]
    External,
    Internal,
    Private,
    Weak,
    LinkOnce,
    Common,
    Appending,
    ExternWeak,
    AvailableExternally,
}

impl Linkage {
    pub fn from_keyword(kw: &str) -> Option<Linkage> {
        use Linkage::*;
        Some(match kw {
            "external" | "dso_local" | "dso_preemptable" => External,
            "internal" => Internal,
            "private" => Private,
            "weak" | "weak_odr" => Weak,
            "linkonce" | "linkonce_odr" => LinkOnce,
            "common" => Common,
            "appending" => Appending,
            "extern_weak" => ExternWeak,
            "available_externally" => AvailableExternally,
            _ => return None,
        })
    }

    /// Whether a definition with this linkage cannot be replaced at link
    /// time (interposable definitions are not exact).
    pub fn is_exact_definition(&self) -> bool {
        !matches!(
            self,
            Linkage::Weak | Linkage::LinkOnce | Linkage::Common | Linkage::ExternWeak
        )
    }
}

/// Typed parameter attributes. Each field is present iff the IR carries the
/// corresponding attribute with its type payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamAttrs {
    pub by_val: Option<Type>,
    pub by_ref: Option<Type>,
    pub pre_allocated: Option<Type>,
    pub struct_ret: Option<Type>,
    pub in_alloca: Option<Type>,
    pub element_type: Option<Type>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Option<String>,
    pub ty: Type,
    pub attrs: ParamAttrs,
}

impl Parameter {
    pub fn new(ty: Type) -> Self {
        Self {
            name: None,
            ty,
            attrs: ParamAttrs::default(),
        }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            attrs: ParamAttrs::default(),
        }
    }
}

/// An IR function: signature, parameters, and (for definitions) a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    name: Option<String>,
    linkage: Linkage,
    ret_ty: Type,
    params: Vec<Parameter>,
    variadic: bool,
    blocks: Vec<BasicBlock>,
    /// Intrinsic id, when the producer recorded one.
    intrinsic_id: Option<u32>,
}

impl Function {
    pub fn new(name: impl Into<String>, ret_ty: Type, params: Vec<Parameter>) -> Self {
        Self {
            name: Some(name.into()),
            linkage: Linkage::External,
            ret_ty,
            params,
            variadic: false,
            blocks: Vec::new(),
            intrinsic_id: None,
        }
    }

    pub fn anonymous(ret_ty: Type, params: Vec<Parameter>) -> Self {
        Self {
            name: None,
            linkage: Linkage::Internal,
            ret_ty,
            params,
            variadic: false,
            blocks: Vec::new(),
            intrinsic_id: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn set_linkage(&mut self, linkage: Linkage) {
        self.linkage = linkage;
    }

    pub fn set_variadic(&mut self, variadic: bool) {
        self.variadic = variadic;
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn set_intrinsic_id(&mut self, id: u32) {
        self.intrinsic_id = Some(id);
    }

    pub fn ret_ty(&self) -> &Type {
        &self.ret_ty
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn add_block(&mut self, block: BasicBlock) {
        self.blocks.push(block);
    }

    pub fn get_block(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.name() == Some(name))
    }

    /// The function's type node.
    pub fn fn_type(&self) -> Type {
        Type::function(
            self.params.iter().map(|p| p.ty.clone()).collect(),
            self.ret_ty.clone(),
            self.variadic,
        )
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_defined(&self) -> bool {
        !self.is_declaration()
    }

    /// Whether the definition cannot be interposed away at link time.
    pub fn is_exact(&self) -> bool {
        self.is_defined() && self.linkage.is_exact_definition()
    }

    /// Whether the function is a compiler-known intrinsic, judged by the
    /// recorded id or by the reserved symbol prefix.
    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic_id.is_some()
            || self.name.as_deref().is_some_and(is_reserved_symbol)
    }

    /// Whether the function is a debug-info intrinsic. Such functions are
    /// skipped entirely during serialization.
    pub fn is_debug(&self) -> bool {
        self.name.as_deref().is_some_and(is_debug_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_and_debug_classification() {
        let memcpy = Function::new("llvm.memcpy.p0.p0.i64", Type::Void, vec![]);
        assert!(memcpy.is_intrinsic());
        assert!(!memcpy.is_debug());

        let dbg = Function::new("llvm.dbg.value", Type::Void, vec![]);
        assert!(dbg.is_intrinsic());
        assert!(dbg.is_debug());

        let plain = Function::new("memcpy", Type::Void, vec![]);
        assert!(!plain.is_intrinsic());

        let mut tagged = Function::new("frobnicate", Type::Void, vec![]);
        tagged.set_intrinsic_id(77);
        assert!(tagged.is_intrinsic());
    }

    #[test]
    fn exactness_tracks_linkage_and_definition() {
        let mut f = Function::new("f", Type::Void, vec![]);
        assert!(!f.is_exact()); // declaration

        let mut entry = BasicBlock::new("entry");
        entry.set_terminator(crate::ir::Inst::new(
            Type::Void,
            crate::ir::InstKind::Return { value: None },
        ));
        f.add_block(entry);
        assert!(f.is_exact());

        f.set_linkage(Linkage::LinkOnce);
        assert!(!f.is_exact());
    }
}
