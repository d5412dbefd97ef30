//! LLVM instruction representations.
//!
//! Opcodes, predicates, orderings and sync scopes are closed enums with a
//! `Display` impl that yields the short wire-format string, so the JSON
//! vocabulary stays centralized here.

use std::fmt;

use super::constant::Constant;
use super::types::Type;
use super::Value;

/// Unary arithmetic opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    FNeg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::FNeg => write!(f, "fneg"),
        }
    }
}

/// Binary arithmetic and bitwise opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Map an IR keyword (`add`, `lshr`, ...) to an opcode.
    pub fn from_keyword(kw: &str) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match kw {
            "add" => Add,
            "fadd" => FAdd,
            "sub" => Sub,
            "fsub" => FSub,
            "mul" => Mul,
            "fmul" => FMul,
            "udiv" => UDiv,
            "sdiv" => SDiv,
            "fdiv" => FDiv,
            "urem" => URem,
            "srem" => SRem,
            "frem" => FRem,
            "shl" => Shl,
            "lshr" => LShr,
            "ashr" => AShr,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let text = match self {
            Add => "add",
            FAdd => "fadd",
            Sub => "sub",
            FSub => "fsub",
            Mul => "mul",
            FMul => "fmul",
            UDiv => "udiv",
            SDiv => "sdiv",
            FDiv => "fdiv",
            URem => "urem",
            SRem => "srem",
            FRem => "frem",
            Shl => "shl",
            LShr => "lshr",
            AShr => "ashr",
            And => "and",
            Or => "or",
            Xor => "xor",
        };
        write!(f, "{}", text)
    }
}

/// Comparison predicates, floating-point and integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpPredicate {
    FFalse,
    FOeq,
    FOgt,
    FOge,
    FOlt,
    FOle,
    FOne,
    FOrd,
    FUno,
    FUeq,
    FUgt,
    FUge,
    FUlt,
    FUle,
    FUne,
    FTrue,
    IEq,
    INe,
    IUgt,
    IUge,
    IUlt,
    IUle,
    ISgt,
    ISge,
    ISlt,
    ISle,
}

impl CmpPredicate {
    /// Map an `icmp` condition keyword to a predicate.
    pub fn from_int_keyword(kw: &str) -> Option<CmpPredicate> {
        use CmpPredicate::*;
        Some(match kw {
            "eq" => IEq,
            "ne" => INe,
            "ugt" => IUgt,
            "uge" => IUge,
            "ult" => IUlt,
            "ule" => IUle,
            "sgt" => ISgt,
            "sge" => ISge,
            "slt" => ISlt,
            "sle" => ISle,
            _ => return None,
        })
    }

    /// Map an `fcmp` condition keyword to a predicate.
    pub fn from_float_keyword(kw: &str) -> Option<CmpPredicate> {
        use CmpPredicate::*;
        Some(match kw {
            "false" => FFalse,
            "oeq" => FOeq,
            "ogt" => FOgt,
            "oge" => FOge,
            "olt" => FOlt,
            "ole" => FOle,
            "one" => FOne,
            "ord" => FOrd,
            "uno" => FUno,
            "ueq" => FUeq,
            "ugt" => FUgt,
            "uge" => FUge,
            "ult" => FUlt,
            "ule" => FUle,
            "une" => FUne,
            "true" => FTrue,
            _ => return None,
        })
    }
}

impl fmt::Display for CmpPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CmpPredicate::*;
        let text = match self {
            FFalse => "f_false",
            FOeq => "f_oeq",
            FOgt => "f_ogt",
            FOge => "f_oge",
            FOlt => "f_olt",
            FOle => "f_ole",
            FOne => "f_one",
            FOrd => "f_ord",
            FUno => "f_uno",
            FUeq => "f_ueq",
            FUgt => "f_ugt",
            FUge => "f_uge",
            FUlt => "f_ult",
            FUle => "f_ule",
            FUne => "f_une",
            FTrue => "f_true",
            IEq => "i_eq",
            INe => "i_ne",
            IUgt => "i_ugt",
            IUge => "i_uge",
            IUlt => "i_ult",
            IUle => "i_ule",
            ISgt => "i_sgt",
            ISge => "i_sge",
            ISlt => "i_slt",
            ISle => "i_sle",
        };
        write!(f, "{}", text)
    }
}

/// Cast opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    FpTrunc,
    FpExt,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
}

impl CastOp {
    /// Map an IR keyword (`zext`, `ptrtoint`, ...) to a cast opcode.
    pub fn from_keyword(kw: &str) -> Option<CastOp> {
        use CastOp::*;
        Some(match kw {
            "trunc" => Trunc,
            "zext" => ZExt,
            "sext" => SExt,
            "fptoui" => FpToUi,
            "fptosi" => FpToSi,
            "uitofp" => UiToFp,
            "sitofp" => SiToFp,
            "fptrunc" => FpTrunc,
            "fpext" => FpExt,
            "ptrtoint" => PtrToInt,
            "inttoptr" => IntToPtr,
            "bitcast" => BitCast,
            "addrspacecast" => AddrSpaceCast,
            _ => return None,
        })
    }

    /// Whether the source operand of this cast is a pointer.
    pub fn src_is_pointer(&self) -> bool {
        matches!(self, CastOp::PtrToInt | CastOp::AddrSpaceCast)
    }

    /// Whether the destination of this cast is a pointer.
    pub fn dst_is_pointer(&self) -> bool {
        matches!(self, CastOp::IntToPtr | CastOp::AddrSpaceCast)
    }
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CastOp::*;
        let text = match self {
            Trunc => "trunc",
            ZExt => "zext",
            SExt => "sext",
            FpToUi => "fp_to_ui",
            FpToSi => "fp_to_si",
            UiToFp => "ui_to_fp",
            SiToFp => "si_to_fp",
            FpTrunc => "fp_trunc",
            FpExt => "fp_ext",
            PtrToInt => "ptr_to_int",
            IntToPtr => "int_to_ptr",
            BitCast => "bitcast",
            AddrSpaceCast => "address_space_cast",
        };
        write!(f, "{}", text)
    }
}

/// Atomic memory orderings, printed with the IR keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AtomicOrdering {
    #[default]
    NotAtomic,
    Unordered,
    Monotonic,
    Acquire,
    Release,
    AcquireRelease,
    SequentiallyConsistent,
}

impl AtomicOrdering {
    pub fn from_keyword(kw: &str) -> Option<AtomicOrdering> {
        use AtomicOrdering::*;
        Some(match kw {
            "unordered" => Unordered,
            "monotonic" => Monotonic,
            "acquire" => Acquire,
            "release" => Release,
            "acq_rel" => AcquireRelease,
            "seq_cst" => SequentiallyConsistent,
            _ => return None,
        })
    }
}

impl fmt::Display for AtomicOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AtomicOrdering::*;
        let text = match self {
            NotAtomic => "not_atomic",
            Unordered => "unordered",
            Monotonic => "monotonic",
            Acquire => "acquire",
            Release => "release",
            AcquireRelease => "acq_rel",
            SequentiallyConsistent => "seq_cst",
        };
        write!(f, "{}", text)
    }
}

/// Synchronization scope of an atomic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncScope {
    #[default]
    System,
    SingleThread,
    /// Any target-specific scope id.
    Other,
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyncScope::System => "system",
            SyncScope::SingleThread => "thread",
            SyncScope::Other => "unknown",
        };
        write!(f, "{}", text)
    }
}

/// `atomicrmw` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RmwOp {
    Xchg,
    Add,
    FAdd,
    Sub,
    FSub,
    UIncWrap,
    UDecWrap,
    Max,
    UMax,
    FMax,
    Min,
    UMin,
    FMin,
    And,
    Or,
    Xor,
    Nand,
}

impl RmwOp {
    pub fn from_keyword(kw: &str) -> Option<RmwOp> {
        use RmwOp::*;
        Some(match kw {
            "xchg" => Xchg,
            "add" => Add,
            "fadd" => FAdd,
            "sub" => Sub,
            "fsub" => FSub,
            "uinc_wrap" => UIncWrap,
            "udec_wrap" => UDecWrap,
            "max" => Max,
            "umax" => UMax,
            "fmax" => FMax,
            "min" => Min,
            "umin" => UMin,
            "fmin" => FMin,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            "nand" => Nand,
            _ => return None,
        })
    }
}

impl fmt::Display for RmwOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RmwOp::*;
        let text = match self {
            Xchg => "xchg",
            Add => "add",
            FAdd => "fadd",
            Sub => "sub",
            FSub => "fsub",
            UIncWrap => "uinc",
            UDecWrap => "udec",
            Max => "max",
            UMax => "umax",
            FMax => "fmax",
            Min => "min",
            UMin => "umin",
            FMin => "fmin",
            And => "and",
            Or => "or",
            Xor => "xor",
            Nand => "nand",
        };
        write!(f, "{}", text)
    }
}

/// Inline assembly callable, usable only as a call or invoke target.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineAsm {
    /// Function type of the asm callable.
    pub signature: Type,
    pub asm: String,
    pub constraint: String,
}

impl InlineAsm {
    pub fn new(signature: Type, asm: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            signature,
            asm: asm.into(),
            constraint: constraint.into(),
        }
    }
}

/// What a call or invoke dispatches to.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Inline assembly blob.
    Asm(InlineAsm),
    /// An ordinary callee operand; a constant function reference makes the
    /// call direct, anything else makes it indirect.
    Value(Value),
}

/// A phi incoming arm.
#[derive(Debug, Clone, PartialEq)]
pub struct PhiArm {
    pub block: String,
    pub value: Value,
}

/// A switch case.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchArm {
    pub value: Constant,
    pub target: String,
}

/// The payload of an instruction. Block references are labels into the
/// enclosing function; value operands resolve through the per-function
/// numbering context at encoding time.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    // memory
    Alloca {
        allocated_type: Type,
        /// Element count for array allocations.
        size: Option<Value>,
        address_space: u32,
    },
    Load {
        pointee_type: Type,
        pointer: Value,
        ordering: AtomicOrdering,
        address_space: u32,
    },
    Store {
        pointee_type: Type,
        pointer: Value,
        value: Value,
        ordering: AtomicOrdering,
        address_space: u32,
    },
    VAArg {
        pointer: Value,
    },

    // calls
    Call {
        target: CallTarget,
        /// Function type of the callee.
        signature: Type,
        args: Vec<Value>,
    },
    Invoke {
        target: CallTarget,
        signature: Type,
        args: Vec<Value>,
        normal: String,
        unwind: String,
    },

    // arithmetic and logic
    Unary {
        opcode: UnaryOp,
        operand: Value,
    },
    Binary {
        opcode: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Compare {
        predicate: CmpPredicate,
        operand_type: Type,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        opcode: CastOp,
        src_ty: Type,
        dst_ty: Type,
        operand: Value,
    },
    Freeze {
        operand: Value,
    },

    // pointer arithmetic
    Gep {
        src_pointee_ty: Type,
        dst_pointee_ty: Type,
        pointer: Value,
        indices: Vec<Value>,
        address_space: u32,
    },

    // choice
    Phi {
        options: Vec<PhiArm>,
    },
    Select {
        cond: Value,
        then_value: Value,
        else_value: Value,
    },

    // aggregates
    ExtractValue {
        from_ty: Type,
        aggregate: Value,
        indices: Vec<u32>,
    },
    InsertValue {
        aggregate: Value,
        value: Value,
        indices: Vec<u32>,
    },
    ExtractElement {
        vec_ty: Type,
        vector: Value,
        slot: Value,
    },
    InsertElement {
        vector: Value,
        value: Value,
        slot: Value,
    },
    ShuffleVector {
        lhs: Value,
        rhs: Value,
        /// Lane selectors; -1 marks an undef lane.
        mask: Vec<i32>,
    },

    // concurrency
    Fence {
        ordering: AtomicOrdering,
        scope: SyncScope,
    },
    CmpXchg {
        pointee_type: Type,
        pointer: Value,
        value_cmp: Value,
        value_xchg: Value,
        address_space: u32,
        ordering_success: AtomicOrdering,
        ordering_failure: AtomicOrdering,
        scope: SyncScope,
    },
    AtomicRmw {
        opcode: RmwOp,
        pointee_type: Type,
        pointer: Value,
        value: Value,
        address_space: u32,
        ordering: AtomicOrdering,
        scope: SyncScope,
    },

    // exception handling
    LandingPad {
        clauses: Vec<Constant>,
        is_cleanup: bool,
    },
    CatchPad,
    CleanupPad,

    // terminators
    Return {
        value: Option<Value>,
    },
    Branch {
        cond: Option<Value>,
        targets: Vec<String>,
    },
    Switch {
        cond_ty: Type,
        cond: Value,
        cases: Vec<SwitchArm>,
        default: Option<String>,
    },
    IndirectBranch {
        address: Value,
        targets: Vec<String>,
    },
    Resume {
        value: Value,
    },
    Unreachable,
    CatchSwitch,
    CatchReturn,
    CleanupReturn,
    CallBranch,
}

impl InstKind {
    /// Whether this instruction ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Return { .. }
                | InstKind::Branch { .. }
                | InstKind::Switch { .. }
                | InstKind::IndirectBranch { .. }
                | InstKind::Invoke { .. }
                | InstKind::Resume { .. }
                | InstKind::Unreachable
                | InstKind::CatchSwitch
                | InstKind::CatchReturn
                | InstKind::CleanupReturn
                | InstKind::CallBranch
        )
    }
}

/// An instruction: optional result name, result type, payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub name: Option<String>,
    pub ty: Type,
    pub kind: InstKind,
}

impl Inst {
    pub fn new(ty: Type, kind: InstKind) -> Self {
        Self {
            name: None,
            ty,
            kind,
        }
    }

    pub fn named(name: impl Into<String>, ty: Type, kind: InstKind) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            kind,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    /// Whether this is a call to a debug-info intrinsic. Such instructions
    /// are excluded from numbering and emission alike.
    pub fn is_debug_intrinsic(&self) -> bool {
        match &self.kind {
            InstKind::Call { target, .. } => match target {
                CallTarget::Value(value) => value
                    .callee_symbol()
                    .is_some_and(super::function::is_debug_symbol),
                CallTarget::Asm(_) => false,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_the_vocabulary() {
        assert_eq!(BinaryOp::LShr.to_string(), "lshr");
        assert_eq!(CmpPredicate::ISle.to_string(), "i_sle");
        assert_eq!(CmpPredicate::FUno.to_string(), "f_uno");
        assert_eq!(CastOp::AddrSpaceCast.to_string(), "address_space_cast");
        assert_eq!(CastOp::FpToUi.to_string(), "fp_to_ui");
        assert_eq!(AtomicOrdering::AcquireRelease.to_string(), "acq_rel");
        assert_eq!(SyncScope::SingleThread.to_string(), "thread");
        assert_eq!(RmwOp::UIncWrap.to_string(), "uinc");
    }

    #[test]
    fn keyword_mappings_round_trip() {
        assert_eq!(BinaryOp::from_keyword("ashr"), Some(BinaryOp::AShr));
        assert_eq!(CastOp::from_keyword("addrspacecast"), Some(CastOp::AddrSpaceCast));
        assert_eq!(
            CmpPredicate::from_int_keyword("sge"),
            Some(CmpPredicate::ISge)
        );
        assert_eq!(
            CmpPredicate::from_float_keyword("uno"),
            Some(CmpPredicate::FUno)
        );
        assert_eq!(CmpPredicate::from_int_keyword("oeq"), None);
        assert_eq!(
            AtomicOrdering::from_keyword("seq_cst"),
            Some(AtomicOrdering::SequentiallyConsistent)
        );
        assert_eq!(RmwOp::from_keyword("uinc_wrap"), Some(RmwOp::UIncWrap));
    }

    #[test]
    fn terminator_classification() {
        assert!(InstKind::Unreachable.is_terminator());
        assert!(InstKind::Return { value: None }.is_terminator());
        assert!(!InstKind::Freeze {
            operand: Value::Metadata
        }
        .is_terminator());
    }
}
