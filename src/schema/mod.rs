//! The JSON wire format.
//!
//! Every IR sum-type is mirrored by a serde enum whose externally-tagged
//! representation yields exactly one discriminant key per case. Variant and
//! field names are the wire format and must not change. Optional fields are
//! omitted (not null) when absent.

use serde::{Deserialize, Serialize};

/// A serialized type node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Int {
        width: u32,
    },
    Float {
        width: u32,
        name: String,
    },
    Array {
        element: Box<Type>,
        length: u64,
    },
    Struct {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<Type>>,
    },
    Function {
        params: Vec<Type>,
        variadic: bool,
        ret: Box<Type>,
    },
    Pointer {
        address_space: u32,
    },
    Vector {
        element: Box<Type>,
        fixed: bool,
        length: u64,
    },
    Extension {
        name: String,
        params: Vec<Type>,
    },
    TypedPointer {
        pointee: Box<Type>,
        address_space: u32,
    },
    Label,
    Token,
    Metadata,
}

/// An identified struct type at module scope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StructType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Type>>,
}

/// The payload of a serialized constant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Const {
    /// Unsigned decimal rendering of the value at full bit width.
    Int { value: String },
    /// Textual rendering of the floating-point value.
    Float { value: String },
    Null,
    None,
    Extension,
    Undef,
    Default,
    Array {
        elements: Vec<Constant>,
    },
    Vector {
        elements: Vec<Constant>,
    },
    Struct {
        elements: Vec<Constant>,
    },
    Variable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Function {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Alias {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Interface {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// `dso_local_equivalent` / `no_cfi` marker around a global value.
    Marker { wrap: Box<Constant> },
    /// Block address: function symbol plus block index in that function.
    Label { func: String, block: u64 },
    /// Constant expression, materialized as an instruction payload.
    Expr { inst: Box<Inst> },
}

/// A serialized constant: its type plus the tagged payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: Type,
    pub repr: Const,
}

/// A serialized operand.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Value {
    Argument { ty: Type, index: u64 },
    Constant(Constant),
    Instruction { ty: Type, index: u64 },
    /// A basic block used as a value.
    Label { func: String, block: u64 },
    /// Metadata-as-value placeholder.
    Metadata,
}

/// Inline assembly attached to a call or invoke.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InlineAsm {
    pub signature: Type,
    #[serde(rename = "asm")]
    pub assembly: String,
    pub constraint: String,
}

/// A phi incoming option.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhiOption {
    pub block: u64,
    pub value: Value,
}

/// A switch case (the default successor is emitted separately).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub block: u64,
    pub value: Constant,
}

/// The payload of a serialized instruction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Inst {
    // memory
    Alloca {
        allocated_type: Type,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Box<Value>>,
        address_space: u32,
    },
    Load {
        pointee_type: Type,
        pointer: Box<Value>,
        ordering: String,
        address_space: u32,
    },
    Store {
        pointee_type: Type,
        pointer: Box<Value>,
        value: Box<Value>,
        ordering: String,
        address_space: u32,
    },
    VAArg {
        pointer: Box<Value>,
    },

    // call family
    Intrinsic {
        callee: Box<Value>,
        target_type: Type,
        args: Vec<Value>,
    },
    CallDirect {
        callee: Box<Value>,
        target_type: Type,
        args: Vec<Value>,
    },
    CallIndirect {
        callee: Box<Value>,
        target_type: Type,
        args: Vec<Value>,
    },
    CallAsm {
        #[serde(rename = "asm")]
        assembly: InlineAsm,
        args: Vec<Value>,
    },

    // arithmetic and logic
    Unary {
        opcode: String,
        operand: Box<Value>,
    },
    Binary {
        opcode: String,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    Compare {
        predicate: String,
        operand_type: Type,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    Cast {
        opcode: String,
        src_ty: Type,
        dst_ty: Type,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src_address_space: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst_address_space: Option<u32>,
        operand: Box<Value>,
    },
    Freeze {
        operand: Box<Value>,
    },

    // pointer arithmetic
    GEP {
        src_pointee_ty: Type,
        dst_pointee_ty: Type,
        pointer: Box<Value>,
        indices: Vec<Value>,
        address_space: u32,
    },

    // choice
    ITE {
        cond: Box<Value>,
        then_value: Box<Value>,
        else_value: Box<Value>,
    },
    Phi {
        options: Vec<PhiOption>,
    },

    // aggregates
    GetValue {
        from_ty: Type,
        aggregate: Box<Value>,
        indices: Vec<u32>,
    },
    SetValue {
        aggregate: Box<Value>,
        value: Box<Value>,
        indices: Vec<u32>,
    },
    GetElement {
        vec_ty: Type,
        vector: Box<Value>,
        slot: Box<Value>,
    },
    SetElement {
        vector: Box<Value>,
        value: Box<Value>,
        slot: Box<Value>,
    },
    ShuffleVector {
        lhs: Box<Value>,
        rhs: Box<Value>,
        mask: Vec<i32>,
    },

    // concurrency
    Fence {
        ordering: String,
        scope: String,
    },
    AtomicCmpXchg {
        pointee_type: Type,
        pointer: Box<Value>,
        value_cmp: Box<Value>,
        value_xchg: Box<Value>,
        address_space: u32,
        ordering_success: String,
        ordering_failure: String,
        scope: String,
    },
    AtomicRMW {
        pointee_type: Type,
        pointer: Box<Value>,
        value: Box<Value>,
        address_space: u32,
        opcode: String,
        ordering: String,
        scope: String,
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
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Box<Value>>,
    },
    Branch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cond: Option<Box<Value>>,
        targets: Vec<u64>,
    },
    Switch {
        cond_ty: Type,
        cond: Box<Value>,
        cases: Vec<SwitchCase>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<u64>,
    },
    IndirectJump {
        address: Box<Value>,
        targets: Vec<u64>,
    },
    InvokeDirect {
        callee: Box<Value>,
        target_type: Type,
        args: Vec<Value>,
        normal: u64,
        unwind: u64,
    },
    InvokeIndirect {
        callee: Box<Value>,
        target_type: Type,
        args: Vec<Value>,
        normal: u64,
        unwind: u64,
    },
    InvokeAsm {
        #[serde(rename = "asm")]
        assembly: InlineAsm,
        args: Vec<Value>,
        normal: u64,
        unwind: u64,
    },
    Resume {
        value: Box<Value>,
    },
    Unreachable,
    CatchSwitch,
    CatchReturn,
    CleanupReturn,
    CallBranch,
}

/// A serialized instruction with its dense index and result type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Instruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ty: Type,
    pub index: u64,
    pub repr: Inst,
}

/// A serialized basic block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
    /// Dense block index within the function.
    pub label: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub body: Vec<Instruction>,
    pub terminator: Instruction,
}

/// A serialized function parameter with its typed attributes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ty: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_val: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_ref: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_allocated: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub struct_ret: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_alloca: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<Type>,
}

/// A serialized function.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Function {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ty: Type,
    pub is_defined: bool,
    pub is_exact: bool,
    pub is_intrinsic: bool,
    pub params: Vec<Parameter>,
    pub blocks: Vec<Block>,
}

/// A serialized global variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlobalVariable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ty: Type,
    pub is_extern: bool,
    pub is_const: bool,
    pub is_defined: bool,
    pub is_exact: bool,
    pub is_thread_local: bool,
    pub address_space: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Constant>,
}

/// The serialized module: the document root.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    #[serde(rename = "asm")]
    pub assembly: String,
    pub structs: Vec<StructType>,
    pub global_variables: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_serialize_with_a_single_discriminant_key() {
        let ty = Type::Int { width: 32 };
        let json = serde_json::to_value(&ty).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("Int"));
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let ty = Type::Struct {
            name: None,
            fields: None,
        };
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["Struct"].as_object().unwrap().len(), 0);

        let ret = Inst::Return { value: None };
        let json = serde_json::to_value(&ret).unwrap();
        assert_eq!(json["Return"].as_object().unwrap().len(), 0);
    }

    #[test]
    fn renamed_fields_hit_the_wire_names() {
        let asm = InlineAsm {
            signature: Type::Function {
                params: vec![],
                variadic: false,
                ret: Box::new(Type::Void),
            },
            assembly: "nop".into(),
            constraint: "".into(),
        };
        let json = serde_json::to_value(&asm).unwrap();
        assert!(json.get("asm").is_some());
        assert!(json.get("assembly").is_none());
    }
}
