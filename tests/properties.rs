//! Quantified properties: determinism, index bijection and ordering,
//! discriminant coverage across the whole instruction vocabulary.

use lljson::ir::{
    AtomicOrdering, BasicBlock, BinaryOp, CallTarget, CastOp, CmpPredicate, Constant, Function,
    InlineAsm, Inst, InstKind, Module, ParamAttrs, Parameter, PhiArm, RmwOp, SwitchArm, SyncScope,
    Type, UnaryOp, Value,
};
use lljson::{encode_module, encode_to_string, parse};

const FIXTURE: &str = r#"
source_filename = "fixture.c"

%struct.node = type { i32, ptr }

@head = global %struct.node zeroinitializer
@count = global i32 0

define i32 @walk(ptr %start, i32 %limit) {
entry:
  %n = alloca i32
  store i32 0, ptr %n
  br label %loop
loop:
  %cur = phi ptr [ %start, %entry ], [ %next, %step ]
  %seen = load i32, ptr %n
  %done = icmp sge i32 %seen, %limit
  br i1 %done, label %exit, label %step
step:
  %nextp = getelementptr %struct.node, ptr %cur, i64 0, i32 1
  %next = load ptr, ptr %nextp
  %bump = add i32 %seen, 1
  store i32 %bump, ptr %n
  br label %loop
exit:
  ret i32 %seen
}
"#;

#[test]
fn encoding_is_deterministic() {
    let module = parse(FIXTURE).unwrap();
    let first = encode_to_string(&module).unwrap();
    let second = encode_to_string(&module).unwrap();
    assert_eq!(first, second);

    // a fresh parse of the same source also matches byte for byte
    let reparsed = parse(FIXTURE).unwrap();
    let third = encode_to_string(&reparsed).unwrap();
    assert_eq!(first, third);
}

#[test]
fn block_and_instruction_indices_are_dense_and_ordered() {
    let module = parse(FIXTURE).unwrap();
    let encoded = encode_module(&module).unwrap();
    let walk = encoded
        .functions
        .iter()
        .find(|f| f.name.as_deref() == Some("walk"))
        .unwrap();

    // block labels are exactly 0..B-1 in emission order
    let labels: Vec<u64> = walk.blocks.iter().map(|b| b.label).collect();
    assert_eq!(labels, (0..walk.blocks.len() as u64).collect::<Vec<_>>());

    // instruction indices are exactly 0..I-1, monotonic across blocks,
    // terminators included
    let mut indices = Vec::new();
    for block in &walk.blocks {
        for inst in &block.body {
            indices.push(inst.index);
        }
        indices.push(block.terminator.index);
    }
    assert_eq!(indices, (0..indices.len() as u64).collect::<Vec<_>>());
}

#[test]
fn module_children_keep_declaration_order() {
    let module = parse(FIXTURE).unwrap();
    let encoded = encode_module(&module).unwrap();

    assert_eq!(encoded.name, "fixture.c");
    let globals: Vec<_> = encoded
        .global_variables
        .iter()
        .map(|g| g.name.clone().unwrap())
        .collect();
    assert_eq!(globals, vec!["head", "count"]);
    assert_eq!(encoded.structs[0].name.as_deref(), Some("struct.node"));
}

/// Build a module that exercises every instruction discriminant, then check
/// each one surfaces in the rendered document exactly once per use.
#[test]
fn every_instruction_discriminant_is_reachable() {
    let mut module = Module::new("kitchen-sink");
    module.add_function(Function::new("llvm.donothing", Type::Void, vec![]));
    module.add_function(Function::new("callee", Type::Void, vec![]));

    let vec2 = Type::vector(Type::int(32), 2);
    let agg = Type::structure(vec![Type::int(32), Type::int(64)]);
    let sig = Type::function(vec![], Type::Void, false);

    let mut func = Function::new(
        "sink",
        Type::Void,
        vec![Parameter::named("p", Type::ptr()), Parameter {
            name: Some("v".to_string()),
            ty: vec2.clone(),
            attrs: ParamAttrs::default(),
        }],
    );

    let mut b0 = BasicBlock::new("b0");
    b0.push(Inst::named(
        "slot",
        Type::ptr(),
        InstKind::Alloca {
            allocated_type: Type::int(32),
            size: Some(Value::const_int(32, 4)),
            address_space: 0,
        },
    ));
    b0.push(Inst::named(
        "ld",
        Type::int(32),
        InstKind::Load {
            pointee_type: Type::int(32),
            pointer: Value::local("slot"),
            ordering: AtomicOrdering::NotAtomic,
            address_space: 0,
        },
    ));
    b0.push(Inst::new(
        Type::Void,
        InstKind::Store {
            pointee_type: Type::int(32),
            pointer: Value::local("slot"),
            value: Value::local("ld"),
            ordering: AtomicOrdering::NotAtomic,
            address_space: 0,
        },
    ));
    b0.push(Inst::named(
        "va",
        Type::int(32),
        InstKind::VAArg {
            pointer: Value::local("p"),
        },
    ));
    b0.push(Inst::new(
        Type::Void,
        InstKind::Call {
            target: CallTarget::Value(Value::Constant(Constant::function_ref("callee"))),
            signature: sig.clone(),
            args: vec![],
        },
    ));
    b0.push(Inst::new(
        Type::Void,
        InstKind::Call {
            target: CallTarget::Value(Value::Constant(Constant::function_ref("llvm.donothing"))),
            signature: sig.clone(),
            args: vec![],
        },
    ));
    b0.push(Inst::new(
        Type::Void,
        InstKind::Call {
            target: CallTarget::Value(Value::local("p")),
            signature: sig.clone(),
            args: vec![],
        },
    ));
    b0.push(Inst::new(
        Type::Void,
        InstKind::Call {
            target: CallTarget::Asm(InlineAsm::new(sig.clone(), "nop", "")),
            signature: sig.clone(),
            args: vec![],
        },
    ));
    b0.push(Inst::named(
        "neg",
        Type::double(),
        InstKind::Unary {
            opcode: UnaryOp::FNeg,
            operand: Value::Constant(Constant::float(Type::double(), "1.0")),
        },
    ));
    b0.push(Inst::named(
        "sum",
        Type::int(32),
        InstKind::Binary {
            opcode: BinaryOp::Add,
            lhs: Value::local("ld"),
            rhs: Value::const_int(32, 1),
        },
    ));
    b0.push(Inst::named(
        "cmp",
        Type::int(1),
        InstKind::Compare {
            predicate: CmpPredicate::ISlt,
            operand_type: Type::int(32),
            lhs: Value::local("sum"),
            rhs: Value::const_int(32, 10),
        },
    ));
    b0.push(Inst::named(
        "wide",
        Type::int(64),
        InstKind::Cast {
            opcode: CastOp::SExt,
            src_ty: Type::int(32),
            dst_ty: Type::int(64),
            operand: Value::local("sum"),
        },
    ));
    b0.push(Inst::named(
        "frozen",
        Type::int(32),
        InstKind::Freeze {
            operand: Value::local("sum"),
        },
    ));
    b0.push(Inst::named(
        "addr",
        Type::ptr(),
        InstKind::Gep {
            src_pointee_ty: agg.clone(),
            dst_pointee_ty: Type::int(64),
            pointer: Value::local("p"),
            indices: vec![Value::const_int(64, 0), Value::const_int(32, 1)],
            address_space: 0,
        },
    ));
    b0.push(Inst::named(
        "pick",
        Type::int(32),
        InstKind::Select {
            cond: Value::local("cmp"),
            then_value: Value::local("sum"),
            else_value: Value::local("frozen"),
        },
    ));
    b0.push(Inst::named(
        "field",
        Type::int(64),
        InstKind::ExtractValue {
            from_ty: agg.clone(),
            aggregate: Value::Constant(Constant::zero(agg.clone())),
            indices: vec![1],
        },
    ));
    b0.push(Inst::named(
        "rebuilt",
        agg.clone(),
        InstKind::InsertValue {
            aggregate: Value::Constant(Constant::zero(agg.clone())),
            value: Value::local("field"),
            indices: vec![1],
        },
    ));
    b0.push(Inst::named(
        "lane",
        Type::int(32),
        InstKind::ExtractElement {
            vec_ty: vec2.clone(),
            vector: Value::local("v"),
            slot: Value::const_int(32, 0),
        },
    ));
    b0.push(Inst::named(
        "lanes",
        vec2.clone(),
        InstKind::InsertElement {
            vector: Value::local("v"),
            value: Value::local("lane"),
            slot: Value::const_int(32, 1),
        },
    ));
    b0.push(Inst::named(
        "mixed",
        vec2.clone(),
        InstKind::ShuffleVector {
            lhs: Value::local("v"),
            rhs: Value::local("lanes"),
            mask: vec![0, 3],
        },
    ));
    b0.push(Inst::new(
        Type::Void,
        InstKind::Fence {
            ordering: AtomicOrdering::SequentiallyConsistent,
            scope: SyncScope::System,
        },
    ));
    b0.push(Inst::named(
        "swap",
        Type::structure(vec![Type::int(32), Type::int(1)]),
        InstKind::CmpXchg {
            pointee_type: Type::int(32),
            pointer: Value::local("slot"),
            value_cmp: Value::const_int(32, 0),
            value_xchg: Value::const_int(32, 1),
            address_space: 0,
            ordering_success: AtomicOrdering::AcquireRelease,
            ordering_failure: AtomicOrdering::Monotonic,
            scope: SyncScope::System,
        },
    ));
    b0.push(Inst::named(
        "fetch",
        Type::int(32),
        InstKind::AtomicRmw {
            opcode: RmwOp::Add,
            pointee_type: Type::int(32),
            pointer: Value::local("slot"),
            value: Value::const_int(32, 1),
            address_space: 0,
            ordering: AtomicOrdering::SequentiallyConsistent,
            scope: SyncScope::SingleThread,
        },
    ));
    b0.push(Inst::new(Type::Token, InstKind::CatchPad));
    b0.push(Inst::new(Type::Token, InstKind::CleanupPad));
    b0.set_terminator(Inst::new(
        Type::Void,
        InstKind::Branch {
            cond: None,
            targets: vec!["b1".to_string()],
        },
    ));
    func.add_block(b0);

    let mut b1 = BasicBlock::new("b1");
    b1.push(Inst::named(
        "merge",
        Type::int(32),
        InstKind::Phi {
            options: vec![PhiArm {
                block: "b0".to_string(),
                value: Value::local("sum"),
            }],
        },
    ));
    b1.push(Inst::named(
        "pad",
        Type::structure(vec![Type::ptr(), Type::int(32)]),
        InstKind::LandingPad {
            clauses: vec![Constant::null()],
            is_cleanup: false,
        },
    ));
    b1.set_terminator(Inst::new(
        Type::Void,
        InstKind::Invoke {
            target: CallTarget::Value(Value::Constant(Constant::function_ref("callee"))),
            signature: sig.clone(),
            args: vec![],
            normal: "b2".to_string(),
            unwind: "b3".to_string(),
        },
    ));
    func.add_block(b1);

    let mut b2 = BasicBlock::new("b2");
    b2.set_terminator(Inst::new(
        Type::Void,
        InstKind::Invoke {
            target: CallTarget::Value(Value::local("p")),
            signature: sig.clone(),
            args: vec![],
            normal: "b4".to_string(),
            unwind: "b3".to_string(),
        },
    ));
    func.add_block(b2);

    let mut b3 = BasicBlock::new("b3");
    b3.set_terminator(Inst::new(
        Type::Void,
        InstKind::Resume {
            value: Value::local("pad"),
        },
    ));
    func.add_block(b3);

    let mut b4 = BasicBlock::new("b4");
    b4.set_terminator(Inst::new(
        Type::Void,
        InstKind::Invoke {
            target: CallTarget::Asm(InlineAsm::new(sig.clone(), "nop", "")),
            signature: sig.clone(),
            args: vec![],
            normal: "b5".to_string(),
            unwind: "b3".to_string(),
        },
    ));
    func.add_block(b4);

    let mut b5 = BasicBlock::new("b5");
    b5.set_terminator(Inst::new(
        Type::Void,
        InstKind::Switch {
            cond_ty: Type::int(32),
            cond: Value::local("merge"),
            cases: vec![SwitchArm {
                value: Constant::int(32, 1),
                target: "b6".to_string(),
            }],
            default: Some("b6".to_string()),
        },
    ));
    func.add_block(b5);

    let mut b6 = BasicBlock::new("b6");
    b6.set_terminator(Inst::new(
        Type::Void,
        InstKind::IndirectBranch {
            address: Value::Constant(Constant::block_address("sink", "b7")),
            targets: vec!["b7".to_string()],
        },
    ));
    func.add_block(b6);

    let mut b7 = BasicBlock::new("b7");
    b7.set_terminator(Inst::new(Type::Void, InstKind::CatchSwitch));
    func.add_block(b7);

    let mut b8 = BasicBlock::new("b8");
    b8.set_terminator(Inst::new(Type::Void, InstKind::CatchReturn));
    func.add_block(b8);

    let mut b9 = BasicBlock::new("b9");
    b9.set_terminator(Inst::new(Type::Void, InstKind::CleanupReturn));
    func.add_block(b9);

    let mut b10 = BasicBlock::new("b10");
    b10.set_terminator(Inst::new(Type::Void, InstKind::CallBranch));
    func.add_block(b10);

    let mut b11 = BasicBlock::new("b11");
    b11.set_terminator(Inst::new(Type::Void, InstKind::Unreachable));
    func.add_block(b11);

    let mut b12 = BasicBlock::new("b12");
    b12.set_terminator(Inst::new(Type::Void, InstKind::Return { value: None }));
    func.add_block(b12);

    module.add_function(func);

    let rendered = encode_to_string(&module).unwrap();
    for key in [
        "\"Alloca\"",
        "\"Load\"",
        "\"Store\"",
        "\"VAArg\"",
        "\"CallDirect\"",
        "\"Intrinsic\"",
        "\"CallIndirect\"",
        "\"CallAsm\"",
        "\"Unary\"",
        "\"Binary\"",
        "\"Compare\"",
        "\"Cast\"",
        "\"Freeze\"",
        "\"GEP\"",
        "\"ITE\"",
        "\"Phi\"",
        "\"GetValue\"",
        "\"SetValue\"",
        "\"GetElement\"",
        "\"SetElement\"",
        "\"ShuffleVector\"",
        "\"Fence\"",
        "\"AtomicCmpXchg\"",
        "\"AtomicRMW\"",
        "\"LandingPad\"",
        "\"CatchPad\"",
        "\"CleanupPad\"",
        "\"Return\"",
        "\"Branch\"",
        "\"Switch\"",
        "\"IndirectJump\"",
        "\"InvokeDirect\"",
        "\"InvokeIndirect\"",
        "\"InvokeAsm\"",
        "\"Resume\"",
        "\"Unreachable\"",
        "\"CatchSwitch\"",
        "\"CatchReturn\"",
        "\"CleanupReturn\"",
        "\"CallBranch\"",
    ] {
        assert!(rendered.contains(key), "missing discriminant {}", key);
    }
}

#[test]
fn block_used_as_value_resolves_to_a_label() {
    let mut module = Module::new("m");
    let mut func = Function::new("f", Type::Void, vec![]);

    let mut entry = BasicBlock::new("entry");
    entry.push(Inst::named(
        "taken",
        Type::Label,
        InstKind::Freeze {
            operand: Value::Block("exit".to_string()),
        },
    ));
    entry.set_terminator(Inst::new(
        Type::Void,
        InstKind::Branch {
            cond: None,
            targets: vec!["exit".to_string()],
        },
    ));
    func.add_block(entry);

    let mut exit = BasicBlock::new("exit");
    exit.set_terminator(Inst::new(Type::Void, InstKind::Return { value: None }));
    func.add_block(exit);
    module.add_function(func);

    let encoded = encode_module(&module).unwrap();
    let rendered = serde_json::to_value(&encoded).unwrap();
    let operand = &rendered["functions"][0]["blocks"][0]["body"][0]["repr"]["Freeze"]["operand"];
    assert_eq!(operand["Label"]["func"], "f");
    assert_eq!(operand["Label"]["block"], 1);
}

#[test]
fn output_files_are_never_overwritten() {
    let module = Module::new("m");
    let path = std::env::temp_dir().join(format!(
        "lljson-overwrite-check-{}.json",
        std::process::id()
    ));

    let _ = std::fs::remove_file(&path);
    lljson::encode_to_file(&module, &path).unwrap();
    let err = lljson::encode_to_file(&module, &path).unwrap_err();
    assert!(err.to_string().contains("failed to create"));
    let _ = std::fs::remove_file(&path);
}
