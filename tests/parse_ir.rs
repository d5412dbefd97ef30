//! Parser-level tests: the produced IR, not its encoding.

use lljson::ir::{CallTarget, ConstKind, InstKind, Linkage, Type, Value};
use lljson::parse;

#[test]
fn module_level_assembly_lines_concatenate() {
    let module = parse(
        r#"
module asm ".globl marker"
module asm "marker:"
"#,
    )
    .unwrap();
    assert_eq!(module.inline_asm(), ".globl marker\nmarker:");
}

#[test]
fn named_and_opaque_struct_types_register() {
    let module = parse(
        r#"
%struct.pair = type { i32, i32 }
%struct.hidden = type opaque

@p = global %struct.pair zeroinitializer
"#,
    )
    .unwrap();

    let pair = module.get_struct("struct.pair").unwrap();
    assert_eq!(pair.fields.as_ref().unwrap().len(), 2);
    let hidden = module.get_struct("struct.hidden").unwrap();
    assert!(hidden.fields.is_none());

    let global = module.get_global("p").unwrap();
    match &global.ty {
        Type::Struct {
            name: Some(name),
            fields: Some(_),
        } => assert_eq!(name, "struct.pair"),
        other => panic!("expected resolved struct type, got {:?}", other),
    }
}

#[test]
fn parameter_attributes_with_type_payloads() {
    let module = parse(
        r#"
%struct.big = type { [16 x i64] }

define void @consume(ptr noundef byval(%struct.big) align 8 %arg, ptr sret(%struct.big) %out, i32 noundef %plain) {
entry:
  ret void
}
"#,
    )
    .unwrap();

    let func = module.get_function("consume").unwrap();
    let params = func.params();
    assert_eq!(params.len(), 3);

    assert!(matches!(
        params[0].attrs.by_val,
        Some(Type::Struct { .. })
    ));
    assert_eq!(params[0].name.as_deref(), Some("arg"));
    assert!(matches!(
        params[1].attrs.struct_ret,
        Some(Type::Struct { .. })
    ));
    assert!(params[2].attrs.by_val.is_none());
}

#[test]
fn linkage_and_variadic_functions() {
    let module = parse(
        r#"
declare i32 @printf(ptr noundef, ...)

define internal i32 @helper() {
entry:
  ret i32 0
}

define weak void @soft() {
entry:
  ret void
}
"#,
    )
    .unwrap();

    let printf = module.get_function("printf").unwrap();
    assert!(printf.is_variadic());
    assert!(printf.is_declaration());

    assert_eq!(
        module.get_function("helper").unwrap().linkage(),
        Linkage::Internal
    );
    let soft = module.get_function("soft").unwrap();
    assert_eq!(soft.linkage(), Linkage::Weak);
    assert!(!soft.is_exact());
}

#[test]
fn aliases_and_ifuncs_resolve_as_symbols() {
    let module = parse(
        r#"
@real = global i32 1
@alias_to_real = alias i32, ptr @real

define ptr @pick_impl() {
entry:
  ret ptr null
}
@fast_fn = ifunc void (), ptr @pick_impl

@user = global ptr @alias_to_real
"#,
    )
    .unwrap();

    assert_eq!(module.aliases().len(), 1);
    assert_eq!(module.ifuncs().len(), 1);

    // the reference through the alias keeps its symbol kind
    let user = module.get_global("user").unwrap();
    match &user.initializer.as_ref().unwrap().kind {
        ConstKind::Alias { name } => assert_eq!(name, "alias_to_real"),
        other => panic!("expected alias reference, got {:?}", other),
    }
}

#[test]
fn numeric_labels_and_references() {
    let module = parse(
        r#"
define void @f(i1 %c) {
entry:
  br i1 %c, label %10, label %20
10:
  ret void
20:
  ret void
}
"#,
    )
    .unwrap();

    let func = module.get_function("f").unwrap();
    assert_eq!(func.blocks().len(), 3);
    assert_eq!(func.blocks()[1].name(), Some("10"));

    match &func.blocks()[0].terminator().unwrap().kind {
        InstKind::Branch { targets, .. } => {
            assert_eq!(targets, &vec!["10".to_string(), "20".to_string()]);
        }
        other => panic!("expected branch, got {:?}", other),
    }
}

#[test]
fn negative_integers_wrap_to_unsigned_decimals() {
    let module = parse(
        r#"
@minus_one = global i8 -1
@minus_forty = global i64 -40
"#,
    )
    .unwrap();

    let minus_one = module.get_global("minus_one").unwrap();
    match &minus_one.initializer.as_ref().unwrap().kind {
        ConstKind::Int { value } => assert_eq!(value, "255"),
        other => panic!("expected int, got {:?}", other),
    }

    let minus_forty = module.get_global("minus_forty").unwrap();
    match &minus_forty.initializer.as_ref().unwrap().kind {
        ConstKind::Int { value } => assert_eq!(value, "18446744073709551576"),
        other => panic!("expected int, got {:?}", other),
    }
}

#[test]
fn string_data_becomes_byte_arrays() {
    let module = parse(
        r#"
@msg = constant [4 x i8] c"ok\0A\00"
"#,
    )
    .unwrap();

    let msg = module.get_global("msg").unwrap();
    match &msg.initializer.as_ref().unwrap().kind {
        ConstKind::Array { elements } => {
            assert_eq!(elements.len(), 4);
            assert_eq!(elements[2].as_u64(), Some(10));
            assert_eq!(elements[3].as_u64(), Some(0));
        }
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn calls_with_explicit_signatures() {
    let module = parse(
        r#"
declare i32 @printf(ptr noundef, ...)
@fmt = constant [3 x i8] c"%d\00"

define void @say(i32 %x) {
entry:
  %r = call i32 (ptr, ...) @printf(ptr @fmt, i32 %x)
  ret void
}
"#,
    )
    .unwrap();

    let say = module.get_function("say").unwrap();
    let call = &say.blocks()[0].body()[0];
    match &call.kind {
        InstKind::Call {
            target, signature, ..
        } => {
            match signature {
                Type::Function { variadic, ret, .. } => {
                    assert!(*variadic);
                    assert_eq!(**ret, Type::int(32));
                }
                other => panic!("expected function type, got {:?}", other),
            }
            match target {
                CallTarget::Value(Value::Constant(c)) => {
                    assert!(matches!(&c.kind, ConstKind::Function { name } if name == "printf"));
                }
                other => panic!("expected direct callee, got {:?}", other),
            }
        }
        other => panic!("expected call, got {:?}", other),
    }
    assert_eq!(call.ty, Type::int(32));
}

#[test]
fn unknown_opcodes_are_rejected() {
    let err = parse(
        r#"
define void @f() {
entry:
  frobnicate i32 1
  ret void
}
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        lljson::ParseError::InvalidInstruction { .. }
    ));
}

#[test]
fn instructions_after_a_terminator_need_a_label() {
    let err = parse(
        r#"
define void @f() {
entry:
  ret void
  ret void
}
"#,
    )
    .unwrap_err();
    assert!(matches!(err, lljson::ParseError::Syntax { .. }));
}
