//! Global-variable encoding scenarios.
//!
//! These mirror the small C fixtures the encoder was developed against:
//! zero-initialized struct globals, constant-folded and expression
//! initializers, nested struct aggregates, and block-address tables.

use lljson::schema::{Const, Inst, Type, Value};
use lljson::{encode_module, parse};

fn encode(source: &str) -> lljson::schema::Module {
    let module = parse(source).expect("fixture must parse");
    encode_module(&module).expect("fixture must encode")
}

#[test]
fn zero_initialized_struct_globals() {
    let encoded = encode(
        r#"
%struct.simple = type { i32, float, ptr }

@g_simple = global %struct.simple zeroinitializer
@g_defined = global %struct.simple zeroinitializer
"#,
    );

    assert_eq!(encoded.global_variables.len(), 2);
    let names: Vec<_> = encoded
        .global_variables
        .iter()
        .map(|g| g.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["g_simple", "g_defined"]);

    for global in &encoded.global_variables {
        assert!(global.is_defined);
        let init = global.initializer.as_ref().expect("has initializer");
        assert_eq!(init.repr, Const::Default);

        // the struct shape, function-pointer field included, rides along
        match &init.ty {
            Type::Struct {
                name: Some(name),
                fields: Some(fields),
            } => {
                assert_eq!(name, "struct.simple");
                assert_eq!(fields.len(), 3);
                assert_eq!(fields[2], Type::Pointer { address_space: 0 });
            }
            other => panic!("expected named struct type, got {:?}", other),
        }
    }

    // identified structs are also listed at module level
    assert_eq!(encoded.structs.len(), 1);
    assert_eq!(encoded.structs[0].name.as_deref(), Some("struct.simple"));
}

#[test]
fn constant_folded_and_expression_initializers() {
    let encoded = encode(
        r#"
@g_defined_const = constant [4 x i32] [i32 1, i32 2, i32 3, i32 4]
@g_int_const = global i32 3
@g_long_var = global i64 mul (i64 sext (i32 3 to i64), i64 5)
@g_int_gep = global ptr getelementptr inbounds ([4 x i32], ptr @g_defined_const, i64 0, i64 2)
"#,
    );

    let by_name = |name: &str| {
        encoded
            .global_variables
            .iter()
            .find(|g| g.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("missing global {}", name))
    };

    // constant folding happened upstream; the value arrives as a plain int
    let int_const = by_name("g_int_const");
    assert_eq!(
        int_const.initializer.as_ref().unwrap().repr,
        Const::Int {
            value: "3".to_string()
        }
    );

    // mul(sext(3), 5) arrives as a nested expression tree
    let long_var = by_name("g_long_var");
    match &long_var.initializer.as_ref().unwrap().repr {
        Const::Expr { inst } => match inst.as_ref() {
            Inst::Binary { opcode, lhs, .. } => {
                assert_eq!(opcode, "mul");
                match lhs.as_ref() {
                    Value::Constant(inner) => match &inner.repr {
                        Const::Expr { inst } => match inst.as_ref() {
                            Inst::Cast { opcode, .. } => assert_eq!(opcode, "sext"),
                            other => panic!("expected cast, got {:?}", other),
                        },
                        other => panic!("expected nested expr, got {:?}", other),
                    },
                    other => panic!("expected constant operand, got {:?}", other),
                }
            }
            other => panic!("expected binary expr, got {:?}", other),
        },
        other => panic!("expected expr initializer, got {:?}", other),
    }

    // gep into another global keeps the source and result pointee types
    let gep = by_name("g_int_gep");
    match &gep.initializer.as_ref().unwrap().repr {
        Const::Expr { inst } => match inst.as_ref() {
            Inst::GEP {
                src_pointee_ty,
                dst_pointee_ty,
                pointer,
                indices,
                address_space,
            } => {
                assert_eq!(
                    src_pointee_ty,
                    &Type::Array {
                        element: Box::new(Type::Int { width: 32 }),
                        length: 4
                    }
                );
                assert_eq!(dst_pointee_ty, &Type::Int { width: 32 });
                assert_eq!(indices.len(), 2);
                assert_eq!(*address_space, 0);
                match pointer.as_ref() {
                    Value::Constant(target) => assert_eq!(
                        target.repr,
                        Const::Variable {
                            name: Some("g_defined_const".to_string())
                        }
                    ),
                    other => panic!("expected constant pointer, got {:?}", other),
                }
            }
            other => panic!("expected gep expr, got {:?}", other),
        },
        other => panic!("expected expr initializer, got {:?}", other),
    }
}

#[test]
fn nested_struct_aggregates_and_null_pointer_fields() {
    let encoded = encode(
        r#"
%struct.simple = type { i32, i64 }
%struct.complex = type { [3 x %struct.simple], ptr, ptr }

@g_complex = global %struct.complex { [3 x %struct.simple] [%struct.simple { i32 1, i64 2 }, %struct.simple { i32 3, i64 4 }, %struct.simple { i32 5, i64 6 }], ptr null, ptr null }
"#,
    );

    let global = &encoded.global_variables[0];
    let init = global.initializer.as_ref().unwrap();
    let fields = match &init.repr {
        Const::Struct { elements } => elements,
        other => panic!("expected struct aggregate, got {:?}", other),
    };
    assert_eq!(fields.len(), 3);

    match &fields[0].repr {
        Const::Array { elements } => {
            assert_eq!(elements.len(), 3);
            for element in elements {
                assert!(matches!(element.repr, Const::Struct { .. }));
            }
        }
        other => panic!("expected array of structs, got {:?}", other),
    }
    assert_eq!(fields[1].repr, Const::Null);
    assert_eq!(fields[2].repr, Const::Null);
}

#[test]
fn block_address_tables_resolve_through_the_registry() {
    let encoded = encode(
        r#"
@jump_table = global [2 x ptr] [ptr blockaddress(@dispatch, %a), ptr blockaddress(@dispatch, %b)]

define void @dispatch(i32 %x) {
entry:
  %c = icmp eq i32 %x, 0
  br i1 %c, label %a, label %b
a:
  ret void
b:
  ret void
}
"#,
    );

    let table = &encoded.global_variables[0];
    let elements = match &table.initializer.as_ref().unwrap().repr {
        Const::Array { elements } => elements,
        other => panic!("expected array, got {:?}", other),
    };
    assert_eq!(
        elements[0].repr,
        Const::Label {
            func: "dispatch".to_string(),
            block: 1
        }
    );
    assert_eq!(
        elements[1].repr,
        Const::Label {
            func: "dispatch".to_string(),
            block: 2
        }
    );

    // the referenced function is among the emitted functions and the block
    // indices are in bounds
    let dispatch = encoded
        .functions
        .iter()
        .find(|f| f.name.as_deref() == Some("dispatch"))
        .unwrap();
    assert_eq!(dispatch.blocks.len(), 3);
}

#[test]
fn declarations_and_attributes_of_globals() {
    let encoded = encode(
        r#"
@g_extern = external global i32
@g_tls = thread_local global i32 0
@g_const = internal constant i64 9
@g_as = addrspace(3) global float 0.0
"#,
    );

    let by_name = |name: &str| {
        encoded
            .global_variables
            .iter()
            .find(|g| g.name.as_deref() == Some(name))
            .unwrap()
    };

    let ext = by_name("g_extern");
    assert!(!ext.is_defined);
    assert!(ext.initializer.is_none());

    let tls = by_name("g_tls");
    assert!(tls.is_thread_local);
    assert!(tls.is_defined);

    let constant = by_name("g_const");
    assert!(constant.is_const);
    assert!(constant.is_exact);

    let spaced = by_name("g_as");
    assert_eq!(spaced.address_space, 3);
}
