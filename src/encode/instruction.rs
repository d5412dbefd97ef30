//! Instruction and value encoding.
//!
//! This is the bulk of the lowering: every instruction variant and every
//! operand kind maps to exactly one discriminant of the wire format. Local
//! references resolve through the current function's numbering context;
//! anything crossing a function boundary goes through the module registry.

use super::constant::encode_constant;
use super::context::{FunctionContext, LocalKind, ModuleContext};
use super::types::encode_type;
use super::{EncodeError, EncodeResult};
use crate::ir;
use crate::schema;

/// Encode an operand.
pub fn encode_value(
    value: &ir::Value,
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<schema::Value> {
    let encoded = match value {
        ir::Value::Local(name) => {
            let slot = fctx
                .lookup_local(name)
                .ok_or_else(|| EncodeError::unknown_local(fctx.describe(), name.clone()))?;
            match slot.kind {
                LocalKind::Argument => schema::Value::Argument {
                    ty: encode_type(&slot.ty),
                    index: slot.index,
                },
                LocalKind::Instruction => schema::Value::Instruction {
                    ty: encode_type(&slot.ty),
                    index: slot.index,
                },
            }
        }
        ir::Value::Constant(constant) => schema::Value::Constant(encode_constant(constant, mctx)?),
        ir::Value::Block(label) => {
            let func = fctx
                .function_name()
                .ok_or(EncodeError::BlockValueInUnnamedFunction)?;
            let block = block_ref(fctx, label)?;
            schema::Value::Label {
                func: func.to_string(),
                block,
            }
        }
        ir::Value::Metadata => schema::Value::Metadata,
    };
    Ok(encoded)
}

/// Encode an instruction with its precomputed dense index.
pub fn encode_instruction(
    inst: &ir::Inst,
    index: u64,
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<schema::Instruction> {
    Ok(schema::Instruction {
        name: inst.name.clone(),
        ty: encode_type(&inst.ty),
        index,
        repr: encode_inst_kind(&inst.kind, fctx, mctx)?,
    })
}

fn boxed(
    value: &ir::Value,
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<Box<schema::Value>> {
    Ok(Box::new(encode_value(value, fctx, mctx)?))
}

fn value_list(
    values: &[ir::Value],
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<Vec<schema::Value>> {
    values
        .iter()
        .map(|value| encode_value(value, fctx, mctx))
        .collect()
}

/// Resolve a block label to its dense index in the current function.
fn block_ref(fctx: &FunctionContext, label: &str) -> EncodeResult<u64> {
    fctx.block_index(label)
        .ok_or_else(|| EncodeError::unknown_block(fctx.describe(), label))
}

fn block_refs(fctx: &FunctionContext, labels: &[String]) -> EncodeResult<Vec<u64>> {
    labels.iter().map(|label| block_ref(fctx, label)).collect()
}

fn encode_inline_asm(asm: &ir::InlineAsm) -> schema::InlineAsm {
    schema::InlineAsm {
        signature: encode_type(&asm.signature),
        assembly: asm.asm.clone(),
        constraint: asm.constraint.clone(),
    }
}

/// Address-space fields of a cast, present only for the pointer-sensitive
/// opcodes. A pointer-sensitive cast whose operand type is not a pointer is
/// a verifier-level breakage and is rejected.
pub(super) fn cast_address_spaces(
    opcode: ir::CastOp,
    src_ty: &ir::Type,
    dst_ty: &ir::Type,
) -> EncodeResult<(Option<u32>, Option<u32>)> {
    let src = if opcode.src_is_pointer() {
        Some(src_ty.pointer_address_space().ok_or_else(|| {
            EncodeError::malformed("cast", format!("{} from non-pointer {}", opcode, src_ty))
        })?)
    } else {
        None
    };
    let dst = if opcode.dst_is_pointer() {
        Some(dst_ty.pointer_address_space().ok_or_else(|| {
            EncodeError::malformed("cast", format!("{} to non-pointer {}", opcode, dst_ty))
        })?)
    } else {
        None
    };
    Ok((src, dst))
}

/// Call-family dispatch result, shared between call and invoke.
enum Callee {
    Asm(schema::InlineAsm),
    Intrinsic(schema::Value),
    Direct(schema::Value),
    Indirect(schema::Value),
}

/// Classify a call target. Intrinsics are tested before the direct/indirect
/// split; an intrinsic also has a direct callee.
fn classify_callee(
    target: &ir::CallTarget,
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<Callee> {
    match target {
        ir::CallTarget::Asm(asm) => Ok(Callee::Asm(encode_inline_asm(asm))),
        ir::CallTarget::Value(callee) => {
            let encoded = encode_value(callee, fctx, mctx)?;
            match callee.callee_symbol() {
                Some(symbol) if mctx.is_intrinsic_symbol(symbol) => {
                    Ok(Callee::Intrinsic(encoded))
                }
                Some(_) => Ok(Callee::Direct(encoded)),
                None => Ok(Callee::Indirect(encoded)),
            }
        }
    }
}

/// Encode an instruction payload. The match is total over the IR
/// instruction grammar.
pub fn encode_inst_kind(
    kind: &ir::InstKind,
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<schema::Inst> {
    let repr = match kind {
        // memory
        ir::InstKind::Alloca {
            allocated_type,
            size,
            address_space,
        } => schema::Inst::Alloca {
            allocated_type: encode_type(allocated_type),
            size: size
                .as_ref()
                .map(|size| boxed(size, fctx, mctx))
                .transpose()?,
            address_space: *address_space,
        },
        ir::InstKind::Load {
            pointee_type,
            pointer,
            ordering,
            address_space,
        } => schema::Inst::Load {
            pointee_type: encode_type(pointee_type),
            pointer: boxed(pointer, fctx, mctx)?,
            ordering: ordering.to_string(),
            address_space: *address_space,
        },
        ir::InstKind::Store {
            pointee_type,
            pointer,
            value,
            ordering,
            address_space,
        } => schema::Inst::Store {
            pointee_type: encode_type(pointee_type),
            pointer: boxed(pointer, fctx, mctx)?,
            value: boxed(value, fctx, mctx)?,
            ordering: ordering.to_string(),
            address_space: *address_space,
        },
        ir::InstKind::VAArg { pointer } => schema::Inst::VAArg {
            pointer: boxed(pointer, fctx, mctx)?,
        },

        // call family
        ir::InstKind::Call {
            target,
            signature,
            args,
        } => {
            let args = value_list(args, fctx, mctx)?;
            let target_type = encode_type(signature);
            match classify_callee(target, fctx, mctx)? {
                Callee::Asm(assembly) => schema::Inst::CallAsm { assembly, args },
                Callee::Intrinsic(callee) => schema::Inst::Intrinsic {
                    callee: Box::new(callee),
                    target_type,
                    args,
                },
                Callee::Direct(callee) => schema::Inst::CallDirect {
                    callee: Box::new(callee),
                    target_type,
                    args,
                },
                Callee::Indirect(callee) => schema::Inst::CallIndirect {
                    callee: Box::new(callee),
                    target_type,
                    args,
                },
            }
        }
        ir::InstKind::Invoke {
            target,
            signature,
            args,
            normal,
            unwind,
        } => {
            let args = value_list(args, fctx, mctx)?;
            let target_type = encode_type(signature);
            let normal = block_ref(fctx, normal)?;
            let unwind = block_ref(fctx, unwind)?;
            match classify_callee(target, fctx, mctx)? {
                Callee::Asm(assembly) => schema::Inst::InvokeAsm {
                    assembly,
                    args,
                    normal,
                    unwind,
                },
                // the invoke family has no intrinsic case
                Callee::Intrinsic(callee) | Callee::Direct(callee) => {
                    schema::Inst::InvokeDirect {
                        callee: Box::new(callee),
                        target_type,
                        args,
                        normal,
                        unwind,
                    }
                }
                Callee::Indirect(callee) => schema::Inst::InvokeIndirect {
                    callee: Box::new(callee),
                    target_type,
                    args,
                    normal,
                    unwind,
                },
            }
        }

        // arithmetic and logic
        ir::InstKind::Unary { opcode, operand } => schema::Inst::Unary {
            opcode: opcode.to_string(),
            operand: boxed(operand, fctx, mctx)?,
        },
        ir::InstKind::Binary { opcode, lhs, rhs } => schema::Inst::Binary {
            opcode: opcode.to_string(),
            lhs: boxed(lhs, fctx, mctx)?,
            rhs: boxed(rhs, fctx, mctx)?,
        },
        ir::InstKind::Compare {
            predicate,
            operand_type,
            lhs,
            rhs,
        } => schema::Inst::Compare {
            predicate: predicate.to_string(),
            operand_type: encode_type(operand_type),
            lhs: boxed(lhs, fctx, mctx)?,
            rhs: boxed(rhs, fctx, mctx)?,
        },
        ir::InstKind::Cast {
            opcode,
            src_ty,
            dst_ty,
            operand,
        } => {
            let (src_address_space, dst_address_space) =
                cast_address_spaces(*opcode, src_ty, dst_ty)?;
            schema::Inst::Cast {
                opcode: opcode.to_string(),
                src_ty: encode_type(src_ty),
                dst_ty: encode_type(dst_ty),
                src_address_space,
                dst_address_space,
                operand: boxed(operand, fctx, mctx)?,
            }
        }
        ir::InstKind::Freeze { operand } => schema::Inst::Freeze {
            operand: boxed(operand, fctx, mctx)?,
        },

        // pointer arithmetic
        ir::InstKind::Gep {
            src_pointee_ty,
            dst_pointee_ty,
            pointer,
            indices,
            address_space,
        } => schema::Inst::GEP {
            src_pointee_ty: encode_type(src_pointee_ty),
            dst_pointee_ty: encode_type(dst_pointee_ty),
            pointer: boxed(pointer, fctx, mctx)?,
            indices: value_list(indices, fctx, mctx)?,
            address_space: *address_space,
        },

        // choice
        ir::InstKind::Phi { options } => {
            let options = options
                .iter()
                .map(|arm| {
                    Ok(schema::PhiOption {
                        block: block_ref(fctx, &arm.block)?,
                        value: encode_value(&arm.value, fctx, mctx)?,
                    })
                })
                .collect::<EncodeResult<_>>()?;
            schema::Inst::Phi { options }
        }
        ir::InstKind::Select {
            cond,
            then_value,
            else_value,
        } => schema::Inst::ITE {
            cond: boxed(cond, fctx, mctx)?,
            then_value: boxed(then_value, fctx, mctx)?,
            else_value: boxed(else_value, fctx, mctx)?,
        },

        // aggregates
        ir::InstKind::ExtractValue {
            from_ty,
            aggregate,
            indices,
        } => schema::Inst::GetValue {
            from_ty: encode_type(from_ty),
            aggregate: boxed(aggregate, fctx, mctx)?,
            indices: indices.clone(),
        },
        ir::InstKind::InsertValue {
            aggregate,
            value,
            indices,
        } => schema::Inst::SetValue {
            aggregate: boxed(aggregate, fctx, mctx)?,
            value: boxed(value, fctx, mctx)?,
            indices: indices.clone(),
        },
        ir::InstKind::ExtractElement {
            vec_ty,
            vector,
            slot,
        } => schema::Inst::GetElement {
            vec_ty: encode_type(vec_ty),
            vector: boxed(vector, fctx, mctx)?,
            slot: boxed(slot, fctx, mctx)?,
        },
        ir::InstKind::InsertElement {
            vector,
            value,
            slot,
        } => schema::Inst::SetElement {
            vector: boxed(vector, fctx, mctx)?,
            value: boxed(value, fctx, mctx)?,
            slot: boxed(slot, fctx, mctx)?,
        },
        ir::InstKind::ShuffleVector { lhs, rhs, mask } => schema::Inst::ShuffleVector {
            lhs: boxed(lhs, fctx, mctx)?,
            rhs: boxed(rhs, fctx, mctx)?,
            mask: mask.clone(),
        },

        // concurrency
        ir::InstKind::Fence { ordering, scope } => schema::Inst::Fence {
            ordering: ordering.to_string(),
            scope: scope.to_string(),
        },
        ir::InstKind::CmpXchg {
            pointee_type,
            pointer,
            value_cmp,
            value_xchg,
            address_space,
            ordering_success,
            ordering_failure,
            scope,
        } => schema::Inst::AtomicCmpXchg {
            pointee_type: encode_type(pointee_type),
            pointer: boxed(pointer, fctx, mctx)?,
            value_cmp: boxed(value_cmp, fctx, mctx)?,
            value_xchg: boxed(value_xchg, fctx, mctx)?,
            address_space: *address_space,
            ordering_success: ordering_success.to_string(),
            ordering_failure: ordering_failure.to_string(),
            scope: scope.to_string(),
        },
        ir::InstKind::AtomicRmw {
            opcode,
            pointee_type,
            pointer,
            value,
            address_space,
            ordering,
            scope,
        } => schema::Inst::AtomicRMW {
            pointee_type: encode_type(pointee_type),
            pointer: boxed(pointer, fctx, mctx)?,
            value: boxed(value, fctx, mctx)?,
            address_space: *address_space,
            opcode: opcode.to_string(),
            ordering: ordering.to_string(),
            scope: scope.to_string(),
        },

        // exception handling
        ir::InstKind::LandingPad {
            clauses,
            is_cleanup,
        } => schema::Inst::LandingPad {
            clauses: clauses
                .iter()
                .map(|clause| encode_constant(clause, mctx))
                .collect::<EncodeResult<_>>()?,
            is_cleanup: *is_cleanup,
        },
        ir::InstKind::CatchPad => schema::Inst::CatchPad,
        ir::InstKind::CleanupPad => schema::Inst::CleanupPad,

        // terminators
        ir::InstKind::Return { value } => schema::Inst::Return {
            value: value
                .as_ref()
                .map(|value| boxed(value, fctx, mctx))
                .transpose()?,
        },
        ir::InstKind::Branch { cond, targets } => schema::Inst::Branch {
            cond: cond
                .as_ref()
                .map(|cond| boxed(cond, fctx, mctx))
                .transpose()?,
            targets: block_refs(fctx, targets)?,
        },
        ir::InstKind::Switch {
            cond_ty,
            cond,
            cases,
            default,
        } => {
            // the default successor never appears among the cases
            let cases = cases
                .iter()
                .map(|arm| {
                    Ok(schema::SwitchCase {
                        block: block_ref(fctx, &arm.target)?,
                        value: encode_constant(&arm.value, mctx)?,
                    })
                })
                .collect::<EncodeResult<_>>()?;
            schema::Inst::Switch {
                cond_ty: encode_type(cond_ty),
                cond: boxed(cond, fctx, mctx)?,
                cases,
                default: default
                    .as_ref()
                    .map(|label| block_ref(fctx, label))
                    .transpose()?,
            }
        }
        ir::InstKind::IndirectBranch { address, targets } => schema::Inst::IndirectJump {
            address: boxed(address, fctx, mctx)?,
            targets: block_refs(fctx, targets)?,
        },
        ir::InstKind::Resume { value } => schema::Inst::Resume {
            value: boxed(value, fctx, mctx)?,
        },
        ir::InstKind::Unreachable => schema::Inst::Unreachable,
        ir::InstKind::CatchSwitch => schema::Inst::CatchSwitch,
        ir::InstKind::CatchReturn => schema::Inst::CatchReturn,
        ir::InstKind::CleanupReturn => schema::Inst::CleanupReturn,
        ir::InstKind::CallBranch => schema::Inst::CallBranch,
    };
    Ok(repr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        BasicBlock, CallTarget, CastOp, Constant, Function, InlineAsm, Inst, InstKind, Module,
        Parameter, Type, Value,
    };

    fn fixture() -> (Module, usize) {
        let mut module = Module::new("m");
        module.add_function(Function::new("llvm.fabs.f64", Type::double(), vec![]));

        let mut func = Function::new("f", Type::Void, vec![Parameter::named("p", Type::ptr())]);
        let mut entry = BasicBlock::new("entry");
        entry.set_terminator(Inst::new(Type::Void, InstKind::Return { value: None }));
        func.add_block(entry);
        module.add_function(func);
        (module, 1)
    }

    fn contexts(module: &Module, position: usize) -> (ModuleContext, FunctionContext) {
        let mctx = ModuleContext::prepare(module);
        let fctx = mctx.context_at(position).unwrap().clone();
        (mctx, fctx)
    }

    #[test]
    fn call_dispatch_tests_intrinsics_before_direct() {
        let (module, position) = fixture();
        let (mctx, fctx) = contexts(&module, position);

        let call = InstKind::Call {
            target: CallTarget::Value(Value::Constant(Constant::function_ref("llvm.fabs.f64"))),
            signature: Type::function(vec![Type::double()], Type::double(), false),
            args: vec![Value::Constant(Constant::float(Type::double(), "1.0"))],
        };
        match encode_inst_kind(&call, &fctx, &mctx).unwrap() {
            schema::Inst::Intrinsic { .. } => {}
            other => panic!("expected intrinsic, got {:?}", other),
        }

        let indirect = InstKind::Call {
            target: CallTarget::Value(Value::local("p")),
            signature: Type::function(vec![], Type::Void, false),
            args: vec![],
        };
        match encode_inst_kind(&indirect, &fctx, &mctx).unwrap() {
            schema::Inst::CallIndirect { .. } => {}
            other => panic!("expected indirect call, got {:?}", other),
        }
    }

    #[test]
    fn asm_calls_record_text_and_constraints() {
        let (module, position) = fixture();
        let (mctx, fctx) = contexts(&module, position);

        let call = InstKind::Call {
            target: CallTarget::Asm(InlineAsm::new(
                Type::function(vec![Type::int(32)], Type::int(32), false),
                "mov %1, %0\n\tadd $1, %0",
                "=r,r",
            )),
            signature: Type::function(vec![Type::int(32)], Type::int(32), false),
            args: vec![Value::const_int(32, 5)],
        };
        match encode_inst_kind(&call, &fctx, &mctx).unwrap() {
            schema::Inst::CallAsm { assembly, args } => {
                assert_eq!(assembly.assembly, "mov %1, %0\n\tadd $1, %0");
                assert_eq!(assembly.constraint, "=r,r");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected asm call, got {:?}", other),
        }
    }

    #[test]
    fn pointer_casts_carry_their_address_spaces() {
        let (src, dst) =
            cast_address_spaces(CastOp::PtrToInt, &Type::ptr_in(3), &Type::int(64)).unwrap();
        assert_eq!((src, dst), (Some(3), None));

        let (src, dst) =
            cast_address_spaces(CastOp::AddrSpaceCast, &Type::ptr(), &Type::ptr_in(1)).unwrap();
        assert_eq!((src, dst), (Some(0), Some(1)));

        let (src, dst) = cast_address_spaces(CastOp::BitCast, &Type::ptr(), &Type::ptr()).unwrap();
        assert_eq!((src, dst), (None, None));

        assert!(cast_address_spaces(CastOp::IntToPtr, &Type::int(64), &Type::int(64)).is_err());
    }

    #[test]
    fn unknown_block_target_is_fatal() {
        let (module, position) = fixture();
        let (mctx, fctx) = contexts(&module, position);

        let br = InstKind::Branch {
            cond: None,
            targets: vec!["nowhere".to_string()],
        };
        let err = encode_inst_kind(&br, &fctx, &mctx).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownBlock { .. }));
    }
}
