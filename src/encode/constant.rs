//! Constant encoding.
//!
//! Constants are self-contained except for two cross-cutting cases: block
//! addresses resolve their block index through the module context, and
//! constant expressions re-enter the instruction vocabulary. An expression
//! is encoded as its instruction payload directly; it belongs to no block
//! and carries no index.

use super::context::ModuleContext;
use super::instruction::cast_address_spaces;
use super::types::encode_type;
use super::EncodeResult;
use crate::ir;
use crate::schema;

/// Encode a constant with its type attached.
pub fn encode_constant(
    constant: &ir::Constant,
    mctx: &ModuleContext,
) -> EncodeResult<schema::Constant> {
    Ok(schema::Constant {
        ty: encode_type(&constant.ty),
        repr: encode_const_kind(&constant.kind, mctx)?,
    })
}

fn encode_elements(
    elements: &[ir::Constant],
    mctx: &ModuleContext,
) -> EncodeResult<Vec<schema::Constant>> {
    elements
        .iter()
        .map(|element| encode_constant(element, mctx))
        .collect()
}

fn encode_const_kind(
    kind: &ir::ConstKind,
    mctx: &ModuleContext,
) -> EncodeResult<schema::Const> {
    let repr = match kind {
        ir::ConstKind::Int { value } => schema::Const::Int {
            value: value.clone(),
        },
        ir::ConstKind::Float { value } => schema::Const::Float {
            value: value.clone(),
        },
        ir::ConstKind::Null => schema::Const::Null,
        ir::ConstKind::TokenNone => schema::Const::None,
        ir::ConstKind::Undef => schema::Const::Undef,
        ir::ConstKind::ZeroAggregate => schema::Const::Default,
        ir::ConstKind::ExtensionNone => schema::Const::Extension,
        ir::ConstKind::Array { elements } => schema::Const::Array {
            elements: encode_elements(elements, mctx)?,
        },
        ir::ConstKind::Struct { elements } => schema::Const::Struct {
            elements: encode_elements(elements, mctx)?,
        },
        ir::ConstKind::Vector { elements } => schema::Const::Vector {
            elements: encode_elements(elements, mctx)?,
        },
        ir::ConstKind::Variable { name } => schema::Const::Variable {
            name: Some(name.clone()),
        },
        ir::ConstKind::Function { name } => schema::Const::Function {
            name: Some(name.clone()),
        },
        ir::ConstKind::Alias { name } => schema::Const::Alias {
            name: Some(name.clone()),
        },
        ir::ConstKind::Ifunc { name } => schema::Const::Interface {
            name: Some(name.clone()),
        },
        ir::ConstKind::DsoLocalEquivalent(inner) | ir::ConstKind::NoCfi(inner) => {
            schema::Const::Marker {
                wrap: Box::new(encode_constant(inner, mctx)?),
            }
        }
        ir::ConstKind::BlockAddress { function, block } => {
            // F-lookup: the context must have been registered up front
            let fctx = mctx.context_for(function)?;
            let index = fctx
                .block_index(block)
                .ok_or_else(|| super::EncodeError::unknown_block(function.clone(), block.clone()))?;
            schema::Const::Label {
                func: function.clone(),
                block: index,
            }
        }
        ir::ConstKind::Expr(expr) => schema::Const::Expr {
            inst: Box::new(encode_const_expr(expr, mctx)?),
        },
    };
    Ok(repr)
}

/// Wrap a constant operand of an expression as an operand value.
fn const_operand(constant: &ir::Constant, mctx: &ModuleContext) -> EncodeResult<schema::Value> {
    Ok(schema::Value::Constant(encode_constant(constant, mctx)?))
}

/// Encode a constant expression as the instruction payload it is shaped as.
fn encode_const_expr(expr: &ir::ConstExpr, mctx: &ModuleContext) -> EncodeResult<schema::Inst> {
    let inst = match expr {
        ir::ConstExpr::Cast {
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
                operand: Box::new(const_operand(operand, mctx)?),
            }
        }
        ir::ConstExpr::GetElementPtr {
            src_pointee_ty,
            dst_pointee_ty,
            pointer,
            indices,
            address_space,
        } => schema::Inst::GEP {
            src_pointee_ty: encode_type(src_pointee_ty),
            dst_pointee_ty: encode_type(dst_pointee_ty),
            pointer: Box::new(const_operand(pointer, mctx)?),
            indices: indices
                .iter()
                .map(|index| const_operand(index, mctx))
                .collect::<EncodeResult<_>>()?,
            address_space: *address_space,
        },
        ir::ConstExpr::Binary { opcode, lhs, rhs } => schema::Inst::Binary {
            opcode: opcode.to_string(),
            lhs: Box::new(const_operand(lhs, mctx)?),
            rhs: Box::new(const_operand(rhs, mctx)?),
        },
    };
    Ok(inst)
}
