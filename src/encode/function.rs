//! Function, parameter, and global-variable encoding.

use super::constant::encode_constant;
use super::context::{FunctionContext, ModuleContext};
use super::instruction::encode_instruction;
use super::types::encode_type;
use super::{EncodeError, EncodeResult};
use crate::ir;
use crate::schema;

fn encode_parameter(param: &ir::Parameter) -> schema::Parameter {
    schema::Parameter {
        name: param.name.clone(),
        ty: encode_type(&param.ty),
        by_val: param.attrs.by_val.as_ref().map(encode_type),
        by_ref: param.attrs.by_ref.as_ref().map(encode_type),
        pre_allocated: param.attrs.pre_allocated.as_ref().map(encode_type),
        struct_ret: param.attrs.struct_ret.as_ref().map(encode_type),
        in_alloca: param.attrs.in_alloca.as_ref().map(encode_type),
        element_type: param.attrs.element_type.as_ref().map(encode_type),
    }
}

/// Encode one non-debug function using its pre-built numbering context.
///
/// Blocks come out in declaration order; each block body skips the debug
/// intrinsics its numbering skipped, and the terminator is emitted apart
/// from the body.
pub fn encode_function(
    func: &ir::Function,
    fctx: &FunctionContext,
    mctx: &ModuleContext,
) -> EncodeResult<schema::Function> {
    if func.name().is_none() {
        log::warn!("unnamed function");
    }

    let params = func.params().iter().map(encode_parameter).collect();

    let mut blocks = Vec::with_capacity(func.blocks().len());
    for (position, block) in func.blocks().iter().enumerate() {
        let numbering = fctx.block_numbering(position);

        let mut body = Vec::new();
        for (slot, inst) in block.body().iter().enumerate() {
            let Some(index) = numbering.body[slot] else {
                continue;
            };
            body.push(encode_instruction(inst, index, fctx, mctx)?);
        }

        let (term, term_index) = match (block.terminator(), numbering.terminator) {
            (Some(term), Some(index)) => (term, index),
            _ => {
                return Err(EncodeError::missing_terminator(
                    fctx.describe(),
                    block
                        .name()
                        .map(str::to_string)
                        .unwrap_or_else(|| position.to_string()),
                ))
            }
        };

        blocks.push(schema::Block {
            label: position as u64,
            name: block.name().map(str::to_string),
            body,
            terminator: encode_instruction(term, term_index, fctx, mctx)?,
        });
    }

    Ok(schema::Function {
        name: func.name().map(str::to_string),
        ty: encode_type(&func.fn_type()),
        is_defined: func.is_defined(),
        is_exact: func.is_exact(),
        is_intrinsic: func.is_intrinsic(),
        params,
        blocks,
    })
}

/// Encode one global variable.
pub fn encode_global_variable(
    global: &ir::GlobalVariable,
    mctx: &ModuleContext,
) -> EncodeResult<schema::GlobalVariable> {
    if global.name.is_none() {
        log::error!("unnamed global variable");
    }

    Ok(schema::GlobalVariable {
        name: global.name.clone(),
        ty: encode_type(&global.ty),
        is_extern: global.is_externally_initialized,
        is_const: global.is_const,
        is_defined: global.is_defined(),
        is_exact: global.is_exact(),
        is_thread_local: global.is_thread_local,
        address_space: global.address_space,
        initializer: global
            .initializer
            .as_ref()
            .map(|init| encode_constant(init, mctx))
            .transpose()?,
    })
}
