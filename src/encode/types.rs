//! Type encoding: a pure function of the type tree.

use crate::ir;
use crate::schema;

/// Encode one type node. Total over the IR type grammar.
pub fn encode_type(ty: &ir::Type) -> schema::Type {
    match ty {
        ir::Type::Void => schema::Type::Void,
        ir::Type::Int { width } => schema::Type::Int { width: *width },
        ir::Type::Float(kind) => schema::Type::Float {
            width: kind.width(),
            name: kind.name().to_string(),
        },
        ir::Type::Array { element, length } => schema::Type::Array {
            element: Box::new(encode_type(element)),
            length: *length,
        },
        ir::Type::Struct { name, fields } => schema::Type::Struct {
            name: name.clone(),
            fields: fields
                .as_ref()
                .map(|fields| fields.iter().map(encode_type).collect()),
        },
        ir::Type::Function {
            params,
            variadic,
            ret,
        } => schema::Type::Function {
            params: params.iter().map(encode_type).collect(),
            variadic: *variadic,
            ret: Box::new(encode_type(ret)),
        },
        ir::Type::Pointer { address_space } => schema::Type::Pointer {
            address_space: *address_space,
        },
        ir::Type::Vector {
            element,
            fixed,
            length,
        } => schema::Type::Vector {
            element: Box::new(encode_type(element)),
            fixed: *fixed,
            length: *length,
        },
        ir::Type::Extension { name, params } => schema::Type::Extension {
            name: name.clone(),
            params: params.iter().map(encode_type).collect(),
        },
        ir::Type::TypedPointer {
            pointee,
            address_space,
        } => schema::Type::TypedPointer {
            pointee: Box::new(encode_type(pointee)),
            address_space: *address_space,
        },
        ir::Type::Label => schema::Type::Label,
        ir::Type::Token => schema::Type::Token,
        ir::Type::Metadata => schema::Type::Metadata,
    }
}

/// Encode a module-scope identified struct.
pub fn encode_struct_def(def: &ir::StructDef) -> schema::StructType {
    schema::StructType {
        name: Some(def.name.clone()),
        fields: def
            .fields
            .as_ref()
            .map(|fields| fields.iter().map(encode_type).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Type;

    #[test]
    fn float_types_carry_width_and_keyword() {
        let encoded = encode_type(&Type::Float(crate::ir::FloatKind::BFloat));
        assert_eq!(
            encoded,
            schema::Type::Float {
                width: 16,
                name: "bfloat".to_string()
            }
        );
    }

    #[test]
    fn opaque_structs_omit_fields() {
        let encoded = encode_type(&Type::opaque_struct("ctx"));
        assert_eq!(
            encoded,
            schema::Type::Struct {
                name: Some("ctx".to_string()),
                fields: None
            }
        );
    }

    #[test]
    fn scalable_vectors_record_minimum_length() {
        let encoded = encode_type(&Type::scalable_vector(Type::int(8), 16));
        assert_eq!(
            encoded,
            schema::Type::Vector {
                element: Box::new(schema::Type::Int { width: 8 }),
                fixed: false,
                length: 16
            }
        );
    }
}
