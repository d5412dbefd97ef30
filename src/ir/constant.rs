//! LLVM constant representations.
//!
//! A constant pairs a type with a kind. Integer payloads are stored as the
//! unsigned decimal string of the value at full bit width, which keeps
//! arbitrary-width integers lossless without imposing a machine ceiling.
//! Float payloads keep their textual IR form.

use std::fmt;

use super::instruction::{BinaryOp, CastOp};
use super::types::Type;

/// A typed constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: Type,
    pub kind: ConstKind,
}

/// The payload of a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstKind {
    /// Integer value as an unsigned decimal string at the type's bit width.
    Int { value: String },

    /// Floating-point value in its textual IR form.
    Float { value: String },

    /// Null pointer.
    Null,

    /// `none` token.
    TokenNone,

    Undef,

    /// All-zero aggregate (`zeroinitializer`).
    ZeroAggregate,

    /// Target extension type `none` value.
    ExtensionNone,

    Array { elements: Vec<Constant> },
    Struct { elements: Vec<Constant> },
    Vector { elements: Vec<Constant> },

    /// Reference to a global variable by symbol.
    Variable { name: String },

    /// Reference to a function by symbol.
    Function { name: String },

    /// Reference to a global alias by symbol.
    Alias { name: String },

    /// Reference to an ifunc by symbol.
    Ifunc { name: String },

    /// `dso_local_equivalent` marker around a global value.
    DsoLocalEquivalent(Box<Constant>),

    /// `no_cfi` marker around a global value.
    NoCfi(Box<Constant>),

    /// Address of a block inside a function (`blockaddress(@f, %bb)`).
    BlockAddress { function: String, block: String },

    /// Instruction-shaped constant expression.
    Expr(Box<ConstExpr>),
}

/// A constant expression: an instruction-shaped computation over constants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstExpr {
    Cast {
        opcode: CastOp,
        src_ty: Type,
        dst_ty: Type,
        operand: Constant,
    },
    GetElementPtr {
        src_pointee_ty: Type,
        dst_pointee_ty: Type,
        pointer: Constant,
        indices: Vec<Constant>,
        address_space: u32,
    },
    Binary {
        opcode: BinaryOp,
        lhs: Constant,
        rhs: Constant,
    },
}

impl Constant {
    pub fn new(ty: Type, kind: ConstKind) -> Self {
        Self { ty, kind }
    }

    /// Integer constant of width at most 128 bits; the value is wrapped to
    /// the width's two's-complement range. Wider integers are constructed
    /// through [`Constant::wide_int`] with a pre-rendered decimal string.
    pub fn int(width: u32, value: i128) -> Self {
        Self {
            ty: Type::int(width),
            kind: ConstKind::Int {
                value: wrap_to_width(value, width),
            },
        }
    }

    /// Integer constant from an unsigned decimal string, for widths beyond
    /// what `i128` covers.
    pub fn wide_int(width: u32, value: impl Into<String>) -> Self {
        Self {
            ty: Type::int(width),
            kind: ConstKind::Int {
                value: value.into(),
            },
        }
    }

    pub fn bool(value: bool) -> Self {
        Self::int(1, value as i128)
    }

    pub fn float(ty: Type, text: impl Into<String>) -> Self {
        Self {
            ty,
            kind: ConstKind::Float { value: text.into() },
        }
    }

    pub fn null() -> Self {
        Self {
            ty: Type::ptr(),
            kind: ConstKind::Null,
        }
    }

    pub fn null_in(address_space: u32) -> Self {
        Self {
            ty: Type::ptr_in(address_space),
            kind: ConstKind::Null,
        }
    }

    pub fn undef(ty: Type) -> Self {
        Self {
            ty,
            kind: ConstKind::Undef,
        }
    }

    pub fn zero(ty: Type) -> Self {
        Self {
            ty,
            kind: ConstKind::ZeroAggregate,
        }
    }

    /// Byte-string data constant (`c"..."`), an array of `i8`.
    pub fn bytes(data: &[u8]) -> Self {
        let elements = data.iter().map(|b| Constant::int(8, *b as i128)).collect();
        Self {
            ty: Type::array(Type::int(8), data.len() as u64),
            kind: ConstKind::Array { elements },
        }
    }

    pub fn array(element_ty: Type, elements: Vec<Constant>) -> Self {
        Self {
            ty: Type::array(element_ty, elements.len() as u64),
            kind: ConstKind::Array { elements },
        }
    }

    pub fn structure(elements: Vec<Constant>) -> Self {
        let fields = elements.iter().map(|c| c.ty.clone()).collect();
        Self {
            ty: Type::structure(fields),
            kind: ConstKind::Struct { elements },
        }
    }

    pub fn vector(elements: Vec<Constant>) -> Self {
        let element_ty = elements
            .first()
            .map(|c| c.ty.clone())
            .unwrap_or(Type::Void);
        Self {
            ty: Type::vector(element_ty, elements.len() as u64),
            kind: ConstKind::Vector { elements },
        }
    }

    pub fn global_ref(name: impl Into<String>) -> Self {
        Self {
            ty: Type::ptr(),
            kind: ConstKind::Variable { name: name.into() },
        }
    }

    pub fn function_ref(name: impl Into<String>) -> Self {
        Self {
            ty: Type::ptr(),
            kind: ConstKind::Function { name: name.into() },
        }
    }

    pub fn block_address(function: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            ty: Type::ptr(),
            kind: ConstKind::BlockAddress {
                function: function.into(),
                block: block.into(),
            },
        }
    }

    pub fn expr(ty: Type, expr: ConstExpr) -> Self {
        Self {
            ty,
            kind: ConstKind::Expr(Box::new(expr)),
        }
    }

    /// The integer payload as `u64` when it fits, used for GEP navigation.
    pub fn as_u64(&self) -> Option<u64> {
        match &self.kind {
            ConstKind::Int { value } => value.parse().ok(),
            _ => None,
        }
    }
}

/// Render `value` as the unsigned decimal of its two's-complement bit
/// pattern at `width` bits.
pub fn wrap_to_width(value: i128, width: u32) -> String {
    let raw = value as u128;
    let masked = if width >= 128 {
        raw
    } else {
        raw & ((1u128 << width) - 1)
    };
    masked.to_string()
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConstKind::Int { value } => write!(f, "{} {}", self.ty, value),
            ConstKind::Float { value } => write!(f, "{} {}", self.ty, value),
            ConstKind::Null => write!(f, "{} null", self.ty),
            ConstKind::TokenNone => write!(f, "token none"),
            ConstKind::Undef => write!(f, "{} undef", self.ty),
            ConstKind::ZeroAggregate => write!(f, "{} zeroinitializer", self.ty),
            ConstKind::ExtensionNone => write!(f, "{} none", self.ty),
            ConstKind::Variable { name }
            | ConstKind::Function { name }
            | ConstKind::Alias { name }
            | ConstKind::Ifunc { name } => write!(f, "{} @{}", self.ty, name),
            ConstKind::BlockAddress { function, block } => {
                write!(f, "blockaddress(@{}, %{})", function, block)
            }
            ConstKind::DsoLocalEquivalent(inner) => {
                write!(f, "dso_local_equivalent {}", inner)
            }
            ConstKind::NoCfi(inner) => write!(f, "no_cfi {}", inner),
            ConstKind::Array { .. } => write!(f, "{} [...]", self.ty),
            ConstKind::Struct { .. } => write!(f, "{} {{...}}", self.ty),
            ConstKind::Vector { .. } => write!(f, "{} <...>", self.ty),
            ConstKind::Expr(_) => write!(f, "{} (const expr)", self.ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_wrap_to_width() {
        assert_eq!(wrap_to_width(-1, 8), "255");
        assert_eq!(wrap_to_width(-1, 64), "18446744073709551615");
        assert_eq!(wrap_to_width(3, 32), "3");
        assert_eq!(wrap_to_width(-1, 128), u128::MAX.to_string());
    }

    #[test]
    fn byte_strings_become_i8_arrays() {
        let c = Constant::bytes(b"hi\0");
        assert_eq!(c.ty, Type::array(Type::int(8), 3));
        match c.kind {
            ConstKind::Array { elements } => {
                assert_eq!(elements.len(), 3);
                assert_eq!(elements[0].as_u64(), Some(104));
                assert_eq!(elements[2].as_u64(), Some(0));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }
}
