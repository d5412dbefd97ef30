//! LLVM type representations.
//!
//! Types form a tree: aggregates own their element types, pointers are
//! opaque (address space only). Identified struct types live in the module's
//! struct table and are inlined wherever they are used, so the tree never
//! needs a lookup side channel.

use std::fmt;

/// A floating-point flavor, carrying its bit width and IR keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    Half,
    BFloat,
    Float,
    Double,
    X86Fp80,
    Fp128,
    PpcFp128,
}

impl FloatKind {
    pub fn width(&self) -> u32 {
        match self {
            FloatKind::Half | FloatKind::BFloat => 16,
            FloatKind::Float => 32,
            FloatKind::Double => 64,
            FloatKind::X86Fp80 => 80,
            FloatKind::Fp128 | FloatKind::PpcFp128 => 128,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FloatKind::Half => "half",
            FloatKind::BFloat => "bfloat",
            FloatKind::Float => "float",
            FloatKind::Double => "double",
            FloatKind::X86Fp80 => "x86_fp80",
            FloatKind::Fp128 => "fp128",
            FloatKind::PpcFp128 => "ppc_fp128",
        }
    }

    /// Map an IR keyword to a float kind.
    pub fn from_keyword(kw: &str) -> Option<FloatKind> {
        match kw {
            "half" => Some(FloatKind::Half),
            "bfloat" => Some(FloatKind::BFloat),
            "float" => Some(FloatKind::Float),
            "double" => Some(FloatKind::Double),
            "x86_fp80" => Some(FloatKind::X86Fp80),
            "fp128" => Some(FloatKind::Fp128),
            "ppc_fp128" => Some(FloatKind::PpcFp128),
            _ => None,
        }
    }
}

/// An LLVM type node.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,

    /// Arbitrary-width integer (`iN`).
    Int { width: u32 },

    Float(FloatKind),

    Array {
        element: Box<Type>,
        length: u64,
    },

    /// Struct type; `name` is present for identified structs, `fields` is
    /// absent iff the struct is opaque.
    Struct {
        name: Option<String>,
        fields: Option<Vec<Type>>,
    },

    Function {
        params: Vec<Type>,
        variadic: bool,
        ret: Box<Type>,
    },

    /// Opaque pointer; only the address space is tracked.
    Pointer { address_space: u32 },

    /// SIMD vector; for scalable vectors `length` is the minimum element
    /// count and `fixed` is false.
    Vector {
        element: Box<Type>,
        fixed: bool,
        length: u64,
    },

    /// Target extension type (`target("name", ...)`).
    Extension { name: String, params: Vec<Type> },

    /// Legacy typed pointer, kept for IR producers that still carry pointee
    /// types.
    TypedPointer {
        pointee: Box<Type>,
        address_space: u32,
    },

    Label,
    Token,
    Metadata,
}

impl Type {
    pub fn int(width: u32) -> Type {
        Type::Int { width }
    }

    pub fn float() -> Type {
        Type::Float(FloatKind::Float)
    }

    pub fn double() -> Type {
        Type::Float(FloatKind::Double)
    }

    /// Opaque pointer in address space 0.
    pub fn ptr() -> Type {
        Type::Pointer { address_space: 0 }
    }

    pub fn ptr_in(address_space: u32) -> Type {
        Type::Pointer { address_space }
    }

    pub fn array(element: Type, length: u64) -> Type {
        Type::Array {
            element: Box::new(element),
            length,
        }
    }

    pub fn vector(element: Type, length: u64) -> Type {
        Type::Vector {
            element: Box::new(element),
            fixed: true,
            length,
        }
    }

    pub fn scalable_vector(element: Type, min_length: u64) -> Type {
        Type::Vector {
            element: Box::new(element),
            fixed: false,
            length: min_length,
        }
    }

    pub fn structure(fields: Vec<Type>) -> Type {
        Type::Struct {
            name: None,
            fields: Some(fields),
        }
    }

    pub fn named_struct(name: impl Into<String>, fields: Vec<Type>) -> Type {
        Type::Struct {
            name: Some(name.into()),
            fields: Some(fields),
        }
    }

    pub fn opaque_struct(name: impl Into<String>) -> Type {
        Type::Struct {
            name: Some(name.into()),
            fields: None,
        }
    }

    pub fn function(params: Vec<Type>, ret: Type, variadic: bool) -> Type {
        Type::Function {
            params,
            variadic,
            ret: Box::new(ret),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. } | Type::TypedPointer { .. })
    }

    /// Address space of a pointer type, looking through vectors of pointers.
    pub fn pointer_address_space(&self) -> Option<u32> {
        match self {
            Type::Pointer { address_space } => Some(*address_space),
            Type::TypedPointer { address_space, .. } => Some(*address_space),
            Type::Vector { element, .. } => element.pointer_address_space(),
            _ => None,
        }
    }

    /// Step into an aggregate by one index. Struct navigation requires a
    /// known constant index; arrays and vectors accept any index.
    pub fn index_into(&self, index: Option<u64>) -> Option<&Type> {
        match self {
            Type::Array { element, .. } | Type::Vector { element, .. } => Some(element),
            Type::Struct {
                fields: Some(fields),
                ..
            } => fields.get(index? as usize),
            _ => None,
        }
    }
}

/// Compute the pointee type a `getelementptr` resolves to, given the source
/// element type and the indices past the initial pointer step. Constant
/// indices are passed as `Some`; `None` marks a dynamic index (only legal
/// over arrays and vectors).
pub fn gep_result_type<I>(source: &Type, indices: I) -> Option<Type>
where
    I: IntoIterator<Item = Option<u64>>,
{
    let mut cursor = source;
    for index in indices {
        cursor = cursor.index_into(index)?;
    }
    Some(cursor.clone())
}

/// An identified struct registered at module scope.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    /// `None` iff the struct is opaque.
    pub fields: Option<Vec<Type>>,
}

impl StructDef {
    pub fn new(name: impl Into<String>, fields: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            fields: Some(fields),
        }
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: None,
        }
    }

    /// The struct as a usable type node.
    pub fn as_type(&self) -> Type {
        Type::Struct {
            name: Some(self.name.clone()),
            fields: self.fields.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int { width } => write!(f, "i{}", width),
            Type::Float(kind) => write!(f, "{}", kind.name()),
            Type::Array { element, length } => write!(f, "[{} x {}]", length, element),
            Type::Struct { name: Some(name), .. } => write!(f, "%{}", name),
            Type::Struct {
                name: None,
                fields: Some(fields),
            } => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, " }}")
            }
            Type::Struct {
                name: None,
                fields: None,
            } => write!(f, "%(opaque)"),
            Type::Function {
                params,
                variadic,
                ret,
            } => {
                write!(f, "{} (", ret)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if *variadic {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            Type::Pointer { address_space: 0 } => write!(f, "ptr"),
            Type::Pointer { address_space } => write!(f, "ptr addrspace({})", address_space),
            Type::Vector {
                element,
                fixed: true,
                length,
            } => write!(f, "<{} x {}>", length, element),
            Type::Vector {
                element,
                fixed: false,
                length,
            } => write!(f, "<vscale x {} x {}>", length, element),
            Type::Extension { name, params } => {
                write!(f, "target(\"{}\"", name)?;
                for param in params {
                    write!(f, ", {}", param)?;
                }
                write!(f, ")")
            }
            Type::TypedPointer {
                pointee,
                address_space: 0,
            } => write!(f, "{}*", pointee),
            Type::TypedPointer {
                pointee,
                address_space,
            } => write!(f, "{} addrspace({})*", pointee, address_space),
            Type::Label => write!(f, "label"),
            Type::Token => write!(f, "token"),
            Type::Metadata => write!(f, "metadata"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_kinds_carry_ir_widths() {
        assert_eq!(FloatKind::Half.width(), 16);
        assert_eq!(FloatKind::BFloat.width(), 16);
        assert_eq!(FloatKind::Double.width(), 64);
        assert_eq!(FloatKind::PpcFp128.width(), 128);
        assert_eq!(FloatKind::from_keyword("x86_fp80"), Some(FloatKind::X86Fp80));
        assert_eq!(FloatKind::from_keyword("quad"), None);
    }

    #[test]
    fn gep_navigation_steps_through_aggregates() {
        let inner = Type::structure(vec![Type::int(8), Type::double()]);
        let outer = Type::array(inner.clone(), 4);

        // outer[i].1 == double
        let result = gep_result_type(&outer, vec![None, Some(1)]);
        assert_eq!(result, Some(Type::double()));

        // struct navigation with a dynamic index is rejected
        assert_eq!(gep_result_type(&inner, vec![None]), None);
    }

    #[test]
    fn display_is_ll_flavored() {
        assert_eq!(Type::int(32).to_string(), "i32");
        assert_eq!(Type::array(Type::int(8), 3).to_string(), "[3 x i8]");
        assert_eq!(Type::ptr_in(5).to_string(), "ptr addrspace(5)");
        assert_eq!(
            Type::scalable_vector(Type::int(32), 4).to_string(),
            "<vscale x 4 x i32>"
        );
        let sig = Type::function(vec![Type::int(32)], Type::Void, true);
        assert_eq!(sig.to_string(), "void (i32, ...)");
    }
}
