//! Type and method signatures as seen by instruction operands.
//!
//! Instruction streams handed to the engine come without a symbol table, so operands carry
//! self-contained descriptors instead of metadata tokens. [`TypeSig`] captures the type
//! information needed for stack typing without requiring metadata resolution; [`MethodSig`]
//! carries what the stack effect model needs to account for a call.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Calling convention flags of a method signature (ECMA-335 II.23.2.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallingConvention: u8 {
        /// Variable argument list
        const VARARG = 0x05;
        /// Generic method signature
        const GENERIC = 0x10;
        /// Instance method, an implicit `this` is passed as first argument
        const HAS_THIS = 0x20;
        /// `this` is explicitly listed as the first parameter
        const EXPLICIT_THIS = 0x40;
    }
}

/// Static type of a value, a local slot, a field or a parameter.
///
/// # Examples
///
/// ```rust
/// use cilsplice::metadata::TypeSig;
///
/// let list = TypeSig::class("System.Collections.Generic.List`1");
/// assert!(list.is_reference());
/// assert!(TypeSig::I32.is_integer());
/// assert_eq!(TypeSig::array(TypeSig::U8).element_type(), Some(&TypeSig::U8));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// No value (System.Void)
    Void,
    /// System.Boolean
    Bool,
    /// System.Char
    Char,
    /// System.SByte
    I8,
    /// System.Byte
    U8,
    /// System.Int16
    I16,
    /// System.UInt16
    U16,
    /// System.Int32
    I32,
    /// System.UInt32
    U32,
    /// System.Int64
    I64,
    /// System.UInt64
    U64,
    /// System.IntPtr
    NativeInt,
    /// System.UIntPtr
    NativeUInt,
    /// System.Single
    F32,
    /// System.Double
    F64,
    /// System.Object
    Object,
    /// System.String
    String,
    /// Reference type, identified by its full name
    Class(String),
    /// Value type, identified by its full name
    ValueType(String),
    /// Array of the element type with the given rank (1 for vectors)
    Array(Box<TypeSig>, u32),
    /// Unmanaged pointer
    Pointer(Box<TypeSig>),
    /// Managed reference (`ref T`)
    ByRef(Box<TypeSig>),
    /// Generic type parameter `!n`
    GenericParam(u32),
    /// Generic method parameter `!!n`
    MethodGenericParam(u32),
    /// System.TypedReference
    TypedReference,
}

impl TypeSig {
    /// Creates a reference type signature from its full name.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        TypeSig::Class(name.into())
    }

    /// Creates a value type signature from its full name.
    #[must_use]
    pub fn value_type(name: impl Into<String>) -> Self {
        TypeSig::ValueType(name.into())
    }

    /// Creates a single-dimensional array (vector) of `element`.
    #[must_use]
    pub fn array(element: TypeSig) -> Self {
        TypeSig::Array(Box::new(element), 1)
    }

    /// Creates a managed reference to `inner`.
    #[must_use]
    pub fn by_ref(inner: TypeSig) -> Self {
        TypeSig::ByRef(Box::new(inner))
    }

    /// Returns `true` for the `void` type.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, TypeSig::Void)
    }

    /// Returns `true` if this is an integer type (signed or unsigned).
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeSig::I8
                | TypeSig::U8
                | TypeSig::I16
                | TypeSig::U16
                | TypeSig::I32
                | TypeSig::U32
                | TypeSig::I64
                | TypeSig::U64
                | TypeSig::NativeInt
                | TypeSig::NativeUInt
        )
    }

    /// Returns `true` if this is a floating-point type.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, TypeSig::F32 | TypeSig::F64)
    }

    /// Returns `true` if this is a reference type (can be null).
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(
            self,
            TypeSig::Object | TypeSig::String | TypeSig::Class(_) | TypeSig::Array(_, _)
        )
    }

    /// Returns `true` if values of this type are stored inline.
    #[must_use]
    pub const fn is_value_type(&self) -> bool {
        !self.is_reference()
            && !matches!(
                self,
                TypeSig::Void | TypeSig::GenericParam(_) | TypeSig::MethodGenericParam(_)
            )
    }

    /// Returns the element type of an array, pointer or managed reference.
    #[must_use]
    pub fn element_type(&self) -> Option<&TypeSig> {
        match self {
            TypeSig::Array(inner, _) | TypeSig::Pointer(inner) | TypeSig::ByRef(inner) => {
                Some(inner)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Void => f.write_str("void"),
            TypeSig::Bool => f.write_str("bool"),
            TypeSig::Char => f.write_str("char"),
            TypeSig::I8 => f.write_str("int8"),
            TypeSig::U8 => f.write_str("uint8"),
            TypeSig::I16 => f.write_str("int16"),
            TypeSig::U16 => f.write_str("uint16"),
            TypeSig::I32 => f.write_str("int32"),
            TypeSig::U32 => f.write_str("uint32"),
            TypeSig::I64 => f.write_str("int64"),
            TypeSig::U64 => f.write_str("uint64"),
            TypeSig::NativeInt => f.write_str("native int"),
            TypeSig::NativeUInt => f.write_str("native uint"),
            TypeSig::F32 => f.write_str("float32"),
            TypeSig::F64 => f.write_str("float64"),
            TypeSig::Object => f.write_str("object"),
            TypeSig::String => f.write_str("string"),
            TypeSig::Class(name) => write!(f, "class {name}"),
            TypeSig::ValueType(name) => write!(f, "valuetype {name}"),
            TypeSig::Array(elem, 1) => write!(f, "{elem}[]"),
            TypeSig::Array(elem, rank) => {
                let commas = ",".repeat(rank.saturating_sub(1) as usize);
                write!(f, "{elem}[{commas}]")
            }
            TypeSig::Pointer(inner) => write!(f, "{inner}*"),
            TypeSig::ByRef(inner) => write!(f, "{inner}&"),
            TypeSig::GenericParam(n) => write!(f, "!{n}"),
            TypeSig::MethodGenericParam(n) => write!(f, "!!{n}"),
            TypeSig::TypedReference => f.write_str("typedref"),
        }
    }
}

/// Signature of a callable: calling convention, parameter types and return type.
///
/// Used directly as the operand of `calli` and embedded in [`crate::metadata::MethodRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    /// Calling convention flags
    pub calling_convention: CallingConvention,
    /// Declared parameter types, excluding an implicit `this`
    pub params: Vec<TypeSig>,
    /// Declared return type ([`TypeSig::Void`] when nothing is returned)
    pub ret: TypeSig,
}

impl MethodSig {
    /// Creates a signature for a static method.
    #[must_use]
    pub fn new_static(params: Vec<TypeSig>, ret: TypeSig) -> Self {
        Self {
            calling_convention: CallingConvention::empty(),
            params,
            ret,
        }
    }

    /// Creates a signature for an instance method (`HAS_THIS`).
    #[must_use]
    pub fn new_instance(params: Vec<TypeSig>, ret: TypeSig) -> Self {
        Self {
            calling_convention: CallingConvention::HAS_THIS,
            params,
            ret,
        }
    }

    /// Returns `true` if callers push an implicit receiver before the declared parameters.
    #[must_use]
    pub fn has_implicit_this(&self) -> bool {
        self.calling_convention.contains(CallingConvention::HAS_THIS)
            && !self
                .calling_convention
                .contains(CallingConvention::EXPLICIT_THIS)
    }

    /// Returns `true` if the callee returns no value.
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.ret.is_void()
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_implicit_this() {
            f.write_str("instance ")?;
        }
        write!(f, "{} (", self.ret)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}
