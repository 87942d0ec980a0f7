//! Field and method descriptors used as instruction operands.

use std::fmt;

use crate::metadata::signatures::{MethodSig, TypeSig};

/// A field referenced by `ldfld`, `stsfld`, `ldflda` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Type declaring the field
    pub declaring_type: TypeSig,
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub field_type: TypeSig,
}

impl FieldRef {
    /// Creates a new field descriptor.
    #[must_use]
    pub fn new(declaring_type: TypeSig, name: impl Into<String>, field_type: TypeSig) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            field_type,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}::{}",
            self.field_type, self.declaring_type, self.name
        )
    }
}

/// A method referenced by `call`, `callvirt`, `newobj`, `ldftn` and `jmp`.
///
/// # Examples
///
/// ```rust
/// use cilsplice::metadata::{MethodRef, MethodSig, TypeSig};
///
/// let log = MethodRef::new(
///     TypeSig::class("UnityEngine.Debug"),
///     "Log",
///     MethodSig::new_static(vec![TypeSig::Object], TypeSig::Void),
/// );
/// assert!(log.is_static());
/// assert_eq!(log.to_string(), "void class UnityEngine.Debug::Log(object)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Type declaring the method
    pub declaring_type: TypeSig,
    /// Method name (`.ctor` for constructors)
    pub name: String,
    /// Call signature
    pub signature: MethodSig,
}

impl MethodRef {
    /// Creates a new method descriptor.
    #[must_use]
    pub fn new(declaring_type: TypeSig, name: impl Into<String>, signature: MethodSig) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            signature,
        }
    }

    /// Returns `true` if the method has no implicit receiver.
    #[must_use]
    pub fn is_static(&self) -> bool {
        !self.signature.has_implicit_this()
    }

    /// Returns `true` for instance constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}::{}(", self.signature.ret, self.declaring_type, self.name)?;
        for (i, param) in self.signature.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}
