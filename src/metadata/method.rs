//! Identity of the method whose instruction list is being edited.

use crate::{
    assembly::Instruction,
    metadata::signatures::{MethodSig, TypeSig},
};

/// Describes the method that owns an instruction list.
///
/// The interception layer hands this over together with the raw instructions. The engine only
/// uses it to type values that come from arguments (`ldarg`, `ldarga`) and, as a last resort,
/// from declared local slots.
///
/// # Examples
///
/// ```rust
/// use cilsplice::metadata::{MethodContext, MethodSig, TypeSig};
///
/// let ctx = MethodContext::new(
///     TypeSig::class("CameraController"),
///     "LateUpdate",
///     MethodSig::new_instance(vec![TypeSig::F32], TypeSig::Void),
/// );
///
/// // Argument 0 is `this` for instance methods
/// assert_eq!(ctx.argument_type(0), Some(TypeSig::class("CameraController")));
/// assert_eq!(ctx.argument_type(1), Some(TypeSig::F32));
/// assert_eq!(ctx.argument_type(2), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodContext {
    /// Type declaring the method
    pub declaring_type: TypeSig,
    /// Method name
    pub name: String,
    /// Method signature
    pub signature: MethodSig,
    /// Declared local variable types, indexed by slot
    pub locals: Vec<TypeSig>,
}

impl MethodContext {
    /// Creates a context without declared locals.
    #[must_use]
    pub fn new(declaring_type: TypeSig, name: impl Into<String>, signature: MethodSig) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            signature,
            locals: Vec::new(),
        }
    }

    /// Sets the declared local variable types.
    #[must_use]
    pub fn with_locals(mut self, locals: Vec<TypeSig>) -> Self {
        self.locals = locals;
        self
    }

    /// Returns the static type of argument slot `index`.
    ///
    /// For instance methods slot 0 is the receiver, typed as the declaring type (by reference
    /// when the declaring type is a value type), and declared parameters start at slot 1.
    #[must_use]
    pub fn argument_type(&self, index: u16) -> Option<TypeSig> {
        let index = usize::from(index);
        if self.signature.has_implicit_this() {
            if index == 0 {
                return Some(match &self.declaring_type {
                    TypeSig::ValueType(_) => TypeSig::by_ref(self.declaring_type.clone()),
                    other => other.clone(),
                });
            }
            self.signature.params.get(index - 1).cloned()
        } else {
            self.signature.params.get(index).cloned()
        }
    }

    /// Returns the declared type of local slot `index`, if known.
    #[must_use]
    pub fn local_type(&self, index: u16) -> Option<&TypeSig> {
        self.locals.get(usize::from(index))
    }

    /// Returns a `Type::Method` style display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        let owner = match &self.declaring_type {
            TypeSig::Class(name) | TypeSig::ValueType(name) => name.clone(),
            other => other.to_string(),
        };
        format!("{owner}::{}", self.name)
    }
}

/// A method's instruction list paired with the context needed to analyse it.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Identity of the method
    pub context: MethodContext,
    /// Linear instruction encoding of the body
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Creates a new method body.
    #[must_use]
    pub fn new(context: MethodContext, instructions: Vec<Instruction>) -> Self {
        Self {
            context,
            instructions,
        }
    }
}
