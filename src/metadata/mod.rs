//! Self-contained descriptors for types, fields and methods.
//!
//! Instruction operands reference members through these descriptors rather than metadata
//! tokens, and [`MethodContext`] identifies the method an instruction list belongs to.
//!
//! # Key Types
//! - [`TypeSig`] - Static type of values, locals, fields and parameters
//! - [`MethodSig`] - Calling convention, parameters and return type
//! - [`FieldRef`] / [`MethodRef`] - Member descriptors used as operands
//! - [`MethodContext`] / [`MethodBody`] - The method being patched

mod members;
mod method;
mod signatures;

pub use members::{FieldRef, MethodRef};
pub use method::{MethodBody, MethodContext};
pub use signatures::{CallingConvention, MethodSig, TypeSig};
