//! Builders shared by the unit tests.

use crate::{
    assembly::Instruction,
    metadata::{MethodBody, MethodContext, MethodRef, MethodSig, TypeSig},
};

/// Context of an instance method on class `type_name`.
pub fn instance_context(type_name: &str, method: &str, params: Vec<TypeSig>) -> MethodContext {
    MethodContext::new(
        TypeSig::class(type_name),
        method,
        MethodSig::new_instance(params, TypeSig::Void),
    )
}

/// Context of a static method on class `type_name`.
pub fn static_context(
    type_name: &str,
    method: &str,
    params: Vec<TypeSig>,
    ret: TypeSig,
) -> MethodContext {
    MethodContext::new(
        TypeSig::class(type_name),
        method,
        MethodSig::new_static(params, ret),
    )
}

/// Parameterless instance method body.
pub fn method_body(type_name: &str, method: &str, instructions: Vec<Instruction>) -> MethodBody {
    MethodBody::new(instance_context(type_name, method, vec![]), instructions)
}

/// `call void type_name::method()`, a static call with no stack effect.
pub fn void_call(type_name: &str, method: &str) -> Instruction {
    Instruction::call(MethodRef::new(
        TypeSig::class(type_name),
        method,
        MethodSig::new_static(vec![], TypeSig::Void),
    ))
}
