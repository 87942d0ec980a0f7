//! Backward dataflow inference of the static type an instruction pushes.
//!
//! Instruction lists handed to the engine come without a symbol table, so the type of a stack
//! value is reconstructed from the instructions around it:
//!
//! - Constants, field and element reads, conversions and calls read the type from the operand
//!   or from a fixed opcode mapping.
//! - Arithmetic and bitwise operations follow their operand producers, preferring the first
//!   operand.
//! - `dup`, `ckfinite`, `neg` and `not` follow the single value they consume.
//! - Local reads follow the nearest preceding store to the same slot and infer the value that
//!   fed it.
//!
//! Producers are located with [`stack_producer`], which scans linearly. Across a control-flow
//! join the textually nearest store or producer wins, even if another predecessor would supply
//! a different value. Inference gives up with `None` rather than guessing when nothing
//! applies.
//!
//! Every dependency sits at a strictly lower instruction index, so inference terminates on any
//! list. A query visits each instruction at most once and keeps its pending producers on the
//! heap, so its cost is polynomial in the list length and independent of the thread stack.
//!
//! # Examples
//!
//! ```rust
//! use cilsplice::analysis::infer_pushed_type;
//! use cilsplice::assembly::Instruction;
//! use cilsplice::metadata::{MethodContext, MethodSig, TypeSig};
//!
//! let ctx = MethodContext::new(
//!     TypeSig::class("Player"),
//!     "Update",
//!     MethodSig::new_instance(vec![], TypeSig::Void),
//! );
//! let list = vec![
//!     Instruction::load_int(5),
//!     Instruction::store_local(0),
//!     Instruction::load_local(0),
//! ];
//! assert_eq!(infer_pushed_type(&ctx, &list, 2)?, Some(TypeSig::I32));
//! # Ok::<(), cilsplice::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{stack_producer, Instruction, Opcode, Operand},
    metadata::{MethodContext, TypeSig},
    Result,
};

/// Infers the static type of the value the instruction at `index` pushes.
///
/// Returns `Ok(None)` when the type cannot be determined, when the instruction pushes nothing,
/// or when `index` is out of range.
///
/// Each query memoizes the type of every instruction it visits and resolves producers with an
/// explicit work stack, so long producer chains neither recurse natively nor get re-walked.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] if the backward walk crosses an instruction without a
/// derivable stack effect.
pub fn infer_pushed_type(
    ctx: &MethodContext,
    list: &[Instruction],
    index: usize,
) -> Result<Option<TypeSig>> {
    if index >= list.len() {
        return Ok(None);
    }
    Inference::new(ctx, list).resolve(index)
}

/// Infers the type of the value sitting `position` slots below the top of the stack just
/// before the instruction at `index` executes.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] if the backward walk crosses an instruction without a
/// derivable stack effect.
pub fn infer_stack_value(
    ctx: &MethodContext,
    list: &[Instruction],
    index: usize,
    position: usize,
) -> Result<Option<TypeSig>> {
    match stack_producer(list, index, position)? {
        Some(producer) => Inference::new(ctx, list).resolve(producer),
        None => Ok(None),
    }
}

/// Outcome of evaluating one instruction against the memo.
enum Step {
    /// The type is known
    Ready(Option<TypeSig>),
    /// The type depends on the unresolved producer at this index
    Needs(usize),
}

impl Step {
    fn map(self, f: impl FnOnce(TypeSig) -> TypeSig) -> Step {
        match self {
            Step::Ready(ty) => Step::Ready(ty.map(f)),
            needs => needs,
        }
    }
}

/// State of a single inference query.
struct Inference<'a> {
    ctx: &'a MethodContext,
    list: &'a [Instruction],
    memo: HashMap<usize, Option<TypeSig>>,
}

impl<'a> Inference<'a> {
    fn new(ctx: &'a MethodContext, list: &'a [Instruction]) -> Self {
        Self {
            ctx,
            list,
            memo: HashMap::new(),
        }
    }

    /// Resolves `root` depth first. Every dependency has a strictly lower index, so the work
    /// stack never exceeds the list length and the loop terminates.
    fn resolve(&mut self, root: usize) -> Result<Option<TypeSig>> {
        let mut pending = vec![root];
        while let Some(&index) = pending.last() {
            if self.memo.contains_key(&index) {
                pending.pop();
                continue;
            }
            match self.evaluate(index)? {
                Step::Ready(ty) => {
                    self.memo.insert(index, ty);
                    pending.pop();
                }
                Step::Needs(producer) => pending.push(producer),
            }
        }
        Ok(self.memo.get(&root).cloned().flatten())
    }

    /// Type of the resolved producer `producer`, or the dependency to resolve first.
    fn through(&self, producer: Option<usize>) -> Step {
        match producer {
            None => Step::Ready(None),
            Some(producer) => match self.memo.get(&producer) {
                Some(ty) => Step::Ready(ty.clone()),
                None => Step::Needs(producer),
            },
        }
    }

    fn evaluate(&self, index: usize) -> Result<Step> {
        let instruction = &self.list[index];
        if let Some(ty) = fixed_type(instruction) {
            return Ok(Step::Ready(Some(ty)));
        }

        let operand_type = instruction.type_operand().cloned();
        let step = match instruction.opcode {
            // Stack-neutral pass-through of the top value
            Opcode::Dup | Opcode::Ckfinite | Opcode::Neg | Opcode::Not => {
                self.through(stack_producer(self.list, index, 0)?)
            }

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::DivUn
            | Opcode::Rem
            | Opcode::RemUn
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::ShrUn
            | Opcode::AddOvf
            | Opcode::AddOvfUn
            | Opcode::MulOvf
            | Opcode::MulOvfUn
            | Opcode::SubOvf
            | Opcode::SubOvfUn => match self.through(stack_producer(self.list, index, 1)?) {
                Step::Ready(None) => self.through(stack_producer(self.list, index, 0)?),
                first => first,
            },

            Opcode::Ldloc0
            | Opcode::Ldloc1
            | Opcode::Ldloc2
            | Opcode::Ldloc3
            | Opcode::LdlocS
            | Opcode::Ldloc => match instruction.local_index() {
                Some(slot) => self.local(index, slot)?,
                None => Step::Ready(None),
            },
            Opcode::LdlocaS | Opcode::Ldloca => match instruction.local_index() {
                Some(slot) => self.local(index, slot)?.map(TypeSig::by_ref),
                None => Step::Ready(None),
            },

            Opcode::Ldarg0
            | Opcode::Ldarg1
            | Opcode::Ldarg2
            | Opcode::Ldarg3
            | Opcode::LdargS
            | Opcode::Ldarg => Step::Ready(
                instruction
                    .argument_index()
                    .and_then(|slot| self.ctx.argument_type(slot)),
            ),
            Opcode::LdargaS | Opcode::Ldarga => Step::Ready(
                instruction
                    .argument_index()
                    .and_then(|slot| self.ctx.argument_type(slot))
                    .map(TypeSig::by_ref),
            ),

            Opcode::Call | Opcode::Callvirt => Step::Ready(
                instruction
                    .method()
                    .map(|method| method.signature.ret.clone())
                    .filter(|ret| !ret.is_void()),
            ),
            Opcode::Calli => Step::Ready(match &instruction.operand {
                Operand::Signature(sig) if !sig.returns_void() => Some(sig.ret.clone()),
                _ => None,
            }),
            Opcode::Newobj => Step::Ready(
                instruction
                    .method()
                    .map(|ctor| ctor.declaring_type.clone()),
            ),

            Opcode::Ldfld | Opcode::Ldsfld => {
                Step::Ready(instruction.field().map(|f| f.field_type.clone()))
            }
            Opcode::Ldflda | Opcode::Ldsflda => Step::Ready(
                instruction
                    .field()
                    .map(|f| TypeSig::by_ref(f.field_type.clone())),
            ),

            Opcode::LdelemRef => match self.through(stack_producer(self.list, index, 1)?) {
                Step::Ready(array) => Step::Ready(Some(match array {
                    Some(TypeSig::Array(element, _)) => *element,
                    _ => TypeSig::Object,
                })),
                needs => needs,
            },
            Opcode::Ldelema | Opcode::Unbox | Opcode::Refanyval => {
                Step::Ready(operand_type.map(TypeSig::by_ref))
            }
            Opcode::Ldelem
            | Opcode::Ldobj
            | Opcode::Castclass
            | Opcode::Isinst
            | Opcode::UnboxAny => Step::Ready(operand_type),
            Opcode::Newarr => Step::Ready(operand_type.map(TypeSig::array)),

            Opcode::Ldtoken => Step::Ready(match &instruction.operand {
                Operand::Type(_) => Some(TypeSig::value_type("System.RuntimeTypeHandle")),
                Operand::Field(_) => Some(TypeSig::value_type("System.RuntimeFieldHandle")),
                Operand::Method(_) => Some(TypeSig::value_type("System.RuntimeMethodHandle")),
                _ => None,
            }),

            _ => Step::Ready(None),
        };
        Ok(step)
    }

    /// Types a read of local `slot` at `index` from the nearest preceding store, falling back
    /// to the declared local type.
    fn local(&self, index: usize, slot: u16) -> Result<Step> {
        let declared = || self.ctx.local_type(slot).cloned();
        let store = (0..index)
            .rev()
            .find(|&i| self.list[i].is_store_local() && self.list[i].local_index() == Some(slot));

        let Some(store) = store else {
            return Ok(Step::Ready(declared()));
        };
        Ok(match self.through(stack_producer(self.list, store, 0)?) {
            Step::Ready(None) => Step::Ready(declared()),
            step => step,
        })
    }
}

/// Types that follow from the opcode alone.
fn fixed_type(instruction: &Instruction) -> Option<TypeSig> {
    let ty = match instruction.opcode {
        Opcode::LdcI4M1
        | Opcode::LdcI4_0
        | Opcode::LdcI4_1
        | Opcode::LdcI4_2
        | Opcode::LdcI4_3
        | Opcode::LdcI4_4
        | Opcode::LdcI4_5
        | Opcode::LdcI4_6
        | Opcode::LdcI4_7
        | Opcode::LdcI4_8
        | Opcode::LdcI4S
        | Opcode::LdcI4 => TypeSig::I32,
        Opcode::LdcI8 => TypeSig::I64,
        Opcode::LdcR4 => TypeSig::F32,
        Opcode::LdcR8 => TypeSig::F64,
        Opcode::Ldstr => TypeSig::String,
        Opcode::Ldnull | Opcode::Box => TypeSig::Object,

        // Small integers widen to int32 on the evaluation stack
        Opcode::LdindI1
        | Opcode::LdindU1
        | Opcode::LdindI2
        | Opcode::LdindU2
        | Opcode::LdindI4
        | Opcode::LdindU4
        | Opcode::LdelemI1
        | Opcode::LdelemU1
        | Opcode::LdelemI2
        | Opcode::LdelemU2
        | Opcode::LdelemI4
        | Opcode::LdelemU4
        | Opcode::Sizeof => TypeSig::I32,
        Opcode::LdindI8 | Opcode::LdelemI8 => TypeSig::I64,
        Opcode::LdindI | Opcode::LdelemI => TypeSig::NativeInt,
        Opcode::LdindR4 | Opcode::LdelemR4 => TypeSig::F32,
        Opcode::LdindR8 | Opcode::LdelemR8 => TypeSig::F64,
        Opcode::LdindRef => TypeSig::Object,
        Opcode::Ldlen => TypeSig::NativeUInt,

        Opcode::ConvI1 | Opcode::ConvOvfI1 | Opcode::ConvOvfI1Un => TypeSig::I8,
        Opcode::ConvU1 | Opcode::ConvOvfU1 | Opcode::ConvOvfU1Un => TypeSig::U8,
        Opcode::ConvI2 | Opcode::ConvOvfI2 | Opcode::ConvOvfI2Un => TypeSig::I16,
        Opcode::ConvU2 | Opcode::ConvOvfU2 | Opcode::ConvOvfU2Un => TypeSig::U16,
        Opcode::ConvI4 | Opcode::ConvOvfI4 | Opcode::ConvOvfI4Un => TypeSig::I32,
        Opcode::ConvU4 | Opcode::ConvOvfU4 | Opcode::ConvOvfU4Un => TypeSig::U32,
        Opcode::ConvI8 | Opcode::ConvOvfI8 | Opcode::ConvOvfI8Un => TypeSig::I64,
        Opcode::ConvU8 | Opcode::ConvOvfU8 | Opcode::ConvOvfU8Un => TypeSig::U64,
        Opcode::ConvI | Opcode::ConvOvfI | Opcode::ConvOvfIUn => TypeSig::NativeInt,
        Opcode::ConvU | Opcode::ConvOvfU | Opcode::ConvOvfUUn => TypeSig::NativeUInt,
        Opcode::ConvR4 => TypeSig::F32,
        Opcode::ConvR8 | Opcode::ConvRUn => TypeSig::F64,

        Opcode::Ceq | Opcode::Cgt | Opcode::CgtUn | Opcode::Clt | Opcode::CltUn => TypeSig::Bool,

        Opcode::Ldftn | Opcode::Ldvirtftn | Opcode::Localloc => TypeSig::NativeInt,
        Opcode::Arglist => TypeSig::value_type("System.RuntimeArgumentHandle"),
        Opcode::Refanytype => TypeSig::value_type("System.RuntimeTypeHandle"),
        Opcode::Mkrefany => TypeSig::TypedReference,
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::Label,
        metadata::{FieldRef, MethodRef, MethodSig},
        Error,
    };

    fn ctx() -> MethodContext {
        MethodContext::new(
            TypeSig::class("Player"),
            "TakeDamage",
            MethodSig::new_instance(vec![TypeSig::F32, TypeSig::String], TypeSig::Void),
        )
    }

    fn infer(list: &[Instruction], index: usize) -> Option<TypeSig> {
        infer_pushed_type(&ctx(), list, index).unwrap()
    }

    #[test]
    fn constants_and_fixed_opcodes() {
        let list = vec![
            Instruction::load_int(5),
            Instruction::load_long(5),
            Instruction::load_float(1.0),
            Instruction::load_double(1.0),
            Instruction::load_string("x"),
            Instruction::new(Opcode::Ldnull),
            Instruction::new(Opcode::LdindI1),
            Instruction::new(Opcode::ConvU8),
            Instruction::new(Opcode::ConvRUn),
            Instruction::new(Opcode::Clt),
        ];
        let expected = [
            TypeSig::I32,
            TypeSig::I64,
            TypeSig::F32,
            TypeSig::F64,
            TypeSig::String,
            TypeSig::Object,
            TypeSig::I32,
            TypeSig::U64,
            TypeSig::F64,
            TypeSig::Bool,
        ];
        for (i, ty) in expected.into_iter().enumerate() {
            assert_eq!(infer(&list, i), Some(ty), "{}", list[i]);
        }
    }

    #[test]
    fn through_a_local() {
        let list = vec![
            Instruction::load_int(5),
            Instruction::store_local(0),
            Instruction::load_local(0),
        ];
        assert_eq!(infer(&list, 2), Some(TypeSig::I32));
    }

    #[test]
    fn nearest_store_wins() {
        let list = vec![
            Instruction::load_string("a"),
            Instruction::store_local(2),
            Instruction::load_double(1.0),
            Instruction::store_local(2),
            Instruction::load_local_address(2),
        ];
        assert_eq!(infer(&list, 4), Some(TypeSig::by_ref(TypeSig::F64)));
    }

    #[test]
    fn declared_local_type_fallback() {
        let ctx = ctx().with_locals(vec![TypeSig::class("Enemy")]);
        let list = vec![Instruction::load_local(0)];
        assert_eq!(
            infer_pushed_type(&ctx, &list, 0).unwrap(),
            Some(TypeSig::class("Enemy"))
        );
        assert_eq!(infer(&list, 0), None);
    }

    #[test]
    fn arguments() {
        let list = vec![
            Instruction::load_argument(0),
            Instruction::load_argument(1),
            Instruction::load_argument_address(2),
            Instruction::load_argument(3),
        ];
        assert_eq!(infer(&list, 0), Some(TypeSig::class("Player")));
        assert_eq!(infer(&list, 1), Some(TypeSig::F32));
        assert_eq!(infer(&list, 2), Some(TypeSig::by_ref(TypeSig::String)));
        assert_eq!(infer(&list, 3), None);
    }

    #[test]
    fn arithmetic_prefers_first_operand() {
        let list = vec![
            Instruction::load_argument(1),
            Instruction::load_int(2),
            Instruction::new(Opcode::Mul),
        ];
        assert_eq!(infer(&list, 2), Some(TypeSig::F32));

        // First operand unknown, second decides
        let list = vec![
            Instruction::new(Opcode::Ldarg3),
            Instruction::load_long(2),
            Instruction::new(Opcode::Add),
            Instruction::new(Opcode::Dup),
            Instruction::new(Opcode::Neg),
        ];
        assert_eq!(infer(&list, 2), Some(TypeSig::I64));
        assert_eq!(infer(&list, 3), Some(TypeSig::I64));
        assert_eq!(infer(&list, 4), Some(TypeSig::I64));
    }

    #[test]
    fn members() {
        let health = FieldRef::new(TypeSig::class("Player"), "health", TypeSig::F32);
        let get_name = MethodRef::new(
            TypeSig::class("Player"),
            "get_Name",
            MethodSig::new_instance(vec![], TypeSig::String),
        );
        let ctor = MethodRef::new(
            TypeSig::value_type("UnityEngine.Vector3"),
            ".ctor",
            MethodSig::new_instance(vec![TypeSig::F32; 3], TypeSig::Void),
        );
        let list = vec![
            Instruction::load_argument(0),
            Instruction::load_field(health.clone(), false),
            Instruction::load_argument(0),
            Instruction::call_virtual(get_name),
            Instruction::with_operand(Opcode::Ldflda, Operand::Field(health)),
            Instruction::new_object(ctor),
        ];
        assert_eq!(infer(&list, 1), Some(TypeSig::F32));
        assert_eq!(infer(&list, 3), Some(TypeSig::String));
        assert_eq!(infer(&list, 4), Some(TypeSig::by_ref(TypeSig::F32)));
        assert_eq!(infer(&list, 5), Some(TypeSig::value_type("UnityEngine.Vector3")));
    }

    #[test]
    fn void_calls_push_nothing() {
        let list = vec![Instruction::call(MethodRef::new(
            TypeSig::class("A"),
            "B",
            MethodSig::new_static(vec![], TypeSig::Void),
        ))];
        assert_eq!(infer(&list, 0), None);
    }

    #[test]
    fn arrays() {
        let list = vec![
            Instruction::load_int(4),
            Instruction::with_operand(Opcode::Newarr, Operand::Type(TypeSig::String)),
            Instruction::store_local(0),
            Instruction::load_local(0),
            Instruction::load_int(0),
            Instruction::new(Opcode::LdelemRef),
            Instruction::new(Opcode::Ldnull),
            Instruction::load_int(0),
            Instruction::new(Opcode::LdelemRef),
        ];
        assert_eq!(infer(&list, 1), Some(TypeSig::array(TypeSig::String)));
        assert_eq!(infer(&list, 5), Some(TypeSig::String));
        assert_eq!(infer(&list, 8), Some(TypeSig::Object));
    }

    #[test]
    fn gives_up_without_a_rule() {
        let list = vec![
            Instruction::new(Opcode::Nop),
            Instruction::branch(Opcode::Br, Label(0)),
        ];
        assert_eq!(infer(&list, 0), None);
        assert_eq!(infer(&list, 1), None);
        assert_eq!(infer(&list, 10), None);
    }

    #[test]
    fn unsupported_producer_propagates() {
        let list = vec![
            Instruction::new(Opcode::Call),
            Instruction::new(Opcode::Dup),
        ];
        assert!(matches!(
            infer_pushed_type(&ctx(), &list, 1),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn self_referential_arithmetic_chain() {
        // v0 = arg1; then v0 = v0 + v0 repeated, each read fans out to the same store
        let mut list = vec![Instruction::load_argument(1), Instruction::store_local(0)];
        for _ in 0..500 {
            list.extend([
                Instruction::load_local(0),
                Instruction::load_local(0),
                Instruction::new(Opcode::Add),
                Instruction::store_local(0),
            ]);
        }
        list.push(Instruction::load_local(0));

        assert_eq!(infer(&list, list.len() - 1), Some(TypeSig::F32));
        assert_eq!(infer(&list, list.len() - 3), Some(TypeSig::F32));
    }

    #[test]
    fn long_pass_through_chains() {
        let mut dups = vec![Instruction::load_int(1)];
        dups.extend(std::iter::repeat_with(|| Instruction::new(Opcode::Dup)).take(5000));
        assert_eq!(infer(&dups, dups.len() - 1), Some(TypeSig::I32));

        let mut copies = vec![Instruction::load_long(1), Instruction::store_local(0)];
        for _ in 0..5000 {
            copies.extend([Instruction::load_local(0), Instruction::store_local(0)]);
        }
        copies.push(Instruction::load_local(0));
        assert_eq!(infer(&copies, copies.len() - 1), Some(TypeSig::I64));

        let mut negations = vec![Instruction::load_argument(1)];
        negations.extend(std::iter::repeat_with(|| Instruction::new(Opcode::Neg)).take(5000));
        assert_eq!(
            infer_stack_value(&ctx(), &negations, negations.len(), 0).unwrap(),
            Some(TypeSig::F32)
        );
    }
}
