//! Stack effect model: how many evaluation stack slots an instruction consumes and produces.
//!
//! Fixed counts come straight from the opcode table. The call-shaped opcodes (`call`,
//! `callvirt`, `calli`, `newobj`) and `ret` are marked [`StackCount::Variable`] there and are
//! resolved here from the method descriptor or call site signature carried by the operand.
//!
//! `ret` always pops exactly one value. Methods returning `void` are assumed never to reach the
//! model through that instruction.
//!
//! # Examples
//!
//! ```rust
//! use cilsplice::assembly::{pop_count, push_count, Instruction};
//! use cilsplice::metadata::{MethodRef, MethodSig, TypeSig};
//!
//! let concat = MethodRef::new(
//!     TypeSig::String,
//!     "Concat",
//!     MethodSig::new_static(vec![TypeSig::String, TypeSig::String], TypeSig::String),
//! );
//! let call = Instruction::call(concat);
//! assert_eq!(pop_count(&call)?, 2);
//! assert_eq!(push_count(&call)?, 1);
//! # Ok::<(), cilsplice::Error>(())
//! ```

use crate::{
    assembly::{instruction::Operand, opcodes::Opcode, Instruction},
    metadata::MethodSig,
    Result,
};

/// Number of stack slots in an opcode table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackCount {
    /// A constant number of slots
    Fixed(u8),
    /// Depends on the operand (call-shaped opcodes and `ret`)
    Variable,
}

impl StackCount {
    /// Returns the fixed slot count, or `None` for [`StackCount::Variable`].
    #[must_use]
    pub const fn fixed(self) -> Option<u8> {
        match self {
            StackCount::Fixed(n) => Some(n),
            StackCount::Variable => None,
        }
    }
}

/// Returns the number of evaluation stack slots `instruction` consumes.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] if the opcode's table entry is variable and the
/// operand does not carry the descriptor needed to resolve it.
pub fn pop_count(instruction: &Instruction) -> Result<usize> {
    if let Some(n) = instruction.opcode.info().pops.fixed() {
        return Ok(usize::from(n));
    }

    match instruction.opcode {
        Opcode::Ret => Ok(1),
        Opcode::Call | Opcode::Callvirt => {
            let sig = call_signature(instruction)?;
            Ok(sig.params.len() + usize::from(sig.has_implicit_this()))
        }
        Opcode::Calli => {
            let sig = call_signature(instruction)?;
            // The function pointer sits on top of the arguments
            Ok(sig.params.len() + usize::from(sig.has_implicit_this()) + 1)
        }
        Opcode::Newobj => Ok(call_signature(instruction)?.params.len()),
        other => Err(unsupported_error!(
            other,
            "variable pop count without a call-shaped resolution"
        )),
    }
}

/// Returns the number of evaluation stack slots `instruction` produces.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] under the same conditions as [`pop_count`].
pub fn push_count(instruction: &Instruction) -> Result<usize> {
    if let Some(n) = instruction.opcode.info().pushes.fixed() {
        return Ok(usize::from(n));
    }

    match instruction.opcode {
        Opcode::Call | Opcode::Callvirt | Opcode::Calli => {
            Ok(usize::from(!call_signature(instruction)?.returns_void()))
        }
        Opcode::Newobj => {
            call_signature(instruction)?;
            Ok(1)
        }
        other => Err(unsupported_error!(
            other,
            "variable push count without a call-shaped resolution"
        )),
    }
}

/// Returns `push_count - pop_count` for `instruction`.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] under the same conditions as [`pop_count`].
pub fn net_effect(instruction: &Instruction) -> Result<isize> {
    let pushes = isize::try_from(push_count(instruction)?).unwrap_or(isize::MAX);
    let pops = isize::try_from(pop_count(instruction)?).unwrap_or(isize::MAX);
    Ok(pushes - pops)
}

/// Finds the instruction that produced the value `position` slots below the top of the stack
/// as it is just before `index` executes.
///
/// Walks backward from `index - 1` keeping a running depth: each instruction first adds its
/// pushes, and the walk stops at the first instruction that lifts the depth above `position`;
/// otherwise its pops are subtracted. Returns `None` if the start of the list is reached.
///
/// The walk is linear. It does not follow branches, so across a control-flow join the result
/// is the textually preceding producer.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] if an instruction on the way has no derivable stack
/// effect.
///
/// # Examples
///
/// ```rust
/// use cilsplice::assembly::{stack_producer, Instruction, Opcode};
///
/// let list = vec![
///     Instruction::load_int(1),
///     Instruction::load_int(2),
///     Instruction::new(Opcode::Add),
/// ];
/// assert_eq!(stack_producer(&list, 2, 0)?, Some(1));
/// assert_eq!(stack_producer(&list, 2, 1)?, Some(0));
/// assert_eq!(stack_producer(&list, 2, 2)?, None);
/// # Ok::<(), cilsplice::Error>(())
/// ```
pub fn stack_producer(
    list: &[Instruction],
    index: usize,
    position: usize,
) -> Result<Option<usize>> {
    let target = isize::try_from(position).unwrap_or(isize::MAX);
    let mut depth: isize = 0;

    for i in (0..index.min(list.len())).rev() {
        let instruction = &list[i];
        depth += isize::try_from(push_count(instruction)?).unwrap_or(isize::MAX);
        if depth > target {
            return Ok(Some(i));
        }
        depth -= isize::try_from(pop_count(instruction)?).unwrap_or(isize::MAX);
    }

    Ok(None)
}

fn call_signature(instruction: &Instruction) -> Result<&MethodSig> {
    match (&instruction.opcode, &instruction.operand) {
        (Opcode::Calli, Operand::Signature(sig)) => Ok(sig),
        (Opcode::Call | Opcode::Callvirt | Opcode::Newobj, Operand::Method(method)) => {
            Ok(&method.signature)
        }
        (opcode, operand) => Err(unsupported_error!(
            *opcode,
            "call-shaped opcode with operand {:?}",
            operand
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::Label,
        metadata::{CallingConvention, MethodRef, TypeSig},
        Error,
    };
    use strum::IntoEnumIterator;

    fn method(sig: MethodSig) -> MethodRef {
        MethodRef::new(TypeSig::class("Target"), "M", sig)
    }

    #[test]
    fn fixed_entries() {
        let cases = [
            (Instruction::new(Opcode::Add), 2, 1),
            (Instruction::new(Opcode::Nop), 0, 0),
            (Instruction::new(Opcode::Dup), 1, 2),
            (Instruction::load_int(3), 0, 1),
            (Instruction::store_local(0), 1, 0),
            (Instruction::branch(Opcode::BrtrueS, Label(0)), 1, 0),
            (Instruction::branch(Opcode::Beq, Label(0)), 2, 0),
            (Instruction::branch(Opcode::Br, Label(0)), 0, 0),
            (Instruction::new(Opcode::StelemI4), 3, 0),
            (Instruction::new(Opcode::Ceq), 2, 1),
        ];
        for (instr, pops, pushes) in cases {
            assert_eq!(pop_count(&instr).unwrap(), pops, "{instr}");
            assert_eq!(push_count(&instr).unwrap(), pushes, "{instr}");
        }
    }

    /// Stack transition of each mnemonic as listed in ECMA-335 Partition III, `None` where it
    /// depends on the call site.
    fn ecma_transition(mnemonic: &str) -> Option<(usize, usize)> {
        let transition = match mnemonic {
            "call" | "callvirt" | "calli" | "newobj" | "ret" => return None,
            "dup" => (1, 2),
            "box" => (1, 1),
            "cpblk" | "initblk" => (3, 0),
            "stfld" | "stobj" | "cpobj" => (2, 0),
            "ceq" | "cgt" | "cgt.un" | "clt" | "clt.un" => (2, 1),
            "brtrue" | "brtrue.s" | "brfalse" | "brfalse.s" | "switch" => (1, 0),
            "stsfld" | "pop" | "throw" | "initobj" | "endfilter" => (1, 0),
            "br" | "br.s" | "leave" | "leave.s" | "jmp" | "endfinally" | "rethrow" | "nop"
            | "break" => (0, 0),
            "ldnull" | "ldstr" | "ldsfld" | "ldsflda" | "ldtoken" | "ldftn" | "arglist"
            | "sizeof" => (0, 1),
            // Prefixes
            m if m.ends_with('.') => (0, 0),
            m if m.starts_with("stelem") => (3, 0),
            m if m.starts_with("ldelem") => (2, 1),
            m if m.starts_with("stind.") => (2, 0),
            m if m.starts_with("stloc") || m.starts_with("starg") => (1, 0),
            m if m.starts_with("ldc.") || m.starts_with("ldarg") || m.starts_with("ldloc") => {
                (0, 1)
            }
            // Two-operand conditional branches
            m if m.starts_with('b') => (2, 0),
            m if ["add", "sub", "mul", "div", "rem", "and", "or", "xor", "shl", "shr"]
                .iter()
                .any(|op| m == *op || m.starts_with(&format!("{op}."))) =>
            {
                (2, 1)
            }
            _ => (1, 1),
        };
        Some(transition)
    }

    #[test]
    fn table_matches_ecma_transitions() {
        let mut categories = Vec::new();
        for opcode in Opcode::iter() {
            let info = opcode.info();
            match ecma_transition(info.mnemonic) {
                None => assert_eq!(info.pops, StackCount::Variable, "{}", info.mnemonic),
                Some((pops, pushes)) => {
                    let instr = Instruction::new(opcode);
                    assert_eq!(pop_count(&instr).unwrap(), pops, "{}", info.mnemonic);
                    assert_eq!(push_count(&instr).unwrap(), pushes, "{}", info.mnemonic);
                    if !categories.contains(&info.category) {
                        categories.push(info.category);
                    }
                }
            }
        }
        // Every category has at least one fixed-effect opcode checked
        assert_eq!(categories.len(), 9);
    }

    #[test]
    fn calls_account_for_receiver_and_return() {
        let stat = method(MethodSig::new_static(
            vec![TypeSig::I32, TypeSig::I32, TypeSig::I32],
            TypeSig::Void,
        ));
        let call = Instruction::call(stat);
        assert_eq!(pop_count(&call).unwrap(), 3);
        assert_eq!(push_count(&call).unwrap(), 0);

        let inst = method(MethodSig::new_instance(vec![TypeSig::String], TypeSig::Bool));
        let callvirt = Instruction::call_virtual(inst);
        assert_eq!(pop_count(&callvirt).unwrap(), 2);
        assert_eq!(push_count(&callvirt).unwrap(), 1);
        assert_eq!(net_effect(&callvirt).unwrap(), -1);
    }

    #[test]
    fn explicit_this_is_already_a_parameter() {
        let mut sig = MethodSig::new_instance(vec![TypeSig::Object], TypeSig::Void);
        sig.calling_convention |= CallingConvention::EXPLICIT_THIS;
        assert_eq!(pop_count(&Instruction::call(method(sig))).unwrap(), 1);
    }

    #[test]
    fn calli_pops_function_pointer() {
        let instr = Instruction::with_operand(
            Opcode::Calli,
            Operand::Signature(MethodSig::new_static(vec![TypeSig::I32], TypeSig::I32)),
        );
        assert_eq!(pop_count(&instr).unwrap(), 2);
        assert_eq!(push_count(&instr).unwrap(), 1);
    }

    #[test]
    fn newobj_pushes_created_instance() {
        let ctor = MethodRef::new(
            TypeSig::class("System.Exception"),
            ".ctor",
            MethodSig::new_instance(vec![TypeSig::String], TypeSig::Void),
        );
        let instr = Instruction::new_object(ctor);
        assert_eq!(pop_count(&instr).unwrap(), 1);
        assert_eq!(push_count(&instr).unwrap(), 1);
    }

    #[test]
    fn ret_pops_one() {
        assert_eq!(pop_count(&Instruction::ret()).unwrap(), 1);
        assert_eq!(push_count(&Instruction::ret()).unwrap(), 0);
    }

    #[test]
    fn producer_walk_skips_consumed_values() {
        let list = vec![
            Instruction::load_int(1),    // A
            Instruction::load_int(2),    // consumed by the store
            Instruction::store_local(0),
            Instruction::load_int(3),    // B
            Instruction::load_int(4),
            Instruction::load_int(5),
            Instruction::new(Opcode::Add), // C = 4 + 5
            Instruction::new(Opcode::Nop),
        ];
        assert_eq!(stack_producer(&list, 7, 0).unwrap(), Some(6));
        assert_eq!(stack_producer(&list, 7, 1).unwrap(), Some(3));
        assert_eq!(stack_producer(&list, 7, 2).unwrap(), Some(0));
        assert_eq!(stack_producer(&list, 7, 3).unwrap(), None);
        assert_eq!(stack_producer(&list, 0, 0).unwrap(), None);
    }

    #[test]
    fn call_without_descriptor_is_unsupported() {
        let bare = Instruction::new(Opcode::Call);
        assert!(matches!(
            pop_count(&bare),
            Err(Error::Unsupported {
                opcode: Opcode::Call,
                ..
            })
        ));
        assert!(push_count(&bare).is_err());
    }
}
