//! Relocation of a donor instruction fragment into a receiver method.
//!
//! Copying vanilla logic verbatim into another method body only works if the copied local
//! slots and labels do not collide with the receiver's. [`rebase`] walks the donor once and
//! rewrites every identifier to a fresh one handed out by the caller's [`LocalAllocator`] and
//! [`LabelAllocator`]:
//!
//! - each donor local slot maps to one fresh receiver slot, typed by inferring the value first
//!   stored into it (falling back to the donor's declared local type)
//! - each donor label maps to one fresh receiver label, both where it is attached and where it
//!   is referenced by branch and switch operands
//!
//! Mappings are memoized, so the local and control flow structure of the fragment is preserved
//! exactly and only the concrete identifiers change. Argument references, member descriptors
//! and exception blocks are copied unchanged.
//!
//! # Examples
//!
//! ```rust
//! use cilsplice::analysis::{rebase, ReceiverScope};
//! use cilsplice::assembly::{Instruction, Label};
//! use cilsplice::metadata::{MethodContext, MethodSig, TypeSig};
//!
//! let donor_ctx = MethodContext::new(
//!     TypeSig::class("Vanilla"),
//!     "Compute",
//!     MethodSig::new_static(vec![], TypeSig::I32),
//! );
//! let donor = vec![
//!     Instruction::load_int(3),
//!     Instruction::store_local(0),
//!     Instruction::load_local(0).with_label(Label(0)),
//!     Instruction::ret(),
//! ];
//!
//! // Receiver already uses locals 0..=1 and label 0
//! let receiver_ctx = MethodContext::new(
//!     TypeSig::class("Modded"),
//!     "Compute",
//!     MethodSig::new_static(vec![], TypeSig::I32),
//! );
//! let receiver = vec![
//!     Instruction::store_local(1).with_label(Label(0)),
//!     Instruction::ret(),
//! ];
//! let mut scope = ReceiverScope::for_body(&receiver_ctx, &receiver);
//! let moved = rebase(&donor, &donor_ctx, &mut scope.locals, &mut scope.labels)?;
//!
//! assert_eq!(moved[1], Instruction::store_local(2));
//! assert_eq!(moved[2], Instruction::load_local(2).with_label(Label(1)));
//! assert_eq!(scope.locals.allocated(), &[(2, Some(TypeSig::I32))]);
//! # Ok::<(), cilsplice::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    analysis::inference::infer_stack_value,
    assembly::{Instruction, Label, Operand},
    metadata::{MethodContext, TypeSig},
    Result,
};

/// Hands out fresh local slots in the receiver method.
pub trait LocalAllocator {
    /// Allocates a new local slot of type `ty` (`None` if the type could not be inferred).
    fn allocate_local(&mut self, ty: Option<TypeSig>) -> u16;
}

/// Hands out fresh labels in the receiver method.
pub trait LabelAllocator {
    /// Allocates a label not used anywhere in the receiver.
    fn allocate_label(&mut self) -> Label;
}

/// Sequential local slot allocator that records what it handed out.
#[derive(Debug, Clone, Default)]
pub struct LocalPool {
    next: u16,
    allocated: Vec<(u16, Option<TypeSig>)>,
}

impl LocalPool {
    /// Creates a pool handing out slots from `first`.
    #[must_use]
    pub fn new(first: u16) -> Self {
        Self {
            next: first,
            allocated: Vec::new(),
        }
    }

    /// Returns the locals allocated so far with their inferred types.
    #[must_use]
    pub fn allocated(&self) -> &[(u16, Option<TypeSig>)] {
        &self.allocated
    }

    /// Declares every allocated local on `ctx`.
    ///
    /// Slots the receiver used without declaring are filled with `object`, as are allocated
    /// locals whose type could not be inferred.
    pub fn declare_on(&self, ctx: &mut MethodContext) {
        for (slot, ty) in &self.allocated {
            let slot = usize::from(*slot);
            if ctx.locals.len() <= slot {
                ctx.locals.resize(slot + 1, TypeSig::Object);
            }
            ctx.locals[slot] = ty.clone().unwrap_or(TypeSig::Object);
        }
    }
}

impl LocalAllocator for LocalPool {
    fn allocate_local(&mut self, ty: Option<TypeSig>) -> u16 {
        let slot = self.next;
        self.next = self.next.saturating_add(1);
        self.allocated.push((slot, ty));
        slot
    }
}

/// Sequential label allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelPool {
    next: u32,
}

impl LabelPool {
    /// Creates a pool handing out labels from `first`.
    #[must_use]
    pub fn new(first: u32) -> Self {
        Self { next: first }
    }
}

impl LabelAllocator for LabelPool {
    fn allocate_label(&mut self) -> Label {
        let label = Label(self.next);
        self.next = self.next.saturating_add(1);
        label
    }
}

/// Local and label pools of a receiver method, starting past every identifier it uses.
#[derive(Debug, Clone, Default)]
pub struct ReceiverScope {
    /// Fresh local slots
    pub locals: LocalPool,
    /// Fresh labels
    pub labels: LabelPool,
}

impl ReceiverScope {
    /// Creates a scope handing out locals from `first_local` and labels from `first_label`.
    #[must_use]
    pub fn new(first_local: u16, first_label: u32) -> Self {
        Self {
            locals: LocalPool::new(first_local),
            labels: LabelPool::new(first_label),
        }
    }

    /// Creates a scope whose identifiers are disjoint from everything `ctx` declares and
    /// `list` uses.
    #[must_use]
    pub fn for_body(ctx: &MethodContext, list: &[Instruction]) -> Self {
        let declared = u16::try_from(ctx.locals.len()).unwrap_or(u16::MAX);
        let used_local = list
            .iter()
            .filter_map(Instruction::local_index)
            .map(|slot| slot.saturating_add(1))
            .max()
            .unwrap_or(0);

        let used_label = list
            .iter()
            .flat_map(|instr| instr.labels.iter().copied().chain(instr.branch_targets()))
            .map(|label| label.0.saturating_add(1))
            .max()
            .unwrap_or(0);

        Self::new(declared.max(used_local), used_label)
    }
}

/// Memoized identifier mappings for one rebase run.
struct Rebaser<'a, L, B> {
    donor: &'a [Instruction],
    donor_ctx: &'a MethodContext,
    local_allocator: &'a mut L,
    label_allocator: &'a mut B,
    locals: HashMap<u16, u16>,
    labels: HashMap<Label, Label>,
}

impl<L: LocalAllocator, B: LabelAllocator> Rebaser<'_, L, B> {
    fn local(&mut self, slot: u16) -> Result<u16> {
        if let Some(&mapped) = self.locals.get(&slot) {
            return Ok(mapped);
        }

        let ty = self.donor_local_type(slot)?;
        let mapped = self.local_allocator.allocate_local(ty.clone());
        log::debug!(
            "rebased local {slot} -> {mapped} ({})",
            ty.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string)
        );
        self.locals.insert(slot, mapped);
        Ok(mapped)
    }

    fn label(&mut self, label: Label) -> Label {
        *self
            .labels
            .entry(label)
            .or_insert_with(|| self.label_allocator.allocate_label())
    }

    /// Type of the value first stored into `slot`, or the declared type.
    fn donor_local_type(&self, slot: u16) -> Result<Option<TypeSig>> {
        let first_store = self
            .donor
            .iter()
            .position(|instr| instr.is_store_local() && instr.local_index() == Some(slot));

        if let Some(store) = first_store {
            if let Some(ty) = infer_stack_value(self.donor_ctx, self.donor, store, 0)? {
                return Ok(Some(ty));
            }
        }
        Ok(self.donor_ctx.local_type(slot).cloned())
    }

    fn rewrite(&mut self, instruction: &Instruction) -> Result<Instruction> {
        let mut rewritten = match instruction.local_index() {
            Some(slot) => {
                let mapped = self.local(slot)?;
                instruction
                    .with_local(mapped)
                    .unwrap_or_else(|| instruction.clone())
            }
            None => instruction.clone(),
        };

        rewritten.labels = instruction
            .labels
            .iter()
            .map(|&label| self.label(label))
            .collect();

        rewritten.operand = match &instruction.operand {
            Operand::Target(target) => Operand::Target(self.label(*target)),
            Operand::Switch(targets) => {
                Operand::Switch(targets.iter().map(|&target| self.label(target)).collect())
            }
            _ => rewritten.operand,
        };

        Ok(rewritten)
    }
}

/// Rewrites the local slots and labels of `donor` into fresh identifiers of the receiver.
///
/// `donor_ctx` describes the method the fragment was taken from; it types arguments and
/// declared locals while inferring the types of relocated locals. [`ReceiverScope`] provides
/// allocators that avoid every identifier a receiver body already uses.
///
/// # Errors
///
/// Returns [`crate::Error::Unsupported`] if typing a local crosses an instruction without a
/// derivable stack effect.
pub fn rebase(
    donor: &[Instruction],
    donor_ctx: &MethodContext,
    locals: &mut impl LocalAllocator,
    labels: &mut impl LabelAllocator,
) -> Result<Vec<Instruction>> {
    let mut rebaser = Rebaser {
        donor,
        donor_ctx,
        local_allocator: locals,
        label_allocator: labels,
        locals: HashMap::new(),
        labels: HashMap::new(),
    };

    let rebased = donor
        .iter()
        .map(|instruction| rebaser.rewrite(instruction))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "rebased {} instruction(s) from {}: {} local(s), {} label(s)",
        rebased.len(),
        donor_ctx.full_name(),
        rebaser.locals.len(),
        rebaser.labels.len()
    );
    Ok(rebased)
}
