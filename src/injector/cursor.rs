//! Stateful editing cursor over one method's instruction list.
//!
//! The [`Cursor`] owns the instruction list from construction until [`Cursor::release`] hands it
//! back. Its position ranges over `[-1, len]`; both ends are sentinel positions meaning the
//! cursor ran past the edge of the list (a failed forward seek lands on `len`, a failed backward
//! seek on `-1`).
//!
//! # Sentinel semantics
//!
//! Once the cursor sits on a sentinel, navigation and editing become no-ops that still return
//! `Ok(&mut Self)`, so a chain of calls after a missed anchor leaves the list untouched instead
//! of editing the wrong place. Callers check [`Cursor::is_valid`] before relying on the edits.
//! Two operations are exempt: [`Cursor::release`], and [`Cursor::seek_to`], which restores a
//! position saved earlier with [`Cursor::position`].
//!
//! After release, every operation fails with [`Error::InvalidCursorState`].
//!
//! # Examples
//!
//! ```rust
//! use cilsplice::assembly::{Instruction, Opcode};
//! use cilsplice::injector::Cursor;
//! use cilsplice::metadata::{MethodRef, MethodSig, TypeSig};
//! use cilsplice::pattern::Matcher;
//!
//! let log = MethodRef::new(
//!     TypeSig::class("UnityEngine.Debug"),
//!     "Log",
//!     MethodSig::new_static(vec![TypeSig::Object], TypeSig::Void),
//! );
//!
//! let mut cursor = Cursor::new(vec![Instruction::load_argument(0), Instruction::ret()]);
//! cursor
//!     .seek_forward(&[Matcher::opcode(Opcode::Ret)])?
//!     .insert_in_place(vec![Instruction::call(log.clone())])?;
//!
//! assert_eq!(
//!     cursor.release()?,
//!     vec![Instruction::load_argument(0), Instruction::call(log), Instruction::ret()]
//! );
//! # Ok::<(), cilsplice::Error>(())
//! ```

use crate::{
    analysis::infer_stack_value,
    assembly::{stack_producer, Instruction},
    metadata::{MethodContext, TypeSig},
    pattern::{find_sequence, rfind_sequence, Matcher, SequenceMatch},
    Error, Result,
};

/// An editing position within an owned instruction list.
#[derive(Debug, Clone)]
pub struct Cursor {
    /// `None` once released
    instructions: Option<Vec<Instruction>>,
    /// Current position in `[-1, len]`
    index: isize,
    /// Window of the most recent successful pattern seek
    last_match: Option<SequenceMatch>,
}

impl Cursor {
    /// Creates a cursor at index 0 owning `instructions`.
    ///
    /// On an empty list the cursor immediately sits on the `len` sentinel.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Cursor {
            instructions: Some(instructions),
            index: 0,
            last_match: None,
        }
    }

    fn list(&self) -> Result<&Vec<Instruction>> {
        self.instructions.as_ref().ok_or(Error::InvalidCursorState)
    }

    fn list_mut(&mut self) -> Result<&mut Vec<Instruction>> {
        self.instructions.as_mut().ok_or(Error::InvalidCursorState)
    }

    /// Index of the current instruction, `None` on a sentinel.
    fn slot(&self) -> Result<Option<usize>> {
        let len = self.list()?.len();
        Ok(usize::try_from(self.index).ok().filter(|&i| i < len))
    }

    fn clamp(index: isize, len: usize) -> isize {
        index.clamp(-1, isize::try_from(len).unwrap_or(isize::MAX))
    }

    fn set_index(&mut self, index: usize) {
        self.index = isize::try_from(index).unwrap_or(isize::MAX);
    }

    /// Returns `true` if the cursor is not released and points at an instruction.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self.slot(), Ok(Some(_)))
    }

    /// Returns the current position, which may be a sentinel (`-1` or `len`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn position(&self) -> Result<isize> {
        self.list()?;
        Ok(self.index)
    }

    /// Returns the number of instructions in the list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Returns `true` if the list holds no instructions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.list()?.is_empty())
    }

    /// Returns the instruction list as edited so far.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn instructions(&self) -> Result<&[Instruction]> {
        Ok(self.list()?.as_slice())
    }

    /// Returns the instruction at the cursor, `None` on a sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn current(&self) -> Result<Option<&Instruction>> {
        let slot = self.slot()?;
        Ok(slot.and_then(|i| self.list().ok()?.get(i)))
    }

    /// Returns the instruction at the cursor for in-place modification, `None` on a sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn current_mut(&mut self) -> Result<Option<&mut Instruction>> {
        let slot = self.slot()?;
        let list = self.list_mut()?;
        Ok(slot.and_then(move |i| list.get_mut(i)))
    }

    /// Returns the window matched by the most recent successful pattern seek.
    ///
    /// A failed seek clears it. Indices refer to the list as it was when the seek ran.
    #[must_use]
    pub fn last_match(&self) -> Option<&SequenceMatch> {
        self.last_match.as_ref()
    }

    /// Infers the type of the value `position` slots below the top of the stack just before the
    /// current instruction executes, without moving the cursor.
    ///
    /// Returns `Ok(None)` on a sentinel or when inference gives up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released, and
    /// [`Error::Unsupported`] if an instruction on the way has no derivable stack effect.
    pub fn infer_stack_type(
        &self,
        ctx: &MethodContext,
        position: usize,
    ) -> Result<Option<TypeSig>> {
        match self.slot()? {
            Some(at) => infer_stack_value(ctx, self.list()?, at, position),
            None => Ok(None),
        }
    }

    /// Moves the cursor by `offset`, clamped into `[-1, len]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn seek_relative(&mut self, offset: isize) -> Result<&mut Self> {
        if self.slot()?.is_none() {
            return Ok(self);
        }
        let len = self.list()?.len();
        self.index = Self::clamp(self.index.saturating_add(offset), len);
        Ok(self)
    }

    /// Moves the cursor to the absolute position `index`, clamped into `[-1, len]`.
    ///
    /// Unlike every other navigation operation this also works from a sentinel position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn seek_to(&mut self, index: isize) -> Result<&mut Self> {
        let len = self.list()?.len();
        self.index = Self::clamp(index, len);
        Ok(self)
    }

    fn seek_forward_impl(&mut self, matchers: &[Matcher], to_end: bool) -> Result<&mut Self> {
        let Some(start) = self.slot()? else {
            return Ok(self);
        };

        let list = self.list()?;
        match find_sequence(list, matchers, start) {
            Some(found) => {
                let target = if to_end { found.end } else { found.start };
                log::debug!(
                    "seek forward from {start} matched {:?}, cursor at {target}",
                    found.range()
                );
                self.set_index(target);
                self.last_match = Some(found);
            }
            None => {
                log::debug!(
                    "seek forward from {start} found no match for [{}]",
                    describe(matchers)
                );
                let len = list.len();
                self.set_index(len);
                self.last_match = None;
            }
        }
        Ok(self)
    }

    /// Moves the cursor to the start of the next window matching `matchers`, beginning at the
    /// current instruction.
    ///
    /// Without a match the cursor moves to the `len` sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn seek_forward(&mut self, matchers: &[Matcher]) -> Result<&mut Self> {
        self.seek_forward_impl(matchers, false)
    }

    /// Like [`Cursor::seek_forward`], but leaves the cursor just past the matched window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn seek_forward_to_end(&mut self, matchers: &[Matcher]) -> Result<&mut Self> {
        self.seek_forward_impl(matchers, true)
    }

    /// Moves the cursor to the start of the nearest window matching `matchers` that begins
    /// before the current instruction.
    ///
    /// Without a match the cursor moves to the `-1` sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn seek_backward(&mut self, matchers: &[Matcher]) -> Result<&mut Self> {
        let Some(before) = self.slot()? else {
            return Ok(self);
        };

        match rfind_sequence(self.list()?, matchers, before) {
            Some(found) => {
                log::debug!("seek backward from {before} matched {:?}", found.range());
                self.set_index(found.start);
                self.last_match = Some(found);
            }
            None => {
                log::debug!(
                    "seek backward from {before} found no match for [{}]",
                    describe(matchers)
                );
                self.index = -1;
                self.last_match = None;
            }
        }
        Ok(self)
    }

    /// Moves the cursor to the instruction that produced the value sitting `position` slots
    /// below the top of the stack just before the current instruction executes.
    ///
    /// Position 0 is the top of the stack, i.e. the last argument the current instruction
    /// consumes. If the walk reaches the start of the list the cursor moves to the `-1`
    /// sentinel. See [`crate::assembly::stack_producer`] for the walk itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released, and
    /// [`Error::Unsupported`] if an instruction on the way has no derivable stack effect.
    pub fn seek_by_stack_position(&mut self, position: usize) -> Result<&mut Self> {
        let Some(start) = self.slot()? else {
            return Ok(self);
        };

        match stack_producer(self.list()?, start, position)? {
            Some(producer) => self.set_index(producer),
            None => {
                log::debug!("no producer for stack position {position} before {start}");
                self.index = -1;
            }
        }
        Ok(self)
    }

    /// Inserts `instructions` before the current instruction and moves the cursor past them, so
    /// it keeps pointing at the same instruction as before.
    ///
    /// Labels stay where they are: a branch to the current instruction still bypasses the
    /// inserted block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn insert_before_cursor(&mut self, instructions: Vec<Instruction>) -> Result<&mut Self> {
        let Some(at) = self.slot()? else {
            return Ok(self);
        };
        let count = instructions.len();
        self.list_mut()?.splice(at..at, instructions);
        self.set_index(at + count);
        log::debug!("inserted {count} instruction(s) before {at}");
        Ok(self)
    }

    /// Inserts `instructions` before the current instruction without moving the cursor, so the
    /// cursor now points at the first inserted instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn insert_in_place(&mut self, instructions: Vec<Instruction>) -> Result<&mut Self> {
        let Some(at) = self.slot()? else {
            return Ok(self);
        };
        let count = instructions.len();
        self.list_mut()?.splice(at..at, instructions);
        log::debug!("inserted {count} instruction(s) at {at}");
        Ok(self)
    }

    /// Replaces the current instruction with `instructions`.
    ///
    /// The labels and exception blocks of the replaced instruction move to the first
    /// replacement, so branches into it now land on the replacement block. The cursor stays on
    /// the first replacement. An empty replacement behaves like [`Cursor::remove`] of one
    /// instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn replace(&mut self, mut instructions: Vec<Instruction>) -> Result<&mut Self> {
        let Some(at) = self.slot()? else {
            return Ok(self);
        };
        if instructions.is_empty() {
            return self.remove(1);
        }

        let list = self.list_mut()?;
        let old = list.remove(at);
        let first = &mut instructions[0];
        prepend(&mut first.labels, old.labels);
        prepend(&mut first.blocks, old.blocks);

        let count = instructions.len();
        list.splice(at..at, instructions);
        log::debug!("replaced {} at {at} with {count} instruction(s)", old.opcode);
        Ok(self)
    }

    /// Removes up to `count` instructions starting at the cursor.
    ///
    /// Labels and exception blocks of removed instructions move to the next surviving
    /// instruction, or to the previous one when the removal reaches the end of the list. The
    /// cursor stays at the same index, which now holds the next surviving instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the cursor was released.
    pub fn remove(&mut self, count: usize) -> Result<&mut Self> {
        let Some(at) = self.slot()? else {
            return Ok(self);
        };

        let list = self.list_mut()?;
        let end = at.saturating_add(count).min(list.len());
        let mut labels = Vec::new();
        let mut blocks = Vec::new();
        for removed in list.drain(at..end) {
            labels.extend(removed.labels);
            blocks.extend(removed.blocks);
        }

        let heir = if at < list.len() {
            Some(at)
        } else {
            at.checked_sub(1)
        };
        match heir.and_then(|i| list.get_mut(i)) {
            Some(survivor) => {
                prepend(&mut survivor.labels, labels);
                prepend(&mut survivor.blocks, blocks);
            }
            None if !labels.is_empty() => {
                log::warn!("removed every instruction, dropping {} label(s)", labels.len());
            }
            None => {}
        }

        log::debug!("removed {} instruction(s) at {at}", end - at);
        Ok(self)
    }

    /// Hands the edited instruction list back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursorState`] if the list was already released.
    pub fn release(&mut self) -> Result<Vec<Instruction>> {
        self.last_match = None;
        self.instructions.take().ok_or(Error::InvalidCursorState)
    }
}

fn prepend<T>(target: &mut Vec<T>, mut front: Vec<T>) {
    front.append(target);
    *target = front;
}

fn describe(matchers: &[Matcher]) -> String {
    matchers
        .iter()
        .map(Matcher::description)
        .collect::<Vec<_>>()
        .join(", ")
}
