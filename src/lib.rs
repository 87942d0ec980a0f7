// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cilsplice
//!
//! Pattern matching, cursor-based splicing and dataflow type inference over CIL (Common
//! Intermediate Language) instruction streams.
//!
//! `cilsplice` edits the instruction lists of already-compiled .NET methods before they run. It
//! works on the linear instruction encoding handed over by a method interception layer and needs
//! no symbol table beyond a small [`metadata::MethodContext`] describing the patched method.
//!
//! ## Features
//!
//! - **Stack effect model** - Pop/push counts for every ECMA-335 opcode, including calls
//! - **Matcher DSL** - Composable predicates over single instructions with named captures
//! - **Editing cursor** - Seek by pattern or by stack position, insert, replace and remove while
//!   keeping jump targets intact
//! - **Type inference** - Backward dataflow typing of stack values from the instruction stream
//! - **Rebasing** - Relocation of donor fragments with fresh locals and labels
//! - **Patch sets** - Named patches applied across many methods with per-patch failure handling
//!
//! ## Quick Start
//!
//! ```rust
//! use cilsplice::prelude::*;
//!
//! let fov = FieldRef::new(TypeSig::class("CameraRig"), "fieldOfView", TypeSig::F32);
//! let ctx = MethodContext::new(
//!     TypeSig::class("CameraRig"),
//!     "Awake",
//!     MethodSig::new_instance(vec![], TypeSig::Void),
//! );
//!
//! let mut cursor = Cursor::new(vec![
//!     Instruction::load_argument(0),
//!     Instruction::load_float(60.0),
//!     Instruction::store_field(fov.clone(), false),
//!     Instruction::ret(),
//! ]);
//!
//! // Find the store and check what it is being handed
//! cursor.seek_forward(&[Matcher::field(fov.clone())])?;
//! assert_eq!(cursor.infer_stack_type(&ctx, 0)?, Some(TypeSig::F32));
//! assert_eq!(cursor.infer_stack_type(&ctx, 1)?, Some(TypeSig::class("CameraRig")));
//!
//! // Walk back to the constant and widen the field of view
//! cursor
//!     .seek_by_stack_position(0)?
//!     .replace(vec![Instruction::load_float(90.0)])?;
//!
//! assert_eq!(
//!     cursor.release()?,
//!     vec![
//!         Instruction::load_argument(0),
//!         Instruction::load_float(90.0),
//!         Instruction::store_field(fov, false),
//!         Instruction::ret(),
//!     ]
//! );
//! # Ok::<(), cilsplice::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - Opcodes, instructions and the stack effect model
//! - [`metadata`] - Type, member and method descriptors
//! - [`pattern`] - Instruction matchers and sequence search
//! - [`injector`] - The editing [`injector::Cursor`]
//! - [`analysis`] - Type inference and rebasing
//! - [`patch`] - Named patches and patch sets
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! The engine prefers "no match" and "no type" over guessing. Errors are reserved for misuse
//! and model mismatches:
//!
//! ```rust
//! use cilsplice::{injector::Cursor, Error};
//!
//! let mut cursor = Cursor::new(vec![]);
//! cursor.release()?;
//! assert!(matches!(cursor.release(), Err(Error::InvalidCursorState)));
//! # Ok::<(), cilsplice::Error>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a logger.
//! Seeks, removals and rebase decisions are traced at debug level, skipped patches at warn level.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run cursor --release
//! ```
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilsplice::prelude::*;
///
/// let cursor = Cursor::new(vec![Instruction::new(Opcode::Nop), Instruction::ret()]);
/// assert_eq!(cursor.len()?, 2);
/// # Ok::<(), cilsplice::Error>(())
/// ```
pub mod prelude;

/// CIL opcodes, instructions and their stack effects
///
/// # Key Types
///
/// - [`assembly::Opcode`] - Every ECMA-335 opcode with its static table entry
/// - [`assembly::Instruction`] - An opcode with its operand, labels and exception markers
/// - [`assembly::Operand`] - Instruction operands
///
/// # Main Functions
///
/// - [`assembly::pop_count`] / [`assembly::push_count`] - Stack effect of one instruction
/// - [`assembly::stack_producer`] - Backward walk to the producer of a stack slot
pub mod assembly;

/// Self-contained type, field and method descriptors.
pub mod metadata;

/// Matchers over single instructions and search for matcher sequences.
///
/// # Examples
///
/// ```rust
/// use cilsplice::assembly::{Instruction, Opcode};
/// use cilsplice::pattern::{find_sequence, Matcher};
///
/// let list = vec![
///     Instruction::load_local(0),
///     Instruction::load_int(2),
///     Instruction::new(Opcode::Mul),
///     Instruction::store_local(0),
/// ];
///
/// let found = find_sequence(
///     &list,
///     &[Matcher::load_local().capture("value"), Matcher::any_int_constant(), Matcher::opcode(Opcode::Mul)],
///     0,
/// )
/// .unwrap();
/// assert_eq!(found.range(), 0..3);
/// assert!(found.capture("value").is_some());
/// ```
pub mod pattern;

/// The stateful editing cursor.
pub mod injector;

/// Dataflow analyses over flat instruction lists: type inference and rebasing.
pub mod analysis;

/// Named patches applied to many method bodies.
pub mod patch;

/// `cilsplice` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use cilsplice::{assembly::{pop_count, Instruction, Opcode}, Result};
///
/// fn pops(instruction: &Instruction) -> Result<usize> {
///     pop_count(instruction)
/// }
///
/// assert_eq!(pops(&Instruction::new(Opcode::Add))?, 2);
/// # Ok::<(), cilsplice::Error>(())
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `cilsplice` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
