//! Instruction pattern DSL.
//!
//! Composable single-instruction [`Matcher`]s plus the search routines that locate an ordered
//! sequence of them inside an instruction list.
//!
//! # Key Types
//! - [`Matcher`] - Predicate over one instruction, composable and optionally capturing
//! - [`InstructionMatcher`] - Trait for custom matchers
//! - [`SequenceMatch`] - Matched window plus captured values
//!
//! # Main Functions
//! - [`find_sequence`] - First window at or after an index
//! - [`rfind_sequence`] - Last window starting before an index

mod matcher;
mod sequence;

pub use matcher::{Capture, InstructionMatcher, InstructionPredicate, MatchResult, Matcher};
pub use sequence::{find_sequence, rfind_sequence, SequenceMatch};
