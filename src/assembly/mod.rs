//! CIL instruction model and stack effect accounting.
//!
//! This module provides the editable instruction representation the rest of the engine works
//! on, together with the static opcode table and the stack effect model derived from it.
//!
//! # Key Types
//! - [`Instruction`] - One instruction of an editable method body
//! - [`Opcode`] - Closed enumeration of every CIL opcode
//! - [`Operand`] - Instruction operands (immediates, slots, labels, descriptors)
//! - [`Label`] - Symbolic jump target
//! - [`StackCount`] - Fixed or operand dependent stack slot count
//!
//! # Main Functions
//! - [`pop_count`] - Stack slots consumed by an instruction
//! - [`push_count`] - Stack slots produced by an instruction
//! - [`stack_producer`] - Instruction that produced a given stack slot
//!
//! # Example
//! ```rust
//! use cilsplice::assembly::{pop_count, push_count, Instruction, Opcode};
//!
//! let add = Instruction::new(Opcode::Add);
//! assert_eq!(pop_count(&add)?, 2);
//! assert_eq!(push_count(&add)?, 1);
//! # Ok::<(), cilsplice::Error>(())
//! ```

mod instruction;
mod opcodes;
mod stack;

pub use instruction::{
    ExceptionBlock, ExceptionBlockKind, FlowType, Immediate, Instruction, InstructionCategory,
    Label, Operand, OperandType,
};
pub use opcodes::{Opcode, OpcodeInfo};
pub use stack::{net_effect, pop_count, push_count, stack_producer, StackCount};
