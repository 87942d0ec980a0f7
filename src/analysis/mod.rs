//! Dataflow analyses over flat instruction lists.
//!
//! Both analyses work on the linear instruction encoding without reconstructing a control flow
//! graph, using the stack effect model to pair producers with consumers.
//!
//! # Key Components
//!
//! - [`infer_pushed_type`] / [`infer_stack_value`] - Best-effort static typing of stack values
//! - [`rebase`] - Relocation of donor fragments with fresh locals and labels
//! - [`ReceiverScope`] - Allocators disjoint from a receiver body's identifiers

mod inference;
mod rebase;

pub use inference::{infer_pushed_type, infer_stack_value};
pub use rebase::{
    rebase, LabelAllocator, LabelPool, LocalAllocator, LocalPool, ReceiverScope,
};
