//! # cilsplice Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and functions
//! from the cilsplice library. Import this module to get quick access to everything needed to
//! write a patch.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilsplice operations
pub use crate::Error;

/// The result type used throughout cilsplice
pub use crate::Result;

// ================================================================================================
// Instructions
// ================================================================================================

/// Opcodes, instructions and operands
pub use crate::assembly::{
    ExceptionBlock, ExceptionBlockKind, FlowType, Immediate, Instruction, Label, Opcode, Operand,
};

/// Stack effect model
pub use crate::assembly::{pop_count, push_count, stack_producer};

// ================================================================================================
// Type and Member Descriptors
// ================================================================================================

/// Descriptors used as operands and as method identity
pub use crate::metadata::{
    CallingConvention, FieldRef, MethodBody, MethodContext, MethodRef, MethodSig, TypeSig,
};

// ================================================================================================
// Matching and Editing
// ================================================================================================

/// Matcher DSL and sequence search
pub use crate::pattern::{find_sequence, rfind_sequence, Capture, Matcher, SequenceMatch};

/// The editing cursor
pub use crate::injector::Cursor;

// ================================================================================================
// Analysis
// ================================================================================================

/// Type inference and rebasing
pub use crate::analysis::{
    infer_pushed_type, infer_stack_value, rebase, LabelAllocator, LocalAllocator, ReceiverScope,
};

// ================================================================================================
// Patches
// ================================================================================================

/// Named patches and patch sets
pub use crate::patch::{
    FailurePolicy, Patch, PatchConfig, PatchOutcome, PatchReport, PatchSet,
};
