//! CIL instruction representation, operand types and classification metadata.
//!
//! This module defines the editable instruction model the engine operates on. Unlike a decoded
//! byte stream, instructions here carry symbolic operands: jump targets are [`Label`]s attached
//! to other instructions, and member references are self-contained descriptors. This makes an
//! instruction list freely spliceable, positions can shift without invalidating branches.
//!
//! # Key Components
//!
//! - [`Instruction`] - Opcode, operand, attached labels and exception block markers
//! - [`Operand`] - Type-safe operand representation
//! - [`Immediate`] - Immediate literal values
//! - [`Label`] - Symbolic jump target
//! - [`FlowType`] - Control flow behavior classification
//! - [`InstructionCategory`] - Functional instruction grouping
//!
//! # Usage Examples
//!
//! ```rust
//! use cilsplice::assembly::{Instruction, Label, Opcode, Operand};
//!
//! let target = Label(0);
//! let branch = Instruction::branch(Opcode::BrtrueS, target);
//! assert!(branch.is_branch());
//! assert_eq!(branch.branch_targets(), vec![target]);
//!
//! let load = Instruction::load_local(7);
//! assert_eq!(load.opcode, Opcode::LdlocS);
//! assert_eq!(load.local_index(), Some(7));
//! ```

use std::fmt;

use crate::{
    assembly::opcodes::Opcode,
    metadata::{FieldRef, MethodRef, MethodSig, TypeSig},
};

/// Kinds of operands an opcode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer literal
    Int8,
    /// Unsigned 8-bit integer literal (prefix arguments)
    UInt8,
    /// Signed 32-bit integer literal
    Int32,
    /// Signed 64-bit integer literal
    Int64,
    /// 32-bit floating point literal
    Float32,
    /// 64-bit floating point literal
    Float64,
    /// Local variable slot
    Local,
    /// Argument slot
    Argument,
    /// Branch target label
    Target,
    /// Switch jump table
    Switch,
    /// Field descriptor
    Field,
    /// Method descriptor
    Method,
    /// Stand-alone call site signature
    Signature,
    /// Type descriptor
    Type,
    /// String literal
    String,
    /// Type, field or method descriptor (`ldtoken`)
    Token,
}

impl OperandType {
    /// Returns `true` if `operand` has a shape this operand type accepts.
    #[must_use]
    pub fn accepts(&self, operand: &Operand) -> bool {
        match (self, operand) {
            (OperandType::None, Operand::None)
            | (
                OperandType::Int8
                | OperandType::UInt8
                | OperandType::Int32
                | OperandType::Int64
                | OperandType::Float32
                | OperandType::Float64,
                Operand::Immediate(_),
            )
            | (OperandType::Local, Operand::Local(_))
            | (OperandType::Argument, Operand::Argument(_))
            | (OperandType::Target, Operand::Target(_))
            | (OperandType::Switch, Operand::Switch(_))
            | (OperandType::Field | OperandType::Token, Operand::Field(_))
            | (OperandType::Method | OperandType::Token, Operand::Method(_))
            | (OperandType::Type | OperandType::Token, Operand::Type(_))
            | (OperandType::Signature, Operand::Signature(_))
            | (OperandType::String, Operand::String(_)) => true,
            _ => false,
        }
    }
}

/// Represents an immediate value type embedded in CIL instructions.
///
/// # Examples
///
/// ```rust
/// use cilsplice::assembly::Immediate;
///
/// assert_eq!(Immediate::Int8(-1).as_i64(), Some(-1));
/// assert_eq!(Immediate::Float32(0.5).as_f64(), Some(0.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Unsigned 8-bit immediate value
    UInt8(u8),
    /// Signed 16-bit immediate value
    Int16(i16),
    /// Unsigned 16-bit immediate value
    UInt16(u16),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Unsigned 32-bit immediate value
    UInt32(u32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// Unsigned 64-bit immediate value
    UInt64(u64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

impl Immediate {
    /// Returns the value as a signed 64-bit integer, for integral immediates.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Immediate::Int8(v) => Some(i64::from(v)),
            Immediate::UInt8(v) => Some(i64::from(v)),
            Immediate::Int16(v) => Some(i64::from(v)),
            Immediate::UInt16(v) => Some(i64::from(v)),
            Immediate::Int32(v) => Some(i64::from(v)),
            Immediate::UInt32(v) => Some(i64::from(v)),
            Immediate::Int64(v) => Some(v),
            // Reinterpret u64 bits as i64 (CIL semantics)
            Immediate::UInt64(v) => Some(i64::from_ne_bytes(v.to_ne_bytes())),
            Immediate::Float32(_) | Immediate::Float64(_) => None,
        }
    }

    /// Returns the value as a 64-bit float, for floating point immediates.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Immediate::Float32(v) => Some(f64::from(v)),
            Immediate::Float64(v) => Some(v),
            _ => None,
        }
    }
}

/// A symbolic jump target.
///
/// A label is defined by attaching it to exactly one instruction of a list
/// ([`Instruction::labels`]) and referenced by branch operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L_{:04}", self.0)
    }
}

/// Kind of an exception region marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionBlockKind {
    /// Start of a protected region
    BeginTry,
    /// Start of a typed catch handler
    BeginCatch,
    /// Start of a filter block
    BeginFilter,
    /// Start of a finally handler
    BeginFinally,
    /// Start of a fault handler
    BeginFault,
    /// End of the current exception region
    End,
}

/// Exception region marker attached to an instruction.
///
/// The engine never interprets these, they are carried along with the instruction they are
/// attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionBlock {
    /// Kind of marker
    pub kind: ExceptionBlockKind,
    /// Caught type for [`ExceptionBlockKind::BeginCatch`]
    pub catch_type: Option<TypeSig>,
}

/// Represents an operand in a structured way.
///
/// # Examples
///
/// ```rust
/// use cilsplice::assembly::{Immediate, Label, Operand};
///
/// assert_eq!(Operand::None.as_string(), None);
/// assert_eq!(Operand::Immediate(Immediate::Int32(42)).as_string(), Some("42".to_string()));
/// assert_eq!(Operand::Target(Label(3)).as_string(), Some("L_0003".to_string()));
/// assert_eq!(Operand::Local(5).as_string(), Some("V_5".to_string()));
/// assert_eq!(Operand::Argument(3).as_string(), Some("A_3".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// Immediate value (constant embedded in instruction)
    Immediate(Immediate),
    /// Branch target
    Target(Label),
    /// Switch table with one target per case
    Switch(Vec<Label>),
    /// Local variable index
    Local(u16),
    /// Method argument index
    Argument(u16),
    /// Field descriptor
    Field(FieldRef),
    /// Method descriptor
    Method(MethodRef),
    /// Stand-alone call site signature (`calli`)
    Signature(MethodSig),
    /// Type descriptor
    Type(TypeSig),
    /// String literal (`ldstr`)
    String(String),
}

impl Operand {
    /// Returns a formatted string representation of the operand.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match self {
            Operand::None => None,
            Operand::Immediate(imm) => Some(match imm {
                Immediate::Float32(v) => v.to_string(),
                Immediate::Float64(v) => v.to_string(),
                other => other.as_i64().unwrap_or_default().to_string(),
            }),
            Operand::Target(label) => Some(label.to_string()),
            Operand::Switch(targets) => Some(format!(
                "({})",
                targets
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Operand::Local(l) => Some(format!("V_{l}")),
            Operand::Argument(a) => Some(format!("A_{a}")),
            Operand::Field(field) => Some(field.to_string()),
            Operand::Method(method) => Some(method.to_string()),
            Operand::Signature(sig) => Some(sig.to_string()),
            Operand::Type(ty) => Some(ty.to_string()),
            Operand::String(s) => Some(format!("{s:?}")),
        }
    }
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Multi-way branch (switch statement)
    Switch,
    /// Exception throwing
    Throw,
    /// End of finally or filter block
    EndFinally,
    /// Leave protected region (try/catch/finally)
    Leave,
}

/// Categorization of instructions by their primary function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionCategory {
    /// Arithmetic operations (add, sub, mul, div, rem, neg)
    Arithmetic,
    /// Bitwise and logical operations (and, or, xor, not, shl, shr)
    BitwiseLogical,
    /// Comparison operations (ceq, cgt, clt)
    Comparison,
    /// Control flow operations (br, switch, ret, call)
    ControlFlow,
    /// Type conversion operations (conv.i4, conv.r8, box, unbox)
    Conversion,
    /// Load and store operations (ldloc, stind, ldarg)
    LoadStore,
    /// Object model operations (newobj, ldfld, castclass)
    ObjectModel,
    /// Prefix instructions (unaligned, volatile, tail)
    Prefix,
    /// Miscellaneous operations (nop, break, dup)
    Misc,
}

/// One instruction of an editable method body.
///
/// Instructions are values: two instructions are equal when their opcode, operand and attached
/// labels are equal. Exception block markers are carried but do not take part in equality.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// The operation
    pub opcode: Opcode,
    /// The operand data for this instruction
    pub operand: Operand,
    /// Labels defined at this instruction (branches elsewhere may target them)
    pub labels: Vec<Label>,
    /// Exception region markers attached to this instruction
    pub blocks: Vec<ExceptionBlock>,
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.opcode == other.opcode && self.operand == other.operand && self.labels == other.labels
    }
}

impl Instruction {
    /// Creates an instruction without operand.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self::with_operand(opcode, Operand::None)
    }

    /// Creates an instruction with the given operand.
    #[must_use]
    pub fn with_operand(opcode: Opcode, operand: Operand) -> Self {
        Self {
            opcode,
            operand,
            labels: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Attaches a label to this instruction.
    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Attaches an exception block marker to this instruction.
    #[must_use]
    pub fn with_block(mut self, block: ExceptionBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// `ldloc` in its shortest form.
    #[must_use]
    pub fn load_local(index: u16) -> Self {
        match index {
            0 => Self::new(Opcode::Ldloc0),
            1 => Self::new(Opcode::Ldloc1),
            2 => Self::new(Opcode::Ldloc2),
            3 => Self::new(Opcode::Ldloc3),
            0..=255 => Self::with_operand(Opcode::LdlocS, Operand::Local(index)),
            _ => Self::with_operand(Opcode::Ldloc, Operand::Local(index)),
        }
    }

    /// `stloc` in its shortest form.
    #[must_use]
    pub fn store_local(index: u16) -> Self {
        match index {
            0 => Self::new(Opcode::Stloc0),
            1 => Self::new(Opcode::Stloc1),
            2 => Self::new(Opcode::Stloc2),
            3 => Self::new(Opcode::Stloc3),
            0..=255 => Self::with_operand(Opcode::StlocS, Operand::Local(index)),
            _ => Self::with_operand(Opcode::Stloc, Operand::Local(index)),
        }
    }

    /// `ldloca` in its shortest form.
    #[must_use]
    pub fn load_local_address(index: u16) -> Self {
        if index <= 255 {
            Self::with_operand(Opcode::LdlocaS, Operand::Local(index))
        } else {
            Self::with_operand(Opcode::Ldloca, Operand::Local(index))
        }
    }

    /// `ldarg` in its shortest form.
    #[must_use]
    pub fn load_argument(index: u16) -> Self {
        match index {
            0 => Self::new(Opcode::Ldarg0),
            1 => Self::new(Opcode::Ldarg1),
            2 => Self::new(Opcode::Ldarg2),
            3 => Self::new(Opcode::Ldarg3),
            0..=255 => Self::with_operand(Opcode::LdargS, Operand::Argument(index)),
            _ => Self::with_operand(Opcode::Ldarg, Operand::Argument(index)),
        }
    }

    /// `ldarga` in its shortest form.
    #[must_use]
    pub fn load_argument_address(index: u16) -> Self {
        if index <= 255 {
            Self::with_operand(Opcode::LdargaS, Operand::Argument(index))
        } else {
            Self::with_operand(Opcode::Ldarga, Operand::Argument(index))
        }
    }

    /// `starg` in its shortest form.
    #[must_use]
    pub fn store_argument(index: u16) -> Self {
        if index <= 255 {
            Self::with_operand(Opcode::StargS, Operand::Argument(index))
        } else {
            Self::with_operand(Opcode::Starg, Operand::Argument(index))
        }
    }

    /// `ldc.i4` in its shortest form.
    #[must_use]
    pub fn load_int(value: i32) -> Self {
        match value {
            -1 => Self::new(Opcode::LdcI4M1),
            0 => Self::new(Opcode::LdcI4_0),
            1 => Self::new(Opcode::LdcI4_1),
            2 => Self::new(Opcode::LdcI4_2),
            3 => Self::new(Opcode::LdcI4_3),
            4 => Self::new(Opcode::LdcI4_4),
            5 => Self::new(Opcode::LdcI4_5),
            6 => Self::new(Opcode::LdcI4_6),
            7 => Self::new(Opcode::LdcI4_7),
            8 => Self::new(Opcode::LdcI4_8),
            _ => match i8::try_from(value) {
                Ok(short) => {
                    Self::with_operand(Opcode::LdcI4S, Operand::Immediate(Immediate::Int8(short)))
                }
                Err(_) => {
                    Self::with_operand(Opcode::LdcI4, Operand::Immediate(Immediate::Int32(value)))
                }
            },
        }
    }

    /// `ldc.i8`.
    #[must_use]
    pub fn load_long(value: i64) -> Self {
        Self::with_operand(Opcode::LdcI8, Operand::Immediate(Immediate::Int64(value)))
    }

    /// `ldc.r4`.
    #[must_use]
    pub fn load_float(value: f32) -> Self {
        Self::with_operand(Opcode::LdcR4, Operand::Immediate(Immediate::Float32(value)))
    }

    /// `ldc.r8`.
    #[must_use]
    pub fn load_double(value: f64) -> Self {
        Self::with_operand(Opcode::LdcR8, Operand::Immediate(Immediate::Float64(value)))
    }

    /// `ldstr`.
    #[must_use]
    pub fn load_string(value: impl Into<String>) -> Self {
        Self::with_operand(Opcode::Ldstr, Operand::String(value.into()))
    }

    /// `call`.
    #[must_use]
    pub fn call(method: MethodRef) -> Self {
        Self::with_operand(Opcode::Call, Operand::Method(method))
    }

    /// `callvirt`.
    #[must_use]
    pub fn call_virtual(method: MethodRef) -> Self {
        Self::with_operand(Opcode::Callvirt, Operand::Method(method))
    }

    /// `newobj`.
    #[must_use]
    pub fn new_object(constructor: MethodRef) -> Self {
        Self::with_operand(Opcode::Newobj, Operand::Method(constructor))
    }

    /// `ldfld`, or `ldsfld` when `is_static`.
    #[must_use]
    pub fn load_field(field: FieldRef, is_static: bool) -> Self {
        let opcode = if is_static {
            Opcode::Ldsfld
        } else {
            Opcode::Ldfld
        };
        Self::with_operand(opcode, Operand::Field(field))
    }

    /// `stfld`, or `stsfld` when `is_static`.
    #[must_use]
    pub fn store_field(field: FieldRef, is_static: bool) -> Self {
        let opcode = if is_static {
            Opcode::Stsfld
        } else {
            Opcode::Stfld
        };
        Self::with_operand(opcode, Operand::Field(field))
    }

    /// A branch instruction (`br`, `brtrue.s`, `leave`, ...) to `target`.
    #[must_use]
    pub fn branch(opcode: Opcode, target: Label) -> Self {
        Self::with_operand(opcode, Operand::Target(target))
    }

    /// `ret`.
    #[must_use]
    pub fn ret() -> Self {
        Self::new(Opcode::Ret)
    }

    /// Returns the mnemonic of the opcode.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic()
    }

    /// Returns the control flow behaviour of the opcode.
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        self.opcode.flow()
    }

    /// Check if this instruction is a branch of any kind.
    ///
    /// Returns `true` for conditional and unconditional branches, `switch`, and `leave`.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.flow_type(),
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Switch
                | FlowType::Leave
        )
    }

    /// Check if this instruction ends a basic block.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.flow_type(),
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Return
                | FlowType::Switch
                | FlowType::Throw
                | FlowType::Leave
                | FlowType::EndFinally
        )
    }

    /// Returns the labels this instruction may jump to.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<Label> {
        match &self.operand {
            Operand::Target(label) => vec![*label],
            Operand::Switch(labels) => labels.clone(),
            _ => Vec::new(),
        }
    }

    /// Returns the local slot read, written or addressed by this instruction.
    #[must_use]
    pub fn local_index(&self) -> Option<u16> {
        match self.opcode {
            Opcode::Ldloc0 | Opcode::Stloc0 => Some(0),
            Opcode::Ldloc1 | Opcode::Stloc1 => Some(1),
            Opcode::Ldloc2 | Opcode::Stloc2 => Some(2),
            Opcode::Ldloc3 | Opcode::Stloc3 => Some(3),
            Opcode::LdlocS
            | Opcode::LdlocaS
            | Opcode::StlocS
            | Opcode::Ldloc
            | Opcode::Ldloca
            | Opcode::Stloc => match self.operand {
                Operand::Local(index) => Some(index),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the argument slot read, written or addressed by this instruction.
    #[must_use]
    pub fn argument_index(&self) -> Option<u16> {
        match self.opcode {
            Opcode::Ldarg0 => Some(0),
            Opcode::Ldarg1 => Some(1),
            Opcode::Ldarg2 => Some(2),
            Opcode::Ldarg3 => Some(3),
            Opcode::LdargS
            | Opcode::LdargaS
            | Opcode::StargS
            | Opcode::Ldarg
            | Opcode::Ldarga
            | Opcode::Starg => match self.operand {
                Operand::Argument(index) => Some(index),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns `true` for `ldloc` and `ldloca` in all their forms.
    #[must_use]
    pub fn is_load_local(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Ldloc0
                | Opcode::Ldloc1
                | Opcode::Ldloc2
                | Opcode::Ldloc3
                | Opcode::LdlocS
                | Opcode::Ldloc
        ) || self.is_load_local_address()
    }

    /// Returns `true` for `ldloca` and `ldloca.s`.
    #[must_use]
    pub fn is_load_local_address(&self) -> bool {
        matches!(self.opcode, Opcode::LdlocaS | Opcode::Ldloca)
    }

    /// Returns `true` for `stloc` in all its forms.
    #[must_use]
    pub fn is_store_local(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Stloc0
                | Opcode::Stloc1
                | Opcode::Stloc2
                | Opcode::Stloc3
                | Opcode::StlocS
                | Opcode::Stloc
        )
    }

    /// Returns `true` for `ldarg` and `ldarga` in all their forms.
    #[must_use]
    pub fn is_load_argument(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Ldarg0
                | Opcode::Ldarg1
                | Opcode::Ldarg2
                | Opcode::Ldarg3
                | Opcode::LdargS
                | Opcode::Ldarg
                | Opcode::LdargaS
                | Opcode::Ldarga
        )
    }

    /// Returns the value pushed by an integer constant load (`ldc.i4.*`, `ldc.i8`).
    #[must_use]
    pub fn int_constant(&self) -> Option<i64> {
        match self.opcode {
            Opcode::LdcI4M1 => Some(-1),
            Opcode::LdcI4_0 => Some(0),
            Opcode::LdcI4_1 => Some(1),
            Opcode::LdcI4_2 => Some(2),
            Opcode::LdcI4_3 => Some(3),
            Opcode::LdcI4_4 => Some(4),
            Opcode::LdcI4_5 => Some(5),
            Opcode::LdcI4_6 => Some(6),
            Opcode::LdcI4_7 => Some(7),
            Opcode::LdcI4_8 => Some(8),
            Opcode::LdcI4S | Opcode::LdcI4 | Opcode::LdcI8 => match &self.operand {
                Operand::Immediate(imm) => imm.as_i64(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the value pushed by a floating point constant load (`ldc.r4`, `ldc.r8`).
    #[must_use]
    pub fn float_constant(&self) -> Option<f64> {
        match (self.opcode, &self.operand) {
            (Opcode::LdcR4 | Opcode::LdcR8, Operand::Immediate(imm)) => imm.as_f64(),
            _ => None,
        }
    }

    /// Returns the field descriptor operand, if any.
    #[must_use]
    pub fn field(&self) -> Option<&FieldRef> {
        match &self.operand {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Returns the method descriptor operand, if any.
    #[must_use]
    pub fn method(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Returns the type descriptor operand, if any.
    #[must_use]
    pub fn type_operand(&self) -> Option<&TypeSig> {
        match &self.operand {
            Operand::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns a copy of this local access re-pointed at slot `index`.
    ///
    /// The access kind (load, store, address) is kept and the shortest encoding for the new slot
    /// is selected. Labels and exception blocks are carried over. Returns `None` if this
    /// instruction does not access a local.
    #[must_use]
    pub fn with_local(&self, index: u16) -> Option<Instruction> {
        self.local_index()?;

        let mut rewritten = if self.is_load_local_address() {
            Instruction::load_local_address(index)
        } else if self.is_store_local() {
            Instruction::store_local(index)
        } else {
            Instruction::load_local(index)
        };
        rewritten.labels.clone_from(&self.labels);
        rewritten.blocks.clone_from(&self.blocks);
        Some(rewritten)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label}: ")?;
        }
        f.write_str(self.mnemonic())?;
        if let Some(operand) = self.operand.as_string() {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MethodSig;

    #[test]
    fn test_immediate_widening() {
        assert_eq!(Immediate::UInt8(255).as_i64(), Some(255));
        assert_eq!(Immediate::Int16(-2).as_i64(), Some(-2));
        assert_eq!(Immediate::UInt64(u64::MAX).as_i64(), Some(-1));
        assert_eq!(Immediate::Float64(1.5).as_i64(), None);
        assert_eq!(Immediate::Float32(42.5).as_f64(), Some(42.5));
        assert_eq!(Immediate::Int32(1).as_f64(), None);
    }

    #[test]
    fn test_shortest_local_forms() {
        assert_eq!(Instruction::load_local(2).opcode, Opcode::Ldloc2);
        assert_eq!(Instruction::load_local(200).opcode, Opcode::LdlocS);
        assert_eq!(Instruction::load_local(300).opcode, Opcode::Ldloc);
        assert_eq!(Instruction::store_local(0).opcode, Opcode::Stloc0);
        assert_eq!(Instruction::store_local(9).opcode, Opcode::StlocS);
        assert_eq!(Instruction::load_local_address(1000).opcode, Opcode::Ldloca);

        for index in [0u16, 3, 4, 255, 256, 4000] {
            assert_eq!(Instruction::load_local(index).local_index(), Some(index));
            assert_eq!(Instruction::store_local(index).local_index(), Some(index));
            assert_eq!(Instruction::load_argument(index).argument_index(), Some(index));
        }
    }

    #[test]
    fn test_int_constant_forms() {
        for value in [-1, 0, 5, 8, 9, -100, 127, 128, 100_000] {
            assert_eq!(Instruction::load_int(value).int_constant(), Some(i64::from(value)));
        }
        assert_eq!(Instruction::load_int(100).opcode, Opcode::LdcI4S);
        assert_eq!(Instruction::load_int(1000).opcode, Opcode::LdcI4);
        assert_eq!(Instruction::load_long(-7).int_constant(), Some(-7));
        assert_eq!(Instruction::load_double(0.5).float_constant(), Some(0.5));
        assert_eq!(Instruction::load_int(1).float_constant(), None);
    }

    #[test]
    fn test_equality_ignores_blocks() {
        let plain = Instruction::ret();
        let marked = Instruction::ret().with_block(ExceptionBlock {
            kind: ExceptionBlockKind::End,
            catch_type: None,
        });
        assert_eq!(plain, marked);
        assert_ne!(plain, Instruction::ret().with_label(Label(1)));
    }

    #[test]
    fn test_with_local_keeps_kind_and_labels() {
        let store = Instruction::store_local(1).with_label(Label(4));
        let moved = store.with_local(12).unwrap();
        assert_eq!(moved.opcode, Opcode::StlocS);
        assert_eq!(moved.local_index(), Some(12));
        assert_eq!(moved.labels, vec![Label(4)]);

        let address = Instruction::load_local_address(0).with_local(2).unwrap();
        assert!(address.is_load_local_address());

        assert!(Instruction::ret().with_local(3).is_none());
    }

    #[test]
    fn test_branch_classification() {
        let switch = Instruction::with_operand(
            Opcode::Switch,
            Operand::Switch(vec![Label(1), Label(2)]),
        );
        assert!(switch.is_branch());
        assert_eq!(switch.branch_targets(), vec![Label(1), Label(2)]);
        assert!(Instruction::branch(Opcode::LeaveS, Label(0)).is_branch());
        assert!(!Instruction::ret().is_branch());
        assert!(Instruction::ret().is_terminal());
    }

    #[test]
    fn test_operand_type_accepts() {
        let method = MethodRef::new(
            TypeSig::Object,
            "ToString",
            MethodSig::new_instance(vec![], TypeSig::String),
        );
        assert!(OperandType::Method.accepts(&Operand::Method(method.clone())));
        assert!(OperandType::Token.accepts(&Operand::Method(method)));
        assert!(OperandType::Int8.accepts(&Operand::Immediate(Immediate::Int8(1))));
        assert!(!OperandType::Local.accepts(&Operand::Argument(1)));
        assert!(OperandType::None.accepts(&Operand::None));
    }

    #[test]
    fn test_display() {
        let instr = Instruction::load_local(5).with_label(Label(12));
        assert_eq!(instr.to_string(), "L_0012: ldloc.s V_5");
        assert_eq!(Instruction::load_string("hi").to_string(), "ldstr \"hi\"");
    }
}
