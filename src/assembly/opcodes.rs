//! CIL opcode enumeration and static per-opcode metadata (ECMA-335, Partition III).
//!
//! Every opcode of the instruction set is a variant of the closed [`Opcode`] enumeration. The
//! discriminant is the encoded opcode value: single-byte opcodes carry their byte (e.g.
//! [`Opcode::Call`] = `0x28`), two-byte opcodes carry `0xFE00 | second_byte` (e.g.
//! [`Opcode::Ceq`] = `0xFE01`).
//!
//! The metadata table ([`OpcodeInfo`]) is produced by a `const fn` match, so it is fixed at
//! compile time and never mutated. The stack columns mirror the `Pop*`/`Push*` behaviours of the
//! specification, collapsed to slot counts; `Variable` marks entries whose effect depends on the
//! operand (the call-shaped opcodes and `ret`).
//!
//! # Examples
//!
//! ```rust
//! use cilsplice::assembly::{Opcode, StackCount};
//!
//! let add = Opcode::Add.info();
//! assert_eq!(add.mnemonic, "add");
//! assert_eq!(add.pops, StackCount::Fixed(2));
//! assert_eq!(add.pushes, StackCount::Fixed(1));
//!
//! assert_eq!(Opcode::from_repr(0xFE01), Some(Opcode::Ceq));
//! assert_eq!(Opcode::from_mnemonic("ldloc.s"), Some(Opcode::LdlocS));
//! ```

use std::{collections::HashMap, fmt, sync::OnceLock};

use strum::{EnumCount, EnumIter, FromRepr, IntoEnumIterator};

use crate::assembly::{
    instruction::{FlowType, InstructionCategory, OperandType},
    stack::StackCount,
};

/// Static metadata describing one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Textual mnemonic as written in ILAsm (e.g. `"ldloc.s"`)
    pub mnemonic: &'static str,
    /// Kind of operand the opcode expects
    pub operand: OperandType,
    /// How the opcode affects control flow
    pub flow: FlowType,
    /// Functional grouping of the opcode
    pub category: InstructionCategory,
    /// Evaluation stack slots consumed
    pub pops: StackCount,
    /// Evaluation stack slots produced
    pub pushes: StackCount,
}

const S0: StackCount = StackCount::Fixed(0);
const S1: StackCount = StackCount::Fixed(1);
const S2: StackCount = StackCount::Fixed(2);
const S3: StackCount = StackCount::Fixed(3);
const VAR: StackCount = StackCount::Variable;

macro_rules! define_opcodes {
    ($(
        $name:ident = $value:literal => ($mnemonic:literal, $operand:ident, $flow:ident, $category:ident, $pops:expr, $pushes:expr)
    ),* $(,)?) => {
        /// A CIL opcode.
        ///
        /// The discriminant is the encoded opcode value, see the module documentation.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, FromRepr,
        )]
        #[repr(u16)]
        pub enum Opcode {
            $(
                #[doc = concat!("`", $mnemonic, "`")]
                $name = $value,
            )*
        }

        impl Opcode {
            /// Returns the static table entry for this opcode.
            #[must_use]
            pub const fn info(self) -> OpcodeInfo {
                match self {
                    $(
                        Opcode::$name => OpcodeInfo {
                            mnemonic: $mnemonic,
                            operand: OperandType::$operand,
                            flow: FlowType::$flow,
                            category: InstructionCategory::$category,
                            pops: $pops,
                            pushes: $pushes,
                        },
                    )*
                }
            }
        }
    };
}

define_opcodes! {
    // Misc
    Nop = 0x00 => ("nop", None, Sequential, Misc, S0, S0),
    Break = 0x01 => ("break", None, Sequential, Misc, S0, S0),

    // Load/store argument and local shorthand
    Ldarg0 = 0x02 => ("ldarg.0", None, Sequential, LoadStore, S0, S1),
    Ldarg1 = 0x03 => ("ldarg.1", None, Sequential, LoadStore, S0, S1),
    Ldarg2 = 0x04 => ("ldarg.2", None, Sequential, LoadStore, S0, S1),
    Ldarg3 = 0x05 => ("ldarg.3", None, Sequential, LoadStore, S0, S1),
    Ldloc0 = 0x06 => ("ldloc.0", None, Sequential, LoadStore, S0, S1),
    Ldloc1 = 0x07 => ("ldloc.1", None, Sequential, LoadStore, S0, S1),
    Ldloc2 = 0x08 => ("ldloc.2", None, Sequential, LoadStore, S0, S1),
    Ldloc3 = 0x09 => ("ldloc.3", None, Sequential, LoadStore, S0, S1),
    Stloc0 = 0x0A => ("stloc.0", None, Sequential, LoadStore, S1, S0),
    Stloc1 = 0x0B => ("stloc.1", None, Sequential, LoadStore, S1, S0),
    Stloc2 = 0x0C => ("stloc.2", None, Sequential, LoadStore, S1, S0),
    Stloc3 = 0x0D => ("stloc.3", None, Sequential, LoadStore, S1, S0),

    // Load/store argument and local (short form)
    LdargS = 0x0E => ("ldarg.s", Argument, Sequential, LoadStore, S0, S1),
    LdargaS = 0x0F => ("ldarga.s", Argument, Sequential, LoadStore, S0, S1),
    StargS = 0x10 => ("starg.s", Argument, Sequential, LoadStore, S1, S0),
    LdlocS = 0x11 => ("ldloc.s", Local, Sequential, LoadStore, S0, S1),
    LdlocaS = 0x12 => ("ldloca.s", Local, Sequential, LoadStore, S0, S1),
    StlocS = 0x13 => ("stloc.s", Local, Sequential, LoadStore, S1, S0),

    // Null / constant loaders
    Ldnull = 0x14 => ("ldnull", None, Sequential, LoadStore, S0, S1),
    LdcI4M1 = 0x15 => ("ldc.i4.m1", None, Sequential, LoadStore, S0, S1),
    LdcI4_0 = 0x16 => ("ldc.i4.0", None, Sequential, LoadStore, S0, S1),
    LdcI4_1 = 0x17 => ("ldc.i4.1", None, Sequential, LoadStore, S0, S1),
    LdcI4_2 = 0x18 => ("ldc.i4.2", None, Sequential, LoadStore, S0, S1),
    LdcI4_3 = 0x19 => ("ldc.i4.3", None, Sequential, LoadStore, S0, S1),
    LdcI4_4 = 0x1A => ("ldc.i4.4", None, Sequential, LoadStore, S0, S1),
    LdcI4_5 = 0x1B => ("ldc.i4.5", None, Sequential, LoadStore, S0, S1),
    LdcI4_6 = 0x1C => ("ldc.i4.6", None, Sequential, LoadStore, S0, S1),
    LdcI4_7 = 0x1D => ("ldc.i4.7", None, Sequential, LoadStore, S0, S1),
    LdcI4_8 = 0x1E => ("ldc.i4.8", None, Sequential, LoadStore, S0, S1),
    LdcI4S = 0x1F => ("ldc.i4.s", Int8, Sequential, LoadStore, S0, S1),
    LdcI4 = 0x20 => ("ldc.i4", Int32, Sequential, LoadStore, S0, S1),
    LdcI8 = 0x21 => ("ldc.i8", Int64, Sequential, LoadStore, S0, S1),
    LdcR4 = 0x22 => ("ldc.r4", Float32, Sequential, LoadStore, S0, S1),
    LdcR8 = 0x23 => ("ldc.r8", Float64, Sequential, LoadStore, S0, S1),

    // Stack manipulation
    Dup = 0x25 => ("dup", None, Sequential, Misc, S1, S2),
    Pop = 0x26 => ("pop", None, Sequential, Misc, S1, S0),

    // Call / return
    Jmp = 0x27 => ("jmp", Method, Call, ControlFlow, S0, S0),
    Call = 0x28 => ("call", Method, Call, ControlFlow, VAR, VAR),
    Calli = 0x29 => ("calli", Signature, Call, ControlFlow, VAR, VAR),
    Ret = 0x2A => ("ret", None, Return, ControlFlow, VAR, S0),

    // Branch (short form)
    BrS = 0x2B => ("br.s", Target, UnconditionalBranch, ControlFlow, S0, S0),
    BrfalseS = 0x2C => ("brfalse.s", Target, ConditionalBranch, ControlFlow, S1, S0),
    BrtrueS = 0x2D => ("brtrue.s", Target, ConditionalBranch, ControlFlow, S1, S0),
    BeqS = 0x2E => ("beq.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BgeS = 0x2F => ("bge.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BgtS = 0x30 => ("bgt.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BleS = 0x31 => ("ble.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BltS = 0x32 => ("blt.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BneUnS = 0x33 => ("bne.un.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BgeUnS = 0x34 => ("bge.un.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BgtUnS = 0x35 => ("bgt.un.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BleUnS = 0x36 => ("ble.un.s", Target, ConditionalBranch, ControlFlow, S2, S0),
    BltUnS = 0x37 => ("blt.un.s", Target, ConditionalBranch, ControlFlow, S2, S0),

    // Branch (long form)
    Br = 0x38 => ("br", Target, UnconditionalBranch, ControlFlow, S0, S0),
    Brfalse = 0x39 => ("brfalse", Target, ConditionalBranch, ControlFlow, S1, S0),
    Brtrue = 0x3A => ("brtrue", Target, ConditionalBranch, ControlFlow, S1, S0),
    Beq = 0x3B => ("beq", Target, ConditionalBranch, ControlFlow, S2, S0),
    Bge = 0x3C => ("bge", Target, ConditionalBranch, ControlFlow, S2, S0),
    Bgt = 0x3D => ("bgt", Target, ConditionalBranch, ControlFlow, S2, S0),
    Ble = 0x3E => ("ble", Target, ConditionalBranch, ControlFlow, S2, S0),
    Blt = 0x3F => ("blt", Target, ConditionalBranch, ControlFlow, S2, S0),
    BneUn = 0x40 => ("bne.un", Target, ConditionalBranch, ControlFlow, S2, S0),
    BgeUn = 0x41 => ("bge.un", Target, ConditionalBranch, ControlFlow, S2, S0),
    BgtUn = 0x42 => ("bgt.un", Target, ConditionalBranch, ControlFlow, S2, S0),
    BleUn = 0x43 => ("ble.un", Target, ConditionalBranch, ControlFlow, S2, S0),
    BltUn = 0x44 => ("blt.un", Target, ConditionalBranch, ControlFlow, S2, S0),

    // Switch
    Switch = 0x45 => ("switch", Switch, Switch, ControlFlow, S1, S0),

    // Indirect load (ldind.*)
    LdindI1 = 0x46 => ("ldind.i1", None, Sequential, LoadStore, S1, S1),
    LdindU1 = 0x47 => ("ldind.u1", None, Sequential, LoadStore, S1, S1),
    LdindI2 = 0x48 => ("ldind.i2", None, Sequential, LoadStore, S1, S1),
    LdindU2 = 0x49 => ("ldind.u2", None, Sequential, LoadStore, S1, S1),
    LdindI4 = 0x4A => ("ldind.i4", None, Sequential, LoadStore, S1, S1),
    LdindU4 = 0x4B => ("ldind.u4", None, Sequential, LoadStore, S1, S1),
    LdindI8 = 0x4C => ("ldind.i8", None, Sequential, LoadStore, S1, S1),
    LdindI = 0x4D => ("ldind.i", None, Sequential, LoadStore, S1, S1),
    LdindR4 = 0x4E => ("ldind.r4", None, Sequential, LoadStore, S1, S1),
    LdindR8 = 0x4F => ("ldind.r8", None, Sequential, LoadStore, S1, S1),
    LdindRef = 0x50 => ("ldind.ref", None, Sequential, LoadStore, S1, S1),

    // Indirect store (stind.*)
    StindRef = 0x51 => ("stind.ref", None, Sequential, LoadStore, S2, S0),
    StindI1 = 0x52 => ("stind.i1", None, Sequential, LoadStore, S2, S0),
    StindI2 = 0x53 => ("stind.i2", None, Sequential, LoadStore, S2, S0),
    StindI4 = 0x54 => ("stind.i4", None, Sequential, LoadStore, S2, S0),
    StindI8 = 0x55 => ("stind.i8", None, Sequential, LoadStore, S2, S0),
    StindR4 = 0x56 => ("stind.r4", None, Sequential, LoadStore, S2, S0),
    StindR8 = 0x57 => ("stind.r8", None, Sequential, LoadStore, S2, S0),

    // Arithmetic
    Add = 0x58 => ("add", None, Sequential, Arithmetic, S2, S1),
    Sub = 0x59 => ("sub", None, Sequential, Arithmetic, S2, S1),
    Mul = 0x5A => ("mul", None, Sequential, Arithmetic, S2, S1),
    Div = 0x5B => ("div", None, Sequential, Arithmetic, S2, S1),
    DivUn = 0x5C => ("div.un", None, Sequential, Arithmetic, S2, S1),
    Rem = 0x5D => ("rem", None, Sequential, Arithmetic, S2, S1),
    RemUn = 0x5E => ("rem.un", None, Sequential, Arithmetic, S2, S1),

    // Bitwise / logical
    And = 0x5F => ("and", None, Sequential, BitwiseLogical, S2, S1),
    Or = 0x60 => ("or", None, Sequential, BitwiseLogical, S2, S1),
    Xor = 0x61 => ("xor", None, Sequential, BitwiseLogical, S2, S1),
    Shl = 0x62 => ("shl", None, Sequential, BitwiseLogical, S2, S1),
    Shr = 0x63 => ("shr", None, Sequential, BitwiseLogical, S2, S1),
    ShrUn = 0x64 => ("shr.un", None, Sequential, BitwiseLogical, S2, S1),
    Neg = 0x65 => ("neg", None, Sequential, Arithmetic, S1, S1),
    Not = 0x66 => ("not", None, Sequential, BitwiseLogical, S1, S1),

    // Conversion
    ConvI1 = 0x67 => ("conv.i1", None, Sequential, Conversion, S1, S1),
    ConvI2 = 0x68 => ("conv.i2", None, Sequential, Conversion, S1, S1),
    ConvI4 = 0x69 => ("conv.i4", None, Sequential, Conversion, S1, S1),
    ConvI8 = 0x6A => ("conv.i8", None, Sequential, Conversion, S1, S1),
    ConvR4 = 0x6B => ("conv.r4", None, Sequential, Conversion, S1, S1),
    ConvR8 = 0x6C => ("conv.r8", None, Sequential, Conversion, S1, S1),
    ConvU4 = 0x6D => ("conv.u4", None, Sequential, Conversion, S1, S1),
    ConvU8 = 0x6E => ("conv.u8", None, Sequential, Conversion, S1, S1),

    // Virtual call / object model
    Callvirt = 0x6F => ("callvirt", Method, Call, ControlFlow, VAR, VAR),
    Cpobj = 0x70 => ("cpobj", Type, Sequential, ObjectModel, S2, S0),
    Ldobj = 0x71 => ("ldobj", Type, Sequential, ObjectModel, S1, S1),
    Ldstr = 0x72 => ("ldstr", String, Sequential, ObjectModel, S0, S1),
    Newobj = 0x73 => ("newobj", Method, Call, ObjectModel, VAR, VAR),
    Castclass = 0x74 => ("castclass", Type, Sequential, ObjectModel, S1, S1),
    Isinst = 0x75 => ("isinst", Type, Sequential, ObjectModel, S1, S1),
    ConvRUn = 0x76 => ("conv.r.un", None, Sequential, Conversion, S1, S1),

    // Boxing / unboxing
    Unbox = 0x79 => ("unbox", Type, Sequential, Conversion, S1, S1),

    // Exception
    Throw = 0x7A => ("throw", None, Throw, ControlFlow, S1, S0),

    // Field access
    Ldfld = 0x7B => ("ldfld", Field, Sequential, ObjectModel, S1, S1),
    Ldflda = 0x7C => ("ldflda", Field, Sequential, ObjectModel, S1, S1),
    Stfld = 0x7D => ("stfld", Field, Sequential, ObjectModel, S2, S0),
    Ldsfld = 0x7E => ("ldsfld", Field, Sequential, ObjectModel, S0, S1),
    Ldsflda = 0x7F => ("ldsflda", Field, Sequential, ObjectModel, S0, S1),
    Stsfld = 0x80 => ("stsfld", Field, Sequential, ObjectModel, S1, S0),

    // Object store
    Stobj = 0x81 => ("stobj", Type, Sequential, ObjectModel, S2, S0),

    // Overflow conversion (unsigned source)
    ConvOvfI1Un = 0x82 => ("conv.ovf.i1.un", None, Sequential, Conversion, S1, S1),
    ConvOvfI2Un = 0x83 => ("conv.ovf.i2.un", None, Sequential, Conversion, S1, S1),
    ConvOvfI4Un = 0x84 => ("conv.ovf.i4.un", None, Sequential, Conversion, S1, S1),
    ConvOvfI8Un = 0x85 => ("conv.ovf.i8.un", None, Sequential, Conversion, S1, S1),
    ConvOvfU1Un = 0x86 => ("conv.ovf.u1.un", None, Sequential, Conversion, S1, S1),
    ConvOvfU2Un = 0x87 => ("conv.ovf.u2.un", None, Sequential, Conversion, S1, S1),
    ConvOvfU4Un = 0x88 => ("conv.ovf.u4.un", None, Sequential, Conversion, S1, S1),
    ConvOvfU8Un = 0x89 => ("conv.ovf.u8.un", None, Sequential, Conversion, S1, S1),
    ConvOvfIUn = 0x8A => ("conv.ovf.i.un", None, Sequential, Conversion, S1, S1),
    ConvOvfUUn = 0x8B => ("conv.ovf.u.un", None, Sequential, Conversion, S1, S1),

    // Boxing / arrays
    Box = 0x8C => ("box", Type, Sequential, Conversion, S1, S1),
    Newarr = 0x8D => ("newarr", Type, Sequential, ObjectModel, S1, S1),
    Ldlen = 0x8E => ("ldlen", None, Sequential, ObjectModel, S1, S1),
    Ldelema = 0x8F => ("ldelema", Type, Sequential, ObjectModel, S2, S1),

    // Array element load
    LdelemI1 = 0x90 => ("ldelem.i1", None, Sequential, ObjectModel, S2, S1),
    LdelemU1 = 0x91 => ("ldelem.u1", None, Sequential, ObjectModel, S2, S1),
    LdelemI2 = 0x92 => ("ldelem.i2", None, Sequential, ObjectModel, S2, S1),
    LdelemU2 = 0x93 => ("ldelem.u2", None, Sequential, ObjectModel, S2, S1),
    LdelemI4 = 0x94 => ("ldelem.i4", None, Sequential, ObjectModel, S2, S1),
    LdelemU4 = 0x95 => ("ldelem.u4", None, Sequential, ObjectModel, S2, S1),
    LdelemI8 = 0x96 => ("ldelem.i8", None, Sequential, ObjectModel, S2, S1),
    LdelemI = 0x97 => ("ldelem.i", None, Sequential, ObjectModel, S2, S1),
    LdelemR4 = 0x98 => ("ldelem.r4", None, Sequential, ObjectModel, S2, S1),
    LdelemR8 = 0x99 => ("ldelem.r8", None, Sequential, ObjectModel, S2, S1),
    LdelemRef = 0x9A => ("ldelem.ref", None, Sequential, ObjectModel, S2, S1),

    // Array element store
    StelemI = 0x9B => ("stelem.i", None, Sequential, ObjectModel, S3, S0),
    StelemI1 = 0x9C => ("stelem.i1", None, Sequential, ObjectModel, S3, S0),
    StelemI2 = 0x9D => ("stelem.i2", None, Sequential, ObjectModel, S3, S0),
    StelemI4 = 0x9E => ("stelem.i4", None, Sequential, ObjectModel, S3, S0),
    StelemI8 = 0x9F => ("stelem.i8", None, Sequential, ObjectModel, S3, S0),
    StelemR4 = 0xA0 => ("stelem.r4", None, Sequential, ObjectModel, S3, S0),
    StelemR8 = 0xA1 => ("stelem.r8", None, Sequential, ObjectModel, S3, S0),
    StelemRef = 0xA2 => ("stelem.ref", None, Sequential, ObjectModel, S3, S0),

    // Generic array element access
    Ldelem = 0xA3 => ("ldelem", Type, Sequential, ObjectModel, S2, S1),
    Stelem = 0xA4 => ("stelem", Type, Sequential, ObjectModel, S3, S0),
    UnboxAny = 0xA5 => ("unbox.any", Type, Sequential, Conversion, S1, S1),

    // Overflow conversion (signed source)
    ConvOvfI1 = 0xB3 => ("conv.ovf.i1", None, Sequential, Conversion, S1, S1),
    ConvOvfU1 = 0xB4 => ("conv.ovf.u1", None, Sequential, Conversion, S1, S1),
    ConvOvfI2 = 0xB5 => ("conv.ovf.i2", None, Sequential, Conversion, S1, S1),
    ConvOvfU2 = 0xB6 => ("conv.ovf.u2", None, Sequential, Conversion, S1, S1),
    ConvOvfI4 = 0xB7 => ("conv.ovf.i4", None, Sequential, Conversion, S1, S1),
    ConvOvfU4 = 0xB8 => ("conv.ovf.u4", None, Sequential, Conversion, S1, S1),
    ConvOvfI8 = 0xB9 => ("conv.ovf.i8", None, Sequential, Conversion, S1, S1),
    ConvOvfU8 = 0xBA => ("conv.ovf.u8", None, Sequential, Conversion, S1, S1),

    // Typed reference
    Refanyval = 0xC2 => ("refanyval", Type, Sequential, ObjectModel, S1, S1),
    Ckfinite = 0xC3 => ("ckfinite", None, Sequential, Arithmetic, S1, S1),
    Mkrefany = 0xC6 => ("mkrefany", Type, Sequential, ObjectModel, S1, S1),

    // Token / conversion
    Ldtoken = 0xD0 => ("ldtoken", Token, Sequential, ObjectModel, S0, S1),
    ConvU2 = 0xD1 => ("conv.u2", None, Sequential, Conversion, S1, S1),
    ConvU1 = 0xD2 => ("conv.u1", None, Sequential, Conversion, S1, S1),
    ConvI = 0xD3 => ("conv.i", None, Sequential, Conversion, S1, S1),
    ConvOvfI = 0xD4 => ("conv.ovf.i", None, Sequential, Conversion, S1, S1),
    ConvOvfU = 0xD5 => ("conv.ovf.u", None, Sequential, Conversion, S1, S1),

    // Overflow arithmetic
    AddOvf = 0xD6 => ("add.ovf", None, Sequential, Arithmetic, S2, S1),
    AddOvfUn = 0xD7 => ("add.ovf.un", None, Sequential, Arithmetic, S2, S1),
    MulOvf = 0xD8 => ("mul.ovf", None, Sequential, Arithmetic, S2, S1),
    MulOvfUn = 0xD9 => ("mul.ovf.un", None, Sequential, Arithmetic, S2, S1),
    SubOvf = 0xDA => ("sub.ovf", None, Sequential, Arithmetic, S2, S1),
    SubOvfUn = 0xDB => ("sub.ovf.un", None, Sequential, Arithmetic, S2, S1),

    // Exception handling
    Endfinally = 0xDC => ("endfinally", None, EndFinally, ControlFlow, S0, S0),
    Leave = 0xDD => ("leave", Target, Leave, ControlFlow, S0, S0),
    LeaveS = 0xDE => ("leave.s", Target, Leave, ControlFlow, S0, S0),

    // Indirect store / conversion
    StindI = 0xDF => ("stind.i", None, Sequential, LoadStore, S2, S0),
    ConvU = 0xE0 => ("conv.u", None, Sequential, Conversion, S1, S1),

    // Two-byte opcodes (0xFE prefix)
    Arglist = 0xFE00 => ("arglist", None, Sequential, Misc, S0, S1),
    Ceq = 0xFE01 => ("ceq", None, Sequential, Comparison, S2, S1),
    Cgt = 0xFE02 => ("cgt", None, Sequential, Comparison, S2, S1),
    CgtUn = 0xFE03 => ("cgt.un", None, Sequential, Comparison, S2, S1),
    Clt = 0xFE04 => ("clt", None, Sequential, Comparison, S2, S1),
    CltUn = 0xFE05 => ("clt.un", None, Sequential, Comparison, S2, S1),
    Ldftn = 0xFE06 => ("ldftn", Method, Sequential, ObjectModel, S0, S1),
    Ldvirtftn = 0xFE07 => ("ldvirtftn", Method, Sequential, ObjectModel, S1, S1),
    Ldarg = 0xFE09 => ("ldarg", Argument, Sequential, LoadStore, S0, S1),
    Ldarga = 0xFE0A => ("ldarga", Argument, Sequential, LoadStore, S0, S1),
    Starg = 0xFE0B => ("starg", Argument, Sequential, LoadStore, S1, S0),
    Ldloc = 0xFE0C => ("ldloc", Local, Sequential, LoadStore, S0, S1),
    Ldloca = 0xFE0D => ("ldloca", Local, Sequential, LoadStore, S0, S1),
    Stloc = 0xFE0E => ("stloc", Local, Sequential, LoadStore, S1, S0),
    Localloc = 0xFE0F => ("localloc", None, Sequential, Misc, S1, S1),
    Endfilter = 0xFE11 => ("endfilter", None, EndFinally, ControlFlow, S1, S0),
    Unaligned = 0xFE12 => ("unaligned.", UInt8, Sequential, Prefix, S0, S0),
    Volatile = 0xFE13 => ("volatile.", None, Sequential, Prefix, S0, S0),
    Tail = 0xFE14 => ("tail.", None, Sequential, Prefix, S0, S0),
    Initobj = 0xFE15 => ("initobj", Type, Sequential, ObjectModel, S1, S0),
    Constrained = 0xFE16 => ("constrained.", Type, Sequential, Prefix, S0, S0),
    Cpblk = 0xFE17 => ("cpblk", None, Sequential, Misc, S3, S0),
    Initblk = 0xFE18 => ("initblk", None, Sequential, Misc, S3, S0),
    No = 0xFE19 => ("no.", UInt8, Sequential, Prefix, S0, S0),
    Rethrow = 0xFE1A => ("rethrow", None, Throw, ControlFlow, S0, S0),
    Sizeof = 0xFE1C => ("sizeof", Type, Sequential, ObjectModel, S0, S1),
    Refanytype = 0xFE1D => ("refanytype", None, Sequential, ObjectModel, S1, S1),
    Readonly = 0xFE1E => ("readonly.", None, Sequential, Prefix, S0, S0),
}

/// Reverse lookup table mapping mnemonics to opcodes.
///
/// Built once on first use from [`Opcode::iter`] and never mutated afterwards.
static MNEMONIC_TO_OPCODE: OnceLock<HashMap<&'static str, Opcode>> = OnceLock::new();

fn get_mnemonic_lookup() -> &'static HashMap<&'static str, Opcode> {
    MNEMONIC_TO_OPCODE.get_or_init(|| {
        let mut map = HashMap::with_capacity(Opcode::COUNT);
        for opcode in Opcode::iter() {
            map.insert(opcode.mnemonic(), opcode);
        }
        map
    })
}

impl Opcode {
    /// Returns the ILAsm mnemonic of this opcode.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    /// Returns the encoded opcode value (`0xFE00 | byte` for two-byte opcodes).
    #[must_use]
    pub const fn value(self) -> u16 {
        self as u16
    }

    /// Returns `true` for opcodes encoded with the `0xFE` prefix byte.
    #[must_use]
    pub const fn is_two_byte(self) -> bool {
        (self as u16) >= 0xFE00
    }

    /// Returns the control flow behaviour of this opcode.
    #[must_use]
    pub const fn flow(self) -> FlowType {
        self.info().flow
    }

    /// Returns the operand kind this opcode expects.
    #[must_use]
    pub const fn operand_type(self) -> OperandType {
        self.info().operand
    }

    /// Returns the functional category of this opcode.
    #[must_use]
    pub const fn category(self) -> InstructionCategory {
        self.info().category
    }

    /// Looks up an opcode by its ILAsm mnemonic (e.g. `"brtrue.s"`).
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        get_mnemonic_lookup().get(mnemonic).copied()
    }

    /// Returns `true` for the call-shaped opcodes whose stack effect is derived from a method
    /// signature operand (`call`, `callvirt`, `calli`, `newobj`).
    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(
            self,
            Opcode::Call | Opcode::Callvirt | Opcode::Calli | Opcode::Newobj
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn mnemonics_are_unique() {
        let mut seen = HashSet::new();
        for opcode in Opcode::iter() {
            assert!(
                seen.insert(opcode.mnemonic()),
                "duplicate mnemonic {}",
                opcode.mnemonic()
            );
        }
        assert_eq!(seen.len(), Opcode::COUNT);
    }

    #[test]
    fn reverse_lookup_table_completeness() {
        for opcode in Opcode::iter() {
            assert_eq!(Opcode::from_mnemonic(opcode.mnemonic()), Some(opcode));
        }
        assert_eq!(Opcode::from_mnemonic("not.an.opcode"), None);
    }

    #[test]
    fn repr_roundtrip() {
        for opcode in Opcode::iter() {
            assert_eq!(Opcode::from_repr(opcode.value()), Some(opcode));
        }
        assert_eq!(Opcode::from_repr(0x24), None);
        assert_eq!(Opcode::from_repr(0xFE08), None);
    }

    #[test]
    fn two_byte_encoding() {
        assert!(!Opcode::Ret.is_two_byte());
        assert!(Opcode::Ceq.is_two_byte());
        assert!(Opcode::Arglist.is_two_byte());
        assert_eq!(Opcode::Stloc.value(), 0xFE0E);
    }

    #[test]
    fn variable_entries_are_call_shaped_or_ret() {
        for opcode in Opcode::iter() {
            let info = opcode.info();
            if info.pops == StackCount::Variable || info.pushes == StackCount::Variable {
                assert!(
                    opcode.is_call() || opcode == Opcode::Ret,
                    "{opcode} has a variable stack entry"
                );
            }
        }
    }

    #[test]
    fn display_uses_mnemonic() {
        assert_eq!(Opcode::LdcI4M1.to_string(), "ldc.i4.m1");
        assert_eq!(Opcode::ConvOvfU8Un.to_string(), "conv.ovf.u8.un");
    }
}
