//! Single-instruction matchers and their composition.
//!
//! A [`Matcher`] is a predicate over one [`Instruction`]. Matchers are immutable values: a
//! successful check reports what it captured through [`MatchResult`] instead of writing into
//! shared state, so the same matcher can be reused across searches on different threads.
//!
//! # Available Matchers
//!
//! | Constructor | Matches |
//! |-------------|---------|
//! | [`Matcher::any`] | every instruction |
//! | [`Matcher::opcode`] / [`Matcher::opcodes`] | an exact opcode or one of a set |
//! | [`Matcher::operand`] | opcode and operand equality |
//! | [`Matcher::load_local`] / [`Matcher::load_local_index`] | `ldloc`/`ldloca` in any form |
//! | [`Matcher::store_local`] / [`Matcher::store_local_index`] | `stloc` in any form |
//! | [`Matcher::load_argument`] | `ldarg`/`ldarga` of a given slot |
//! | [`Matcher::branch`] | any branch, `switch` or `leave` |
//! | [`Matcher::int_constant`] / [`Matcher::any_int_constant`] | integer constant loads |
//! | [`Matcher::float_constant`] | floating point constant loads |
//! | [`Matcher::field`] / [`Matcher::field_named`] | field accesses |
//! | [`Matcher::method`] / [`Matcher::call_to`] | method references and calls |
//! | [`Matcher::predicate`] | a user supplied closure |
//!
//! Matchers combine with `!` (negation), [`Matcher::or`] and the capture decorators
//! [`Matcher::capture`] and [`Matcher::capture_operand`].
//!
//! # Examples
//!
//! ```rust
//! use cilsplice::assembly::{Instruction, Opcode};
//! use cilsplice::pattern::{Capture, Matcher};
//!
//! let matcher = Matcher::load_local().capture_operand("slot");
//! let result = matcher.check(&Instruction::load_local(4));
//! assert!(result.matched);
//! assert_eq!(result.captures, vec![("slot".to_string(), Capture::Local(4))]);
//!
//! let not_ret = !Matcher::opcode(Opcode::Ret);
//! assert!(!not_ret.check(&Instruction::ret()).matched);
//! ```

use std::{fmt, ops, sync::Arc};

use crate::{
    assembly::{Instruction, Label, Opcode, Operand},
    metadata::{FieldRef, MethodRef, TypeSig},
};

/// Type alias for user supplied instruction predicates.
pub type InstructionPredicate = dyn Fn(&Instruction) -> bool + Send + Sync;

/// A value recorded by a capturing matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// The whole matched instruction
    Instruction(Instruction),
    /// An operand that has no more specific decoding
    Operand(Operand),
    /// Local slot, including the slot implied by macro forms such as `ldloc.2`
    Local(u16),
    /// Argument slot, including the slot implied by macro forms such as `ldarg.1`
    Argument(u16),
    /// Field descriptor
    Field(FieldRef),
    /// Method descriptor
    Method(MethodRef),
    /// Branch target
    Label(Label),
}

impl Capture {
    /// Decodes the operand of `instruction` into its most specific capture.
    #[must_use]
    pub fn operand_of(instruction: &Instruction) -> Capture {
        if let Some(index) = instruction.local_index() {
            return Capture::Local(index);
        }
        if let Some(index) = instruction.argument_index() {
            return Capture::Argument(index);
        }
        match &instruction.operand {
            Operand::Field(field) => Capture::Field(field.clone()),
            Operand::Method(method) => Capture::Method(method.clone()),
            Operand::Target(label) => Capture::Label(*label),
            other => Capture::Operand(other.clone()),
        }
    }

    /// Returns the captured local slot.
    #[must_use]
    pub fn as_local(&self) -> Option<u16> {
        match self {
            Capture::Local(index) => Some(*index),
            _ => None,
        }
    }

    /// Returns the captured instruction.
    #[must_use]
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Capture::Instruction(instr) => Some(instr),
            _ => None,
        }
    }
}

/// Outcome of checking one instruction against a matcher.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchResult {
    /// Whether the instruction satisfied the matcher
    pub matched: bool,
    /// Named values recorded by capturing matchers, empty unless `matched`
    pub captures: Vec<(String, Capture)>,
}

impl MatchResult {
    /// A successful match without captures.
    #[must_use]
    pub fn hit() -> Self {
        Self {
            matched: true,
            captures: Vec::new(),
        }
    }

    /// A failed match.
    #[must_use]
    pub fn miss() -> Self {
        Self::default()
    }

    fn from_bool(matched: bool) -> Self {
        if matched {
            Self::hit()
        } else {
            Self::miss()
        }
    }
}

/// Trait for implementing instruction matchers.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use cilsplice::assembly::Instruction;
/// use cilsplice::pattern::{InstructionMatcher, MatchResult, Matcher};
///
/// struct Terminal;
///
/// impl InstructionMatcher for Terminal {
///     fn check(&self, instruction: &Instruction) -> MatchResult {
///         if instruction.is_terminal() {
///             MatchResult::hit()
///         } else {
///             MatchResult::miss()
///         }
///     }
///
///     fn description(&self) -> String {
///         "terminal".to_string()
///     }
/// }
///
/// let matcher = Matcher::new(Terminal);
/// assert!(matcher.check(&Instruction::ret()).matched);
/// ```
///
/// # Thread Safety
///
/// Matchers must be `Send + Sync` so that patch sets can be applied in parallel.
pub trait InstructionMatcher: Send + Sync {
    /// Checks `instruction` against this matcher.
    fn check(&self, instruction: &Instruction) -> MatchResult;

    /// Returns a short description of this matcher for diagnostics.
    fn description(&self) -> String;
}

/// Cheaply clonable handle to an [`InstructionMatcher`].
#[derive(Clone)]
pub struct Matcher(Arc<dyn InstructionMatcher>);

impl Matcher {
    /// Wraps a custom matcher implementation.
    #[must_use]
    pub fn new(matcher: impl InstructionMatcher + 'static) -> Self {
        Matcher(Arc::new(matcher))
    }

    /// Checks `instruction` against this matcher.
    #[must_use]
    pub fn check(&self, instruction: &Instruction) -> MatchResult {
        self.0.check(instruction)
    }

    /// Returns `true` if `instruction` satisfies this matcher.
    #[must_use]
    pub fn matches(&self, instruction: &Instruction) -> bool {
        self.0.check(instruction).matched
    }

    /// Returns the description of this matcher.
    #[must_use]
    pub fn description(&self) -> String {
        self.0.description()
    }

    /// Matches every instruction.
    #[must_use]
    pub fn any() -> Self {
        Self::predicate("any", |_| true)
    }

    /// Matches an exact opcode.
    #[must_use]
    pub fn opcode(opcode: Opcode) -> Self {
        Self::new(OpcodeMatcher {
            opcodes: vec![opcode],
        })
    }

    /// Matches any opcode of the given set.
    #[must_use]
    pub fn opcodes(opcodes: &[Opcode]) -> Self {
        Self::new(OpcodeMatcher {
            opcodes: opcodes.to_vec(),
        })
    }

    /// Matches an exact opcode together with an exact operand.
    #[must_use]
    pub fn operand(opcode: Opcode, operand: Operand) -> Self {
        Self::new(OperandMatcher { opcode, operand })
    }

    /// Matches a load (`ldloc`, `ldloca`) of any local.
    #[must_use]
    pub fn load_local() -> Self {
        Self::predicate("ldloc *", Instruction::is_load_local)
    }

    /// Matches a load (`ldloc`, `ldloca`) of local slot `index` in any encoding form.
    #[must_use]
    pub fn load_local_index(index: u16) -> Self {
        Self::predicate(format!("ldloc {index}"), move |instr| {
            instr.is_load_local() && instr.local_index() == Some(index)
        })
    }

    /// Matches a store to any local.
    #[must_use]
    pub fn store_local() -> Self {
        Self::predicate("stloc *", Instruction::is_store_local)
    }

    /// Matches a store to local slot `index` in any encoding form.
    #[must_use]
    pub fn store_local_index(index: u16) -> Self {
        Self::predicate(format!("stloc {index}"), move |instr| {
            instr.is_store_local() && instr.local_index() == Some(index)
        })
    }

    /// Matches a load (`ldarg`, `ldarga`) of argument slot `index` in any encoding form.
    #[must_use]
    pub fn load_argument(index: u16) -> Self {
        Self::predicate(format!("ldarg {index}"), move |instr| {
            instr.is_load_argument() && instr.argument_index() == Some(index)
        })
    }

    /// Matches any branch, including `switch` and `leave`.
    #[must_use]
    pub fn branch() -> Self {
        Self::predicate("branch", Instruction::is_branch)
    }

    /// Matches an integer constant load pushing `value`.
    #[must_use]
    pub fn int_constant(value: i64) -> Self {
        Self::predicate(format!("ldc.i {value}"), move |instr| {
            instr.int_constant() == Some(value)
        })
    }

    /// Matches any integer constant load.
    #[must_use]
    pub fn any_int_constant() -> Self {
        Self::predicate("ldc.i *", |instr| instr.int_constant().is_some())
    }

    /// Matches a floating point constant load pushing `value`.
    #[must_use]
    pub fn float_constant(value: f64) -> Self {
        Self::predicate(format!("ldc.r {value}"), move |instr| {
            instr.float_constant() == Some(value)
        })
    }

    /// Matches any instruction whose operand is `field`.
    #[must_use]
    pub fn field(field: FieldRef) -> Self {
        Self::predicate(format!("field {field}"), move |instr| {
            instr.field() == Some(&field)
        })
    }

    /// Matches any instruction accessing a field called `name`.
    #[must_use]
    pub fn field_named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::predicate(format!("field *::{name}"), move |instr| {
            instr.field().is_some_and(|field| field.name == name)
        })
    }

    /// Matches any instruction whose operand is `method`.
    #[must_use]
    pub fn method(method: MethodRef) -> Self {
        Self::predicate(format!("method {method}"), move |instr| {
            instr.method() == Some(&method)
        })
    }

    /// Matches a `call` or `callvirt` to a method named `method` declared by `type_name`.
    #[must_use]
    pub fn call_to(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let method = method.into();
        Self::predicate(format!("call {type_name}::{method}"), move |instr| {
            matches!(instr.opcode, Opcode::Call | Opcode::Callvirt)
                && instr.method().is_some_and(|target| {
                    target.name == method && type_name_of(&target.declaring_type) == type_name
                })
        })
    }

    /// Matches instructions accepted by `predicate`.
    #[must_use]
    pub fn predicate(
        description: impl Into<String>,
        predicate: impl Fn(&Instruction) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(PredicateMatcher {
            description: description.into(),
            predicate: Box::new(predicate),
        })
    }

    /// Matches instructions satisfying this matcher or `other`.
    ///
    /// Captures come from whichever side matched first.
    #[must_use]
    pub fn or(self, other: Matcher) -> Self {
        Self::new(OrMatcher {
            left: self,
            right: other,
        })
    }

    /// Records the whole matched instruction under `name`.
    #[must_use]
    pub fn capture(self, name: impl Into<String>) -> Self {
        Self::new(CaptureMatcher {
            inner: self,
            name: name.into(),
            operand_only: false,
        })
    }

    /// Records the decoded operand of the matched instruction under `name`.
    ///
    /// See [`Capture::operand_of`] for the decoding rules.
    #[must_use]
    pub fn capture_operand(self, name: impl Into<String>) -> Self {
        Self::new(CaptureMatcher {
            inner: self,
            name: name.into(),
            operand_only: true,
        })
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.description())
    }
}

impl ops::Not for Matcher {
    type Output = Matcher;

    fn not(self) -> Matcher {
        Matcher::new(NotMatcher { inner: self })
    }
}

impl ops::BitOr for Matcher {
    type Output = Matcher;

    fn bitor(self, rhs: Matcher) -> Matcher {
        self.or(rhs)
    }
}

impl From<Opcode> for Matcher {
    fn from(opcode: Opcode) -> Self {
        Matcher::opcode(opcode)
    }
}

fn type_name_of(ty: &TypeSig) -> String {
    match ty {
        TypeSig::Class(name) | TypeSig::ValueType(name) => name.clone(),
        other => other.to_string(),
    }
}

struct OpcodeMatcher {
    opcodes: Vec<Opcode>,
}

impl InstructionMatcher for OpcodeMatcher {
    fn check(&self, instruction: &Instruction) -> MatchResult {
        MatchResult::from_bool(self.opcodes.contains(&instruction.opcode))
    }

    fn description(&self) -> String {
        self.opcodes
            .iter()
            .map(|op| op.mnemonic())
            .collect::<Vec<_>>()
            .join("|")
    }
}

struct OperandMatcher {
    opcode: Opcode,
    operand: Operand,
}

impl InstructionMatcher for OperandMatcher {
    fn check(&self, instruction: &Instruction) -> MatchResult {
        MatchResult::from_bool(
            instruction.opcode == self.opcode && instruction.operand == self.operand,
        )
    }

    fn description(&self) -> String {
        match self.operand.as_string() {
            Some(operand) => format!("{} {operand}", self.opcode),
            None => self.opcode.to_string(),
        }
    }
}

struct PredicateMatcher {
    description: String,
    predicate: Box<InstructionPredicate>,
}

impl InstructionMatcher for PredicateMatcher {
    fn check(&self, instruction: &Instruction) -> MatchResult {
        MatchResult::from_bool((self.predicate)(instruction))
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

struct NotMatcher {
    inner: Matcher,
}

impl InstructionMatcher for NotMatcher {
    fn check(&self, instruction: &Instruction) -> MatchResult {
        // Captures of the negated matcher never surface
        MatchResult::from_bool(!self.inner.matches(instruction))
    }

    fn description(&self) -> String {
        format!("!({})", self.inner.description())
    }
}

struct OrMatcher {
    left: Matcher,
    right: Matcher,
}

impl InstructionMatcher for OrMatcher {
    fn check(&self, instruction: &Instruction) -> MatchResult {
        let left = self.left.check(instruction);
        if left.matched {
            return left;
        }
        self.right.check(instruction)
    }

    fn description(&self) -> String {
        format!("{} | {}", self.left.description(), self.right.description())
    }
}

struct CaptureMatcher {
    inner: Matcher,
    name: String,
    operand_only: bool,
}

impl InstructionMatcher for CaptureMatcher {
    fn check(&self, instruction: &Instruction) -> MatchResult {
        let mut result = self.inner.check(instruction);
        if result.matched {
            let value = if self.operand_only {
                Capture::operand_of(instruction)
            } else {
                Capture::Instruction(instruction.clone())
            };
            result.captures.push((self.name.clone(), value));
        }
        result
    }

    fn description(&self) -> String {
        format!("{} as {}", self.inner.description(), self.name)
    }
}
