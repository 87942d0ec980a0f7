//! Locating ordered matcher sequences inside an instruction list.
//!
//! A search tries each candidate start index in turn and requires every matcher to accept the
//! instruction at its offset. Windows never extend past the end of the list, so a pattern that
//! would only partially fit is not a match. The worst case is `O(n * m)` for a list of length
//! `n` and a pattern of length `m`.

use std::ops::Range;

use crate::{
    assembly::Instruction,
    pattern::matcher::{Capture, Matcher},
};

/// A window `[start, end)` of an instruction list that satisfied a matcher sequence.
///
/// `end - start` always equals the number of matchers in the sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceMatch {
    /// Index of the first matched instruction
    pub start: usize,
    /// Index one past the last matched instruction
    pub end: usize,
    /// Values recorded by capturing matchers, in matcher order
    pub captures: Vec<(String, Capture)>,
}

impl SequenceMatch {
    /// Returns the matched index range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns the number of matched instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the first value captured under `name`.
    #[must_use]
    pub fn capture(&self, name: &str) -> Option<&Capture> {
        self.captures
            .iter()
            .find(|(captured, _)| captured == name)
            .map(|(_, value)| value)
    }
}

/// Checks the window starting at `start`, which must leave room for every matcher.
fn match_at(list: &[Instruction], matchers: &[Matcher], start: usize) -> Option<SequenceMatch> {
    let mut captures = Vec::new();
    for (matcher, instruction) in matchers.iter().zip(&list[start..start + matchers.len()]) {
        let result = matcher.check(instruction);
        if !result.matched {
            return None;
        }
        captures.extend(result.captures);
    }

    Some(SequenceMatch {
        start,
        end: start + matchers.len(),
        captures,
    })
}

/// Finds the lowest-index window at or after `start` where every matcher accepts the
/// instruction at its offset.
///
/// Returns `None` if `matchers` is empty or no such window fits before the end of the list.
///
/// # Examples
///
/// ```rust
/// use cilsplice::assembly::{Instruction, Opcode};
/// use cilsplice::pattern::{find_sequence, Matcher};
///
/// let list = vec![
///     Instruction::load_int(1),
///     Instruction::store_local(0),
///     Instruction::load_local(0),
///     Instruction::ret(),
/// ];
/// let found = find_sequence(&list, &[Matcher::load_local(), Matcher::opcode(Opcode::Ret)], 0)
///     .unwrap();
/// assert_eq!(found.range(), 2..4);
/// ```
#[must_use]
pub fn find_sequence(
    list: &[Instruction],
    matchers: &[Matcher],
    start: usize,
) -> Option<SequenceMatch> {
    if matchers.is_empty() {
        return None;
    }
    let last_start = list.len().checked_sub(matchers.len())?;
    (start..=last_start).find_map(|candidate| match_at(list, matchers, candidate))
}

/// Finds the highest-index window starting strictly before `before`.
///
/// The window itself may extend past `before`. Returns `None` if `matchers` is empty or no
/// such window exists.
#[must_use]
pub fn rfind_sequence(
    list: &[Instruction],
    matchers: &[Matcher],
    before: usize,
) -> Option<SequenceMatch> {
    if matchers.is_empty() || before == 0 {
        return None;
    }
    let last_start = list.len().checked_sub(matchers.len())?;
    let upper = last_start.min(before - 1);
    (0..=upper)
        .rev()
        .find_map(|candidate| match_at(list, matchers, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Opcode;

    fn list() -> Vec<Instruction> {
        vec![
            Instruction::load_argument(0),
            Instruction::ret(),
            Instruction::load_argument(0),
            Instruction::ret(),
        ]
    }

    fn pattern() -> Vec<Matcher> {
        vec![Matcher::load_argument(0), Matcher::opcode(Opcode::Ret)]
    }

    #[test]
    fn finds_lowest_window() {
        let found = find_sequence(&list(), &pattern(), 0).unwrap();
        assert_eq!(found.range(), 0..2);
        assert_eq!(found.len(), 2);

        let next = find_sequence(&list(), &pattern(), 1).unwrap();
        assert_eq!(next.start, 2);
    }

    #[test]
    fn empty_pattern_never_matches() {
        assert!(find_sequence(&list(), &[], 0).is_none());
        assert!(rfind_sequence(&list(), &[], 4).is_none());
    }

    #[test]
    fn short_tail_is_not_a_match() {
        let short = vec![Instruction::load_argument(0)];
        assert!(find_sequence(&short, &pattern(), 0).is_none());
        assert!(find_sequence(&list(), &pattern(), 3).is_none());
        assert!(find_sequence(&list(), &pattern(), 100).is_none());
    }

    #[test]
    fn reverse_search() {
        let found = rfind_sequence(&list(), &pattern(), 4).unwrap();
        assert_eq!(found.start, 2);
        let found = rfind_sequence(&list(), &pattern(), 2).unwrap();
        assert_eq!(found.start, 0);
        assert!(rfind_sequence(&list(), &pattern(), 0).is_none());
    }

    #[test]
    fn captures_in_matcher_order() {
        let matchers = vec![
            Matcher::load_argument(0).capture_operand("arg"),
            Matcher::opcode(Opcode::Ret).capture("exit"),
        ];
        let found = find_sequence(&list(), &matchers, 0).unwrap();
        assert_eq!(found.capture("arg"), Some(&Capture::Argument(0)));
        assert_eq!(
            found.capture("exit").and_then(Capture::as_instruction),
            Some(&Instruction::ret())
        );
        assert!(found.capture("missing").is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::assembly::Opcode;
    use proptest::prelude::*;

    // Filler never contains the planted opcodes, so the only window is the planted one
    const FILLER: [Opcode; 5] = [Opcode::Nop, Opcode::Pop, Opcode::Dup, Opcode::Add, Opcode::Ldnull];

    fn filler_strategy() -> impl Strategy<Value = Vec<Instruction>> {
        prop::collection::vec(
            (0..FILLER.len()).prop_map(|i| Instruction::new(FILLER[i])),
            0..32,
        )
    }

    fn planted() -> Vec<Instruction> {
        vec![
            Instruction::load_local(1),
            Instruction::load_int(7),
            Instruction::new(Opcode::Mul),
        ]
    }

    fn pattern() -> Vec<Matcher> {
        vec![
            Matcher::load_local(),
            Matcher::any_int_constant(),
            Matcher::opcodes(&[Opcode::Mul, Opcode::Div]),
        ]
    }

    proptest! {
        /// The planted window is found at exactly the offset it was planted at.
        #[test]
        fn finds_planted_sequence(prefix in filler_strategy(), suffix in filler_strategy()) {
            let offset = prefix.len();
            let mut list = prefix;
            list.extend(planted());
            list.extend(suffix);

            let found = find_sequence(&list, &pattern(), 0);
            prop_assert_eq!(found.map(|m| m.range()), Some(offset..offset + 3));

            let back = rfind_sequence(&list, &pattern(), list.len());
            prop_assert_eq!(back.map(|m| m.start), Some(offset));
        }

        /// Filler alone never matches.
        #[test]
        fn no_match_without_plant(list in filler_strategy()) {
            prop_assert!(find_sequence(&list, &pattern(), 0).is_none());
        }

        /// Every reported window satisfies each matcher at its offset.
        #[test]
        fn reported_window_satisfies_pattern(prefix in filler_strategy(), start in 0usize..40) {
            let mut list = prefix;
            list.extend(planted());
            if let Some(found) = find_sequence(&list, &pattern(), start) {
                prop_assert!(found.start >= start);
                prop_assert_eq!(found.len(), pattern().len());
                for (matcher, instr) in pattern().iter().zip(&list[found.range()]) {
                    prop_assert!(matcher.matches(instr));
                }
            }
        }
    }
}
