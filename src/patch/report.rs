//! Outcome reporting for patch runs.

use std::fmt;

/// Result of applying the patches of a set to one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodReport {
    /// `Type::Method` name of the patched method
    pub method: String,
    /// Patches whose edits were kept
    pub applied: Vec<String>,
    /// Patches that did not find their anchor pattern
    pub missed: Vec<String>,
    /// Patches that returned an error, with the error message
    pub failed: Vec<(String, String)>,
    /// Whether the method body was restored to its unmodified state
    pub reverted: bool,
}

impl MethodReport {
    /// Creates an empty report for `method`.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if every applicable patch was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missed.is_empty() && self.failed.is_empty()
    }
}

/// Result of applying a patch set to many methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// One entry per processed method, in input order
    pub methods: Vec<MethodReport>,
}

impl PatchReport {
    /// Returns the total number of applied patches.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.methods.iter().map(|m| m.applied.len()).sum()
    }

    /// Returns `(method, patch)` pairs for every missed anchor.
    pub fn missed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.methods.iter().flat_map(|m| {
            m.missed
                .iter()
                .map(move |patch| (m.method.as_str(), patch.as_str()))
        })
    }

    /// Returns `(method, patch, error)` triples for every failed patch.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.methods.iter().flat_map(|m| {
            m.failed
                .iter()
                .map(move |(patch, err)| (m.method.as_str(), patch.as_str(), err.as_str()))
        })
    }

    /// Returns `true` if no patch missed or failed anywhere.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.methods.iter().all(MethodReport::is_clean)
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missed = self.missed().count();
        let failed = self.failed().count();
        let reverted = self.methods.iter().filter(|m| m.reverted).count();
        write!(
            f,
            "{} method(s): {} applied, {missed} missed, {failed} failed, {reverted} reverted",
            self.methods.len(),
            self.applied_count()
        )
    }
}
