//! Configuration for applying patch sets.

/// What to do with a method when one of its patches misses its anchor or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Skip only the offending patch, keep the edits of every other patch.
    #[default]
    SkipPatch,
    /// Restore the unmodified method body and stop patching that method.
    RevertMethod,
}

/// Configuration for [`crate::patch::PatchSet`].
///
/// # Examples
///
/// ```rust
/// use cilsplice::patch::{FailurePolicy, PatchConfig};
///
/// let config = PatchConfig {
///     failure_policy: FailurePolicy::RevertMethod,
///     ..PatchConfig::default()
/// };
/// assert!(config.parallel);
/// ```
#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// Patch independent methods on the rayon thread pool (default: true).
    ///
    /// Each method is still patched sequentially by one thread.
    pub parallel: bool,

    /// Handling of missed anchors and failed patches (default: [`FailurePolicy::SkipPatch`]).
    pub failure_policy: FailurePolicy,

    /// Report missed anchors at warn level (default: true). When disabled they are logged at
    /// debug level, for patches that are expected to miss on some game versions.
    pub warn_on_miss: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            failure_policy: FailurePolicy::SkipPatch,
            warn_on_miss: true,
        }
    }
}
