//! Named patches and their application to method bodies.

use std::{fmt, sync::Arc};

use rayon::prelude::*;

use crate::{
    injector::Cursor,
    metadata::{MethodBody, MethodContext, TypeSig},
    patch::{
        config::{FailurePolicy, PatchConfig},
        report::{MethodReport, PatchReport},
    },
    Result,
};

/// Type alias for patch transforms.
pub type PatchTransform = dyn Fn(&mut Cursor, &MethodContext) -> Result<PatchOutcome> + Send + Sync;

/// What a patch transform reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The anchor was found and the edits should be kept.
    Applied,
    /// The anchor pattern was not found, any edits are discarded.
    AnchorNotFound,
}

impl PatchOutcome {
    /// [`PatchOutcome::Applied`] if `cursor` still points at an instruction, otherwise
    /// [`PatchOutcome::AnchorNotFound`].
    ///
    /// Convenient as the tail of a transform whose seeks leave the cursor on a sentinel when
    /// the anchor is missing.
    #[must_use]
    pub fn from_cursor(cursor: &Cursor) -> Self {
        if cursor.is_valid() {
            PatchOutcome::Applied
        } else {
            PatchOutcome::AnchorNotFound
        }
    }
}

/// A named edit applied to every method matching its filter.
///
/// # Examples
///
/// ```rust
/// use cilsplice::assembly::{Instruction, Opcode};
/// use cilsplice::metadata::{MethodBody, MethodContext, MethodSig, TypeSig};
/// use cilsplice::patch::{Patch, PatchOutcome};
/// use cilsplice::pattern::Matcher;
///
/// let patch = Patch::new("skip-intro", |cursor, _ctx| {
///     cursor
///         .seek_forward(&[Matcher::opcode(Opcode::Ret)])?
///         .insert_in_place(vec![Instruction::new(Opcode::Nop)])?;
///     Ok(PatchOutcome::from_cursor(cursor))
/// })
/// .target_type("IntroController")
/// .target_method("Start");
///
/// let ctx = MethodContext::new(
///     TypeSig::class("IntroController"),
///     "Start",
///     MethodSig::new_instance(vec![], TypeSig::Void),
/// );
/// assert!(patch.applies_to(&ctx));
///
/// let body = MethodBody::new(ctx, vec![Instruction::ret()]);
/// let (outcome, edited) = patch.run(&body)?;
/// assert_eq!(outcome, PatchOutcome::Applied);
/// assert_eq!(edited.len(), 2);
/// # Ok::<(), cilsplice::Error>(())
/// ```
#[derive(Clone)]
pub struct Patch {
    name: String,
    declaring_type: Option<String>,
    method_name: Option<String>,
    transform: Arc<PatchTransform>,
}

impl Patch {
    /// Creates a patch applying `transform` to every method.
    ///
    /// Use [`Patch::target_type`] and [`Patch::target_method`] to restrict it.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&mut Cursor, &MethodContext) -> Result<PatchOutcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declaring_type: None,
            method_name: None,
            transform: Arc::new(transform),
        }
    }

    /// Restricts the patch to methods declared by the type with full name `name`.
    #[must_use]
    pub fn target_type(mut self, name: impl Into<String>) -> Self {
        self.declaring_type = Some(name.into());
        self
    }

    /// Restricts the patch to methods called `name`.
    #[must_use]
    pub fn target_method(mut self, name: impl Into<String>) -> Self {
        self.method_name = Some(name.into());
        self
    }

    /// Returns the patch name used in logs and reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the method described by `ctx` passes the filter.
    #[must_use]
    pub fn applies_to(&self, ctx: &MethodContext) -> bool {
        let type_matches = self.declaring_type.as_ref().is_none_or(|t| match &ctx.declaring_type {
            TypeSig::Class(name) | TypeSig::ValueType(name) => name == t,
            _ => false,
        });
        let method_matches = self.method_name.as_ref().is_none_or(|m| *m == ctx.name);
        type_matches && method_matches
    }

    /// Runs the transform on a copy of `body`'s instructions.
    ///
    /// Returns the outcome together with the edited instruction list. The body itself is not
    /// modified.
    ///
    /// # Errors
    ///
    /// Propagates errors from the transform, and returns [`crate::Error::InvalidCursorState`]
    /// if the transform released the cursor itself.
    pub fn run(&self, body: &MethodBody) -> Result<(PatchOutcome, Vec<crate::assembly::Instruction>)> {
        let mut cursor = Cursor::new(body.instructions.clone());
        let outcome = (self.transform)(&mut cursor, &body.context)?;
        Ok((outcome, cursor.release()?))
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patch")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("method_name", &self.method_name)
            .finish_non_exhaustive()
    }
}

/// An ordered collection of patches applied together.
///
/// Patches run in registration order, each on its own cursor over the body as left by the
/// previous patches.
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    patches: Vec<Patch>,
    config: PatchConfig,
}

impl PatchSet {
    /// Creates an empty patch set.
    #[must_use]
    pub fn new(config: PatchConfig) -> Self {
        Self {
            patches: Vec::new(),
            config,
        }
    }

    /// Adds a patch.
    pub fn add(&mut self, patch: Patch) -> &mut Self {
        self.patches.push(patch);
        self
    }

    /// Adds a patch, builder style.
    #[must_use]
    pub fn with_patch(mut self, patch: Patch) -> Self {
        self.patches.push(patch);
        self
    }

    /// Returns the registered patches.
    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Applies every patch whose filter accepts `body`.
    ///
    /// Missed anchors and transform errors never abort the run; they are logged with the patch
    /// name and handled per [`PatchConfig::failure_policy`].
    pub fn apply(&self, body: &mut MethodBody) -> MethodReport {
        let method = body.context.full_name();
        let mut report = MethodReport::new(method.clone());
        let original = body.instructions.clone();

        for patch in self.patches.iter().filter(|p| p.applies_to(&body.context)) {
            match patch.run(body) {
                Ok((PatchOutcome::Applied, edited)) => {
                    log::debug!("patch '{}' applied to {method}", patch.name());
                    body.instructions = edited;
                    report.applied.push(patch.name().to_string());
                }
                Ok((PatchOutcome::AnchorNotFound, _)) => {
                    if self.config.warn_on_miss {
                        log::warn!(
                            "patch '{}' could not find its anchor in {method}, skipping",
                            patch.name()
                        );
                    } else {
                        log::debug!("patch '{}' missed its anchor in {method}", patch.name());
                    }
                    report.missed.push(patch.name().to_string());
                }
                Err(err) => {
                    log::warn!("patch '{}' failed on {method}: {err}", patch.name());
                    report.failed.push((patch.name().to_string(), err.to_string()));
                }
            }

            if !report.is_clean() && self.config.failure_policy == FailurePolicy::RevertMethod {
                log::warn!("reverting {method} to its unmodified body");
                body.instructions = original;
                report.applied.clear();
                report.reverted = true;
                break;
            }
        }

        report
    }

    /// Applies the set to every body, in parallel when [`PatchConfig::parallel`] is set.
    pub fn apply_all(&self, bodies: &mut [MethodBody]) -> PatchReport {
        let methods = if self.config.parallel {
            bodies.par_iter_mut().map(|body| self.apply(body)).collect()
        } else {
            bodies.iter_mut().map(|body| self.apply(body)).collect()
        };

        let report = PatchReport { methods };
        log::debug!("patch run finished: {report}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{Instruction, Opcode},
        pattern::Matcher,
        test::method_body as body,
        Error,
    };

    fn nop_before_ret() -> Patch {
        Patch::new("nop-before-ret", |cursor, _| {
            cursor
                .seek_forward(&[Matcher::opcode(Opcode::Ret)])?
                .insert_before_cursor(vec![Instruction::new(Opcode::Nop)])?;
            Ok(PatchOutcome::from_cursor(cursor))
        })
    }

    fn needs_throw() -> Patch {
        Patch::new("needs-throw", |cursor, _| {
            cursor.remove(1)?.seek_forward(&[Matcher::opcode(Opcode::Throw)])?;
            Ok(PatchOutcome::from_cursor(cursor))
        })
    }

    #[test]
    fn filters() {
        let patch = nop_before_ret().target_type("Camera").target_method("Update");
        assert!(patch.applies_to(&body("Camera", "Update", vec![]).context));
        assert!(!patch.applies_to(&body("Camera", "Start", vec![]).context));
        assert!(!patch.applies_to(&body("Player", "Update", vec![]).context));
        assert!(nop_before_ret().applies_to(&body("Any", "Thing", vec![]).context));
    }

    #[test]
    fn skip_patch_keeps_other_edits() {
        let set = PatchSet::new(PatchConfig::default())
            .with_patch(needs_throw())
            .with_patch(nop_before_ret());
        let mut method = body("A", "B", vec![Instruction::load_int(1), Instruction::ret()]);
        let report = set.apply(&mut method);

        assert_eq!(report.applied, vec!["nop-before-ret".to_string()]);
        assert_eq!(report.missed, vec!["needs-throw".to_string()]);
        assert!(!report.reverted);
        // The missed patch's removal was discarded
        assert_eq!(
            method.instructions,
            vec![
                Instruction::load_int(1),
                Instruction::new(Opcode::Nop),
                Instruction::ret()
            ]
        );
    }

    #[test]
    fn revert_method_restores_body() {
        let config = PatchConfig {
            failure_policy: FailurePolicy::RevertMethod,
            ..PatchConfig::default()
        };
        let set = PatchSet::new(config)
            .with_patch(nop_before_ret())
            .with_patch(needs_throw());
        let original = vec![Instruction::ret()];
        let mut method = body("A", "B", original.clone());
        let report = set.apply(&mut method);

        assert!(report.reverted);
        assert!(report.applied.is_empty());
        assert_eq!(method.instructions, original);
    }

    #[test]
    fn errors_are_reported() {
        let failing = Patch::new("boom", |_, _| Err(Error::Error("boom".into())));
        let releasing = Patch::new("releases", |cursor, _| {
            cursor.release()?;
            Ok(PatchOutcome::Applied)
        });
        let mut set = PatchSet::new(PatchConfig::default());
        set.add(failing).add(releasing);

        let mut method = body("A", "B", vec![Instruction::ret()]);
        let report = set.apply(&mut method);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0], ("boom".to_string(), "boom".to_string()));
        assert_eq!(method.instructions, vec![Instruction::ret()]);
    }

    #[test]
    fn apply_all_parallel_and_sequential_agree() {
        let make = || {
            (0..16)
                .map(|i| {
                    let instrs = if i % 2 == 0 {
                        vec![Instruction::ret()]
                    } else {
                        vec![Instruction::new(Opcode::Nop)]
                    };
                    body("T", &format!("M{i}"), instrs)
                })
                .collect::<Vec<_>>()
        };

        let parallel = PatchSet::new(PatchConfig::default()).with_patch(nop_before_ret());
        let sequential = PatchSet::new(PatchConfig {
            parallel: false,
            ..PatchConfig::default()
        })
        .with_patch(nop_before_ret());

        let mut a = make();
        let mut b = make();
        let report_a = parallel.apply_all(&mut a);
        let report_b = sequential.apply_all(&mut b);

        assert_eq!(a, b);
        assert_eq!(report_a, report_b);
        assert_eq!(report_a.applied_count(), 8);
        assert_eq!(report_a.missed().count(), 8);
        assert!(!report_a.is_clean());
        assert_eq!(report_a.methods[1].method, "T::M1");
    }
}
