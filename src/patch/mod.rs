//! Named patches applied across many method bodies.
//!
//! A [`Patch`] pairs a method filter with a transform that drives a [`crate::injector::Cursor`].
//! A [`PatchSet`] applies its patches to every body it is given and collects a
//! [`PatchReport`] instead of aborting on the first missed anchor or failed transform.
//!
//! # Key Components
//!
//! - [`Patch`] / [`PatchOutcome`] - One named edit and its result
//! - [`PatchSet`] - Ordered patches plus [`PatchConfig`]
//! - [`MethodReport`] / [`PatchReport`] - Per-method and aggregate outcomes
//!
//! # Thread Safety
//!
//! Transforms are `Send + Sync`. With [`PatchConfig::parallel`] set, independent method bodies
//! are patched concurrently on the rayon pool; a single body is only ever touched by one thread.

mod config;
mod report;
mod set;

pub use config::{FailurePolicy, PatchConfig};
pub use report::{MethodReport, PatchReport};
pub use set::{Patch, PatchOutcome, PatchSet, PatchTransform};
