//! The seam between the analysis and the editor integrations that find and
//! resolve call expressions.

use std::fmt;

use crate::callable::ResolvedCallable;

pub mod manifest;

pub use manifest::{CallManifest, ManifestCall, ManifestFrontEnd};

/// Call extraction and type resolution for one source language.
pub trait FrontEnd {
    /// The analyzed unit (file, document, manifest, ...).
    type Unit: ?Sized;
    /// One call expression; ordered so discoveries group deterministically.
    type Call: Clone + Ord + fmt::Debug;

    /// Calls whose offsets fall inside `[start, end)`.
    fn extract_calls(&self, unit: &Self::Unit, start: usize, end: usize) -> Vec<Self::Call>;

    /// The declaration a call targets; `None` when unresolved.
    fn resolve_call(&self, call: &Self::Call) -> Option<ResolvedCallable>;
}
