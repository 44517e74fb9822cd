//! Exception discovery for calls into compiled code.
//!
//! - [`extract_exceptions`]: per-method exceptions of one container's classes;
//! - [`JarAnalyzer`]: scans containers and fills the cache;
//! - [`LazyPolymorphAnalyzer`]: unions exceptions over all overrides;
//! - [`CaretAnalyzer`]: turns the calls of a source range into discoveries.

mod caret;
mod error;
mod extract;
mod jar_analyzer;
mod polymorph;

pub use crate::caret::CaretAnalyzer;
pub use crate::error::AnalysisError;
pub use crate::extract::{extract_exceptions, ExtractOptions};
pub use crate::jar_analyzer::JarAnalyzer;
pub use crate::polymorph::{LazyPolymorphAnalyzer, Project};
