use serde::{Deserialize, Serialize};

use crate::callable::ResolvedCallable;
use crate::frontend::FrontEnd;

/// Calls extracted ahead of time, e.g. by an editor plugin, in JSON form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallManifest {
    #[serde(default)]
    pub calls: Vec<ManifestCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ManifestCall {
    pub offset: usize,
    /// Source text of the call expression.
    #[serde(default)]
    pub text: String,
    /// The resolved declaration; absent when resolution failed.
    #[serde(default)]
    pub target: Option<ResolvedCallable>,
}

impl CallManifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestFrontEnd;

impl FrontEnd for ManifestFrontEnd {
    type Unit = CallManifest;
    type Call = ManifestCall;

    fn extract_calls(&self, unit: &CallManifest, start: usize, end: usize) -> Vec<ManifestCall> {
        unit.calls
            .iter()
            .filter(|call| start <= call.offset && call.offset < end)
            .cloned()
            .collect()
    }

    fn resolve_call(&self, call: &ManifestCall) -> Option<ResolvedCallable> {
        call.target.clone()
    }
}
