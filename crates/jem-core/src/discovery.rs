use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::callable::ResolvedCallable;

/// One exception type that may escape one call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Discovery<C> {
    /// Dotted binary name, e.g. `java.lang.IndexOutOfBoundsException`.
    pub exception_type: String,
    pub call_site: C,
    pub method: ResolvedCallable,
}

/// Discoveries grouped by exception type.
pub type DiscoveryMap<C> = BTreeMap<String, BTreeSet<Discovery<C>>>;
