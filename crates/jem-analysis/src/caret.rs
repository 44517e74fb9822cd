use std::collections::BTreeSet;
use std::path::Path;

use jem_cache::{ExceptionCache, ExceptionStore};
use jem_classpath::ClasspathEntry;
use jem_core::{Callable, Discovery, DiscoveryMap, FrontEnd, MethodInformation};

use crate::jar_analyzer::JarAnalyzer;
use crate::polymorph::{LazyPolymorphAnalyzer, Project};

/// Maps the calls inside a source range to the exceptions they may throw.
///
/// Owns the resolver state for its project; nothing is shared between
/// analyzers.
#[derive(Debug)]
pub struct CaretAnalyzer<F, S> {
    front_end: F,
    project: Project,
    cache: ExceptionCache<S>,
    jar_analyzer: JarAnalyzer,
    polymorph: LazyPolymorphAnalyzer,
}

impl<F: FrontEnd, S: ExceptionStore> CaretAnalyzer<F, S> {
    pub fn new(
        front_end: F,
        project: Project,
        cache: ExceptionCache<S>,
        jar_analyzer: JarAnalyzer,
    ) -> Self {
        Self {
            front_end,
            project,
            cache,
            jar_analyzer,
            polymorph: LazyPolymorphAnalyzer::new(),
        }
    }

    pub fn cache(&self) -> &ExceptionCache<S> {
        &self.cache
    }

    pub fn jar_analyzer(&self) -> &JarAnalyzer {
        &self.jar_analyzer
    }

    pub fn polymorph(&self) -> &LazyPolymorphAnalyzer {
        &self.polymorph
    }

    /// Forgets the resolver's index and memoized results; the next analysis
    /// re-indexes the project.
    pub fn reset(&mut self) {
        self.polymorph.reset();
    }

    /// Exceptions of every resolvable call to a compiled method whose offset
    /// lies in `[start, end)`, grouped by exception type.
    ///
    /// Never fails: unresolvable calls, source-level targets and unreadable
    /// containers only drop their own contributions.
    pub fn analyze(&mut self, unit: &F::Unit, start: usize, end: usize) -> DiscoveryMap<F::Call> {
        let mut discoveries = DiscoveryMap::new();
        if start >= end {
            return discoveries;
        }

        let calls = self.front_end.extract_calls(unit, start, end);
        if calls.is_empty() {
            return discoveries;
        }
        self.ensure_resolver();

        for call in calls {
            let Some(callable) = self.front_end.resolve_call(&call) else {
                tracing::debug!(target: "jem.analysis", call = ?call, "unresolved call");
                continue;
            };
            let Some(method) = callable.method_identity() else {
                tracing::debug!(target: "jem.analysis", call = ?call, "call target has no owner");
                continue;
            };
            let Some(container) = callable.origin().container() else {
                tracing::debug!(target: "jem.analysis", method = %method, "call target is not compiled");
                continue;
            };

            for exception in self.exceptions_for(&method, Some(container)) {
                discoveries
                    .entry(exception.clone())
                    .or_insert_with(BTreeSet::new)
                    .insert(Discovery {
                        exception_type: exception,
                        call_site: call.clone(),
                        method: callable.clone(),
                    });
            }
        }

        discoveries
    }

    /// Exceptions of `method`: the polymorphic union when the resolver knows
    /// the method, otherwise whatever the cache holds after scanning
    /// `container` for the owner class.
    pub fn exceptions_for(
        &mut self,
        method: &MethodInformation,
        container: Option<&Path>,
    ) -> BTreeSet<String> {
        self.ensure_resolver();
        if let Some(exceptions) = self.polymorph.analyze(method, &self.cache, &self.jar_analyzer) {
            return exceptions;
        }

        if let Some(container) = container {
            if !self.cache.exists(&method.owner) {
                let entry = ClasspathEntry::from_path(container);
                if let Err(err) =
                    self.jar_analyzer
                        .analyze_class(&entry, &method.owner, false, &self.cache)
                {
                    tracing::debug!(
                        target: "jem.analysis",
                        method = %method,
                        error = %err,
                        "fallback analysis failed"
                    );
                }
            }
        }
        self.cache.read(method)
    }

    fn ensure_resolver(&mut self) {
        if !self.polymorph.is_init() {
            self.polymorph.init(&self.project);
        }
    }
}
