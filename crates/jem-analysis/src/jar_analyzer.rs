use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use jem_cache::{cache_key, ClassEntries, ExceptionCache, ExceptionStore};
use jem_classfile::ClassFile;
use jem_classpath::{read_classes, ClasspathEntry, InheritanceIndex};
use jem_core::names::{internal_to_binary, qualified_to_binary};

use crate::error::AnalysisError;
use crate::extract::{extract_exceptions, ExtractOptions};

/// Scans class containers and writes the extracted exceptions to the cache.
///
/// Results only ever reach callers through the cache.
#[derive(Debug, Default)]
pub struct JarAnalyzer {
    options: ExtractOptions,
    scans: Cell<usize>,
}

impl JarAnalyzer {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            scans: Cell::new(0),
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Number of container passes run so far.
    pub fn scans(&self) -> usize {
        self.scans.get()
    }

    /// Scans `container` and merges results for every class it defines.
    /// Returns the cache keys written.
    pub fn analyze<S: ExceptionStore>(
        &self,
        container: &ClasspathEntry,
        cache: &ExceptionCache<S>,
    ) -> Result<BTreeSet<String>, AnalysisError> {
        let classes = self.scan(container)?;
        let grouped = self.grouped(&classes);
        let written: BTreeSet<String> = grouped.keys().cloned().collect();
        for (key, entries) in &grouped {
            cache.write(key, entries)?;
        }
        Ok(written)
    }

    /// Scans `container` but only writes the cache key of `class` and, with
    /// `recurse_hierarchy`, the not yet cached keys of its in-container
    /// supertypes and subtypes.
    pub fn analyze_class<S: ExceptionStore>(
        &self,
        container: &ClasspathEntry,
        class: &str,
        recurse_hierarchy: bool,
        cache: &ExceptionCache<S>,
    ) -> Result<BTreeSet<String>, AnalysisError> {
        self.analyze_classes(container, &[class.to_string()], recurse_hierarchy, cache)
    }

    /// Batch form of [`JarAnalyzer::analyze_class`]: one pass over `container`
    /// for all of `classes`.
    pub fn analyze_classes<S: ExceptionStore>(
        &self,
        container: &ClasspathEntry,
        classes: &[String],
        recurse_hierarchy: bool,
        cache: &ExceptionCache<S>,
    ) -> Result<BTreeSet<String>, AnalysisError> {
        let parsed = self.scan(container)?;
        let grouped = self.grouped(&parsed);

        let mut targets: BTreeSet<String> = classes.iter().map(|c| cache_key(c)).collect();
        if recurse_hierarchy {
            let hierarchy = InheritanceIndex::from_classes(&parsed);
            for class in classes {
                let binary = qualified_to_binary(&internal_to_binary(class));
                let related = hierarchy
                    .all_supertypes(&binary)
                    .into_iter()
                    .chain(hierarchy.all_subtypes(&binary));
                for name in related {
                    let key = cache_key(&name);
                    if grouped.contains_key(&key) && !cache.exists(&key) {
                        targets.insert(key);
                    }
                }
            }
        }

        let mut written = BTreeSet::new();
        for key in targets {
            match grouped.get(&key) {
                Some(entries) => {
                    cache.write(&key, entries)?;
                    written.insert(key);
                }
                None => tracing::debug!(
                    target: "jem.analysis",
                    class = %key,
                    container = %container.path().display(),
                    "class not found in container"
                ),
            }
        }
        Ok(written)
    }

    fn scan(&self, container: &ClasspathEntry) -> Result<Vec<ClassFile>, AnalysisError> {
        self.scans.set(self.scans.get() + 1);
        let classes =
            read_classes(container).map_err(|source| AnalysisError::ContainerUnavailable {
                path: container.path().to_path_buf(),
                source,
            })?;
        tracing::debug!(
            target: "jem.analysis",
            container = %container.path().display(),
            classes = classes.len(),
            "scanned container"
        );
        Ok(classes)
    }

    /// Extraction results grouped by cache key. Classes without methods still
    /// get a (possibly empty) group so their key can be marked as analyzed.
    fn grouped(&self, classes: &[ClassFile]) -> BTreeMap<String, ClassEntries> {
        let mut grouped: BTreeMap<String, ClassEntries> = BTreeMap::new();
        for cf in classes {
            grouped
                .entry(cache_key(&internal_to_binary(&cf.this_class)))
                .or_default();
        }
        for (method, exceptions) in extract_exceptions(classes, &self.options) {
            grouped
                .entry(method.cache_key())
                .or_default()
                .insert(method, exceptions);
        }
        grouped
    }
}
