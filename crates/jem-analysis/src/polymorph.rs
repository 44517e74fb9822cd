//! Exception resolution across virtual dispatch.
//!
//! A call to an overridable method may run any override in the classpath
//! universe, so its exceptions are the union over the base declaration and
//! every override the index can see.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use jem_cache::{cache_key, ExceptionCache, ExceptionStore};
use jem_classpath::{ClassStub, ClasspathEntry, ClasspathIndex};
use jem_core::MethodInformation;

use crate::jar_analyzer::JarAnalyzer;

/// The classpath the resolver indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub classpath: Vec<ClasspathEntry>,
}

impl Project {
    pub fn new(classpath: Vec<ClasspathEntry>) -> Self {
        Self { classpath }
    }
}

/// Session state built on first use.
#[derive(Debug)]
struct ResolverContext {
    index: ClasspathIndex,
    memo: HashMap<MethodInformation, BTreeSet<String>>,
    /// Cache keys known to be present in the cache.
    ensured: HashSet<String>,
    /// Containers already scanned (or found unavailable) this session.
    scanned: HashSet<ClasspathEntry>,
}

#[derive(Debug, Default)]
pub struct LazyPolymorphAnalyzer {
    state: Option<ResolverContext>,
}

impl LazyPolymorphAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_init(&self) -> bool {
        self.state.is_some()
    }

    /// Indexes the project's classpath. Does nothing when already initialized.
    ///
    /// Unreadable entries are left out of the index; the rest still resolve.
    pub fn init(&mut self, project: &Project) {
        if self.state.is_some() {
            return;
        }
        let index = ClasspathIndex::build(&project.classpath);
        tracing::info!(
            target: "jem.analysis",
            entries = project.classpath.len(),
            skipped = index.unavailable().len(),
            classes = index.len(),
            "polymorph resolver initialized"
        );
        self.state = Some(ResolverContext {
            index,
            memo: HashMap::new(),
            ensured: HashSet::new(),
            scanned: HashSet::new(),
        });
    }

    /// Drops the index and all memoized results.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Union of the exceptions of `method` and every override of it.
    ///
    /// `None` when uninitialized or when the owner class or the declaration
    /// is unknown to the index.
    pub fn analyze<S: ExceptionStore>(
        &mut self,
        method: &MethodInformation,
        cache: &ExceptionCache<S>,
        jar_analyzer: &JarAnalyzer,
    ) -> Option<BTreeSet<String>> {
        let ctx = self.state.as_mut()?;
        if let Some(known) = ctx.memo.get(method) {
            return Some(known.clone());
        }

        let targets = ctx.targets(method)?;
        ctx.ensure_cached(&targets, cache, jar_analyzer);

        let mut union = BTreeSet::new();
        for target in &targets {
            union.extend(cache.read(target));
        }
        tracing::debug!(
            target: "jem.analysis",
            method = %method,
            implementations = targets.len(),
            exceptions = union.len(),
            "resolved polymorphic exceptions"
        );
        ctx.memo.insert(method.clone(), union.clone());
        Some(union)
    }
}

impl ResolverContext {
    /// The base declaration plus every reachable override.
    fn targets(&self, method: &MethodInformation) -> Option<BTreeSet<MethodInformation>> {
        let owner = self.index.lookup_binary(&method.owner)?;
        let (declaring, decl) = self.declaration(owner, method)?;

        let mut targets = BTreeSet::new();
        targets.insert(method.with_owner(&declaring.binary_name));

        let overridable = !decl.is_static()
            && !decl.is_private()
            && !decl.is_final()
            && !decl.is_initializer()
            && !owner.is_final();
        if !overridable {
            return Some(targets);
        }

        let hierarchy = self.index.hierarchy();
        let subtypes = hierarchy.all_subtypes(&owner.binary_name);
        let subtree: HashSet<&str> = subtypes
            .iter()
            .map(String::as_str)
            .chain([owner.binary_name.as_str()])
            .collect();

        for sub in &subtypes {
            let Some(stub) = self.index.lookup_binary(sub) else {
                continue;
            };
            if declares_instance_method(stub, method) {
                targets.insert(method.with_owner(sub));
                continue;
            }
            // A superclass outside the subtree may supply the implementation,
            // e.g. `Impl extends Base implements Owner` with `Base.m()`.
            if let Some(inherited) = self.inherited_implementation(stub, method, &subtree) {
                targets.insert(method.with_owner(inherited));
            }
        }

        Some(targets)
    }

    fn declaration<'a>(
        &'a self,
        owner: &'a ClassStub,
        method: &MethodInformation,
    ) -> Option<(&'a ClassStub, &'a jem_classpath::MethodStub)> {
        // Superclasses first, then interfaces, as the JVM resolves methods.
        let mut current = Some(owner);
        while let Some(stub) = current {
            if let Some(decl) = stub.method(&method.name, &method.descriptor) {
                return Some((stub, decl));
            }
            current = stub
                .super_binary_name
                .as_deref()
                .and_then(|name| self.index.lookup_binary(name));
        }
        self.index
            .hierarchy()
            .all_supertypes(&owner.binary_name)
            .iter()
            .filter_map(|name| self.index.lookup_binary(name))
            .find_map(|stub| {
                stub.method(&method.name, &method.descriptor)
                    .map(|decl| (stub, decl))
            })
    }

    fn inherited_implementation<'a>(
        &'a self,
        class: &'a ClassStub,
        method: &MethodInformation,
        subtree: &HashSet<&str>,
    ) -> Option<&'a str> {
        let mut current = class.super_binary_name.as_deref();
        while let Some(name) = current {
            if subtree.contains(name) {
                return None;
            }
            let stub = self.index.lookup_binary(name)?;
            if declares_instance_method(stub, method) {
                return Some(&stub.binary_name);
            }
            current = stub.super_binary_name.as_deref();
        }
        None
    }

    /// Makes sure every target's cache key is present, scanning each
    /// container that holds missing keys at most once per session.
    fn ensure_cached<S: ExceptionStore>(
        &mut self,
        targets: &BTreeSet<MethodInformation>,
        cache: &ExceptionCache<S>,
        jar_analyzer: &JarAnalyzer,
    ) {
        let mut missing: BTreeMap<ClasspathEntry, Vec<String>> = BTreeMap::new();
        for target in targets {
            let key = cache_key(&target.owner);
            if self.ensured.contains(&key) {
                continue;
            }
            if cache.exists(&key) {
                self.ensured.insert(key);
                continue;
            }
            let Some(container) = self.index.container_of(&target.owner) else {
                continue;
            };
            if !self.scanned.contains(container) {
                missing.entry(container.clone()).or_default().push(key);
            }
        }

        for (container, wanted) in missing {
            // One pass per container: write every class from it that the
            // cache lacks, so later lookups never need this container again.
            let mut classes: Vec<String> = self
                .index
                .classes_in(&container)
                .into_iter()
                .map(|name| cache_key(&name))
                .filter(|key| !self.ensured.contains(key))
                .collect();
            classes.dedup();
            classes.retain(|key| wanted.contains(key) || !cache.exists(key));

            self.scanned.insert(container.clone());
            match jar_analyzer.analyze_classes(&container, &classes, false, cache) {
                Ok(written) => self.ensured.extend(written),
                Err(err) => tracing::debug!(
                    target: "jem.analysis",
                    container = %container.path().display(),
                    error = %err,
                    "container analysis failed; treating as no data"
                ),
            }
        }
    }
}

fn declares_instance_method(stub: &ClassStub, method: &MethodInformation) -> bool {
    stub.method(&method.name, &method.descriptor)
        .is_some_and(|m| !m.is_static())
}
