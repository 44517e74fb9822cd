//! Persistent, per-class cache of the exceptions compiled methods may throw.
//!
//! ## On-disk layout
//!
//! One pretty-printed JSON document per top-level class under the cache root
//! (default `<home>/.JEMPluginCache`, see [`CacheConfig`]):
//!
//! - `<root>/<package dirs>/<OuterSimpleName>.json`: a [`ClassDocument`] with
//!   schema [`CACHE_SCHEMA_VERSION`]; nested classes are folded into their
//!   outer class's document;
//! - `<root>/.lock`: held around read-modify-write merges.
//!
//! Documents are replaced atomically. A document that fails to parse, or has a
//! different schema version, is deleted and read as a miss.

mod cache_dir;
mod error;
mod lock;
mod record;
mod store;
mod util;

use std::collections::BTreeSet;

use jem_core::MethodInformation;

pub use crate::cache_dir::{cache_key, class_file_path, CacheConfig, CACHE_DIR_ENV};
pub use crate::error::{CacheError, Result};
pub use crate::lock::CacheLock;
pub use crate::record::{
    merge_entries, ClassDocument, ClassEntries, MethodRecord, CACHE_SCHEMA_VERSION,
};
pub use crate::store::{ExceptionStore, FsStore, MemoryStore};
pub use crate::util::atomic_write;

/// Method-level view over an [`ExceptionStore`].
#[derive(Debug)]
pub struct ExceptionCache<S> {
    store: S,
}

impl<S: ExceptionStore> ExceptionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether results for `class` (or the top-level class it is nested in) are cached.
    pub fn exists(&self, class: &str) -> bool {
        self.store.contains(class)
    }

    /// Cached exceptions of `method`; empty when nothing is cached for it.
    pub fn read(&self, method: &MethodInformation) -> BTreeSet<String> {
        self.store
            .get(&method.owner)
            .and_then(|mut entries| entries.remove(method))
            .unwrap_or_default()
    }

    /// Merges `entries` into the cache key of `class`.
    pub fn write(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        self.store.merge(class, entries)
    }

    pub fn entries(&self, class: &str) -> Option<ClassEntries> {
        self.store.get(class)
    }

    pub fn remove(&self, class: &str) -> Result<()> {
        self.store.remove(class)
    }
}
