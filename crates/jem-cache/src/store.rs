use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::cache_dir::{cache_key, class_file_path, CacheConfig};
use crate::error::{CacheError, Result};
use crate::lock::CacheLock;
use crate::record::{merge_entries, ClassDocument, ClassEntries};
use crate::util::{atomic_write, read_file_limited, remove_file_best_effort};

/// Key-value storage of per-class exception entries.
///
/// Keys may name any class; implementations store nested classes under their
/// top-level class (see [`cache_key`]).
pub trait ExceptionStore {
    /// `None` when nothing usable is stored for the key.
    fn get(&self, class: &str) -> Option<ClassEntries>;

    /// Replaces whatever is stored for the key.
    fn put(&self, class: &str, entries: &ClassEntries) -> Result<()>;

    /// Adds `entries` to what is stored, unioning per-method exception sets.
    fn merge(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        let mut merged = self.get(class).unwrap_or_default();
        merge_entries(&mut merged, entries);
        self.put(class, &merged)
    }

    fn contains(&self, class: &str) -> bool {
        self.get(class).is_some()
    }

    fn remove(&self, class: &str) -> Result<()>;
}

impl<S: ExceptionStore + ?Sized> ExceptionStore for &S {
    fn get(&self, class: &str) -> Option<ClassEntries> {
        (**self).get(class)
    }

    fn put(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        (**self).put(class, entries)
    }

    fn merge(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        (**self).merge(class, entries)
    }

    fn contains(&self, class: &str) -> bool {
        (**self).contains(class)
    }

    fn remove(&self, class: &str) -> Result<()> {
        (**self).remove(class)
    }
}

fn discard_malformed(path: &Path, err: &CacheError) {
    tracing::debug!(
        target: "jem.cache",
        path = %path.display(),
        error = %err,
        "discarding unreadable cache file"
    );
    remove_file_best_effort(path, "malformed");
}

/// One JSON document per top-level class under a cache root.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.root()?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, class: &str) -> PathBuf {
        class_file_path(&self.root, class)
    }

    fn lock(&self) -> Result<CacheLock> {
        CacheLock::lock_exclusive(&self.root.join(".lock"))
    }

    fn write_document(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        let key = cache_key(class);
        let path = self.path_for(&key);
        atomic_write(&path, &ClassDocument::new(&key, entries).to_json()?)?;
        tracing::debug!(
            target: "jem.cache",
            class = %key,
            path = %path.display(),
            methods = entries.len(),
            "wrote cache file"
        );
        Ok(())
    }
}

impl ExceptionStore for FsStore {
    fn get(&self, class: &str) -> Option<ClassEntries> {
        let path = self.path_for(class);
        let bytes = read_file_limited(&path)?;
        match ClassDocument::from_json(&bytes) {
            Ok(doc) => Some(doc.into_entries()),
            Err(err) => {
                discard_malformed(&path, &err);
                None
            }
        }
    }

    fn contains(&self, class: &str) -> bool {
        let path = self.path_for(class);
        let Some(bytes) = read_file_limited(&path) else {
            return false;
        };
        match ClassDocument::check_header(&bytes) {
            Ok(()) => true,
            Err(err) => {
                discard_malformed(&path, &err);
                false
            }
        }
    }

    fn put(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        self.write_document(class, entries)
    }

    fn merge(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        let _lock = self.lock()?;
        let mut merged = self.get(class).unwrap_or_default();
        merge_entries(&mut merged, entries);
        self.write_document(class, &merged)
    }

    fn remove(&self, class: &str) -> Result<()> {
        let path = self.path_for(class);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    classes: Mutex<HashMap<String, ClassEntries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.classes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn classes(&self) -> std::sync::MutexGuard<'_, HashMap<String, ClassEntries>> {
        self.classes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ExceptionStore for MemoryStore {
    fn get(&self, class: &str) -> Option<ClassEntries> {
        self.classes().get(&cache_key(class)).cloned()
    }

    fn put(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        self.classes().insert(cache_key(class), entries.clone());
        Ok(())
    }

    fn merge(&self, class: &str, entries: &ClassEntries) -> Result<()> {
        let mut classes = self.classes();
        merge_entries(classes.entry(cache_key(class)).or_default(), entries);
        Ok(())
    }

    fn contains(&self, class: &str) -> bool {
        self.classes().contains_key(&cache_key(class))
    }

    fn remove(&self, class: &str) -> Result<()> {
        self.classes().remove(&cache_key(class));
        Ok(())
    }
}
