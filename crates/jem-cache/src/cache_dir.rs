use std::path::{Path, PathBuf};

use jem_core::names::{outer_class_name, split_package};

use crate::error::CacheError;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "JEM_CACHE_DIR";

const DEFAULT_DIR_NAME: &str = ".JEMPluginCache";

/// Configuration for selecting the on-disk cache root.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Replaces `<home>/.JEMPluginCache`.
    pub cache_root_override: Option<PathBuf>,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            cache_root_override: std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root_override: Some(root.into()),
        }
    }

    /// The configured root, or the default one under the user's home.
    pub fn root(&self) -> Result<PathBuf, CacheError> {
        match &self.cache_root_override {
            Some(root) => Ok(root.clone()),
            None => default_cache_root(),
        }
    }
}

/// The cache key (top-level class binary name) `class_name` is stored under.
pub fn cache_key(class_name: &str) -> String {
    outer_class_name(class_name)
}

/// `<root>/<package dirs>/<OuterSimpleName>.json` for any class, nested
/// classes included.
pub fn class_file_path(root: &Path, class_name: &str) -> PathBuf {
    let key = cache_key(class_name);
    let (package, simple) = split_package(&key);
    let mut path = root.to_path_buf();
    for segment in package.split('.').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push(format!("{simple}.json"));
    path
}

pub(crate) fn default_cache_root() -> Result<PathBuf, CacheError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;

    Ok(home.join(DEFAULT_DIR_NAME))
}
