use std::path::PathBuf;

use jem_cache::CacheError;
use jem_classpath::ClasspathError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The container is missing or unreadable; callers treat it as "no data".
    #[error("container {path} is unavailable: {source}")]
    ContainerUnavailable {
        path: PathBuf,
        #[source]
        source: ClasspathError,
    },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}
