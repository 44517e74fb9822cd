//! Classpath containers (jars, jmods, class directories) and an index of the
//! classes they hold, including the inheritance graph between them.

mod container;
mod hierarchy;
mod index;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::container::read_classes;
pub use crate::hierarchy::InheritanceIndex;
pub use crate::index::{ClassStub, ClasspathIndex, MethodStub};

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("classfile error: {0}")]
    ClassFile(#[from] jem_classfile::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
    Jmod(PathBuf),
}

impl ClasspathEntry {
    /// Infers the entry kind from the path: `.jmod` files are jmods, other
    /// files are jars and directories hold loose class files.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            return ClasspathEntry::ClassDir(path);
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jmod") => ClasspathEntry::Jmod(path),
            _ => ClasspathEntry::Jar(path),
        }
    }

    pub fn normalize(&self) -> std::io::Result<Self> {
        Ok(match self {
            ClasspathEntry::ClassDir(p) => ClasspathEntry::ClassDir(canonicalize_if_possible(p)?),
            ClasspathEntry::Jar(p) => ClasspathEntry::Jar(canonicalize_if_possible(p)?),
            ClasspathEntry::Jmod(p) => ClasspathEntry::Jmod(canonicalize_if_possible(p)?),
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            ClasspathEntry::ClassDir(p) | ClasspathEntry::Jar(p) | ClasspathEntry::Jmod(p) => p,
        }
    }
}

fn canonicalize_if_possible(path: &Path) -> std::io::Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(err),
    }
}

fn internal_name_to_binary(internal: &str) -> String {
    internal.replace('/', ".")
}

fn is_ignored_class(internal_name: &str) -> bool {
    internal_name == "module-info"
        || internal_name == "package-info"
        || internal_name.ends_with("/package-info")
}
