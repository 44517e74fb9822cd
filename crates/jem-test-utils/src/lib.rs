//! Utilities shared by JEM tests.
//!
//! Tests need real class files and jars without shelling out to `javac`, so
//! this crate assembles them directly:
//!
//! - [`ClassBuilder`] / [`MethodBuilder`] / [`CodeBuilder`] emit version 52
//!   class files with `Exceptions` and `Code` attributes;
//! - [`JarBuilder`] packs them into a jar.

mod classgen;
mod jar;

pub use classgen::{ClassBuilder, CodeBuilder, MethodBuilder};
pub use jar::{jar_url, JarBuilder};

/// Creates a fresh temporary directory for a test.
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("jem-test-")
        .tempdir()
        .expect("failed to create temporary directory")
}
