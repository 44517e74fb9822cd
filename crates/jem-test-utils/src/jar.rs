use std::io::{self, Write};
use std::path::Path;

use crate::classgen::ClassBuilder;

/// Builds a jar file from in-memory class files.
#[derive(Default)]
pub struct JarBuilder {
    manifest: Option<String>,
    entries: Vec<(String, Vec<u8>)>,
}

impl JarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `<internal name>.class`.
    pub fn class(self, class: &ClassBuilder) -> Self {
        let name = format!("{}.class", class.internal_name());
        self.entry(&name, class.build())
    }

    /// Replaces the default `META-INF/MANIFEST.MF` contents.
    pub fn manifest(mut self, contents: &str) -> Self {
        self.manifest = Some(contents.to_string());
        self
    }

    pub fn entry(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.entries.push((name.to_string(), bytes));
        self
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();

        zip.start_file("META-INF/MANIFEST.MF", options)?;
        let manifest = self.manifest.as_deref().unwrap_or("Manifest-Version: 1.0\n");
        zip.write_all(manifest.as_bytes())?;

        for (name, bytes) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        zip.finish()?;
        Ok(())
    }
}

/// Virtual-file URL of a class inside a jar, the way an editor reports it.
pub fn jar_url(jar: &Path, internal_name: &str) -> String {
    format!("jar://{}!/{internal_name}.class", jar.display())
}
