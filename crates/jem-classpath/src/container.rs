use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{Read, Seek};
use std::path::Path;

use jem_classfile::ClassFile;

use crate::{is_ignored_class, ClasspathEntry, ClasspathError};

/// Reads and parses every class file held by `entry`, sorted by internal name.
///
/// Class files that fail to parse are skipped; an unreadable container is an
/// error.
pub fn read_classes(entry: &ClasspathEntry) -> Result<Vec<ClassFile>, ClasspathError> {
    let mut classes = match entry {
        ClasspathEntry::ClassDir(dir) => read_class_dir(dir)?,
        ClasspathEntry::Jar(path) => read_zip(path, ZipKind::Jar)?,
        ClasspathEntry::Jmod(path) => read_zip(path, ZipKind::Jmod)?,
    };
    classes.sort_by(|a, b| a.this_class.cmp(&b.this_class));
    Ok(classes)
}

fn read_class_dir(dir: &Path) -> Result<Vec<ClassFile>, ClasspathError> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )
        .into());
    }

    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() != Some(OsStr::new("class")) {
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        if let Some(cf) = parse_class(&bytes, &entry.path().display().to_string()) {
            out.push(cf);
        }
    }
    Ok(out)
}

enum ZipKind {
    Jar,
    Jmod,
}

fn read_zip(path: &Path, kind: ZipKind) -> Result<Vec<ClassFile>, ClasspathError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    match kind {
        ZipKind::Jmod => {
            let mut out = Vec::new();
            for i in 0..archive.len() {
                let mut file = archive.by_index(i)?;
                if !file.is_file() {
                    continue;
                }
                let name = file.name().to_owned();

                // JMODs place class files under `classes/`.
                if !name.ends_with(".class") || !name.starts_with("classes/") {
                    continue;
                }

                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                if let Some(cf) = parse_class(&bytes, &name) {
                    out.push(cf);
                }
            }
            Ok(out)
        }
        ZipKind::Jar => {
            let is_multi_release = jar_is_multi_release(&mut archive);

            // Base entries win over `META-INF/versions/<n>/` ones; among
            // versioned entries the highest version wins.
            let mut best: HashMap<String, (u32, ClassFile)> = HashMap::new();

            for i in 0..archive.len() {
                let mut file = archive.by_index(i)?;
                if !file.is_file() {
                    continue;
                }
                let name = file.name().to_owned();

                if !name.ends_with(".class") {
                    continue;
                }

                let mr_version = if let Some(rest) = name.strip_prefix("META-INF/versions/") {
                    if !is_multi_release {
                        continue;
                    }
                    let Some((version, _path)) = rest.split_once('/') else {
                        continue;
                    };
                    match version.parse::<u32>() {
                        Ok(v) => Some(v),
                        Err(_) => continue,
                    }
                } else if name.starts_with("META-INF/") {
                    continue;
                } else {
                    None
                };

                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                let Some(cf) = parse_class(&bytes, &name) else {
                    continue;
                };

                let key = cf.this_class.clone();
                let version = mr_version.unwrap_or(0);
                match best.get(&key) {
                    Some((existing, _)) if *existing == 0 => {}
                    Some((existing, _)) if version != 0 && version <= *existing => {}
                    _ => {
                        best.insert(key, (version, cf));
                    }
                }
            }

            Ok(best.into_values().map(|(_, cf)| cf).collect())
        }
    }
}

fn parse_class(bytes: &[u8], origin: &str) -> Option<ClassFile> {
    match ClassFile::parse(bytes) {
        Ok(cf) if is_ignored_class(&cf.this_class) => None,
        Ok(cf) => Some(cf),
        Err(err) => {
            tracing::debug!(
                target: "jem.classpath",
                entry = %origin,
                error = %err,
                "skipping malformed class file"
            );
            None
        }
    }
}

fn jar_is_multi_release<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> bool {
    let mut file = match archive.by_name("META-INF/MANIFEST.MF") {
        Ok(file) => file,
        Err(_) => return false,
    };

    let mut manifest = String::new();
    if file.read_to_string(&mut manifest).is_err() {
        return false;
    }

    manifest_is_multi_release(&manifest)
}

fn manifest_is_multi_release(manifest: &str) -> bool {
    for line in manifest.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("Multi-Release") {
            return value.trim().eq_ignore_ascii_case("true");
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::manifest_is_multi_release;

    #[test]
    fn multi_release_manifest_flag() {
        assert!(manifest_is_multi_release("Manifest-Version: 1.0\nMulti-Release: true\n"));
        assert!(manifest_is_multi_release("multi-release:TRUE"));
        assert!(!manifest_is_multi_release("Manifest-Version: 1.0\n"));
        assert!(!manifest_is_multi_release("Multi-Release: false"));
    }
}
