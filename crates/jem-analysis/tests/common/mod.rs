#![allow(dead_code)]

use std::path::{Path, PathBuf};

use jem_analysis::{CaretAnalyzer, ExtractOptions, JarAnalyzer, Project};
use jem_cache::{ExceptionCache, FsStore};
use jem_classpath::ClasspathEntry;
use jem_core::{
    CallManifest, JavaMethod, ManifestCall, ManifestFrontEnd, Modifiers, Origin, ResolvedCallable,
    TypeParameter,
};
use jem_test_utils::{jar_url, ClassBuilder, JarBuilder, MethodBuilder};

pub const IOOBE: &str = "java/lang/IndexOutOfBoundsException";

/// `java/util/List` with `get(I)` declaring `IndexOutOfBoundsException` and
/// an exception-free `size()`.
pub fn list_jar(dir: &Path) -> PathBuf {
    let jar = dir.join("rt.jar");
    JarBuilder::new()
        .class(
            &ClassBuilder::interface("java/util/List")
                .method(MethodBuilder::abstract_method("get", "(I)Ljava/lang/Object;").throws(IOOBE))
                .method(MethodBuilder::abstract_method("size", "()I")),
        )
        .write(&jar)
        .unwrap();
    jar
}

pub fn java_method(
    owner: &str,
    name: &str,
    parameter_types: &[&str],
    return_type: Option<&str>,
    origin: String,
) -> ResolvedCallable {
    ResolvedCallable::Java(JavaMethod {
        containing_class: Some(owner.to_string()),
        name: name.to_string(),
        parameter_types: parameter_types.iter().map(|s| s.to_string()).collect(),
        return_type: return_type.map(str::to_string),
        type_parameters: vec![TypeParameter {
            name: "E".to_string(),
            bounds: Vec::new(),
        }],
        modifiers: Modifiers::default(),
        origin: Origin::parse(&origin),
    })
}

pub fn list_get(jar: &Path) -> ResolvedCallable {
    java_method(
        "java.util.List",
        "get",
        &["int"],
        Some("E"),
        jar_url(jar, "java/util/List"),
    )
}

pub fn manifest(calls: Vec<(usize, Option<ResolvedCallable>)>) -> CallManifest {
    CallManifest {
        calls: calls
            .into_iter()
            .map(|(offset, target)| ManifestCall {
                offset,
                text: format!("call@{offset}"),
                target,
            })
            .collect(),
    }
}

pub fn analyzer(
    classpath: &[&Path],
    cache_root: &Path,
) -> CaretAnalyzer<ManifestFrontEnd, FsStore> {
    let project = Project::new(
        classpath
            .iter()
            .map(|p| ClasspathEntry::from_path(*p))
            .collect(),
    );
    CaretAnalyzer::new(
        ManifestFrontEnd,
        project,
        ExceptionCache::new(FsStore::new(cache_root).unwrap()),
        JarAnalyzer::new(ExtractOptions::default()),
    )
}
