mod common;

use std::collections::BTreeSet;

use jem_cache::{ClassEntries, ExceptionStore, FsStore};
use jem_core::{MethodInformation, Origin, ResolvedCallable};
use jem_test_utils::{jar_url, scratch_dir};
use pretty_assertions::assert_eq;

use common::*;

fn keys<C>(map: &jem_core::DiscoveryMap<C>) -> Vec<String> {
    map.keys().cloned().collect()
}

#[test]
fn list_get_reports_index_out_of_bounds() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let cache_root = tmp.path().join("cache");
    let mut analyzer = analyzer(&[jar.as_path()], &cache_root);

    let unit = manifest(vec![(10, Some(list_get(&jar)))]);
    let found = analyzer.analyze(&unit, 0, 100);

    assert_eq!(keys(&found), vec!["java.lang.IndexOutOfBoundsException"]);
    let discoveries = &found["java.lang.IndexOutOfBoundsException"];
    assert_eq!(discoveries.len(), 1);
    let discovery = discoveries.iter().next().unwrap();
    assert_eq!(discovery.call_site.offset, 10);
    assert_eq!(discovery.method, list_get(&jar));

    assert!(cache_root.join("java/util/List.json").is_file());
    assert_eq!(analyzer.jar_analyzer().scans(), 1);
}

#[test]
fn method_without_exceptions_contributes_nothing() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let mut analyzer = analyzer(&[jar.as_path()], &tmp.path().join("cache"));

    let size = java_method("java.util.List", "size", &[], Some("int"), jar_url(&jar, "java/util/List"));
    let found = analyzer.analyze(&manifest(vec![(5, Some(size))]), 0, 10);
    assert!(found.is_empty());
}

#[test]
fn each_call_site_is_a_separate_discovery() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let mut analyzer = analyzer(&[jar.as_path()], &tmp.path().join("cache"));

    let unit = manifest(vec![(3, Some(list_get(&jar))), (30, Some(list_get(&jar)))]);
    let found = analyzer.analyze(&unit, 0, 100);

    assert_eq!(found.len(), 1);
    let offsets: Vec<usize> = found["java.lang.IndexOutOfBoundsException"]
        .iter()
        .map(|d| d.call_site.offset)
        .collect();
    assert_eq!(offsets, vec![3, 30]);
    assert_eq!(analyzer.jar_analyzer().scans(), 1);
}

#[test]
fn selection_bounds_limit_calls() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let mut analyzer = analyzer(&[jar.as_path()], &tmp.path().join("cache"));
    let unit = manifest(vec![(3, Some(list_get(&jar))), (30, Some(list_get(&jar)))]);

    let found = analyzer.analyze(&unit, 10, 40);
    let offsets: Vec<usize> = found["java.lang.IndexOutOfBoundsException"]
        .iter()
        .map(|d| d.call_site.offset)
        .collect();
    assert_eq!(offsets, vec![30]);

    assert!(analyzer.analyze(&unit, 10, 10).is_empty());
    assert!(analyzer.analyze(&unit, 40, 10).is_empty());
    assert!(analyzer.analyze(&unit, 50, 60).is_empty());
}

#[test]
fn cached_results_short_circuit_scanning() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let cache_root = tmp.path().join("cache");

    let get = MethodInformation::new("java.util.List", "get", "(I)Ljava/lang/Object;");
    let mut fake = ClassEntries::new();
    fake.insert(get, BTreeSet::from(["fake.Boom".to_string()]));
    FsStore::new(&cache_root)
        .unwrap()
        .put("java.util.List", &fake)
        .unwrap();

    let mut analyzer = analyzer(&[jar.as_path()], &cache_root);
    let found = analyzer.analyze(&manifest(vec![(1, Some(list_get(&jar)))]), 0, 10);

    assert_eq!(keys(&found), vec!["fake.Boom"]);
    assert_eq!(analyzer.jar_analyzer().scans(), 0);
}

#[test]
fn repeated_sessions_are_idempotent() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let cache_root = tmp.path().join("cache");
    let unit = manifest(vec![(1, Some(list_get(&jar)))]);

    let mut first = analyzer(&[jar.as_path()], &cache_root);
    let first_found = first.analyze(&unit, 0, 10);
    let bytes = std::fs::read(cache_root.join("java/util/List.json")).unwrap();

    let mut second = analyzer(&[jar.as_path()], &cache_root);
    let second_found = second.analyze(&unit, 0, 10);

    assert_eq!(first_found, second_found);
    assert_eq!(second.jar_analyzer().scans(), 0);
    assert_eq!(std::fs::read(cache_root.join("java/util/List.json")).unwrap(), bytes);
}

#[test]
fn owner_outside_project_classpath_uses_fallback_scan() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let cache_root = tmp.path().join("cache");
    let mut analyzer = analyzer(&[], &cache_root);

    let found = analyzer.analyze(&manifest(vec![(1, Some(list_get(&jar)))]), 0, 10);

    assert_eq!(keys(&found), vec!["java.lang.IndexOutOfBoundsException"]);
    assert!(analyzer.polymorph().is_init());
    assert_eq!(analyzer.jar_analyzer().scans(), 1);
    assert!(cache_root.join("java/util/List.json").is_file());

    // The fallback cached the class: no second scan.
    analyzer.analyze(&manifest(vec![(1, Some(list_get(&jar)))]), 0, 10);
    assert_eq!(analyzer.jar_analyzer().scans(), 1);
}

#[test]
fn unreachable_container_yields_nothing() {
    let tmp = scratch_dir();
    let missing = tmp.path().join("gone.jar");
    let mut analyzer = analyzer(&[], &tmp.path().join("cache"));

    let found = analyzer.analyze(&manifest(vec![(1, Some(list_get(&missing)))]), 0, 10);
    assert!(found.is_empty());
}

#[test]
fn unreadable_classpath_entries_do_not_disable_the_resolver() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let broken = tmp.path().join("broken.jar");
    std::fs::write(&broken, b"not a zip").unwrap();
    let deleted = tmp.path().join("deleted.jar");
    let mut analyzer = analyzer(
        &[broken.as_path(), deleted.as_path(), jar.as_path()],
        &tmp.path().join("cache"),
    );

    let found = analyzer.analyze(&manifest(vec![(1, Some(list_get(&jar)))]), 0, 10);
    assert!(analyzer.polymorph().is_init());
    assert_eq!(keys(&found), vec!["java.lang.IndexOutOfBoundsException"]);
}

#[test]
fn source_and_unresolved_targets_are_skipped() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let mut analyzer = analyzer(&[jar.as_path()], &tmp.path().join("cache"));

    let mut in_source = list_get(&jar);
    if let ResolvedCallable::Java(method) = &mut in_source {
        method.origin = Origin::parse("file:///project/src/List.java");
    }
    let mut ownerless = list_get(&jar);
    if let ResolvedCallable::Java(method) = &mut ownerless {
        method.containing_class = None;
    }

    let unit = manifest(vec![(1, Some(in_source)), (2, None), (3, Some(ownerless))]);
    assert!(analyzer.analyze(&unit, 0, 10).is_empty());
    assert_eq!(analyzer.jar_analyzer().scans(), 0);
}

#[test]
fn malformed_cache_file_is_rebuilt() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let cache_root = tmp.path().join("cache");
    let path = cache_root.join("java/util/List.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{ definitely not json").unwrap();

    let mut analyzer = analyzer(&[jar.as_path()], &cache_root);
    let found = analyzer.analyze(&manifest(vec![(1, Some(list_get(&jar)))]), 0, 10);

    assert_eq!(keys(&found), vec!["java.lang.IndexOutOfBoundsException"]);
    let doc: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(doc["class"], "java.util.List");
}

#[test]
fn kotlin_and_java_calls_agree() {
    let tmp = scratch_dir();
    let jar = list_jar(tmp.path());
    let mut analyzer = analyzer(&[jar.as_path()], &tmp.path().join("cache"));

    let kotlin = ResolvedCallable::Kotlin(jem_core::KotlinFunction {
        containing_declaration: Some("kotlin.collections.List".to_string()),
        name: "get".to_string(),
        value_parameter_types: vec!["Int".to_string()],
        return_type: Some("E".to_string()),
        type_parameters: vec![jem_core::TypeParameter {
            name: "E".to_string(),
            bounds: Vec::new(),
        }],
        modifiers: Default::default(),
        origin: Origin::parse(&jar_url(&jar, "java/util/List")),
    });

    let unit = manifest(vec![(1, Some(list_get(&jar))), (2, Some(kotlin))]);
    let found = analyzer.analyze(&unit, 0, 10);
    assert_eq!(found["java.lang.IndexOutOfBoundsException"].len(), 2);
}
