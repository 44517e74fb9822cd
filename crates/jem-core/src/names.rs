//! Conversions between the different spellings of JVM class names.
//!
//! - internal: `java/util/Map$Entry` (class files, descriptors)
//! - binary: `java.util.Map$Entry` (cache keys, [`MethodInformation`](crate::MethodInformation))
//! - qualified: `java.util.Map.Entry` (what editors show for nested classes)

pub fn internal_to_binary(internal: &str) -> String {
    internal.replace('/', ".")
}

pub fn binary_to_internal(binary: &str) -> String {
    binary.replace('.', "/")
}

/// Best-effort conversion of a source-level qualified name to a binary name.
///
/// Segments after the first uppercase-led segment are treated as nested
/// classes: `java.util.Map.Entry` becomes `java.util.Map$Entry`. Names that
/// already contain `$`, or have no uppercase-led segment, are returned as is.
pub fn qualified_to_binary(qualified: &str) -> String {
    if qualified.contains('$') {
        return qualified.to_string();
    }

    let mut out = String::with_capacity(qualified.len());
    let mut in_class = false;
    for (i, segment) in qualified.split('.').enumerate() {
        if i > 0 {
            out.push(if in_class { '$' } else { '.' });
        }
        out.push_str(segment);
        if segment.starts_with(|c: char| c.is_ascii_uppercase()) {
            in_class = true;
        }
    }
    out
}

/// The top-level class a (possibly nested) class belongs to.
///
/// `com.foo.Bar$Inner` and `com.foo.Bar.Inner` both yield `com.foo.Bar`.
pub fn outer_class_name(class_name: &str) -> String {
    let binary = qualified_to_binary(&internal_to_binary(class_name));
    match binary.split_once('$') {
        Some((outer, _)) if !outer.is_empty() && !outer.ends_with('.') => outer.to_string(),
        _ => binary,
    }
}

/// Splits a binary name into `(package, simple name)`; the package is empty
/// for the default package.
pub fn split_package(binary: &str) -> (&str, &str) {
    binary.rsplit_once('.').unwrap_or(("", binary))
}
