//! Erasure of front-end type text to JVM descriptors.
//!
//! The codec is total: text it cannot make sense of degrades to a reference
//! type spelled after the text itself, so every callable has a descriptor.

use jem_classfile::{BaseType, FieldType, MethodDescriptor, ReturnType};

use crate::callable::TypeParameter;
use crate::names::{binary_to_internal, internal_to_binary, qualified_to_binary};

const OBJECT: &str = "java/lang/Object";

/// Bound chains deeper than this (`T extends U`, `U extends T`, ...) erase to `Object`.
const MAX_BOUND_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dialect {
    Java,
    Kotlin,
}

/// Builds the erased descriptor `(<params>)<return>`.
///
/// `return_type` of `None` means `void` (Java) or `Unit` (Kotlin).
/// `type_parameters` lists every type variable in scope of the declaration,
/// method-level and class-level alike.
pub fn method_descriptor(
    dialect: Dialect,
    parameter_types: &[String],
    return_type: Option<&str>,
    type_parameters: &[TypeParameter],
) -> String {
    MethodDescriptor {
        params: parameter_types
            .iter()
            .map(|text| erase(dialect, text, type_parameters))
            .collect(),
        return_type: erase_return(dialect, return_type, type_parameters),
    }
    .to_string()
}

/// Erases a single parameter or field type.
pub fn erase(dialect: Dialect, text: &str, type_parameters: &[TypeParameter]) -> FieldType {
    match dialect {
        Dialect::Java => erase_java(text, type_parameters, 0),
        Dialect::Kotlin => erase_kotlin(text, type_parameters, 0, false),
    }
}

pub fn erase_return(
    dialect: Dialect,
    text: Option<&str>,
    type_parameters: &[TypeParameter],
) -> ReturnType {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return ReturnType::Void;
    };
    let is_void = match dialect {
        Dialect::Java => text == "void",
        Dialect::Kotlin => matches!(text, "Unit" | "kotlin.Unit"),
    };
    if is_void {
        ReturnType::Void
    } else {
        ReturnType::Type(erase(dialect, text, type_parameters))
    }
}

/// Maps a Kotlin class name to the binary name of the JVM class it compiles to,
/// e.g. `kotlin.collections.MutableList` to `java.util.List`.
pub fn kotlin_class_to_jvm(name: &str) -> String {
    let (base, _) = split_generics(name.trim().trim_end_matches('?'));
    let base = base.trim();
    if let Some(internal) = kotlin_boxed(base).or_else(|| kotlin_builtin(base)) {
        return internal_to_binary(internal);
    }
    qualified_to_binary(base)
}

fn erase_java(text: &str, type_parameters: &[TypeParameter], depth: usize) -> FieldType {
    let text = strip_annotations(text);
    let mut text = text.trim();
    let mut dims = 0;
    if let Some(rest) = text.strip_suffix("...") {
        dims += 1;
        text = rest.trim_end();
    }

    let (base, _) = split_generics(text);
    let mut base = base.trim();
    while let Some(rest) = base.strip_suffix("[]") {
        dims += 1;
        base = rest.trim_end();
    }

    java_element(base, type_parameters, depth).array_of(dims)
}

fn java_element(name: &str, type_parameters: &[TypeParameter], depth: usize) -> FieldType {
    if let Some(base) = BaseType::from_keyword(name) {
        return FieldType::Base(base);
    }
    if let Some(bound) = name.strip_prefix("? extends ") {
        return erase_java(bound, type_parameters, depth + 1);
    }
    if name == "?" || name.starts_with("? super ") {
        return object();
    }
    if let Some(param) = type_parameters.iter().find(|p| p.name == name) {
        return match param.bounds.first() {
            Some(bound) if depth < MAX_BOUND_DEPTH => erase_java(bound, type_parameters, depth + 1),
            _ => object(),
        };
    }
    reference(name)
}

fn erase_kotlin(
    text: &str,
    type_parameters: &[TypeParameter],
    depth: usize,
    boxed: bool,
) -> FieldType {
    let text = strip_annotations(text);
    let text = text.trim();
    let (text, nullable) = match text.strip_suffix('?') {
        Some(rest) => (rest.trim_end(), true),
        None => (text, false),
    };
    let text = strip_variance(text);
    if text == "*" {
        return object();
    }

    let (base, args) = split_generics(text);
    let base = base.trim();

    if matches!(base, "Array" | "kotlin.Array") {
        let element = match args.first() {
            Some(arg) => erase_kotlin(arg, type_parameters, depth + 1, true),
            None => object(),
        };
        return element.array_of(1);
    }
    if let Some(element) = kotlin_primitive_array(base) {
        return FieldType::Base(element).array_of(1);
    }
    if let Some(primitive) = kotlin_primitive(base) {
        return match kotlin_boxed(base) {
            Some(boxed_name) if nullable || boxed => FieldType::Object(boxed_name.to_string()),
            _ => FieldType::Base(primitive),
        };
    }
    if let Some(param) = type_parameters.iter().find(|p| p.name == base) {
        return match param.bounds.first() {
            Some(bound) if depth < MAX_BOUND_DEPTH => {
                erase_kotlin(bound, type_parameters, depth + 1, true)
            }
            _ => object(),
        };
    }
    if let Some(internal) = kotlin_builtin(base) {
        return FieldType::Object(internal.to_string());
    }
    reference(base)
}

fn object() -> FieldType {
    FieldType::Object(OBJECT.to_string())
}

fn reference(name: &str) -> FieldType {
    if name.is_empty() {
        return object();
    }
    if is_qualified_name(name) {
        return FieldType::Object(binary_to_internal(&qualified_to_binary(name)));
    }
    let text: String = name.split_whitespace().collect();
    FieldType::Object(text.replace('.', "/"))
}

fn is_qualified_name(name: &str) -> bool {
    name.split('.').all(|segment| {
        let mut chars = segment.chars();
        matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
            && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    })
}

fn strip_annotations(text: &str) -> String {
    if !text.contains('@') {
        return text.to_string();
    }
    text.split_whitespace()
        .filter(|token| !token.starts_with('@'))
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_variance(text: &str) -> &str {
    text.strip_prefix("out ")
        .or_else(|| text.strip_prefix("in "))
        .map(str::trim_start)
        .unwrap_or(text)
}

/// Removes every `<...>` group, returning the remaining text and the
/// top-level arguments of the first group.
fn split_generics(text: &str) -> (String, Vec<String>) {
    let mut base = String::with_capacity(text.len());
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut first_group = true;

    for c in text.chars() {
        match c {
            '<' => {
                if depth > 0 && first_group {
                    current.push(c);
                }
                depth += 1;
            }
            '>' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if first_group {
                        args.push(std::mem::take(&mut current).trim().to_string());
                    }
                    first_group = false;
                } else if first_group {
                    current.push(c);
                }
            }
            ',' if depth == 1 && first_group => {
                args.push(std::mem::take(&mut current).trim().to_string());
            }
            _ if depth == 0 => base.push(c),
            _ if first_group => current.push(c),
            _ => {}
        }
    }

    args.retain(|arg| !arg.is_empty());
    (base, args)
}

fn strip_kotlin_prefix(name: &str) -> &str {
    name.strip_prefix("kotlin.collections.")
        .or_else(|| name.strip_prefix("kotlin.annotation."))
        .or_else(|| name.strip_prefix("kotlin."))
        .unwrap_or(name)
}

fn kotlin_primitive(name: &str) -> Option<BaseType> {
    Some(match name.strip_prefix("kotlin.").unwrap_or(name) {
        "Int" => BaseType::Int,
        "Long" => BaseType::Long,
        "Short" => BaseType::Short,
        "Byte" => BaseType::Byte,
        "Char" => BaseType::Char,
        "Boolean" => BaseType::Boolean,
        "Float" => BaseType::Float,
        "Double" => BaseType::Double,
        _ => return None,
    })
}

fn kotlin_boxed(name: &str) -> Option<&'static str> {
    Some(match name.strip_prefix("kotlin.").unwrap_or(name) {
        "Int" => "java/lang/Integer",
        "Long" => "java/lang/Long",
        "Short" => "java/lang/Short",
        "Byte" => "java/lang/Byte",
        "Char" => "java/lang/Character",
        "Boolean" => "java/lang/Boolean",
        "Float" => "java/lang/Float",
        "Double" => "java/lang/Double",
        _ => return None,
    })
}

fn kotlin_primitive_array(name: &str) -> Option<BaseType> {
    let element = name.strip_prefix("kotlin.").unwrap_or(name).strip_suffix("Array")?;
    kotlin_primitive(element)
}

fn kotlin_builtin(name: &str) -> Option<&'static str> {
    Some(match strip_kotlin_prefix(name) {
        "Any" => OBJECT,
        "String" => "java/lang/String",
        "CharSequence" => "java/lang/CharSequence",
        "Number" => "java/lang/Number",
        "Throwable" => "java/lang/Throwable",
        "Comparable" => "java/lang/Comparable",
        "Enum" => "java/lang/Enum",
        "Cloneable" => "java/lang/Cloneable",
        "Nothing" => "java/lang/Void",
        "Annotation" => "java/lang/annotation/Annotation",
        "Unit" => "kotlin/Unit",
        "Iterable" | "MutableIterable" => "java/lang/Iterable",
        "Collection" | "MutableCollection" => "java/util/Collection",
        "List" | "MutableList" => "java/util/List",
        "Set" | "MutableSet" => "java/util/Set",
        "Map" | "MutableMap" => "java/util/Map",
        "Map.Entry" | "MutableMap.MutableEntry" => "java/util/Map$Entry",
        "Iterator" | "MutableIterator" => "java/util/Iterator",
        "ListIterator" | "MutableListIterator" => "java/util/ListIterator",
        "NoSuchElementException" => "java/util/NoSuchElementException",
        "ConcurrentModificationException" => "java/util/ConcurrentModificationException",
        other if name.starts_with("kotlin.") && !other.contains('.') && is_throwable_alias(other) => {
            return Some(match other {
                "Exception" => "java/lang/Exception",
                "Error" => "java/lang/Error",
                "RuntimeException" => "java/lang/RuntimeException",
                "IllegalArgumentException" => "java/lang/IllegalArgumentException",
                "IllegalStateException" => "java/lang/IllegalStateException",
                "IndexOutOfBoundsException" => "java/lang/IndexOutOfBoundsException",
                "UnsupportedOperationException" => "java/lang/UnsupportedOperationException",
                "ArithmeticException" => "java/lang/ArithmeticException",
                "NumberFormatException" => "java/lang/NumberFormatException",
                "NullPointerException" => "java/lang/NullPointerException",
                "ClassCastException" => "java/lang/ClassCastException",
                "AssertionError" => "java/lang/AssertionError",
                _ => return None,
            })
        }
        _ => return None,
    })
}

fn is_throwable_alias(name: &str) -> bool {
    name.ends_with("Exception") || name.ends_with("Error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn tp(name: &str, bounds: &[&str]) -> TypeParameter {
        TypeParameter {
            name: name.to_string(),
            bounds: strings(bounds),
        }
    }

    #[test]
    fn java_primitives_arrays_and_varargs() {
        let desc = method_descriptor(
            Dialect::Java,
            &strings(&["int", "long[]", "java.lang.String...", "boolean[][]"]),
            Some("void"),
            &[],
        );
        assert_eq!(desc, "(I[J[Ljava/lang/String;[[Z)V");
    }

    #[test]
    fn java_generics_are_erased() {
        let desc = method_descriptor(
            Dialect::Java,
            &strings(&["java.util.List<java.lang.String>", "java.util.Map<K, java.util.List<V>>"]),
            Some("java.util.Map.Entry<K, V>"),
            &[],
        );
        assert_eq!(
            desc,
            "(Ljava/util/List;Ljava/util/Map;)Ljava/util/Map$Entry;"
        );
    }

    #[test]
    fn java_type_parameters_erase_to_first_bound() {
        let params = [tp("E", &[]), tp("T", &["java.lang.Comparable<T>", "java.io.Serializable"])];
        let desc = method_descriptor(Dialect::Java, &strings(&["int", "T[]"]), Some("E"), &params);
        assert_eq!(desc, "(I[Ljava/lang/Comparable;)Ljava/lang/Object;");
    }

    #[test]
    fn java_list_get_matches_bytecode() {
        let desc = method_descriptor(Dialect::Java, &strings(&["int"]), Some("E"), &[tp("E", &[])]);
        assert_eq!(desc, "(I)Ljava/lang/Object;");
    }

    #[test]
    fn kotlin_builtins_map_to_jvm_types() {
        let desc = method_descriptor(
            Dialect::Kotlin,
            &strings(&["Int", "kotlin.Int?", "String", "IntArray", "Array<String>", "Array<Int>"]),
            None,
            &[],
        );
        assert_eq!(
            desc,
            "(ILjava/lang/Integer;Ljava/lang/String;[I[Ljava/lang/String;[Ljava/lang/Integer;)V"
        );
    }

    #[test]
    fn kotlin_collections_map_to_java_util() {
        let desc = method_descriptor(
            Dialect::Kotlin,
            &strings(&["kotlin.collections.MutableList<out T>", "Map<String, Any?>"]),
            Some("kotlin.collections.Map.Entry<K, V>"),
            &[tp("T", &[])],
        );
        assert_eq!(desc, "(Ljava/util/List;Ljava/util/Map;)Ljava/util/Map$Entry;");
    }

    #[test]
    fn dialects_agree_on_the_same_method() {
        let java = method_descriptor(
            Dialect::Java,
            &strings(&["int", "java.lang.String", "java.util.List<? extends java.lang.Number>"]),
            Some("java.lang.Object"),
            &[],
        );
        let kotlin = method_descriptor(
            Dialect::Kotlin,
            &strings(&["kotlin.Int", "kotlin.String", "List<out Number>"]),
            Some("Any?"),
            &[],
        );
        assert_eq!(java, kotlin);
        assert_eq!(java, "(ILjava/lang/String;Ljava/util/List;)Ljava/lang/Object;");
    }

    #[test]
    fn unit_and_unresolvable_text_degrade_gracefully() {
        assert_eq!(erase_return(Dialect::Kotlin, Some("Unit"), &[]), ReturnType::Void);
        assert_eq!(
            erase(Dialect::Java, "com.acme.Broken Thing", &[]).to_string(),
            "Lcom/acme/BrokenThing;"
        );
        assert_eq!(erase(Dialect::Java, "", &[]).to_string(), "Ljava/lang/Object;");
        assert_eq!(
            erase(Dialect::Java, "@NotNull java.lang.String", &[]).to_string(),
            "Ljava/lang/String;"
        );
    }

    #[test]
    fn descriptor_is_deterministic() {
        let params = strings(&["java.util.Map.Entry<String, Integer>", "char"]);
        let first = method_descriptor(Dialect::Java, &params, Some("byte[]"), &[]);
        for _ in 0..3 {
            assert_eq!(method_descriptor(Dialect::Java, &params, Some("byte[]"), &[]), first);
        }
        assert_eq!(first, "(Ljava/util/Map$Entry;C)[B");
    }

    #[test]
    fn kotlin_owner_classes_map_to_jvm() {
        assert_eq!(kotlin_class_to_jvm("kotlin.collections.List"), "java.util.List");
        assert_eq!(kotlin_class_to_jvm("kotlin.String"), "java.lang.String");
        assert_eq!(kotlin_class_to_jvm("com.acme.Outer.Inner"), "com.acme.Outer$Inner");
    }
}
