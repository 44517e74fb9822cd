use std::collections::{BTreeMap, BTreeSet};

use jem_core::MethodInformation;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Exception sets of the methods stored under one cache key.
pub type ClassEntries = BTreeMap<MethodInformation, BTreeSet<String>>;

pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// On-disk form of one cache file.
///
/// ```json
/// {
///   "schema_version": 1,
///   "class": "java.util.Map",
///   "methods": [
///     {"name": "get", "descriptor": "(Ljava/lang/Object;)Ljava/lang/Object;", "exceptions": []},
///     {"class": "java.util.Map$Entry", "name": "setValue", "descriptor": "...", "exceptions": ["java.lang.UnsupportedOperationException"]}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDocument {
    pub schema_version: u32,
    pub class: String,
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    /// Owner of the method when it differs from the document class (nested classes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

#[derive(Deserialize)]
struct DocumentHeader {
    schema_version: u32,
    #[allow(dead_code)]
    class: IgnoredAny,
}

impl ClassDocument {
    pub fn new(key: &str, entries: &ClassEntries) -> Self {
        let methods = entries
            .iter()
            .map(|(method, exceptions)| MethodRecord {
                class: (method.owner != key).then(|| method.owner.clone()),
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
                exceptions: exceptions.iter().cloned().collect(),
            })
            .collect();
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            class: key.to_string(),
            methods,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: ClassDocument = serde_json::from_slice(bytes)?;
        if doc.schema_version != CACHE_SCHEMA_VERSION {
            return Err(CacheError::IncompatibleSchemaVersion {
                expected: CACHE_SCHEMA_VERSION,
                found: doc.schema_version,
            });
        }
        Ok(doc)
    }

    /// Checks syntax and schema version without materializing method records.
    pub fn check_header(bytes: &[u8]) -> Result<()> {
        let header: DocumentHeader = serde_json::from_slice(bytes)?;
        if header.schema_version != CACHE_SCHEMA_VERSION {
            return Err(CacheError::IncompatibleSchemaVersion {
                expected: CACHE_SCHEMA_VERSION,
                found: header.schema_version,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Repeated records for the same method are unioned.
    pub fn into_entries(self) -> ClassEntries {
        let mut entries = ClassEntries::new();
        for record in self.methods {
            let owner = record.class.unwrap_or_else(|| self.class.clone());
            entries
                .entry(MethodInformation::new(owner, record.name, record.descriptor))
                .or_default()
                .extend(record.exceptions);
        }
        entries
    }
}

/// Adds `incoming` to `existing`, unioning the exception sets of methods present in both.
pub fn merge_entries(existing: &mut ClassEntries, incoming: &ClassEntries) {
    for (method, exceptions) in incoming {
        existing
            .entry(method.clone())
            .or_default()
            .extend(exceptions.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_owners_keep_their_class_field() {
        let mut entries = ClassEntries::new();
        entries.insert(
            MethodInformation::new("com.foo.Bar", "run", "()V"),
            BTreeSet::from(["java.io.IOException".to_string()]),
        );
        entries.insert(
            MethodInformation::new("com.foo.Bar$Inner", "run", "()V"),
            BTreeSet::new(),
        );

        let doc = ClassDocument::new("com.foo.Bar", &entries);
        assert_eq!(doc.methods[0].class, None);
        assert_eq!(doc.methods[1].class.as_deref(), Some("com.foo.Bar$Inner"));

        let bytes = doc.to_json().unwrap();
        let back = ClassDocument::from_json(&bytes).unwrap().into_entries();
        assert_eq!(back, entries);
    }

    #[test]
    fn tolerates_key_order_unknown_fields_and_missing_methods() {
        let json = br#"{"methods":[{"exceptions":["a.B"],"descriptor":"()V","name":"m","extra":1}],"class":"p.C","schema_version":1,"generator":"other"}"#;
        let entries = ClassDocument::from_json(json).unwrap().into_entries();
        assert_eq!(
            entries.get(&MethodInformation::new("p.C", "m", "()V")),
            Some(&BTreeSet::from(["a.B".to_string()]))
        );

        let empty = ClassDocument::from_json(br#"{"schema_version":1,"class":"p.C"}"#).unwrap();
        assert!(empty.into_entries().is_empty());
    }

    #[test]
    fn rejects_other_schema_versions() {
        let err = ClassDocument::from_json(br#"{"schema_version":7,"class":"p.C"}"#).unwrap_err();
        assert!(matches!(
            err,
            CacheError::IncompatibleSchemaVersion { expected: 1, found: 7 }
        ));
        assert!(ClassDocument::from_json(b"not json").is_err());
    }

    #[test]
    fn header_check_skips_method_records() {
        let doc = br#"{"schema_version": 1, "class": "p.C", "methods": 5}"#;
        assert!(ClassDocument::check_header(doc).is_ok());
        assert!(ClassDocument::from_json(doc).is_err());

        assert!(ClassDocument::check_header(br#"{"schema_version": 2, "class": "p.C"}"#).is_err());
        assert!(ClassDocument::check_header(br#"{"schema_version": 1}"#).is_err());
        assert!(ClassDocument::check_header(br#"{"schema_version": 1, "class": "#).is_err());
    }
}
