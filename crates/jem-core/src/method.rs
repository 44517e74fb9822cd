use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::names::outer_class_name;

/// Identifies one compiled method: owner binary name, method name and erased
/// descriptor. Used as the join key between the resolver and the cache.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodInformation {
    /// Binary name of the declaring class, e.g. `java.util.Map$Entry`.
    pub owner: String,
    pub name: String,
    /// Erased JVM descriptor, e.g. `(I)Ljava/lang/Object;`.
    pub descriptor: String,
}

impl MethodInformation {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Same method signature declared on another class.
    pub fn with_owner(&self, owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..self.clone()
        }
    }

    /// The cache key (top-level class) this method's results are stored under.
    pub fn cache_key(&self) -> String {
        outer_class_name(&self.owner)
    }
}

impl fmt::Display for MethodInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMethodError(String);

impl fmt::Display for ParseMethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid method `{}` (expected `owner.name(descriptor)return`)",
            self.0
        )
    }
}

impl std::error::Error for ParseMethodError {}

impl FromStr for MethodInformation {
    type Err = ParseMethodError;

    /// Parses `java.util.List.get(I)Ljava/lang/Object;`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMethodError(s.to_string());
        let s = s.trim();
        let paren = s.find('(').ok_or_else(err)?;
        let (qualified, descriptor) = s.split_at(paren);
        let (owner, name) = qualified.rsplit_once('.').ok_or_else(err)?;
        if owner.is_empty() || name.is_empty() {
            return Err(err());
        }
        jem_classfile::parse_method_descriptor(descriptor).map_err(|_| err())?;
        Ok(Self::new(owner, name, descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_textual_form() {
        let m: MethodInformation = "java.util.List.get(I)Ljava/lang/Object;".parse().unwrap();
        assert_eq!(m.owner, "java.util.List");
        assert_eq!(m.name, "get");
        assert_eq!(m.descriptor, "(I)Ljava/lang/Object;");
        assert_eq!(m.to_string(), "java.util.List.get(I)Ljava/lang/Object;");
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("get(I)V".parse::<MethodInformation>().is_err());
        assert!("java.util.List.get".parse::<MethodInformation>().is_err());
        assert!("java.util.List.get(I".parse::<MethodInformation>().is_err());
    }

    #[test]
    fn cache_key_folds_nested_owner() {
        let m = MethodInformation::new("java.util.Map$Entry", "getKey", "()Ljava/lang/Object;");
        assert_eq!(m.cache_key(), "java.util.Map");
    }
}
