use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a resolved declaration lives, parsed from an editor virtual-file URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Origin {
    /// A class file inside a jar: `jar://<container>!/<entry>`.
    Archive { container: PathBuf, entry: String },
    Source(PathBuf),
}

impl Origin {
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if url.starts_with("jar") {
            if let Some((_, rest)) = url.split_once("://") {
                if let Some(end) = rest.rfind(".jar") {
                    let container = &rest[..end + ".jar".len()];
                    let entry = rest[end + ".jar".len()..]
                        .trim_start_matches('!')
                        .trim_start_matches('/');
                    return Origin::Archive {
                        container: PathBuf::from(container),
                        entry: entry.to_string(),
                    };
                }
            }
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        Origin::Source(PathBuf::from(path))
    }

    /// Only declarations inside archives have bytecode to analyze.
    pub fn is_compiled_dependency(&self) -> bool {
        matches!(self, Origin::Archive { .. })
    }

    pub fn container(&self) -> Option<&Path> {
        match self {
            Origin::Archive { container, .. } => Some(container),
            Origin::Source(_) => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Archive { container, entry } => {
                write!(f, "jar://{}!/{entry}", container.display())
            }
            Origin::Source(path) => write!(f, "file://{}", path.display()),
        }
    }
}

impl FromStr for Origin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Origin::parse(s))
    }
}

impl From<String> for Origin {
    fn from(value: String) -> Self {
        Origin::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(value: Origin) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jar_urls() {
        let origin = Origin::parse("jar:///opt/libs/guava-33.jar!/com/google/common/collect/Lists.class");
        assert_eq!(
            origin,
            Origin::Archive {
                container: PathBuf::from("/opt/libs/guava-33.jar"),
                entry: "com/google/common/collect/Lists.class".to_string(),
            }
        );
        assert!(origin.is_compiled_dependency());
        assert_eq!(origin.container(), Some(Path::new("/opt/libs/guava-33.jar")));
    }

    #[test]
    fn container_ends_at_last_jar_suffix() {
        let origin = Origin::parse("jar://C:/cache/my.jars/lib.jar!/a/B.class");
        assert_eq!(origin.container(), Some(Path::new("C:/cache/my.jars/lib.jar")));
    }

    #[test]
    fn everything_else_is_source() {
        let origin = Origin::parse("file:///home/me/project/src/Main.java");
        assert_eq!(origin, Origin::Source(PathBuf::from("/home/me/project/src/Main.java")));
        assert!(!origin.is_compiled_dependency());
        assert_eq!(origin.container(), None);

        // A `.jar` suffix alone does not make an archive URL.
        assert!(!Origin::parse("/tmp/lib.jar").is_compiled_dependency());
    }

    #[test]
    fn serializes_as_url_string() {
        let origin = Origin::parse("jar:///lib/a.jar!/p/A.class");
        let json = serde_json::to_string(&origin).unwrap();
        assert_eq!(json, "\"jar:///lib/a.jar!/p/A.class\"");
        let back: Origin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, origin);
    }
}
