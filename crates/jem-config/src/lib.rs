//! Configuration for the JEM tools, loaded from `jem.toml`.
//!
//! ```toml
//! [cache]
//! root = "/var/cache/jem"
//!
//! [analysis]
//! declared = true
//! thrown = true
//! follow_invocations = true
//!
//! [logging]
//! level = "info"
//! json = false
//! stderr = true
//! file = "/tmp/jem.log"
//! ```
//!
//! Every field has a default; unknown keys are rejected.

mod logging;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::logging::init_tracing;

/// Environment variable naming an explicit config file.
pub const JEM_CONFIG_ENV_VAR: &str = "JEM_CONFIG_PATH";

/// Environment variable overriding `[cache] root`.
pub const CACHE_DIR_ENV_VAR: &str = "JEM_CACHE_DIR";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JemConfig {
    #[serde(default)]
    pub cache: CacheSection,

    /// Which exception sources the bytecode extractor collects.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Cache directory; `~/.JEMPluginCache` when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Exceptions listed in `throws` clauses.
    #[serde(default = "default_true")]
    pub declared: bool,

    /// Exceptions raised by `throw` statements in method bodies.
    #[serde(default = "default_true")]
    pub thrown: bool,

    /// Exceptions of methods invoked from the same container.
    #[serde(default = "default_true")]
    pub follow_invocations: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            declared: true,
            thrown: true,
            follow_invocations: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_true")]
    pub stderr: bool,

    /// Append logs to this file as well. Logging to it is skipped when it
    /// cannot be opened.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            "off" | "none" => "off".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        })
    }

    /// The effective filter: the configured level with `RUST_LOG` directives
    /// appended when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: true,
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message only; the default `Display` quotes the input.
        ConfigError::Toml(err.message().to_string())
    }
}

impl JemConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// The configured cache root, with [`CACHE_DIR_ENV_VAR`] taking precedence.
    /// `None` means the default location.
    pub fn cache_root(&self) -> Option<PathBuf> {
        std::env::var_os(CACHE_DIR_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.cache.root.clone())
    }
}

/// Finds the config file for `dir`.
///
/// Search order:
/// 1) `JEM_CONFIG_PATH` (absolute or relative to `dir`)
/// 2) `jem.toml` in `dir`
/// 3) `.jem.toml` in `dir`
pub fn discover_config_path(dir: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(JEM_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            dir.join(candidate)
        };
        return Some(path);
    }

    ["jem.toml", ".jem.toml"]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Loads the config for `dir`, or the defaults when there is none.
pub fn load_for_dir(dir: &Path) -> Result<(JemConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(dir) else {
        return Ok((JemConfig::default(), None));
    };
    let config = JemConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_synonyms_are_normalized() {
        assert_eq!(LoggingConfig::normalize_level_directives(" WARNING "), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives("Debug"), "debug");
        assert_eq!(LoggingConfig::normalize_level_directives(""), "warn");
        assert_eq!(
            LoggingConfig::normalize_level_directives("jem.cache=trace"),
            "jem.cache=trace"
        );
    }

    #[test]
    fn toml_errors_do_not_echo_input() {
        let err = JemConfig::load_from_str("[cache]\nroot = 42\n").unwrap_err();
        let ConfigError::Toml(message) = err else {
            panic!("expected a toml error");
        };
        assert!(!message.contains("root = 42"), "{message}");
    }
}
