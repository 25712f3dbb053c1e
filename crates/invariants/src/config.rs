//! Default error kind and message configuration.
//!
//! # Hierarchy
//!
//! A violation's kind and message resolve in this order (earlier wins):
//! 1. Call-site override
//! 2. The invariant's own default message (message only)
//! 3. Type configuration
//! 4. Global configuration
//!
//! # Global lifecycle
//!
//! Global configuration has two phases. During start-up it may be mutated
//! through [`configure_global`] any number of times. The first read through
//! [`global`] (which the first enforcement performs) freezes it; further
//! mutation fails with [`ConfigError::Frozen`]. Concurrent mutation during
//! start-up is unsupported.
//!
//! Type configuration is resolved against the global configuration at the
//! first enforcement for that type and cached from then on.
//!
//! # Loading
//!
//! Configuration layers merge in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file (`[invariants]` table)
//! 3. Environment variables: `INVARIANTS_DEFAULT_ERROR_KIND`, `INVARIANTS_DEFAULT_MESSAGE`
//!
//! ```toml
//! [invariants]
//! default_error_kind = "unprocessable"
//! default_message = "{type} refused: {condition}"
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Mutex, OnceLock, PoisonError},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    kind::ErrorKind,
    template::{Template, TemplateError},
};

/// Environment variable overriding the default error kind.
pub const ENV_DEFAULT_ERROR_KIND: &str = "INVARIANTS_DEFAULT_ERROR_KIND";

/// Environment variable overriding the default message template.
pub const ENV_DEFAULT_MESSAGE: &str = "INVARIANTS_DEFAULT_MESSAGE";

/// Errors raised while loading or installing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Global configuration was already read
    #[error("global invariant configuration is frozen; configure it before the first enforcement")]
    Frozen,

    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Message template does not parse
    #[error("invalid message template: {0}")]
    Template(#[from] TemplateError),

    /// Error kind name does not parse
    #[error("invalid error kind `{value}` in {origin}")]
    InvalidErrorKind { value: String, origin: &'static str },
}

/// Fully resolved defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Kind used when nothing more specific is configured
    pub default_error_kind: ErrorKind,
    /// Message used when nothing more specific is configured
    pub default_message: Template,
}

impl Configuration {
    /// Load configuration: defaults, then `path` (if it exists), then environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or any layer is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) if path.exists() => PartialConfiguration::from_file(path)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "no invariant config file, using defaults");
                PartialConfiguration::default()
            }
            None => PartialConfiguration::default(),
        };
        let env = PartialConfiguration::from_env()?;

        Ok(file.merge(env).resolve(&Self::default()))
    }
}

/// One layer of configuration; unset fields fall through to the next layer.
///
/// Used both for config-file and environment layers and, as
/// [`TypeConfiguration`], for per-type defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfiguration {
    /// Kind override for this layer
    pub default_error_kind: Option<ErrorKind>,
    /// Message override for this layer
    pub default_message: Option<Template>,
}

/// Per-type defaults, falling back to the global configuration.
pub type TypeConfiguration = PartialConfiguration;

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    invariants: PartialConfiguration,
}

impl PartialConfiguration {
    /// Parse the `[invariants]` table of a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` for malformed TOML, unknown keys, or
    /// invalid kind/template values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.invariants)
    }

    /// Read and parse a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read variables through `lookup`, ignoring blank values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let default_error_kind = read(ENV_DEFAULT_ERROR_KIND)
            .map(|value| {
                ErrorKind::from_str(value.trim()).map_err(|_| ConfigError::InvalidErrorKind {
                    value,
                    origin: ENV_DEFAULT_ERROR_KIND,
                })
            })
            .transpose()?;
        let default_message = read(ENV_DEFAULT_MESSAGE)
            .map(Template::parse)
            .transpose()?;

        Ok(Self {
            default_error_kind,
            default_message,
        })
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            default_error_kind: other.default_error_kind.or(self.default_error_kind),
            default_message: other.default_message.or(self.default_message),
        }
    }

    /// Fill unset fields from `base`.
    #[must_use]
    pub fn resolve(&self, base: &Configuration) -> Configuration {
        Configuration {
            default_error_kind: self.default_error_kind.unwrap_or(base.default_error_kind),
            default_message: self
                .default_message
                .clone()
                .unwrap_or_else(|| base.default_message.clone()),
        }
    }

    /// Whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.default_error_kind.is_none() && self.default_message.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GLOBAL CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

static PENDING: Mutex<Option<Configuration>> = Mutex::new(None);
static FROZEN: OnceLock<Configuration> = OnceLock::new();

/// Mutate the process-wide defaults.
///
/// Intended to run once during start-up, before any enforcement. The
/// mutator runs under the configuration lock and must not call [`global`].
///
/// # Errors
///
/// Returns `ConfigError::Frozen` once the global configuration has been read.
pub fn configure_global<F>(mutator: F) -> Result<(), ConfigError>
where
    F: FnOnce(&mut Configuration),
{
    // Freezing happens under this lock, so the check cannot go stale.
    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    if FROZEN.get().is_some() {
        tracing::warn!("ignoring global invariant configuration change after first use");
        return Err(ConfigError::Frozen);
    }

    let config = pending.get_or_insert_with(Configuration::default);
    mutator(config);

    tracing::debug!(
        default_error_kind = %config.default_error_kind,
        default_message = %config.default_message,
        "global invariant configuration updated"
    );
    Ok(())
}

/// Load configuration from `path` and the environment, then install it globally.
///
/// # Errors
///
/// Returns `ConfigError` if loading fails or the global configuration is frozen.
pub fn configure_global_from(path: &Path) -> Result<(), ConfigError> {
    let loaded = Configuration::load(Some(path))?;
    configure_global(|config| *config = loaded)
}

/// The frozen process-wide defaults. The first call freezes them.
pub fn global() -> &'static Configuration {
    if let Some(config) = FROZEN.get() {
        return config;
    }

    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    FROZEN.get_or_init(|| {
        let config = pending.take().unwrap_or_default();
        tracing::debug!(
            default_error_kind = %config.default_error_kind,
            default_message = %config.default_message,
            "global invariant configuration frozen"
        );
        config
    })
}

/// Whether the global configuration has been read and can no longer change.
pub fn is_frozen() -> bool {
    FROZEN.get().is_some()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.default_error_kind, ErrorKind::Generic);
        assert_eq!(
            config.default_message.as_str(),
            "Invariant cannot be enforced: {condition}"
        );
    }

    #[test]
    fn test_from_toml_str_reads_invariants_table() {
        let partial = PartialConfiguration::from_toml_str(
            r#"
            [invariants]
            default_error_kind = "unprocessable"
            default_message = "{type} refused: {condition}"
            "#,
        )
        .expect("valid config");

        assert_eq!(partial.default_error_kind, Some(ErrorKind::Unprocessable));
        let message = partial.default_message.expect("message set");
        assert_eq!(message.render(&"added", "Todo"), "Todo refused: added");
    }

    #[test]
    fn test_from_toml_str_without_table_is_empty() {
        let partial = PartialConfiguration::from_toml_str("other = 1").expect("valid config");
        assert!(partial.is_empty());
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_keys() {
        let result = PartialConfiguration::from_toml_str(
            r#"
            [invariants]
            default_error = "conflict"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_from_toml_str_rejects_bad_template() {
        let result = PartialConfiguration::from_toml_str(
            r#"
            [invariants]
            default_message = "broken {placeholder}"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_from_lookup_reads_both_variables() {
        let partial = PartialConfiguration::from_lookup(lookup(&[
            (ENV_DEFAULT_ERROR_KIND, "conflict"),
            (ENV_DEFAULT_MESSAGE, "no: {condition}"),
        ]))
        .expect("valid env");

        assert_eq!(partial.default_error_kind, Some(ErrorKind::Conflict));
        assert_eq!(
            partial.default_message.map(|m| m.render(&"x", "T")),
            Some("no: x".to_string())
        );
    }

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let partial =
            PartialConfiguration::from_lookup(lookup(&[(ENV_DEFAULT_ERROR_KIND, "  ")]))
                .expect("valid env");
        assert!(partial.is_empty());
    }

    #[test]
    fn test_from_lookup_rejects_bad_kind() {
        let result =
            PartialConfiguration::from_lookup(lookup(&[(ENV_DEFAULT_ERROR_KIND, "teapot")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidErrorKind { ref value, origin })
                if value == "teapot" && origin == ENV_DEFAULT_ERROR_KIND
        ));
    }

    #[test]
    fn test_from_lookup_rejects_bad_template() {
        let result = PartialConfiguration::from_lookup(lookup(&[(ENV_DEFAULT_MESSAGE, "{")]));
        assert!(matches!(result, Err(ConfigError::Template(_))));
    }

    #[test]
    fn test_merge_later_layer_wins() {
        let file = PartialConfiguration {
            default_error_kind: Some(ErrorKind::Conflict),
            default_message: Some(Template::literal("from file")),
        };
        let env = PartialConfiguration {
            default_error_kind: Some(ErrorKind::NotFound),
            default_message: None,
        };

        let merged = file.merge(env);
        assert_eq!(merged.default_error_kind, Some(ErrorKind::NotFound));
        assert_eq!(merged.default_message, Some(Template::literal("from file")));
    }

    #[test]
    fn test_resolve_falls_back_per_field() {
        let base = Configuration {
            default_error_kind: ErrorKind::Conflict,
            default_message: Template::literal("base"),
        };
        let partial = PartialConfiguration {
            default_error_kind: Some(ErrorKind::Unprocessable),
            default_message: None,
        };

        let resolved = partial.resolve(&base);
        assert_eq!(resolved.default_error_kind, ErrorKind::Unprocessable);
        assert_eq!(resolved.default_message, Template::literal("base"));
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let result = PartialConfiguration::from_file(Path::new("/nonexistent/invariants.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
