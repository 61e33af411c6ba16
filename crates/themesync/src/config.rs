//! Coordinator configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.
//! Configuration can be built in code or loaded from YAML:
//!
//! ```rust
//! use themesync::{CoordinatorConfig, MalformedPolicy, Theme};
//!
//! let config = CoordinatorConfig::from_yaml(r#"
//! storage_key: site-theme
//! malformed: fallback-light
//! "#).unwrap();
//!
//! assert_eq!(config.storage_key, "site-theme");
//! assert_eq!(config.dark_class, "dark");
//! assert_eq!(config.default_theme, Theme::Light);
//! assert_eq!(config.malformed, MalformedPolicy::FallbackLight);
//! ```

use serde::{Deserialize, Serialize};

use crate::{Theme, ThemeError};

/// Key under which the override is persisted unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "theme";

/// Class set on the document root while the dark theme is active.
pub const DEFAULT_DARK_CLASS: &str = "dark";

/// What to do with a persisted value that is neither `"light"` nor `"dark"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Treat it as if nothing were stored. The next write-through removes it.
    #[default]
    Ignore,
    /// Treat it as an explicit `light` override.
    FallbackLight,
}

/// Settings shared by [`ThemeCoordinator`](crate::ThemeCoordinator) and
/// [`LocalTheme`](crate::LocalTheme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Storage key holding the override.
    pub storage_key: String,
    /// Class toggled on the document root by browser presentation flags.
    pub dark_class: String,
    /// Theme used when the OS preference cannot be queried and before
    /// initialization.
    pub default_theme: Theme,
    /// Handling of malformed persisted values.
    pub malformed: MalformedPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            dark_class: DEFAULT_DARK_CLASS.to_string(),
            default_theme: Theme::Light,
            malformed: MalformedPolicy::Ignore,
        }
    }
}

impl CoordinatorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ThemeError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Sets the storage key.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the dark class name.
    pub fn dark_class(mut self, class: impl Into<String>) -> Self {
        self.dark_class = class.into();
        self
    }

    /// Sets the fallback theme.
    pub fn default_theme(mut self, theme: Theme) -> Self {
        self.default_theme = theme;
        self
    }

    /// Sets the malformed-value policy.
    pub fn malformed(mut self, policy: MalformedPolicy) -> Self {
        self.malformed = policy;
        self
    }

    /// Interprets a raw persisted value under this configuration's policy.
    ///
    /// `None` and the empty string both mean "no override".
    pub fn parse_override(&self, raw: Option<&str>) -> Option<Theme> {
        let raw = raw.filter(|value| !value.is_empty())?;
        match raw.parse::<Theme>() {
            Ok(theme) => Some(theme),
            Err(err) => match self.malformed {
                MalformedPolicy::Ignore => {
                    tracing::warn!(key = %self.storage_key, %err, "ignoring stored theme");
                    None
                }
                MalformedPolicy::FallbackLight => {
                    tracing::warn!(key = %self.storage_key, %err, "stored theme replaced by light");
                    Some(Theme::Light)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.storage_key, "theme");
        assert_eq!(config.dark_class, "dark");
        assert_eq!(config.default_theme, Theme::Light);
        assert_eq!(config.malformed, MalformedPolicy::Ignore);
    }

    #[test]
    fn test_from_yaml_empty_is_default() {
        assert_eq!(
            CoordinatorConfig::from_yaml("").unwrap(),
            CoordinatorConfig::default()
        );
    }

    #[test]
    fn test_from_yaml_partial() {
        let config =
            CoordinatorConfig::from_yaml("dark_class: night\ndefault_theme: dark\n").unwrap();
        assert_eq!(config.dark_class, "night");
        assert_eq!(config.default_theme, Theme::Dark);
        assert_eq!(config.storage_key, "theme");
    }

    #[test]
    fn test_from_yaml_rejects_unknown_theme() {
        let err = CoordinatorConfig::from_yaml("default_theme: sepia").unwrap_err();
        assert!(matches!(err, ThemeError::Config(_)));
    }

    #[test]
    fn test_builder_setters() {
        let config = CoordinatorConfig::new()
            .storage_key("k")
            .dark_class("is-dark")
            .default_theme(Theme::Dark)
            .malformed(MalformedPolicy::FallbackLight);
        assert_eq!(config.storage_key, "k");
        assert_eq!(config.dark_class, "is-dark");
        assert_eq!(config.default_theme, Theme::Dark);
        assert_eq!(config.malformed, MalformedPolicy::FallbackLight);
    }

    #[test]
    fn test_parse_override_valid_and_absent() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.parse_override(Some("dark")), Some(Theme::Dark));
        assert_eq!(config.parse_override(None), None);
        assert_eq!(config.parse_override(Some("")), None);
    }

    #[test]
    fn test_parse_override_malformed_policies() {
        let ignore = CoordinatorConfig::default();
        assert_eq!(ignore.parse_override(Some("purple")), None);

        let fallback = CoordinatorConfig::default().malformed(MalformedPolicy::FallbackLight);
        assert_eq!(fallback.parse_override(Some("purple")), Some(Theme::Light));
    }
}
