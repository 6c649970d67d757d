#![forbid(unsafe_code)]

//! Environment-driven configuration.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `LOCBIND_CULTURE` | `initial_culture` | detected system culture |
//! | `LOCBIND_CLEANUP_THRESHOLD` | `cleanup_threshold` | 40 |
//! | `LOCBIND_SYNC_FORMAT_CULTURE` | `sync_formatting_culture` | `true` |
//!
//! Invalid values never abort parsing: the default is kept and the problem
//! is reported through [`ConfigParse::errors`].

use std::env;
use std::fmt;

use crate::culture::{Culture, detect_system_culture};

pub const ENV_CULTURE: &str = "LOCBIND_CULTURE";
pub const ENV_CLEANUP_THRESHOLD: &str = "LOCBIND_CLEANUP_THRESHOLD";
pub const ENV_SYNC_FORMAT_CULTURE: &str = "LOCBIND_SYNC_FORMAT_CULTURE";

/// Registrations between automatic registry cleanups.
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 40;

/// Runtime configuration shared by the culture context and binding registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocbindConfig {
    /// Culture to start with. `None` means detect from the environment.
    pub initial_culture: Option<Culture>,
    /// Registrations after which the registry purges dead bindings.
    pub cleanup_threshold: usize,
    /// Mirror culture changes into the formatting culture slot.
    pub sync_formatting_culture: bool,
}

impl Default for LocbindConfig {
    fn default() -> Self {
        Self {
            initial_culture: None,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
            sync_formatting_culture: true,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: LocbindConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl LocbindConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Builder: fixed initial culture.
    #[must_use]
    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.initial_culture = Some(culture);
        self
    }

    /// Builder: cleanup threshold.
    #[must_use]
    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold;
        self
    }

    /// Builder: formatting culture synchronization.
    #[must_use]
    pub fn with_sync_formatting_culture(mut self, enabled: bool) -> Self {
        self.sync_formatting_culture = enabled;
        self
    }

    /// The configured initial culture, or the detected system culture.
    #[must_use]
    pub fn resolve_initial_culture(&self) -> Culture {
        self.initial_culture
            .clone()
            .unwrap_or_else(detect_system_culture)
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.cleanup_threshold == 0 {
            errors.push(ConfigError::new(
                "cleanup_threshold",
                "0",
                "must be positive",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn from_env_with<F>(mut get: F) -> ConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = LocbindConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_CULTURE) {
        match Culture::parse(&value) {
            Ok(culture) => config.initial_culture = Some(culture),
            Err(err) => errors.push(ConfigError::new("initial_culture", value, err.to_string())),
        }
    }

    if let Some(value) = get(ENV_CLEANUP_THRESHOLD) {
        match value.trim().parse::<usize>() {
            Ok(parsed) if parsed > 0 => config.cleanup_threshold = parsed,
            _ => errors.push(ConfigError::new(
                "cleanup_threshold",
                value,
                "expected positive integer",
            )),
        }
    }

    if let Some(value) = get(ENV_SYNC_FORMAT_CULTURE) {
        match parse_bool(&value) {
            Some(parsed) => config.sync_formatting_culture = parsed,
            None => errors.push(ConfigError::new(
                "sync_formatting_culture",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    ConfigParse { config, errors }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(vars: &[(&str, &str)]) -> ConfigParse {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        from_env_with(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_env_yields_defaults() {
        let parsed = parse(&[]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config, LocbindConfig::default());
        assert_eq!(parsed.config.cleanup_threshold, 40);
        assert!(parsed.config.sync_formatting_culture);
    }

    #[test]
    fn env_overrides_apply() {
        let parsed = parse(&[
            (ENV_CULTURE, "de_AT.UTF-8"),
            (ENV_CLEANUP_THRESHOLD, "8"),
            (ENV_SYNC_FORMAT_CULTURE, "off"),
        ]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.initial_culture.unwrap(), "de-AT");
        assert_eq!(parsed.config.cleanup_threshold, 8);
        assert!(!parsed.config.sync_formatting_culture);
    }

    #[test]
    fn invalid_values_keep_defaults_and_report() {
        let parsed = parse(&[
            (ENV_CULTURE, "not a culture"),
            (ENV_CLEANUP_THRESHOLD, "0"),
            (ENV_SYNC_FORMAT_CULTURE, "maybe"),
        ]);
        assert_eq!(parsed.config, LocbindConfig::default());
        let fields: Vec<&str> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["initial_culture", "cleanup_threshold", "sync_formatting_culture"]
        );
        assert_eq!(
            parsed.errors[2].to_string(),
            "sync_formatting_culture=maybe (expected bool (1/0/true/false))"
        );
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let config = LocbindConfig::default().with_cleanup_threshold(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cleanup_threshold");
        assert!(LocbindConfig::default().validate().is_ok());
    }

    #[test]
    fn explicit_culture_wins_over_detection() {
        let culture = Culture::parse("ja").unwrap();
        let config = LocbindConfig::default().with_culture(culture.clone());
        assert_eq!(config.resolve_initial_culture(), culture);
    }
}
