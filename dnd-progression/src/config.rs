//! Engine configuration.

use crate::multiclass::LeaveClassPolicy;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_HP_POLICY: &str = "DND_PROGRESSION_HP_POLICY";
pub const ENV_OFFER_MULTICLASS: &str = "DND_PROGRESSION_OFFER_MULTICLASS";
pub const ENV_LEAVE_CLASS_POLICY: &str = "DND_PROGRESSION_LEAVE_CLASS_POLICY";
pub const ENV_SAVE_DIR: &str = "DND_PROGRESSION_SAVE_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// How hit points may be gained on level-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitPointPolicy {
    /// The player may roll the hit die or take the fixed average.
    #[default]
    RollOrAverage,
    /// Only the fixed average is accepted.
    AverageOnly,
}

/// Configuration for a progression engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub hp_policy: HitPointPolicy,

    /// Offer the class-select step to single-classed characters.
    pub offer_multiclass: bool,

    pub leave_class_policy: LeaveClassPolicy,

    /// Directory used by the JSON character store.
    pub save_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hp_policy: HitPointPolicy::RollOrAverage,
            offer_multiclass: false,
            leave_class_policy: LeaveClassPolicy::Enforce,
            save_dir: PathBuf::from("characters"),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hp_policy(mut self, policy: HitPointPolicy) -> Self {
        self.hp_policy = policy;
        self
    }

    pub fn with_multiclass(mut self, offer: bool) -> Self {
        self.offer_multiclass = offer;
        self
    }

    pub fn with_leave_class_policy(mut self, policy: LeaveClassPolicy) -> Self {
        self.leave_class_policy = policy;
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    /// Load `.env` if present, then read `DND_PROGRESSION_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_HP_POLICY) {
            config.hp_policy = match value.trim().to_ascii_lowercase().as_str() {
                "roll-or-average" => HitPointPolicy::RollOrAverage,
                "average-only" => HitPointPolicy::AverageOnly,
                _ => return Err(invalid(ENV_HP_POLICY, value)),
            };
        }

        if let Some(value) = lookup(ENV_OFFER_MULTICLASS) {
            config.offer_multiclass = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(invalid(ENV_OFFER_MULTICLASS, value)),
            };
        }

        if let Some(value) = lookup(ENV_LEAVE_CLASS_POLICY) {
            config.leave_class_policy = match value.trim().to_ascii_lowercase().as_str() {
                "enforce" => LeaveClassPolicy::Enforce,
                "warn" => LeaveClassPolicy::Warn,
                "allow" => LeaveClassPolicy::Allow,
                _ => return Err(invalid(ENV_LEAVE_CLASS_POLICY, value)),
            };
        }

        if let Some(value) = lookup(ENV_SAVE_DIR) {
            if value.trim().is_empty() {
                return Err(invalid(ENV_SAVE_DIR, value));
            }
            config.save_dir = PathBuf::from(value);
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.leave_class_policy, LeaveClassPolicy::Enforce);
    }

    #[test]
    fn test_reads_every_key() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_HP_POLICY, "average-only"),
            (ENV_OFFER_MULTICLASS, "true"),
            (ENV_LEAVE_CLASS_POLICY, "Warn"),
            (ENV_SAVE_DIR, "/tmp/heroes"),
        ]))
        .unwrap();
        assert_eq!(config.hp_policy, HitPointPolicy::AverageOnly);
        assert!(config.offer_multiclass);
        assert_eq!(config.leave_class_policy, LeaveClassPolicy::Warn);
        assert_eq!(config.save_dir, PathBuf::from("/tmp/heroes"));
    }

    #[test]
    fn test_invalid_value() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_HP_POLICY, "max")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_HP_POLICY.to_string(),
                value: "max".to_string(),
            }
        );
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_hp_policy(HitPointPolicy::AverageOnly)
            .with_multiclass(true)
            .with_leave_class_policy(LeaveClassPolicy::Allow)
            .with_save_dir("saves");
        assert_eq!(config.hp_policy, HitPointPolicy::AverageOnly);
        assert!(config.offer_multiclass);
        assert_eq!(config.leave_class_policy, LeaveClassPolicy::Allow);
        assert_eq!(config.save_dir, PathBuf::from("saves"));
    }
}
