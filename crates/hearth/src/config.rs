//! # Client Configuration
//!
//! Loaded once at startup from TOML. Every section and field is optional;
//! missing values take the defaults below.
//!
//! ```toml
//! [display]
//! show_hitboxes = true
//!
//! [timing]
//! sim_tick_hz = 20.0
//! placement_tick_hz = 5.0
//!
//! [effects]
//! damage_resource = "gfx/fx/floatimg"
//! ```

use std::path::Path;
use std::time::Duration;

use hearth_core::DisplaySettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {field} {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Outline object hitboxes.
    pub show_hitboxes: bool,
    /// Also outline virtual objects that are placement previews.
    pub hitbox_on_previews: bool,
    /// Render per-object info labels.
    pub show_info_labels: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_hitboxes: false,
            hitbox_on_previews: true,
            show_info_labels: false,
        }
    }
}

/// `[timing]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Simulation ticks per second.
    pub sim_tick_hz: f64,
    /// Placement passes per second.
    pub placement_tick_hz: f64,
    /// How long `await_removal` callers wait before giving up.
    pub removal_wait_ms: u64,
}

impl TimingConfig {
    /// Seconds between placement passes.
    #[must_use]
    pub fn placement_period(&self) -> f64 {
        1.0 / self.placement_tick_hz
    }

    /// Seconds between simulation ticks.
    #[must_use]
    pub fn sim_period(&self) -> f64 {
        1.0 / self.sim_tick_hz
    }

    /// Removal wait as a duration.
    #[must_use]
    pub fn removal_wait(&self) -> Duration {
        Duration::from_millis(self.removal_wait_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sim_tick_hz: 20.0,
            placement_tick_hz: 5.0,
            removal_wait_ms: hearth_shared::constants::REMOVAL_WAIT_MS,
        }
    }
}

/// `[effects]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Overlay resource carrying damage numbers.
    pub damage_resource: String,
    /// Overlay resource that turns on radius display.
    pub radius_resource: String,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        let core = DisplaySettings::default();
        Self {
            damage_resource: core.damage_resource,
            radius_resource: core.radius_resource,
        }
    }
}

/// Whole client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Display toggles.
    pub display: DisplayConfig,
    /// Tick cadences.
    pub timing: TimingConfig,
    /// Effect resources.
    pub effects: EffectsConfig,
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.as_ref().display(), "client config loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = |field, hz: f64| {
            if hz.is_finite() && hz > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be a positive rate",
                })
            }
        };
        rate("timing.sim_tick_hz", self.timing.sim_tick_hz)?;
        rate("timing.placement_tick_hz", self.timing.placement_tick_hz)?;
        if self.timing.placement_tick_hz > self.timing.sim_tick_hz {
            return Err(ConfigError::Invalid {
                field: "timing.placement_tick_hz",
                reason: "must not exceed sim_tick_hz",
            });
        }
        if self.timing.removal_wait_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timing.removal_wait_ms",
                reason: "must be non-zero",
            });
        }
        if self.effects.damage_resource.is_empty() {
            return Err(ConfigError::Invalid {
                field: "effects.damage_resource",
                reason: "must name a resource",
            });
        }
        if self.effects.radius_resource.is_empty() {
            return Err(ConfigError::Invalid {
                field: "effects.radius_resource",
                reason: "must name a resource",
            });
        }
        Ok(())
    }

    /// The settings the object core reads at run time.
    #[must_use]
    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            show_hitboxes: self.display.show_hitboxes,
            hitbox_on_previews: self.display.hitbox_on_previews,
            show_info_labels: self.display.show_info_labels,
            damage_resource: self.effects.damage_resource.clone(),
            radius_resource: self.effects.radius_resource.clone(),
        }
    }

    /// Consumes the config into core display settings.
    #[must_use]
    pub fn into_core(self) -> DisplaySettings {
        DisplaySettings {
            show_hitboxes: self.display.show_hitboxes,
            hitbox_on_previews: self.display.hitbox_on_previews,
            show_info_labels: self.display.show_info_labels,
            damage_resource: self.effects.damage_resource,
            radius_resource: self.effects.radius_resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timing.removal_wait(), Duration::from_secs(15));
        assert_eq!(config.display_settings(), DisplaySettings::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ClientConfig::from_toml_str(
            r#"
            [display]
            show_hitboxes = true
            hitbox_on_previews = false

            [effects]
            damage_resource = "gfx/fx/dmg"
            "#,
        )
        .unwrap();
        assert!(config.display.show_hitboxes);
        assert!(!config.display.hitbox_on_previews);
        assert!(!config.display.show_info_labels);
        assert_eq!(config.timing, TimingConfig::default());

        let core = config.into_core();
        assert!(core.show_hitboxes);
        assert_eq!(core.damage_resource, "gfx/fx/dmg");
        assert_eq!(core.radius_resource, "gfx/fx/msrad");
    }

    #[test]
    fn test_rejects_bad_rates() {
        let err = ClientConfig::from_toml_str("[timing]\nsim_tick_hz = 0.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "timing.sim_tick_hz",
                ..
            }
        ));

        let err = ClientConfig::from_toml_str("[timing]\nsim_tick_hz = 10.0\nplacement_tick_hz = 30.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "timing.placement_tick_hz",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_empty_resource_names() {
        let err = ClientConfig::from_toml_str("[effects]\nradius_resource = \"\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "effects.radius_resource",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = ClientConfig::from_toml_str("[timing]\nsim_tick_hz = \"fast\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("hearth-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[timing]\nremoval_wait_ms = 500\n").unwrap();
        let config = ClientConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.timing.removal_wait(), Duration::from_millis(500));

        let missing = ClientConfig::load(std::env::temp_dir().join("hearth-config-missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
