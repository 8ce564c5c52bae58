//! Persisted clock configuration.
//!
//! Stored as pretty-printed JSON next to the binary. Every field has a
//! compiled-in default, and `#[serde(default)]` means a stored file only
//! needs the fields it wants to override. A missing or broken file is
//! never fatal: we log it and run on defaults.

use crate::PanelConfig;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_TIME_FORMAT: &str = "%I:%M:%S";

/// Hue (degrees, 0-360), saturation (0-100) and value (0-100).
///
/// The value doubles as the panel brightness while the clock owns it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsv {
    pub hue: f64,
    pub saturation: f64,
    pub value: u8,
}

impl Default for Hsv {
    fn default() -> Self {
        Self {
            hue: 120.0,
            saturation: 100.0,
            value: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub color: Hsv,
    /// Fraction of the full color used for the divider and digits.
    pub dim: f64,
    /// chrono strftime pattern; characters 0, 1, 3 and 4 are drawn.
    pub time_format: String,
    pub tick_interval_ms: u64,
    /// How long the panel stays on external frames after the last one.
    pub idle_revert_ms: u64,
    pub frame_port: u16,
    pub rows: u32,
    pub cols: u32,
    pub parallel: u32,
    pub chain_length: u32,
    pub hardware_mapping: String,
    pub show_refresh_rate: bool,
    pub inverse_colors: bool,
    pub disable_hardware_pulsing: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            color: Hsv::default(),
            dim: 0.25,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            tick_interval_ms: 40,
            idle_revert_ms: 500,
            frame_port: 1337,
            rows: 16,
            cols: 32,
            parallel: 1,
            chain_length: 1,
            hardware_mapping: "regular".to_string(),
            show_refresh_rate: false,
            inverse_colors: false,
            disable_hardware_pulsing: false,
        }
    }
}

impl ClockConfig {
    /// Load from `path`, falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Could not load config from {}: {} (using defaults)",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config.sanitized())
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Clamp ranges and replace a time format chrono can't render.
    pub fn sanitized(mut self) -> Self {
        self.dim = if self.dim.is_finite() {
            self.dim.clamp(0.0, 1.0)
        } else {
            Self::default().dim
        };
        self.color.value = self.color.value.min(100);
        if !is_valid_time_format(&self.time_format) {
            tracing::warn!(
                "Invalid time format {:?}, using {:?}",
                self.time_format,
                DEFAULT_TIME_FORMAT
            );
            self.time_format = DEFAULT_TIME_FORMAT.to_string();
        }
        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self.idle_revert_ms = self.idle_revert_ms.max(1);
        self
    }

    pub fn panel(&self) -> PanelConfig {
        PanelConfig {
            rows: self.rows,
            cols: self.cols,
            chain_length: self.chain_length,
            parallel: self.parallel,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn idle_revert(&self) -> Duration {
        Duration::from_millis(self.idle_revert_ms)
    }
}

pub fn is_valid_time_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

// ── Shared runtime handle ───────────────────────────────────────────

/// Configuration shared between the control server and the engine.
///
/// Fields are independent and visually idempotent, so readers take one
/// snapshot per tick and a write simply shows up on the next one.
#[derive(Clone, Debug, Default)]
pub struct SharedConfig(Arc<Mutex<ClockConfig>>);

impl SharedConfig {
    pub fn new(config: ClockConfig) -> Self {
        Self(Arc::new(Mutex::new(config)))
    }

    pub fn snapshot(&self) -> ClockConfig {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ClockConfig) -> R) -> R {
        let mut config = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = ClockConfig::load_or_default(&tmp.path().join("nope.json"));
        assert_eq!(config, ClockConfig::default());
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert_eq!(ClockConfig::load_or_default(&path), ClockConfig::default());
    }

    #[test]
    fn absent_fields_keep_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{ "dim": 0.5, "color": { "hue": 10.0 } }"#).unwrap();

        let config = ClockConfig::load_or_default(&path);
        assert_eq!(config.dim, 0.5);
        assert_eq!(config.color.hue, 10.0);
        assert_eq!(config.color.saturation, 100.0);
        assert_eq!(config.color.value, 30);
        assert_eq!(config.time_format, DEFAULT_TIME_FORMAT);
        assert_eq!(config.frame_port, 1337);
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let config = ClockConfig {
            color: Hsv {
                hue: 200.0,
                saturation: 40.0,
                value: 80,
            },
            hardware_mapping: "adafruit-hat".to_string(),
            chain_length: 2,
            ..ClockConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(ClockConfig::load(&path).unwrap(), config);
    }

    #[rstest]
    #[case("%I:%M:%S", true)]
    #[case("%H:%M", true)]
    #[case("%Q", false)]
    #[case("", false)]
    fn test_time_format_validation(#[case] format: &str, #[case] valid: bool) {
        assert_eq!(is_valid_time_format(format), valid);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let config = ClockConfig {
            dim: 3.0,
            color: Hsv {
                value: 250,
                ..Hsv::default()
            },
            time_format: "%Q".to_string(),
            tick_interval_ms: 0,
            ..ClockConfig::default()
        }
        .sanitized();

        assert_eq!(config.dim, 1.0);
        assert_eq!(config.color.value, 100);
        assert_eq!(config.time_format, DEFAULT_TIME_FORMAT);
        assert_eq!(config.tick_interval_ms, 1);
    }

    #[test]
    fn shared_config_updates_are_visible_in_snapshots() {
        let shared = SharedConfig::new(ClockConfig::default());
        let other = shared.clone();
        other.update(|c| c.color.hue = 42.0);
        assert_eq!(shared.snapshot().color.hue, 42.0);
    }
}
