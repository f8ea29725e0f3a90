// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Front-end configuration
//!
//! Settings are read from a TOML file, then overridden by `VCSGUI_*`
//! environment variables. The demo binary applies command line flags last.
//!
//! ```toml
//! ring_size = 10
//! vsync = true
//! mode = "play"
//! spec = "NTSC"
//! overlay = "none"
//! play_scale = 3.0
//! debug_scale = 2.0
//!
//! [visible]
//! top = 40
//! bottom = 232
//! ```

use super::scheduler::ScreenMode;
use super::screen::crit::validate_geometry;
use crate::core::error::{GuiError, Result};
use crate::core::reflection::Overlay;
use crate::core::specification::{SpecId, Specification};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILE: &str = "vcsgui.toml";

/// Prefix of environment variables that override the file
pub const ENV_PREFIX: &str = "VCSGUI_";

/// Allowed number of frame buffers in the play mode ring
pub const RING_SIZE_RANGE: std::ops::RangeInclusive<usize> = 2..=64;

/// Visible window override, `bottom` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleWindow {
    pub top: usize,
    pub bottom: usize,
}

impl FromStr for VisibleWindow {
    type Err = String;

    /// Parse `TOP..BOTTOM`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (top, bottom) = s
            .split_once("..")
            .ok_or_else(|| format!("expected TOP..BOTTOM, got {}", s))?;
        let top = top.trim().parse().map_err(|e| format!("bad top scanline: {}", e))?;
        let bottom = bottom
            .trim()
            .parse()
            .map_err(|e| format!("bad bottom scanline: {}", e))?;
        Ok(Self { top, bottom })
    }
}

/// Front-end settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Frame buffers in the play mode ring
    pub ring_size: usize,
    /// Pace emulation against the display
    pub vsync: bool,
    /// Starting presentation mode
    pub mode: ScreenMode,
    /// Television specification
    pub spec: SpecId,
    /// Window scale in play mode
    pub play_scale: f32,
    /// Window scale in debug mode
    pub debug_scale: f32,
    /// Debug overlay
    pub overlay: Overlay,
    /// Display refresh rate in Hz, detected from the monitor when absent
    pub refresh_rate: Option<f32>,
    /// How long a resize waits for the render thread, in milliseconds
    pub resize_timeout_ms: u64,
    /// Capacity of the feature request queue
    pub feature_queue_size: usize,
    /// Visible window; the specification's default when absent
    pub visible: Option<VisibleWindow>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            ring_size: 10,
            vsync: true,
            mode: ScreenMode::Play,
            spec: SpecId::Ntsc,
            play_scale: 3.0,
            debug_scale: 2.0,
            overlay: Overlay::None,
            refresh_rate: None,
            resize_timeout_ms: 2000,
            feature_queue_size: 64,
            visible: None,
        }
    }
}

impl GuiConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// - [`GuiError::ConfigIo`] if the file cannot be read
    /// - [`GuiError::ConfigParse`] if it is not valid TOML for this struct
    /// - [`GuiError::InvalidConfig`] / [`GuiError::InvalidGeometry`] if a value
    ///   is out of range
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| GuiError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration as pretty TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| GuiError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `VCSGUI_*` environment variable overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));

        if let Some(v) = get("RING_SIZE") {
            self.ring_size = parse_var("RING_SIZE", &v)?;
        }
        if let Some(v) = get("VSYNC") {
            self.vsync = parse_bool("VSYNC", &v)?;
        }
        if let Some(v) = get("MODE") {
            self.mode = parse_var("MODE", &v)?;
        }
        if let Some(v) = get("SPEC") {
            self.spec = parse_var("SPEC", &v)?;
        }
        if let Some(v) = get("VISIBLE") {
            self.visible = Some(parse_var("VISIBLE", &v)?);
        }
        if let Some(v) = get("OVERLAY") {
            self.overlay = parse_var("OVERLAY", &v)?;
        }
        if let Some(v) = get("PLAY_SCALE") {
            self.play_scale = parse_var("PLAY_SCALE", &v)?;
        }
        if let Some(v) = get("DEBUG_SCALE") {
            self.debug_scale = parse_var("DEBUG_SCALE", &v)?;
        }
        if let Some(v) = get("REFRESH_RATE") {
            self.refresh_rate = Some(parse_var("REFRESH_RATE", &v)?);
        }
        Ok(())
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<()> {
        if !RING_SIZE_RANGE.contains(&self.ring_size) {
            return Err(GuiError::InvalidConfig(format!(
                "ring_size must be in {}..={}, got {}",
                RING_SIZE_RANGE.start(),
                RING_SIZE_RANGE.end(),
                self.ring_size
            )));
        }
        for (name, scale) in [("play_scale", self.play_scale), ("debug_scale", self.debug_scale)] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(GuiError::InvalidConfig(format!(
                    "{} must be greater than 0, got {}",
                    name, scale
                )));
            }
        }
        if let Some(hz) = self.refresh_rate {
            if !(hz.is_finite() && hz > 0.0) {
                return Err(GuiError::InvalidConfig(format!(
                    "refresh_rate must be greater than 0, got {}",
                    hz
                )));
            }
        }
        if self.resize_timeout_ms == 0 {
            return Err(GuiError::InvalidConfig("resize_timeout_ms must not be 0".into()));
        }
        if self.feature_queue_size == 0 {
            return Err(GuiError::InvalidConfig("feature_queue_size must not be 0".into()));
        }
        let (top, bottom) = self.visible_window();
        validate_geometry(self.specification(), top, bottom)
    }

    pub fn specification(&self) -> &'static Specification {
        Specification::get(self.spec)
    }

    /// Visible window to start with, `bottom` exclusive
    pub fn visible_window(&self) -> (usize, usize) {
        match self.visible {
            Some(w) => (w.top, w.bottom),
            None => {
                let spec = self.specification();
                (spec.visible_top, spec.visible_bottom)
            }
        }
    }

    pub fn resize_timeout(&self) -> Duration {
        Duration::from_millis(self.resize_timeout_ms)
    }

    /// Window scale for a presentation mode
    pub fn scale_for(&self, mode: ScreenMode) -> f32 {
        match mode {
            ScreenMode::Play => self.play_scale,
            ScreenMode::Debug => self.debug_scale,
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        GuiError::InvalidConfig(format!("{}{}={}: {}", ENV_PREFIX, name, value, e))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GuiError::InvalidConfig(format!(
            "{}{}={}: expected a boolean",
            ENV_PREFIX, name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_is_valid() {
        let config = GuiConfig::default();
        config.validate().unwrap();
        assert_eq!(config.visible_window(), (40, 232));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = GuiConfig {
            ring_size: 4,
            vsync: false,
            mode: ScreenMode::Debug,
            spec: SpecId::PalM,
            visible: Some(VisibleWindow { top: 30, bottom: 240 }),
            overlay: Overlay::Hmove,
            refresh_rate: Some(144.0),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("spec = \"PAL-M\""));
        assert!(contents.contains("overlay = \"hmove\""));

        assert_eq!(GuiConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "spec = \"PAL\"\n").unwrap();

        let config = GuiConfig::load(&path).unwrap();
        assert_eq!(config.spec, SpecId::Pal);
        assert_eq!(config.ring_size, 10);
        assert_eq!(config.visible_window(), (48, 276));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(GuiConfig::load(&path), Err(GuiError::ConfigIo { .. })));
        assert_eq!(GuiConfig::load_or_default(&path).unwrap(), GuiConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "ring_size = \"many\"\n").unwrap();
        assert!(matches!(GuiConfig::load(&path), Err(GuiError::ConfigParse(_))));
    }

    #[test]
    fn test_validation() {
        let bad_ring = GuiConfig {
            ring_size: 1,
            ..Default::default()
        };
        assert!(matches!(bad_ring.validate(), Err(GuiError::InvalidConfig(_))));

        let bad_scale = GuiConfig {
            play_scale: 0.0,
            ..Default::default()
        };
        assert!(bad_scale.validate().is_err());

        let bad_window = GuiConfig {
            visible: Some(VisibleWindow { top: 200, bottom: 100 }),
            ..Default::default()
        };
        assert!(matches!(
            bad_window.validate(),
            Err(GuiError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VCSGUI_RING_SIZE", "3"),
            ("VCSGUI_VSYNC", "off"),
            ("VCSGUI_MODE", "debug"),
            ("VCSGUI_SPEC", "secam"),
            ("VCSGUI_VISIBLE", "50..250"),
            ("VCSGUI_REFRESH_RATE", "59.94"),
        ]
        .into_iter()
        .collect();

        let mut config = GuiConfig::default();
        config
            .apply_env_with(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.ring_size, 3);
        assert!(!config.vsync);
        assert_eq!(config.mode, ScreenMode::Debug);
        assert_eq!(config.spec, SpecId::Secam);
        assert_eq!(config.visible_window(), (50, 250));
        assert_eq!(config.refresh_rate, Some(59.94));
        config.validate().unwrap();
    }

    #[test]
    fn test_env_override_errors_name_variable() {
        let mut config = GuiConfig::default();
        let err = config
            .apply_env_with(|name| (name == "VCSGUI_VSYNC").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("VCSGUI_VSYNC"));
    }

    #[test]
    fn test_visible_window_parse() {
        assert_eq!(
            "40..232".parse::<VisibleWindow>(),
            Ok(VisibleWindow { top: 40, bottom: 232 })
        );
        assert!("40-232".parse::<VisibleWindow>().is_err());
    }
}
