//! Configuration management for opsheet

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub markers: MarkerConfig,
    pub regions: RegionConfig,
    pub events: EventConfig,
    pub behavior: BehaviorConfig,
}

/// Class-like markers written onto the document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkerConfig {
    pub hidden: String,
    pub entering: String,
    pub exiting: String,
    /// Placed on the root viewport while the page scroll is locked
    pub scroll_locked: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            hidden: "hidden".to_string(),
            entering: "animate-slide-in-right".to_string(),
            exiting: "animate-slide-out-right".to_string(),
            scroll_locked: "overflow-hidden".to_string(),
        }
    }
}

/// Data attributes used to find a sheet's sub-regions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    pub backdrop_attr: String,
    pub content_attr: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            backdrop_attr: "data-sheet-bg".to_string(),
            content_attr: "data-sheet-content".to_string(),
        }
    }
}

/// Broadcast event names the listener reacts to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventConfig {
    pub toggle: String,
    /// Additional names treated as toggle requests
    pub toggle_aliases: Vec<String>,
    pub animation_end: String,
    /// Capacity of the broadcast bus (per subscriber backlog)
    pub bus_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            toggle: "panel:toggle".to_string(),
            toggle_aliases: vec!["op:toggle".to_string()],
            animation_end: "animationend".to_string(),
            bus_capacity: 64,
        }
    }
}

impl EventConfig {
    pub fn is_toggle(&self, name: &str) -> bool {
        self.toggle == name || self.toggle_aliases.iter().any(|alias| alias == name)
    }
}

/// How the scroll lock reacts to overlapping panels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Lock stays until the last open panel finishes closing
    #[default]
    RefCounted,
    /// Any finished close clears the lock, even with other panels open
    SingleFlag,
}

/// What a toggle does to a panel that is still animating out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClosingToggle {
    /// Cancel the close and bring the panel back
    #[default]
    Reopen,
    /// Re-issue the exit animation and arm a fresh completion gate
    Restart,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub lock_policy: LockPolicy,
    pub closing_toggle: ClosingToggle,
    /// Force-finalize a close after this long without an animation-end
    /// signal. 0 disables the guard.
    pub close_timeout_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            lock_policy: LockPolicy::default(),
            closing_toggle: ClosingToggle::default(),
            close_timeout_ms: 1000,
        }
    }
}

impl BehaviorConfig {
    pub fn close_timeout(&self) -> Option<Duration> {
        (self.close_timeout_ms > 0).then(|| Duration::from_millis(self.close_timeout_ms))
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "opsheet") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}
