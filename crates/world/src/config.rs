//! Tunables shared by all devices of a level.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

/// Default location of the automation config file.
pub const DEFAULT_CONFIG_PATH: &str = "config/automation.toml";

/// Device tunables loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub dropper: DropperConfig,
    pub incinerator: IncineratorConfig,
    pub smelter: SmelterConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DropperConfig {
    /// Insert into an adjacent inventory instead of spawning item entities.
    pub with_adjacent_item_insertion: bool,
}

impl Default for DropperConfig {
    fn default() -> Self {
        Self {
            with_adjacent_item_insertion: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IncineratorConfig {
    /// Energy per tick drawn while burning (4..=4096).
    pub energy_consumption: u32,
}

impl Default for IncineratorConfig {
    fn default() -> Self {
        Self {
            energy_consumption: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SmelterConfig {
    /// Energy per tick drawn while heating (8..=4096).
    pub energy_consumption: u32,
    /// Progress gained per active tick (1..=5).
    pub heatup_rate: u32,
}

impl Default for SmelterConfig {
    fn default() -> Self {
        Self {
            energy_consumption: 144,
            heatup_rate: 2,
        }
    }
}

impl SmelterConfig {
    /// Progress lost per idle tick.
    pub fn cooldown_rate(&self) -> u32 {
        (self.heatup_rate / 2).clamp(1, 5)
    }
}

impl AutomationConfig {
    /// Load from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AutomationConfig>(&contents) {
                Ok(cfg) => cfg.clamped(),
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    AutomationConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                AutomationConfig::default()
            }
        }
    }

    /// Save to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Copy with every tunable forced into its valid range.
    pub fn clamped(mut self) -> Self {
        self.incinerator.energy_consumption = self.incinerator.energy_consumption.clamp(4, 4096);
        self.smelter.energy_consumption = self.smelter.energy_consumption.clamp(8, 4096);
        self.smelter.heatup_rate = self.smelter.heatup_rate.clamp(1, 5);
        self
    }
}
