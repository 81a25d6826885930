// ⚙️ Planner configuration - planner.toml
// Settings plus the item definitions of every business unit. Definitions are
// re-registered on every run, after the snapshot's, so edits here win.

use crate::calendar::DEFAULT_SETTLEMENT_MONTH;
use crate::error::{PlannerError, Result};
use crate::items::{ExpenseItem, SalesItem};
use crate::store::{Settings, StoreBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name inside the data directory
pub const CONFIG_FILE: &str = "planner.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Absent means keep the settings already loaded from the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,

    #[serde(default)]
    pub sales: Vec<SalesItem>,

    #[serde(default)]
    pub expenses: Vec<ExpenseItem>,
}

impl PlannerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Load the file if it exists; a missing configuration is not an error
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            warn!("No configuration at {}, using snapshot definitions only", path.display());
            return Ok(None);
        }
        let config = Self::from_file(path)?;
        info!(
            "Loaded configuration {} ({} units)",
            path.display(),
            config.units.len()
        );
        Ok(Some(config))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(settings) = &self.settings {
            let month = settings.settlement_month;
            if !(1..=12).contains(&month) {
                return Err(PlannerError::config(format!(
                    "settlement_month must be between 1 and 12 (default {}), got {}",
                    DEFAULT_SETTLEMENT_MONTH, month
                )));
            }
            if settings.shared_unit.trim().is_empty() {
                return Err(PlannerError::config("shared_unit must not be empty"));
            }
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.name.trim().is_empty() {
                return Err(PlannerError::config("unit name must not be empty"));
            }
            if !seen.insert(unit.name.as_str()) {
                return Err(PlannerError::config(format!(
                    "unit '{}' is defined more than once",
                    unit.name
                )));
            }
            for item in &unit.expenses {
                if let Some(ratio) = item.ratio {
                    if !(0.0..=1.0).contains(&ratio) {
                        return Err(PlannerError::config(format!(
                            "ratio {} of '{}' in unit '{}' is outside 0..=1",
                            ratio, item.account, unit.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply settings (when given) and queue every definition into the builder
    pub fn register(&self, builder: &mut StoreBuilder) {
        if let Some(settings) = &self.settings {
            builder.set_settings(settings.clone());
        }
        for unit in &self.units {
            builder.register_unit(&unit.name);
            for item in &unit.sales {
                builder.define(&unit.name, item.clone());
            }
            for item in &unit.expenses {
                builder.define(&unit.name, item.clone());
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
