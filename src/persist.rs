//! Durable part of the application state: selected season, active tab and
//! the filter sets of every tab, stored as JSON under a fixed key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::{DiamondError, Season};

pub const STORAGE_KEY: &str = "diamond.state";
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub key: String,
    pub version: u32,
    #[serde(default)]
    pub season: Option<Season>,
    /// View tag, kept as a string so a removed tab does not break loading.
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            key: STORAGE_KEY.to_string(),
            version: STORAGE_VERSION,
            season: None,
            tab: None,
            filters: BTreeMap::new(),
        }
    }
}

/// Default location, `~/.config/diamond/state.json` on Linux.
pub fn default_state_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("diamond").join("state.json"))
}

impl PersistedState {
    /// Reads the state file. A missing, unreadable or foreign file yields
    /// `None` and the caller starts from defaults.
    pub fn load(path: &Path) -> Option<PersistedState> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                debug!("No state at {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str::<PersistedState>(&json) {
            Ok(state) if state.key == STORAGE_KEY => Some(state),
            Ok(state) => {
                warn!(
                    "Ignoring state with foreign key {:?} at {}",
                    state.key,
                    path.display()
                );
                None
            }
            Err(e) => {
                warn!("Ignoring invalid state at {}: {e}", path.display());
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), DiamondError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Saved state to {}", path.display());
        Ok(())
    }
}
