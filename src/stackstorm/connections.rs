use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionsConfig {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ConnectionEntry {
    pub fn display_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }
}

impl ConnectionsConfig {
    /// Reads the connections file. A missing or malformed file yields an empty set.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(
                "StackStorm connections config not found at {}",
                path.display()
            );
            return Self::default();
        }

        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Self>(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => {
                info!(
                    "Loaded {} StackStorm connection(s) from {}",
                    config.connections.len(),
                    path.display()
                );
                config
            }
            Err(e) => {
                warn!(
                    "Error loading StackStorm connections config {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn by_id(&self, id: &str) -> Option<&ConnectionEntry> {
        self.connections.iter().find(|conn| conn.id == id)
    }

    pub fn default_connection(&self) -> Option<&ConnectionEntry> {
        self.default.as_deref().and_then(|id| self.by_id(id))
    }
}
