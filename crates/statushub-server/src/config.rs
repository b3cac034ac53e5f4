use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_enabled")]
    pub enabled: bool,
    /// One global tick drives all sources; per-source intervals stored on
    /// data sources are advisory only.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    /// Seed the fixed default source list when the store is empty.
    #[serde(default = "default_bootstrap_sources")]
    pub bootstrap_sources: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_sync_enabled(),
            interval_secs: default_sync_interval_secs(),
            bootstrap_sources: default_bootstrap_sources(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_sync_enabled() -> bool {
    true
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_bootstrap_sources() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
