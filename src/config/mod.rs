//! # Configuration Management Module
//!
//! Handles all configuration aspects of netbbs: a TOML file loaded with serde,
//! sensible defaults, and a `create_default` helper used by `netbbs init`.
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 8000
//! backfill_count = 2
//!
//! [[groups]]
//! id = 1
//! name = "General"
//!
//! [[groups]]
//! id = 2
//! name = "Technical"
//!
//! [logging]
//! level = "info"
//! # file = "netbbs.log"
//! ```
//!
//! The group set is fixed at startup: groups are instantiated once from this
//! list and live for the process lifetime.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind: String,
    pub port: u16,
    /// How many recent messages a newly joined member is sent.
    #[serde(default = "default_backfill_count")]
    pub backfill_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

fn default_backfill_count() -> usize {
    2
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 8000,
                backfill_count: 2,
            },
            groups: vec![
                GroupConfig {
                    id: 1,
                    name: "General".to_string(),
                },
                GroupConfig {
                    id: 2,
                    name: "Technical".to_string(),
                },
                GroupConfig {
                    id: 3,
                    name: "Community".to_string(),
                },
            ],
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_groups() {
        let config = Config::default();
        assert_eq!(config.groups.len(), 3);
        assert_eq!(config.groups[0].id, 1);
        assert_eq!(config.groups[0].name, "General");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.backfill_count, 2);
    }

    #[test]
    fn parses_minimal_config() {
        let toml_src = r#"
            [server]
            bind = "127.0.0.1"
            port = 9000

            [[groups]]
            id = 7
            name = "Lobby"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        // backfill_count falls back to its serde default
        assert_eq!(config.server.backfill_count, 2);
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].name, "Lobby");
        assert!(config.logging.file.is_none());
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();

        assert_eq!(loaded.server.port, Config::default().server.port);
        assert_eq!(loaded.groups.len(), Config::default().groups.len());
    }

    #[tokio::test]
    async fn load_missing_file_errors() {
        let err = Config::load("/nonexistent/netbbs-config.toml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
