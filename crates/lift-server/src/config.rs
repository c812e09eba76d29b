//! Server configuration: an optional TOML file layered over defaults,
//! with the database password overridable from the environment.

use std::path::Path;

use anyhow::Context;
use lift_access::AccessConfig;
use lift_db::{DbConfig, SeedConfig};
use serde::Deserialize;

/// Environment variable that overrides `db.password`.
pub const DB_PASSWORD_ENV: &str = "LIFT_DB_PASSWORD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub access: AccessConfig,
    pub seed: SeedConfig,
    /// Buffer size of the in-process event channel.
    pub event_capacity: Option<usize>,
}

impl ServerConfig {
    /// Load `path` if it exists, otherwise start from defaults, then
    /// apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(password) = std::env::var(DB_PASSWORD_ENV) {
            config.db.password = password;
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
