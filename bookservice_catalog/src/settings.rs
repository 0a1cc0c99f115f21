use anyhow::Context;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

const CONFIG_FILE_ENV: &str = "BOOKSERVICE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "bookservice.toml";
const ENV_PREFIX: &str = "BOOKSERVICE";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Base of the urls returned after creating or editing resources
    pub public_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseSettings {
    pub in_memory: bool,
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            in_memory: false,
            hostname: "127.0.0.1".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the optional config file, overridden by `BOOKSERVICE__<SECTION>__<KEY>` variables
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Self::build(
            Config::builder()
                .add_source(File::with_name(&config_file).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
