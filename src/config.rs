use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credential for the completion gateway
    pub api_key: Option<String>,

    /// Completion gateway endpoint (accepts POST {prompt, model})
    pub gateway_url: String,

    /// Model identifier sent with every completion request
    pub model: String,

    /// Persona template override; `{{input}}` is replaced with the user's text
    pub persona: Option<String>,

    /// Parley home directory (config + conversation store)
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            api_key: None,
            gateway_url: "http://localhost:8787/api/chat".to_string(),
            model: "gpt-4o-mini".to_string(),
            persona: None,
            data_dir: home.join(".parley"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.parley/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(home.join(".parley"))
    }

    /// Load configuration from an explicit data directory. On first run the
    /// defaults are written out so there is a file to edit.
    pub fn load_from(data_dir: PathBuf) -> Result<Self> {
        let config_path = data_dir.join("config.toml");

        fs::create_dir_all(&data_dir).context("Failed to create .parley directory")?;

        let first_run = !config_path.exists();
        let mut config = if first_run {
            Config::default()
        } else {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        };
        config.data_dir = data_dir;

        if first_run {
            config.save()?;
        }
        Ok(config)
    }

    /// Save configuration back to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.data_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Credential from config or environment, config taking precedence
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("PARLEY_API_KEY").ok())
    }

    /// Path of the durable conversation store
    pub fn conversations_path(&self) -> PathBuf {
        self.data_dir.join("conversations.json")
    }
}
