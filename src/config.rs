//! Configuration management for hashledger

use crate::error::ChainError;
use crate::miner::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Peers registered at startup, in any form `/connect_node` accepts.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bootstrap_peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Receiver of the reward transaction added to every mined block.
    #[serde(default = "default_reward_receiver")]
    pub reward_receiver: String,
    #[serde(default = "default_reward_amount")]
    pub reward_amount: Amount,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward_receiver: default_reward_receiver(),
            reward_amount: default_reward_amount(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusConfig {
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.consensus.fetch_timeout_ms)
    }

    /// Validate critical values
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.miner.difficulty == 0 || self.miner.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "miner.difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, self.miner.difficulty
            )));
        }

        if self.miner.reward_receiver.trim().is_empty() {
            return Err(ChainError::ConfigError(
                "miner.reward_receiver must not be empty".to_string(),
            ));
        }

        if self.consensus.fetch_timeout_ms == 0 {
            return Err(ChainError::ConfigError(
                "consensus.fetch_timeout_ms must be positive".to_string(),
            ));
        }

        if self.network.host.trim().is_empty() {
            return Err(ChainError::ConfigError("network.host must be set".to_string()));
        }

        Ok(())
    }

    /// `PORT` overrides `network.port` when it parses.
    fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.network.port = port;
        }
    }
}

pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Read a TOML config file. A missing file yields the defaults.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let mut config = match fs::read_to_string(path.as_ref()) {
        Ok(contents) => toml::from_str::<Config>(&contents)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_reward_receiver() -> String {
    "miner".to_string()
}

fn default_reward_amount() -> Amount {
    Amount::from(1)
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}
