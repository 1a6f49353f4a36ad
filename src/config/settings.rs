use crate::core::monetary::INITIAL_BLOCK_REWARD;
use crate::core::proof_of_work::{DEFAULT_PROGRESS_INTERVAL, MAX_DIFFICULTY};
use crate::error::{BlockchainError, Result};
use crate::storage::memory_pool::{DEFAULT_MEMPOOL_CAPACITY, DEFAULT_PURGE_TOLERANCE_MS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_PATH_KEY: &str = "CHAIN_CONFIG";
const DIFFICULTY_KEY: &str = "CHAIN_DIFFICULTY";
const SNAPSHOT_KEY: &str = "CHAIN_SNAPSHOT";

/// An initial balance credited by the genesis block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub address: String,
    pub amount: u64,
}

/// Node settings; every field has a default so a partial TOML file is enough
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub initial_difficulty: u32,
    pub min_difficulty: u32,
    pub max_difficulty: u32,
    pub target_block_time_secs: u64,
    pub adjustment_window: usize,
    pub base_reward: u64,
    pub halving_interval: Option<u64>,
    pub mempool_capacity: usize,
    pub block_tx_limit: Option<usize>,
    pub progress_interval: u64,
    pub purge_tolerance_ms: i64,
    pub snapshot_path: Option<PathBuf>,
    pub genesis_allocations: Vec<GenesisAllocation>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_difficulty: 2,
            min_difficulty: 1,
            max_difficulty: 10,
            target_block_time_secs: 10,
            adjustment_window: 5,
            base_reward: INITIAL_BLOCK_REWARD,
            halving_interval: Some(10),
            mempool_capacity: DEFAULT_MEMPOOL_CAPACITY,
            block_tx_limit: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            purge_tolerance_ms: DEFAULT_PURGE_TOLERANCE_MS,
            snapshot_path: None,
            genesis_allocations: vec![],
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Config> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Config> {
        let source = fs::read_to_string(path)
            .map_err(|e| BlockchainError::Config(format!("Cannot read {path:?}: {e}")))?;
        Self::from_toml_str(&source)
    }

    /// File named by `CHAIN_CONFIG` (or defaults), then `CHAIN_DIFFICULTY` and
    /// `CHAIN_SNAPSHOT` overrides
    pub fn from_env() -> Result<Config> {
        let mut config = match env::var(CONFIG_PATH_KEY) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Config::default(),
        };
        if let Ok(difficulty) = env::var(DIFFICULTY_KEY) {
            config.initial_difficulty = difficulty.trim().parse().map_err(|_| {
                BlockchainError::Config(format!("{DIFFICULTY_KEY} must be an integer"))
            })?;
        }
        if let Ok(snapshot) = env::var(SNAPSHOT_KEY) {
            config.snapshot_path = Some(PathBuf::from(snapshot));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_difficulty == 0 || self.max_difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "Difficulty bounds must lie within 1..={MAX_DIFFICULTY}"
            )));
        }
        if self.min_difficulty > self.max_difficulty {
            return Err(BlockchainError::Config(format!(
                "min_difficulty {} exceeds max_difficulty {}",
                self.min_difficulty, self.max_difficulty
            )));
        }
        if !(self.min_difficulty..=self.max_difficulty).contains(&self.initial_difficulty) {
            return Err(BlockchainError::Config(format!(
                "initial_difficulty {} is outside {}..={}",
                self.initial_difficulty, self.min_difficulty, self.max_difficulty
            )));
        }
        if self.adjustment_window == 0 || self.progress_interval == 0 {
            return Err(BlockchainError::Config(
                "adjustment_window and progress_interval must be positive".to_string(),
            ));
        }
        if self.halving_interval == Some(0) {
            return Err(BlockchainError::Config(
                "halving_interval must be positive when set".to_string(),
            ));
        }
        if self.mempool_capacity == 0 {
            return Err(BlockchainError::Config(
                "mempool_capacity must be positive".to_string(),
            ));
        }
        if self.purge_tolerance_ms < 0 {
            return Err(BlockchainError::Config(
                "purge_tolerance_ms cannot be negative".to_string(),
            ));
        }
        if let Some(allocation) = self
            .genesis_allocations
            .iter()
            .find(|a| a.address.is_empty() || a.amount > i64::MAX as u64)
        {
            return Err(BlockchainError::Config(format!(
                "Invalid genesis allocation {allocation:?}"
            )));
        }
        Ok(())
    }

    /// Genesis allocations as `(address, amount)` pairs
    pub fn allocations(&self) -> Vec<(String, u64)> {
        self.genesis_allocations
            .iter()
            .map(|a| (a.address.clone(), a.amount))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.halving_interval, Some(10));
        assert_eq!(config.mempool_capacity, 1_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            initial_difficulty = 3
            snapshot_path = "chain.json"

            [[genesis_allocations]]
            address = "alice"
            amount = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.initial_difficulty, 3);
        assert_eq!(config.max_difficulty, 10);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("chain.json")));
        assert_eq!(config.allocations(), vec![("alice".to_string(), 1_000)]);
    }

    #[test]
    fn test_inconsistent_bounds_are_rejected() {
        assert!(Config::from_toml_str("min_difficulty = 5\nmax_difficulty = 3").is_err());
        assert!(Config::from_toml_str("initial_difficulty = 12").is_err());
        assert!(Config::from_toml_str("halving_interval = 0").is_err());
        assert!(Config::from_toml_str("initial_difficulty = \"two\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        fs::write(&path, "adjustment_window = 3\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().adjustment_window, 3);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }
}
