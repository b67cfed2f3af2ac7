//! Runtime configuration, read from an optional TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{BalanceCheck, PROGRESS_CHUNK_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker count for the parallel sum
    pub workers: usize,

    /// Payments per chunk for the streaming sum
    pub progress_chunk_size: usize,

    /// Balance policy applied by `pay`
    pub balance_check: BalanceCheck,

    /// Records per file when exporting an account history
    pub history_records_per_file: usize,

    /// When set, each account's history is written under `<dir>/<account id>/`
    pub history_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 4,
            progress_chunk_size: PROGRESS_CHUNK_SIZE,
            balance_check: BalanceCheck::Positive,
            history_records_per_file: 100,
            history_dir: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config '{}': {}", path.display(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path.display(), e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml_str("").expect("failed to parse config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = Config::from_toml_str("workers = 16\nbalance_check = \"covering\"\n")
            .expect("failed to parse config");
        assert_eq!(config.workers, 16);
        assert_eq!(config.balance_check, BalanceCheck::Covering);
        assert_eq!(config.progress_chunk_size, PROGRESS_CHUNK_SIZE);
        assert_eq!(config.history_dir, None);
    }

    #[test]
    fn test_history_dir() {
        let input = "history_dir = \"out/history\"\nhistory_records_per_file = 10";
        let config = Config::from_toml_str(input).expect("failed to parse config");
        assert_eq!(config.history_dir, Some(PathBuf::from("out/history")));
        assert_eq!(config.history_records_per_file, 10);
    }

    #[test]
    fn test_unknown_balance_check_rejected() {
        assert!(Config::from_toml_str("balance_check = \"strict\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/ledger.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
