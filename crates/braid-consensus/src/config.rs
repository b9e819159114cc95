//! Engine configuration

use braid_core::{Block, BraidError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::mpsc;

/// Rule deciding when the famous witnesses of a round receive an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceivedCriterion {
    /// Every famous witness of the round sees the event
    #[default]
    Unanimous,

    /// More than half of the famous witnesses see the event
    Majority,
}

impl ReceivedCriterion {
    /// Whether `seen` out of `famous` witnesses is enough
    pub fn is_met(self, seen: usize, famous: usize) -> bool {
        match self {
            ReceivedCriterion::Unanimous => seen > 0 && seen == famous,
            ReceivedCriterion::Majority => seen > famous / 2,
        }
    }
}

/// Consensus engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Capacity of the commit channel
    #[serde(default = "default_commit_buffer")]
    pub commit_buffer: usize,

    /// Size of each engine cache; the store's hint when unset
    #[serde(default)]
    pub cache_size: Option<usize>,

    /// Round-received rule
    #[serde(default)]
    pub received_criterion: ReceivedCriterion,
}

fn default_commit_buffer() -> usize {
    400
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            commit_buffer: default_commit_buffer(),
            cache_size: None,
            received_criterion: ReceivedCriterion::default(),
        }
    }
}

impl ConsensusConfig {
    /// Parse from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| BraidError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BraidError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.commit_buffer == 0 {
            return Err(BraidError::Config("commit_buffer must be positive".into()));
        }
        if self.cache_size == Some(0) {
            return Err(BraidError::Config("cache_size must be positive".into()));
        }
        Ok(())
    }
}

/// Bounded commit channel sized by `config.commit_buffer`
pub fn commit_channel(config: &ConsensusConfig) -> (mpsc::Sender<Block>, mpsc::Receiver<Block>) {
    mpsc::channel(config.commit_buffer.max(1))
}
