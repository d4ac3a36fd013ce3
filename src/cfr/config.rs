//! Configuration options for the CFR trainer.
//!
//! This module provides configuration structs that control the tree walkers
//! (exploration, turn cap) and the scoring rules they are parametric over.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Highest deadwood a ten-card hand can hold (ten face cards).
pub const MAX_HAND_DEADWOOD: u32 = 100;

/// Scoring constants of the rules variant in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// Bonus for knocking with zero deadwood.
    pub gin_bonus: i32,
    /// Bonus awarded to the defender when the knocker is undercut.
    pub undercut_bonus: i32,
    /// Highest deadwood a player may knock with.
    pub max_deadwood: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            gin_bonus: 25,
            undercut_bonus: 25,
            max_deadwood: 10,
        }
    }
}

/// Which tree walker drives training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WalkerKind {
    /// Outcome-sampling Monte Carlo CFR: one sampled path per walk.
    #[default]
    OutcomeSampling,
    /// Full-width vanilla CFR: every action at every node.
    Vanilla,
}

/// Configuration for the CFR trainer.
///
/// # Example
/// ```
/// use gin_cfr::cfr::CFRConfig;
///
/// let config = CFRConfig::default().with_exploration(0.5).with_max_turns(8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CFRConfig {
    /// Exploration probability ε mixed into the trained player's strategy.
    ///
    /// At the trained player's nodes the sampling distribution is
    /// `ε / N + (1 - ε) · σ(a)`.
    pub exploration: f64,

    /// Truncate walks after this many full rounds, scoring the hand by the
    /// deadwood difference instead of recursing further.
    ///
    /// `None` plays every hand out until a knock or the deck runs out.
    pub max_turns: Option<u32>,

    /// Scoring constants.
    pub rules: Rules,

    /// Which walker to use.
    pub walker: WalkerKind,

    /// Number of threads to use for parallel training.
    ///
    /// Set to `None` to use all available cores.
    pub num_threads: Option<usize>,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for CFRConfig {
    fn default() -> Self {
        Self {
            exploration: 0.6,
            max_turns: Some(20),
            rules: Rules::default(),
            walker: WalkerKind::OutcomeSampling,
            num_threads: None,
            seed: None,
        }
    }
}

impl CFRConfig {
    /// Create a new CFRConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for full-width training on shallow subtrees.
    ///
    /// The full-width walker expands every action, so the turn cap has to be
    /// small for a walk to finish.
    pub fn vanilla(max_turns: u32) -> Self {
        Self {
            walker: WalkerKind::Vanilla,
            max_turns: Some(max_turns),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: CFRConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method: set exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration.clamp(0.0, 1.0);
        self
    }

    /// Builder method: set the turn cap.
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    /// Builder method: play hands out without a turn cap.
    pub fn without_turn_cap(mut self) -> Self {
        self.max_turns = None;
        self
    }

    /// Builder method: set scoring rules.
    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Builder method: set the walker.
    pub fn with_walker(mut self, walker: WalkerKind) -> Self {
        self.walker = walker;
        self
    }

    /// Builder method: set number of threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(ConfigError::InvalidExploration(self.exploration));
        }
        if self.max_turns == Some(0) {
            return Err(ConfigError::ZeroTurnCap);
        }
        if self.rules.gin_bonus < 0 || self.rules.undercut_bonus < 0 {
            return Err(ConfigError::NegativeBonus);
        }
        if self.rules.max_deadwood > MAX_HAND_DEADWOOD {
            return Err(ConfigError::DeadwoodCapOutOfRange(self.rules.max_deadwood));
        }
        Ok(())
    }
}

/// Errors that can occur when loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Exploration probability is out of range [0, 1].
    #[error("exploration probability {0} is out of range [0, 1]")]
    InvalidExploration(f64),
    /// A turn cap of zero would truncate every walk at the root.
    #[error("max_turns must be at least 1")]
    ZeroTurnCap,
    /// Gin and undercut bonuses must not be negative.
    #[error("scoring bonuses must not be negative")]
    NegativeBonus,
    /// The knock cap exceeds the deadwood any hand can hold.
    #[error("max_deadwood {0} is above 100")]
    DeadwoodCapOutOfRange(u32),
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON.
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Statistics tracked during training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CFRStats {
    /// Total number of iterations completed.
    pub iterations: u64,

    /// Number of distinct information-set keys in the tables.
    pub info_sets: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,

    /// Mean positive regret per key per iteration (lower is better).
    pub average_regret: Option<f64>,
}

impl CFRStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CFRConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rules.gin_bonus, 25);
        assert_eq!(config.rules.max_deadwood, 10);
        assert_eq!(config.walker, WalkerKind::OutcomeSampling);
    }

    #[test]
    fn test_validation() {
        let mut config = CFRConfig::default();
        config.exploration = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExploration(_))
        ));

        let config = CFRConfig::default().with_max_turns(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTurnCap)));

        let config = CFRConfig::default().with_rules(Rules {
            gin_bonus: -1,
            ..Rules::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::NegativeBonus)));

        let config = CFRConfig::default().with_rules(Rules {
            max_deadwood: 300,
            ..Rules::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DeadwoodCapOutOfRange(300))
        ));
    }

    #[test]
    fn test_builder_clamps_exploration() {
        let config = CFRConfig::new().with_exploration(3.0);
        assert_eq!(config.exploration, 1.0);
    }

    #[test]
    fn test_json_round_trip() {
        let config = CFRConfig::vanilla(2).with_seed(9);
        let text = serde_json::to_string(&config).unwrap();
        let back: CFRConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.walker, WalkerKind::Vanilla);
        assert_eq!(back.max_turns, Some(2));
        assert_eq!(back.seed, Some(9));
    }
}
