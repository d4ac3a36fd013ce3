//! CFR (Counterfactual Regret Minimization) engine for Gin Rummy.
//!
//! This module provides two walkers over the same regret tables:
//!
//! - [`OutcomeSampler`]: outcome-sampling Monte Carlo CFR. One sampled path
//!   per walk, importance-weighted updates, ε-exploration for the trained
//!   player. This is what full games train with.
//! - [`VanillaWalker`]: full-width vanilla CFR. Every action at every node,
//!   exact updates. Only tractable on shallow subtrees, and used as the
//!   reference the sampled walker should agree with.
//!
//! # Usage
//!
//! ```no_run
//! use gin_cfr::cfr::{CFRConfig, Trainer};
//!
//! let mut trainer = Trainer::new(CFRConfig::default().with_threads(8));
//! let stats = trainer.train_parallel(100_000).unwrap();
//! println!("Trained {} keys in {:.2}s", stats.info_sets, stats.elapsed_seconds);
//! ```
//!
//! # Theory
//!
//! **Regret Matching**: Set strategy proportional to positive regrets.
//! ```text
//! Strategy(a) = max(0, Regret(a)) / sum(max(0, Regret(a')))
//! ```
//!
//! **Outcome sampling**: with `q` the trained player's sampling reach to the
//! terminal `z`, `u' = u(z) / q` and `tail` the strategy probability from the
//! node to `z`, the sampled action `s` and every other action `a` get
//! ```text
//! Regret(s) += u' · (1 - σ(s)) · tail
//! Regret(a) -= u' · σ(s) · tail
//! ```
//!
//! **Convergence**: the average strategy, not the current one, approaches
//! equilibrium.
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete Information" (2007)
//! - Lanctot, M., et al. "Monte Carlo Sampling for Regret Minimization in Extensive Games" (2009)

pub mod config;
pub mod error;
pub mod sampling;
pub mod solver;
pub mod storage;
pub mod strategy;
pub mod vanilla;

// Re-export main types for convenient access
pub use config::{CFRConfig, CFRStats, ConfigError, Rules, WalkerKind};
pub use error::{GameError, TableError};
pub use sampling::OutcomeSampler;
pub use solver::{SolverState, Trainer};
pub use storage::{RegretTable, StrategySnapshot, Tables, TablesExport};
pub use strategy::{Action, ExactStrategy, SampledStrategy, Strategy};
pub use vanilla::VanillaWalker;
