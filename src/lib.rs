//! # Gin CFR
//!
//! Counterfactual Regret Minimization training for two-player Gin Rummy.
//!
//! ## Features
//!
//! - **Outcome-sampling MCCFR**: one sampled path per walk with ε-exploration
//! - **Vanilla CFR**: full-width reference walker for shallow subtrees
//! - **Concurrent Tables**: per-key atomic updates, safe for parallel walks
//! - **Checkpointing**: text tables and JSON solver state
//!
//! ## Quick Start
//!
//! ```no_run
//! use gin_cfr::{CFRConfig, Trainer};
//!
//! let mut trainer = Trainer::new(CFRConfig::default());
//! trainer.train(10_000).unwrap();
//! trainer.save_tables("tables.txt").unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: Tables, strategies, walkers and the trainer
//! - [`games`]: Gin Rummy rules, state and scoring
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Trainer                              │
//! │  - Fresh deal per iteration   - rayon parallel walks            │
//! │  - Checkpoints                - Convergence indicator           │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//!      ┌────────────────┐              ┌────────────────┐
//!      │ OutcomeSampler │              │ VanillaWalker  │
//!      │ SampledStrategy│              │ ExactStrategy  │
//!      └────────────────┘              └────────────────┘
//!               │                               │
//!               └───────────────┬───────────────┘
//!                               ▼
//!      ┌─────────────────────────────────────────────────┐
//!      │ Tables (draw / discard / knock RegretTables)    │
//!      │ GameTree arena · InfoKey · MeldOracle · scoring │
//!      └─────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

/// CFR engine module.
///
/// Regret tables, regret-matching strategies, both walkers and the trainer.
pub mod cfr;

/// Game implementations module.
///
/// Contains Gin Rummy.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use cfr::{CFRConfig, CFRStats, GameError, Rules, Tables, Trainer};
pub use games::gin_rummy::{Card, CardSet, GameState, GameTree, InfoKey};
