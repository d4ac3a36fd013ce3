//! Outer training loop.
//!
//! Every iteration deals a fresh hand and walks it:
//! - **Outcome sampling**: one sampled walk per seat, each training that seat
//!   while the other seat's average strategy accumulates.
//! - **Vanilla**: one full-width walk updating both seats.
//!
//! Walks are independent, so [`Trainer::train_parallel`] spreads them over a
//! rayon pool. The only shared state is the [`Tables`], whose updates are
//! atomic per key.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::cfr::config::{CFRConfig, CFRStats, WalkerKind};
use crate::cfr::error::{GameError, TableError};
use crate::cfr::sampling::OutcomeSampler;
use crate::cfr::storage::{StrategySnapshot, Tables, TablesExport};
use crate::cfr::strategy::ExactStrategy;
use crate::cfr::vanilla::VanillaWalker;
use crate::games::gin_rummy::melds::{MeldOracle, MeldTable};
use crate::games::gin_rummy::state::GameTree;

/// Deal one hand from `rng` and walk it according to `config.walker`.
fn play_deal<R: Rng>(
    tables: &Tables,
    oracle: &dyn MeldOracle,
    config: &CFRConfig,
    rng: &mut R,
) -> Result<(), GameError> {
    let (mut tree, root) = GameTree::random(rng);
    match config.walker {
        WalkerKind::OutcomeSampling => {
            for trainee in 0..2 {
                OutcomeSampler::new(tables, oracle, config, trainee)
                    .play_from(&mut tree, root, 1.0, rng)?;
            }
        }
        WalkerKind::Vanilla => {
            let strategy = ExactStrategy::new(tables, oracle, config.rules.max_deadwood);
            VanillaWalker::new(strategy, oracle, config).play_from(&mut tree, root, [1.0, 1.0])?;
        }
    }
    Ok(())
}

/// The CFR trainer for Gin Rummy.
///
/// # Example
/// ```no_run
/// use gin_cfr::cfr::{CFRConfig, Trainer};
///
/// let config = CFRConfig::default().with_max_turns(4).with_seed(7);
/// let mut trainer = Trainer::new(config);
/// let stats = trainer.train(1_000).unwrap();
/// println!("{} keys after {} iterations", stats.info_sets, stats.iterations);
/// trainer.save_tables("tables.txt").unwrap();
/// ```
pub struct Trainer {
    /// Configuration for the trainer.
    config: CFRConfig,

    /// Regret and strategy tables shared by every walk.
    tables: Tables,

    /// Meld oracle used by the walkers.
    oracle: Box<dyn MeldOracle>,

    /// Completed iterations.
    iteration: u64,

    /// Statistics tracking.
    stats: CFRStats,

    /// Random number generator for deals and sampling.
    rng: StdRng,
}

impl Trainer {
    /// Create a trainer using the bundled [`MeldTable`].
    pub fn new(config: CFRConfig) -> Self {
        Self::with_oracle(config, Box::new(MeldTable::new()))
    }

    /// Create a trainer with a custom meld oracle.
    pub fn with_oracle(config: CFRConfig, oracle: Box<dyn MeldOracle>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            tables: Tables::new(),
            oracle,
            iteration: 0,
            stats: CFRStats::new(),
            rng,
        }
    }

    /// Deal one hand and walk it.
    pub fn run_iteration(&mut self) -> Result<(), GameError> {
        play_deal(&self.tables, &*self.oracle, &self.config, &mut self.rng)?;
        self.iteration += 1;
        Ok(())
    }

    /// Train for `iterations` hands on the calling thread.
    pub fn train(&mut self, iterations: u64) -> Result<&CFRStats, GameError> {
        let prior = self.stats.elapsed_seconds;
        let start_time = Instant::now();

        for _ in 0..iterations {
            self.run_iteration()?;
        }

        self.refresh_stats(prior, start_time);
        Ok(&self.stats)
    }

    /// Train with a callback every `callback_interval` iterations.
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<&CFRStats, GameError>
    where
        F: FnMut(&CFRStats),
    {
        let prior = self.stats.elapsed_seconds;
        let start_time = Instant::now();
        let interval = callback_interval.max(1);

        for i in 0..iterations {
            self.run_iteration()?;

            if (i + 1) % interval == 0 {
                self.refresh_stats(prior, start_time);
                callback(&self.stats);
            }
        }

        self.refresh_stats(prior, start_time);
        Ok(&self.stats)
    }

    /// Train for `iterations` hands across a rayon pool.
    ///
    /// Each hand gets its own RNG seeded from the trainer's, so a seeded run
    /// deals the same hands regardless of thread count. The first protocol
    /// violation stops the batch.
    pub fn train_parallel(&mut self, iterations: u64) -> Result<&CFRStats, GameError> {
        let prior = self.stats.elapsed_seconds;
        let start_time = Instant::now();
        let base_seed: u64 = self.rng.gen();
        let tables = &self.tables;
        let oracle = &*self.oracle;
        let config = &self.config;

        let run = || {
            (0..iterations).into_par_iter().try_for_each(|i| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i));
                play_deal(tables, oracle, config, &mut rng)
            })
        };

        let result = match config.num_threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    log::warn!("could not build a {}-thread pool ({}), using the global pool", threads, e);
                    run()
                }
            },
            None => run(),
        };
        result?;

        self.iteration += iterations;
        self.refresh_stats(prior, start_time);
        Ok(&self.stats)
    }

    /// Mean utility for player 0 when both seats play the average strategy.
    ///
    /// Tables are left untouched.
    pub fn evaluate(&mut self, hands: u64) -> Result<f64, GameError> {
        if hands == 0 {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for _ in 0..hands {
            let (mut tree, root) = GameTree::random(&mut self.rng);
            let sampler =
                OutcomeSampler::new(&self.tables, &*self.oracle, &self.config, 0).evaluating();
            let (utility, _) = sampler.play_from(&mut tree, root, 1.0, &mut self.rng)?;
            total += utility;
        }
        Ok(total / hands as f64)
    }

    fn refresh_stats(&mut self, prior_seconds: f64, start_time: Instant) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.tables.num_info_sets();
        self.stats.elapsed_seconds = prior_seconds + start_time.elapsed().as_secs_f64();
        self.stats.average_regret = Some(self.tables.average_regret(self.iteration));
        self.stats.update_rate();
    }

    /// Take a snapshot of current average strategies for CI calculation.
    pub fn snapshot_strategies(&self) -> StrategySnapshot {
        self.tables.snapshot_strategies()
    }

    /// Get current CI (Convergence Indicator) compared to a snapshot.
    pub fn calculate_ci(&self, snapshot: &StrategySnapshot) -> f64 {
        self.tables.calculate_ci(snapshot)
    }

    /// Get the current iteration count.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get current statistics.
    pub fn stats(&self) -> &CFRStats {
        &self.stats
    }

    /// Get reference to the tables for analysis.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &CFRConfig {
        &self.config
    }

    /// Write the tables in the text persistence format.
    pub fn save_tables<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.tables.save(&mut writer)?;
        log::info!(
            "saved {} keys to {}",
            self.tables.num_info_sets(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replace the tables with ones saved by [`Trainer::save_tables`].
    pub fn load_tables<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TableError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        self.tables.load(reader)?;
        self.stats.info_sets = self.tables.num_info_sets();
        log::info!(
            "resumed {} keys from {}",
            self.stats.info_sets,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Export trainer state for checkpointing.
    pub fn export_state(&self) -> SolverState {
        SolverState {
            iteration: self.iteration,
            tables: self.tables.export(),
            stats: self.stats.clone(),
        }
    }

    /// Import trainer state from checkpoint.
    pub fn import_state(&mut self, state: SolverState) {
        self.iteration = state.iteration;
        self.tables.import(state.tables);
        self.stats = state.stats;
    }

    /// Write a JSON checkpoint of [`Trainer::export_state`].
    pub fn save_state<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, &self.export_state())?;
        writer.flush()?;
        log::info!(
            "checkpointed iteration {} to {}",
            self.iteration,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Restore a checkpoint written by [`Trainer::save_state`].
    ///
    /// The trainer is unchanged if the file cannot be read or parsed.
    pub fn load_state<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TableError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let state: SolverState = serde_json::from_reader(reader)?;
        self.import_state(state);
        log::info!(
            "restored iteration {} from {}",
            self.iteration,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Reset the trainer to initial state.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.iteration = 0;
        self.stats = CFRStats::new();
    }
}

/// Serializable trainer state for checkpointing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SolverState {
    /// Current iteration.
    pub iteration: u64,
    /// Table export.
    pub tables: TablesExport,
    /// Statistics.
    pub stats: CFRStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> CFRConfig {
        CFRConfig::default().with_max_turns(2).with_seed(42)
    }

    #[test]
    fn test_train_populates_tables() {
        let mut trainer = Trainer::new(small_config());
        let stats = trainer.train(50).unwrap();
        assert_eq!(stats.iterations, 50);
        assert!(stats.info_sets > 0);
        assert!(stats.average_regret.is_some());
        assert!(!trainer.tables().draw.is_empty());
        assert!(!trainer.tables().discard.is_empty());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let mut a = Trainer::new(small_config());
        let mut b = Trainer::new(small_config());
        a.train(20).unwrap();
        b.train(20).unwrap();

        let mut left = Vec::new();
        let mut right = Vec::new();
        a.tables().save(&mut left).unwrap();
        b.tables().save(&mut right).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_parallel_training() {
        let mut trainer = Trainer::new(small_config().with_threads(4));
        let stats = trainer.train_parallel(64).unwrap();
        println!("{} keys, {:.0} it/s", stats.info_sets, stats.iterations_per_second);
        assert_eq!(stats.iterations, 64);
        assert!(stats.info_sets > 0);
    }

    #[test]
    fn test_callback_interval() {
        let mut trainer = Trainer::new(small_config());
        let mut calls = Vec::new();
        trainer
            .train_with_callback(30, 10, |s| calls.push(s.iterations))
            .unwrap();
        assert_eq!(calls, vec![10, 20, 30]);
    }

    #[test]
    fn test_vanilla_walker() {
        let config = CFRConfig::vanilla(1).with_seed(5);
        let mut trainer = Trainer::new(config);
        trainer.train(2).unwrap();
        assert!(!trainer.tables().draw.is_empty());
    }

    #[test]
    fn test_evaluate_leaves_tables_alone() {
        let mut trainer = Trainer::new(small_config());
        trainer.train(10).unwrap();
        let before = trainer.tables().num_info_sets();
        let snapshot = trainer.snapshot_strategies();
        let value = trainer.evaluate(20).unwrap();
        assert!(value.is_finite());
        assert_eq!(trainer.tables().num_info_sets(), before);
        assert_eq!(trainer.calculate_ci(&snapshot), 0.0);
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut trainer = Trainer::new(small_config());
        trainer.train(10).unwrap();
        let json = serde_json::to_string(&trainer.export_state()).unwrap();

        let mut restored = Trainer::new(small_config());
        restored.import_state(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.iteration(), 10);
        assert_eq!(
            restored.tables().num_info_sets(),
            trainer.tables().num_info_sets()
        );

        restored.reset();
        assert_eq!(restored.iteration(), 0);
        assert_eq!(restored.tables().num_info_sets(), 0);
    }

    #[test]
    fn test_state_checkpoint_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gin_cfr_state_{}.json", std::process::id()));
        let mut trainer = Trainer::new(small_config());
        trainer.train(10).unwrap();
        trainer.save_state(&path).unwrap();

        let mut restored = Trainer::new(small_config());
        restored.load_state(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(restored.iteration(), 10);
        assert_eq!(
            restored.tables().num_info_sets(),
            trainer.tables().num_info_sets()
        );

        let bad = dir.join(format!("gin_cfr_bad_state_{}.json", std::process::id()));
        std::fs::write(&bad, "{\"iteration\": 3").unwrap();
        let result = restored.load_state(&bad);
        std::fs::remove_file(&bad).ok();
        assert!(matches!(result, Err(TableError::Json(_))));
        assert_eq!(restored.iteration(), 10);
    }

    #[test]
    fn test_save_and_load_tables() {
        let path = std::env::temp_dir().join(format!("gin_cfr_tables_{}.txt", std::process::id()));
        let mut trainer = Trainer::new(small_config());
        trainer.train(10).unwrap();
        trainer.save_tables(&path).unwrap();

        let mut resumed = Trainer::new(small_config());
        resumed.load_tables(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            resumed.tables().num_info_sets(),
            trainer.tables().num_info_sets()
        );
    }
}
