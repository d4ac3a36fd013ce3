use super::{Action, Strategy};
use crate::cfr::storage::Tables;
use crate::games::gin_rummy::melds::MeldOracle;

/// Regret matching with importance-weighted updates for outcome sampling.
///
/// Only one action per node is followed, so updates are scaled by the
/// returned tail probability and by the sampling reach instead of
/// enumerating the other branches.
pub struct SampledStrategy<'a> {
    tables: &'a Tables,
    oracle: &'a dyn MeldOracle,
    max_deadwood: u32,
    training: bool,
}

impl<'a> SampledStrategy<'a> {
    /// Create a strategy over shared tables.
    pub fn new(tables: &'a Tables, oracle: &'a dyn MeldOracle, max_deadwood: u32) -> Self {
        Self {
            tables,
            oracle,
            max_deadwood,
            training: true,
        }
    }

    /// Play the average strategy without touching the tables.
    pub fn frozen(mut self) -> Self {
        self.training = false;
        self
    }

    /// Credit the sampled action and debit the rest.
    ///
    /// ```text
    /// sumRegret[sampled] += u · (1 - p[sampled]) · tail
    /// sumRegret[other]   -= u · p[sampled] · tail
    /// ```
    pub fn update_sampled_regret(&self, actions: &[Action], sampled: usize, utility: f64, tail: f64) {
        if !self.training {
            return;
        }
        let ps = actions[sampled].p;
        for (i, action) in actions.iter().enumerate() {
            let Some(key) = action.key else { continue };
            let delta = if i == sampled {
                utility * (1.0 - ps) * tail
            } else {
                -utility * ps * tail
            };
            self.tables.for_key(&key).add_regret(key, delta);
        }
    }

    /// Accumulate `p[a] / sample_reach` into the average strategy.
    pub fn update_average_strategy(&self, actions: &[Action], sample_reach: f64) {
        if !self.training || sample_reach <= 0.0 {
            return;
        }
        for action in actions {
            if let Some(key) = action.key {
                self.tables.for_key(&key).add_strategy(key, action.p / sample_reach);
            }
        }
    }
}

impl Strategy for SampledStrategy<'_> {
    fn tables(&self) -> &Tables {
        self.tables
    }

    fn oracle(&self) -> &dyn MeldOracle {
        self.oracle
    }

    fn max_deadwood(&self) -> u32 {
        self.max_deadwood
    }

    fn training(&self) -> bool {
        self.training
    }
}
