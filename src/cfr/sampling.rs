//! Outcome-sampling Monte Carlo CFR walker.
//!
//! Each walk follows exactly one path from the root to a terminal. At the
//! trained player's nodes the path is sampled from an ε-exploring mix of the
//! current strategy; everywhere else it follows the strategy itself.
//!
//! A walk returns `(scaled_utility, tail)`:
//! - `scaled_utility` is the terminal utility for the player to act at the
//!   node, divided by the trained player's sampling reach to that terminal.
//! - `tail` is the strategy probability of the path from the node down.
//!
//! Terminals:
//!
//! | condition                       | utility                       |
//! |---------------------------------|-------------------------------|
//! | draw pile at the floor          | `0` (tail 1, nothing updated) |
//! | `round >= max_turns`            | deadwood margin               |
//! | knock                           | [`game_over`] score           |

use rand::Rng;

use crate::cfr::config::{CFRConfig, Rules};
use crate::cfr::error::GameError;
use crate::cfr::storage::Tables;
use crate::cfr::strategy::{Action, SampledStrategy, Strategy};
use crate::games::gin_rummy::melds::MeldOracle;
use crate::games::gin_rummy::scoring::{deadwood_margin, game_over};
use crate::games::gin_rummy::state::{GameTree, NodeId, Transition};

/// Sample an index from a probability distribution by inverse CDF.
pub fn sample_index<R: Rng>(probs: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.gen();
    let mut cumsum = 0.0;

    for (i, &p) in probs.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }

    // Floating point shortfall: fall back to the last action that can be played
    probs
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or(probs.len() - 1)
}

/// Outcome-sampling walker training one player.
pub struct OutcomeSampler<'a> {
    strategy: SampledStrategy<'a>,
    oracle: &'a dyn MeldOracle,
    rules: Rules,
    exploration: f64,
    max_turns: Option<u32>,
    trainee: usize,
}

impl<'a> OutcomeSampler<'a> {
    /// Create a walker that trains `trainee` against the shared tables.
    pub fn new(
        tables: &'a Tables,
        oracle: &'a dyn MeldOracle,
        config: &CFRConfig,
        trainee: usize,
    ) -> Self {
        Self {
            strategy: SampledStrategy::new(tables, oracle, config.rules.max_deadwood),
            oracle,
            rules: config.rules,
            exploration: config.exploration,
            max_turns: config.max_turns,
            trainee,
        }
    }

    /// Play both seats from the average strategy with no exploration and no
    /// table updates.
    pub fn evaluating(mut self) -> Self {
        self.strategy = self.strategy.frozen();
        self
    }

    /// The strategy this walker samples from.
    pub fn strategy(&self) -> &SampledStrategy<'a> {
        &self.strategy
    }

    /// Walk one sampled path from `id`.
    ///
    /// `sample_reach` is the trained player's sampling probability of
    /// reaching `id`; pass `1.0` at the root. States allocated below `id`
    /// are released before returning.
    pub fn play_from<R: Rng>(
        &self,
        tree: &mut GameTree,
        id: NodeId,
        sample_reach: f64,
        rng: &mut R,
    ) -> Result<(f64, f64), GameError> {
        let state = &tree[id];
        if state.deck_exhausted() {
            log::debug!("draw pile exhausted at dp {}", state.decision_point);
            return Ok((0.0, 1.0));
        }
        if let Some(cap) = self.max_turns {
            if state.round() >= cap {
                let margin = deadwood_margin(state, self.oracle) as f64;
                return Ok((margin / sample_reach, 1.0));
            }
        }

        let player = state.current_player();
        let actions = self.strategy.get_strategy(tree, id);
        let exploring = self.strategy.training() && player == self.trainee;
        let probs = if exploring {
            self.explore(&actions)
        } else {
            actions.iter().map(|a| a.p).collect()
        };
        let sampled = sample_index(&probs, rng);
        let reach = if exploring {
            sample_reach * probs[sampled]
        } else {
            sample_reach
        };

        let mark = tree.len();
        let (utility, tail) = match tree.apply(id, actions[sampled].mv)? {
            Transition::Knock => {
                let score = game_over(&tree[id], self.oracle, &self.rules)?;
                (score as f64 / reach, 1.0)
            }
            Transition::Child { state, flips } => {
                let child = tree.push(state);
                let result = self.play_from(tree, child, reach, rng);
                tree.truncate(mark);
                let (u, t) = result?;
                (if flips { -u } else { u }, t)
            }
        };

        if player == self.trainee {
            self.strategy
                .update_sampled_regret(&actions, sampled, utility, tail);
        } else {
            self.strategy.update_average_strategy(&actions, sample_reach);
        }
        Ok((utility, tail * actions[sampled].p))
    }

    /// Mix ε-uniform exploration into the strategy.
    fn explore(&self, actions: &[Action]) -> Vec<f64> {
        let uniform = self.exploration / actions.len() as f64;
        actions
            .iter()
            .map(|a| uniform + (1.0 - self.exploration) * a.p)
            .collect()
    }
}
