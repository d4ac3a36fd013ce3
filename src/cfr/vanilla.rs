//! Full-width vanilla CFR walker.
//!
//! Expands every legal action at every node of a dealt hand and feeds the
//! exact action utilities to [`ExactStrategy::update_regret`]. Chance is
//! resolved once by the shuffle, so a walk is deterministic given the deck.
//!
//! The tree grows exponentially with depth; keep `max_turns` small.

use crate::cfr::config::{CFRConfig, Rules};
use crate::cfr::error::GameError;
use crate::cfr::strategy::{ExactStrategy, Strategy};
use crate::games::gin_rummy::melds::MeldOracle;
use crate::games::gin_rummy::scoring::{deadwood_margin, game_over};
use crate::games::gin_rummy::state::{GameTree, NodeId, Transition};

/// Vanilla CFR walker updating both players on every walk.
pub struct VanillaWalker<'a> {
    strategy: ExactStrategy<'a>,
    oracle: &'a dyn MeldOracle,
    rules: Rules,
    max_turns: Option<u32>,
}

impl<'a> VanillaWalker<'a> {
    /// Create a walker around `strategy`.
    pub fn new(strategy: ExactStrategy<'a>, oracle: &'a dyn MeldOracle, config: &CFRConfig) -> Self {
        Self {
            strategy,
            oracle,
            rules: config.rules,
            max_turns: config.max_turns,
        }
    }

    /// Expected utility at `id` for the player to act there.
    ///
    /// `reach` holds each player's own probability of reaching `id`.
    pub fn play_from(
        &self,
        tree: &mut GameTree,
        id: NodeId,
        reach: [f64; 2],
    ) -> Result<f64, GameError> {
        let state = &tree[id];
        if state.deck_exhausted() {
            log::debug!("draw pile exhausted at dp {}", state.decision_point);
            return Ok(0.0);
        }
        if let Some(cap) = self.max_turns {
            if state.round() >= cap {
                return Ok(deadwood_margin(state, self.oracle) as f64);
            }
        }

        let player = state.current_player();
        let actions = self.strategy.get_strategy(tree, id);
        let mut utils = Vec::with_capacity(actions.len());

        for action in &actions {
            let mark = tree.len();
            let util = match tree.apply(id, action.mv)? {
                Transition::Knock => game_over(&tree[id], self.oracle, &self.rules)? as f64,
                Transition::Child { state, flips } => {
                    let child = tree.push(state);
                    let mut next = reach;
                    next[player] *= action.p;
                    let result = self.play_from(tree, child, next);
                    tree.truncate(mark);
                    let u = result?;
                    if flips {
                        -u
                    } else {
                        u
                    }
                }
            };
            utils.push(util);
        }

        Ok(self
            .strategy
            .update_regret(&actions, &utils, reach[player], reach[1 - player]))
    }
}
