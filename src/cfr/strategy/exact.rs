use super::{Action, Strategy};
use crate::cfr::storage::Tables;
use crate::games::gin_rummy::melds::MeldOracle;

/// Regret matching with vanilla CFR updates.
///
/// Used by the full-width walker, which knows the utility of every action, so
/// no importance correction is applied.
pub struct ExactStrategy<'a> {
    tables: &'a Tables,
    oracle: &'a dyn MeldOracle,
    max_deadwood: u32,
    training: bool,
}

impl<'a> ExactStrategy<'a> {
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

    /// Fold a node's action utilities into the tables and return its value.
    ///
    /// `my_prob` is the acting player's reach and `other_prob` the opponent's.
    pub fn update_regret(
        &self,
        actions: &[Action],
        utils: &[f64],
        my_prob: f64,
        other_prob: f64,
    ) -> f64 {
        debug_assert_eq!(actions.len(), utils.len());
        let node_util: f64 = actions.iter().zip(utils).map(|(a, u)| a.p * u).sum();
        if !self.training {
            return node_util;
        }
        for (action, &util) in actions.iter().zip(utils) {
            if let Some(key) = action.key {
                let table = self.tables.for_key(&key);
                table.add_strategy(key, my_prob * action.p);
                table.add_regret(key, (util - node_util) * other_prob);
            }
        }
        node_util
    }
}

impl Strategy for ExactStrategy<'_> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gin_rummy::cards::Card;
    use crate::games::gin_rummy::info_key::{DiscardKey, InfoKey};
    use crate::games::gin_rummy::melds::MeldTable;
    use crate::games::gin_rummy::state::Move;

    fn discard_actions() -> Vec<Action> {
        (0..3u8)
            .map(|i| Action {
                mv: Move::Discard(Card::from_id(i)),
                p: [0.5, 0.25, 0.25][i as usize],
                key: Some(InfoKey::Discard(DiscardKey {
                    points: i + 1,
                    deadwood_after: 20,
                    breaks_meld: false,
                    opp_wants: false,
                    turns_left: 3,
                })),
            })
            .collect()
    }

    #[test]
    fn test_vanilla_update() {
        let tables = Tables::new();
        let strategy = ExactStrategy::new(&tables, MeldTable::shared(), 10);
        let actions = discard_actions();
        let node = strategy.update_regret(&actions, &[4.0, 8.0, -4.0], 0.5, 0.25);
        assert_eq!(node, 3.0);

        let key = |i: usize| actions[i].key.unwrap();
        assert_eq!(tables.discard.regret(&key(0)), 0.25);
        assert_eq!(tables.discard.regret(&key(1)), 1.25);
        assert_eq!(tables.discard.regret(&key(2)), -1.75);
        assert_eq!(tables.discard.strategy(&key(0)), 0.25);
        assert_eq!(tables.discard.strategy(&key(2)), 0.125);
    }

    #[test]
    fn test_frozen_returns_value_only() {
        let tables = Tables::new();
        let strategy = ExactStrategy::new(&tables, MeldTable::shared(), 10).frozen();
        let node = strategy.update_regret(&discard_actions(), &[2.0, 2.0, 2.0], 1.0, 1.0);
        assert_eq!(node, 2.0);
        assert!(tables.discard.is_empty());
    }
}
