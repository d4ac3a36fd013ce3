//! Regret-matching strategies over Gin Rummy decisions.
//!
//! A [`Strategy`] builds the legal actions at a node, tags each one with its
//! information-set key, and turns the accumulated tables into probabilities:
//!
//! ```text
//! training:  p[i] ∝ max(sumRegret[key_i], 0)     (regret matching)
//! playing:   p[i] ∝ max(sumStrategy[key_i], 0)   (average strategy)
//! ```
//!
//! with a uniform fallback when every weight is zero. The two implementations
//! share this contract and differ only in how they update the tables after a
//! walk returns:
//!
//! - [`SampledStrategy`]: importance-weighted updates for outcome sampling.
//! - [`ExactStrategy`]: textbook vanilla CFR updates from full enumeration.

mod exact;
mod sampled;

pub use exact::ExactStrategy;
pub use sampled::SampledStrategy;

use crate::cfr::storage::Tables;
use crate::games::gin_rummy::info_key::{DiscardKey, DrawKey, InfoKey, KnockKey};
use crate::games::gin_rummy::melds::MeldOracle;
use crate::games::gin_rummy::state::{DecisionKind, GameTree, Move, NodeId};

/// A candidate action at a decision node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Action {
    /// What the action does.
    pub mv: Move,
    /// Probability, filled in by [`Strategy::get_probabilities`].
    pub p: f64,
    /// Information-set key. `None` only when this is the sole legal action.
    pub key: Option<InfoKey>,
}

impl Action {
    fn keyed(mv: Move, key: InfoKey) -> Self {
        Self { mv, p: 0.0, key: Some(key) }
    }

    fn forced(mv: Move) -> Self {
        Self { mv, p: 1.0, key: None }
    }
}

/// Rescale `actions` so `Σ p == 1` and every `p ≥ 0`.
///
/// Negative inputs count as zero; if nothing positive remains the
/// distribution falls back to uniform.
///
/// # Panics
/// If a probability is negative or not finite after normalizing.
pub fn normalize(actions: &mut [Action]) {
    if actions.is_empty() {
        log::warn!("normalize called on an empty action set");
        return;
    }
    let sum: f64 = actions.iter().map(|a| a.p.max(0.0)).sum();
    if sum > 0.0 && sum.is_finite() {
        for a in actions.iter_mut() {
            a.p = a.p.max(0.0) / sum;
        }
    } else {
        let uniform = 1.0 / actions.len() as f64;
        for a in actions.iter_mut() {
            a.p = uniform;
        }
    }
    for a in actions.iter() {
        assert!(
            a.p >= 0.0 && a.p.is_finite(),
            "invalid probability {} for {:?}",
            a.p,
            a.mv
        );
    }
}

/// Legal actions at `id`, each tagged with its information-set key.
///
/// Probabilities are left unset.
pub fn legal_actions(
    tree: &GameTree,
    id: NodeId,
    oracle: &dyn MeldOracle,
    max_deadwood: u32,
) -> Vec<Action> {
    let state = &tree[id];
    match state.kind() {
        DecisionKind::Draw => {
            let face_up = match state.face_up_card {
                Some(card) if !tree.must_draw_face_down(id) => card,
                _ => return vec![Action::forced(Move::DrawFaceDown)],
            };
            let [take, pass] = DrawKey::pair(state, face_up, oracle);
            let pass_move = if state.is_first_round() {
                Move::DeclineFaceUp
            } else {
                Move::DrawFaceDown
            };
            vec![
                Action::keyed(Move::TakeFaceUp, InfoKey::Draw(take)),
                Action::keyed(pass_move, InfoKey::Draw(pass)),
            ]
        }
        DecisionKind::Discard => {
            let mut candidates = state.me().cards;
            if let Some(card) = tree.drawn_face_up(id) {
                candidates = candidates.without(card);
            }
            let keyed = DiscardKey::for_candidates(state, candidates, oracle);
            if keyed.len() == 1 {
                return vec![Action::forced(Move::Discard(keyed[0].0))];
            }
            keyed
                .into_iter()
                .map(|(card, key)| Action::keyed(Move::Discard(card), InfoKey::Discard(key)))
                .collect()
        }
        DecisionKind::Knock => {
            let deadwood = oracle.best_deadwood(state.me().cards);
            if deadwood > max_deadwood {
                return vec![Action::forced(Move::Continue)];
            }
            let [knock, cont] = KnockKey::pair(state, deadwood);
            vec![
                Action::keyed(Move::Knock, InfoKey::Knock(knock)),
                Action::keyed(Move::Continue, InfoKey::Knock(cont)),
            ]
        }
    }
}

/// Shared contract of the regret-matching engines.
pub trait Strategy {
    /// Regret/strategy tables, one per decision kind.
    fn tables(&self) -> &Tables;

    /// Meld oracle used to compute information-set features.
    fn oracle(&self) -> &dyn MeldOracle;

    /// Knock threshold.
    fn max_deadwood(&self) -> u32;

    /// True while training (regret matching); false to play the average strategy.
    fn training(&self) -> bool;

    /// Legal actions at `id` with probabilities filled in.
    fn get_strategy(&self, tree: &GameTree, id: NodeId) -> Vec<Action> {
        let mut actions = legal_actions(tree, id, self.oracle(), self.max_deadwood());
        self.get_probabilities(&mut actions);
        actions
    }

    /// Fill in `p` for every action from the tables.
    fn get_probabilities(&self, actions: &mut [Action]) {
        if let [only] = actions {
            only.p = 1.0;
            return;
        }
        let training = self.training();
        for a in actions.iter_mut() {
            a.p = match &a.key {
                Some(key) => {
                    let table = self.tables().for_key(key);
                    if training {
                        table.regret(key).max(0.0)
                    } else {
                        table.strategy(key).max(0.0)
                    }
                }
                None => 0.0,
            };
        }
        normalize(actions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gin_rummy::cards::{Card, CardSet};
    use crate::games::gin_rummy::melds::MeldTable;
    use crate::games::gin_rummy::state::GameState;

    struct Fixed<'a> {
        tables: &'a Tables,
        training: bool,
    }

    impl Strategy for Fixed<'_> {
        fn tables(&self) -> &Tables {
            self.tables
        }
        fn oracle(&self) -> &dyn MeldOracle {
            MeldTable::shared()
        }
        fn max_deadwood(&self) -> u32 {
            10
        }
        fn training(&self) -> bool {
            self.training
        }
    }

    fn ordered_tree() -> (GameTree, NodeId) {
        GameTree::new((0..52).map(Card::from_id).collect())
    }

    fn assert_distribution(actions: &[Action]) {
        let sum: f64 = actions.iter().map(|a| a.p).sum();
        assert!((sum - 1.0).abs() < 1e-12, "sum {}", sum);
        assert!(actions.iter().all(|a| a.p >= 0.0));
    }

    #[test]
    fn test_normalize_degenerate_is_uniform() {
        let mut actions: Vec<Action> = (0..4)
            .map(|i| Action {
                mv: Move::Discard(Card::from_id(i)),
                p: -(i as f64),
                key: None,
            })
            .collect();
        normalize(&mut actions);
        assert!(actions.iter().all(|a| a.p == 0.25));

        actions[2].p = 3.0;
        actions[3].p = -1.0;
        normalize(&mut actions);
        assert_distribution(&actions);
        assert_eq!(actions[3].p, 0.0);
    }

    #[test]
    fn test_opening_draw_actions() {
        let (tree, root) = ordered_tree();
        let tables = Tables::new();
        let strategy = Fixed { tables: &tables, training: true };
        let actions = strategy.get_strategy(&tree, root);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].mv, Move::TakeFaceUp);
        assert_eq!(actions[1].mv, Move::DeclineFaceUp);
        assert!(actions.iter().all(|a| a.p == 0.5));
    }

    #[test]
    fn test_regret_matching_and_average() {
        let (tree, root) = ordered_tree();
        let tables = Tables::new();
        let keys: Vec<InfoKey> = legal_actions(&tree, root, MeldTable::shared(), 10)
            .iter()
            .map(|a| a.key.unwrap())
            .collect();
        tables.draw.add_regret(keys[0], 9.0);
        tables.draw.add_regret(keys[1], 3.0);
        tables.draw.add_strategy(keys[0], 1.0);
        tables.draw.add_strategy(keys[1], 4.0);

        let training = Fixed { tables: &tables, training: true }.get_strategy(&tree, root);
        assert_eq!(training[0].p, 0.75);
        assert_eq!(training[1].p, 0.25);

        let playing = Fixed { tables: &tables, training: false }.get_strategy(&tree, root);
        assert_eq!(playing[0].p, 0.2);
        assert_eq!(playing[1].p, 0.8);
    }

    #[test]
    fn test_discard_excludes_face_up_pickup() {
        let (mut tree, root) = ordered_tree();
        let up = tree[root].face_up_card.unwrap();
        let child = tree[root].add_face_up_card_to_hand(root).unwrap();
        let id = tree.push(child);
        let actions = legal_actions(&tree, id, MeldTable::shared(), 10);
        assert_eq!(actions.len(), 10);
        assert!(actions.iter().all(|a| a.mv != Move::Discard(up)));
        assert!(actions.iter().all(|a| a.key.is_some()));
    }

    #[test]
    fn test_knock_only_offered_under_cap() {
        let deck: Vec<Card> = (0..52).map(Card::from_id).collect();
        let mut state = GameState::deal(&deck);
        state.decision_point = 2;
        // A-T of clubs is gin.
        let (tree, root) = GameTree::with_root(deck.clone(), state.clone());
        let actions = legal_actions(&tree, root, MeldTable::shared(), 10);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].mv, Move::Knock);

        state.players[0].cards = CardSet::parse("KC QH JS TD 9C 8H 7S 6D 5C 4H").unwrap();
        let (tree, root) = GameTree::with_root(deck, state);
        let actions = legal_actions(&tree, root, MeldTable::shared(), 10);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].mv, Move::Continue);
        assert_eq!(actions[0].key, None);
        assert_eq!(actions[0].p, 1.0);
    }

    #[test]
    fn test_forced_face_down_after_double_decline() {
        let (mut tree, root) = ordered_tree();
        let p1 = tree[root].decline_face_up_card(root).unwrap();
        let p1 = tree.push(p1);
        let p0 = tree[p1].decline_face_up_card(p1).unwrap();
        let p0 = tree.push(p0);
        let actions = legal_actions(&tree, p0, MeldTable::shared(), 10);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].mv, Move::DrawFaceDown);
        assert_eq!(actions[0].key, None);
    }
}
