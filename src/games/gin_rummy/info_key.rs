//! Information-set abstraction for Gin Rummy decisions.
//!
//! Every candidate action carries its own key: the handful of features that
//! matter for that choice, not the full state. Keys are small `Copy` structs
//! so the regret tables hash integers instead of strings.
//!
//! Textual form (used by table persistence):
//!
//! ```text
//! D:{first_round}:{take}:{improvement}:{completes_meld}:{turns_left}
//! X:{points}:{deadwood_after}:{breaks_meld}:{opp_wants}:{turns_left}
//! K:{knock}:{deadwood}:{gin}:{opp_known}:{turns_left}
//! ```
//!
//! Booleans are written as `0`/`1`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::cards::{Card, CardSet};
use super::melds::MeldOracle;
use super::state::{DecisionKind, GameState};

const MIN_IMPROVEMENT: i32 = -10;
const MAX_IMPROVEMENT: i32 = 20;
const MAX_DEADWOOD_AFTER: u32 = 40;
const MAX_OPP_KNOWN: usize = 6;
const DRAWS_PER_BUCKET: usize = 6;

/// Coarse count of remaining draws (0 = nearly exhausted).
pub fn turns_left_bucket(state: &GameState) -> u8 {
    (state.draws_left() / DRAWS_PER_BUCKET) as u8
}

/// Features of one draw choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawKey {
    /// Opening-round offer of the first face-up card.
    pub first_round: bool,
    /// This action takes the face-up card.
    pub take: bool,
    /// Deadwood saved by taking the face-up card and discarding optimally.
    pub improvement: i8,
    /// The face-up card completes a meld with the hand.
    pub completes_meld: bool,
    /// Remaining-draws bucket.
    pub turns_left: u8,
}

impl DrawKey {
    /// Keys for `[take, pass]` at a draw decision.
    pub fn pair(state: &GameState, face_up: Card, oracle: &dyn MeldOracle) -> [DrawKey; 2] {
        let hand = state.me().cards;
        let now = oracle.best_deadwood(hand) as i32;
        let with_up = hand.with(face_up);
        let after = hand
            .iter()
            .map(|d| oracle.best_deadwood(with_up.without(d)) as i32)
            .min()
            .unwrap_or(now);
        let improvement = (now - after).clamp(MIN_IMPROVEMENT, MAX_IMPROVEMENT) as i8;

        let base = DrawKey {
            first_round: state.is_first_round(),
            take: true,
            improvement,
            completes_meld: oracle.completes_meld(hand, face_up),
            turns_left: turns_left_bucket(state),
        };
        [base, DrawKey { take: false, ..base }]
    }
}

/// Features of discarding one particular card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscardKey {
    /// Deadwood value of the card.
    pub points: u8,
    /// Best deadwood of the hand left behind.
    pub deadwood_after: u8,
    /// The card belongs to the hand's best meld partition.
    pub breaks_meld: bool,
    /// The card completes a meld with cards known to be in the opponent's hand.
    pub opp_wants: bool,
    /// Remaining-draws bucket.
    pub turns_left: u8,
}

impl DiscardKey {
    /// Keys for discarding each of `candidates`.
    pub fn for_candidates(
        state: &GameState,
        candidates: CardSet,
        oracle: &dyn MeldOracle,
    ) -> Vec<(Card, DiscardKey)> {
        let hand = state.me().cards;
        let known = state.me().opp_cards;
        let melded = oracle
            .best_meld_sets(hand)
            .first()
            .map(|melds| melds.iter().fold(CardSet::EMPTY, |acc, &m| acc | m))
            .unwrap_or_default();
        let turns_left = turns_left_bucket(state);

        candidates
            .iter()
            .map(|card| {
                let after = oracle.best_deadwood(hand.without(card)).min(MAX_DEADWOOD_AFTER);
                let key = DiscardKey {
                    points: card.points() as u8,
                    deadwood_after: after as u8,
                    breaks_meld: melded.contains(card),
                    opp_wants: oracle.completes_meld(known, card),
                    turns_left,
                };
                (card, key)
            })
            .collect()
    }
}

/// Features of a knock decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnockKey {
    /// This action knocks.
    pub knock: bool,
    /// Current best deadwood.
    pub deadwood: u8,
    /// Deadwood is zero.
    pub gin: bool,
    /// Number of opponent cards this player knows about.
    pub opp_known: u8,
    /// Remaining-draws bucket.
    pub turns_left: u8,
}

impl KnockKey {
    /// Keys for `[knock, continue]` at a knock decision.
    pub fn pair(state: &GameState, deadwood: u32) -> [KnockKey; 2] {
        let base = KnockKey {
            knock: true,
            deadwood: u8::try_from(deadwood).unwrap_or(u8::MAX),
            gin: deadwood == 0,
            opp_known: state.me().opp_cards.len().min(MAX_OPP_KNOWN) as u8,
            turns_left: turns_left_bucket(state),
        };
        [base, KnockKey { knock: false, ..base }]
    }
}

/// Key of a single action in the regret tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfoKey {
    /// Draw decision.
    Draw(DrawKey),
    /// Discard decision.
    Discard(DiscardKey),
    /// Knock decision.
    Knock(KnockKey),
}

impl InfoKey {
    /// Decision kind the key belongs to.
    pub fn kind(&self) -> DecisionKind {
        match self {
            InfoKey::Draw(_) => DecisionKind::Draw,
            InfoKey::Discard(_) => DecisionKind::Discard,
            InfoKey::Knock(_) => DecisionKind::Knock,
        }
    }

    /// `(yes, no)` keys of the binary decision this key belongs to: take or
    /// pass, knock or continue. Discards have no fixed sibling.
    pub fn paired(&self) -> Option<(InfoKey, InfoKey)> {
        match *self {
            InfoKey::Draw(k) => Some((
                InfoKey::Draw(DrawKey { take: true, ..k }),
                InfoKey::Draw(DrawKey { take: false, ..k }),
            )),
            InfoKey::Knock(k) => Some((
                InfoKey::Knock(KnockKey { knock: true, ..k }),
                InfoKey::Knock(KnockKey { knock: false, ..k }),
            )),
            InfoKey::Discard(_) => None,
        }
    }
}

fn flag(b: bool) -> u8 {
    b as u8
}

impl fmt::Display for InfoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoKey::Draw(k) => write!(
                f,
                "D:{}:{}:{}:{}:{}",
                flag(k.first_round),
                flag(k.take),
                k.improvement,
                flag(k.completes_meld),
                k.turns_left
            ),
            InfoKey::Discard(k) => write!(
                f,
                "X:{}:{}:{}:{}:{}",
                k.points,
                k.deadwood_after,
                flag(k.breaks_meld),
                flag(k.opp_wants),
                k.turns_left
            ),
            InfoKey::Knock(k) => write!(
                f,
                "K:{}:{}:{}:{}:{}",
                flag(k.knock),
                k.deadwood,
                flag(k.gin),
                k.opp_known,
                k.turns_left
            ),
        }
    }
}

/// A key string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError(pub String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid information-set key {:?}", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

impl FromStr for InfoKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseKeyError(s.to_string());
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 6 {
            return Err(err());
        }
        let int = |i: usize| fields[i].parse::<i32>().map_err(|_| err());
        let boolean = |i: usize| match fields[i] {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(err()),
        };
        let byte = |i: usize| fields[i].parse::<u8>().map_err(|_| err());

        match fields[0] {
            "D" => Ok(InfoKey::Draw(DrawKey {
                first_round: boolean(1)?,
                take: boolean(2)?,
                improvement: i8::try_from(int(3)?).map_err(|_| err())?,
                completes_meld: boolean(4)?,
                turns_left: byte(5)?,
            })),
            "X" => Ok(InfoKey::Discard(DiscardKey {
                points: byte(1)?,
                deadwood_after: byte(2)?,
                breaks_meld: boolean(3)?,
                opp_wants: boolean(4)?,
                turns_left: byte(5)?,
            })),
            "K" => Ok(InfoKey::Knock(KnockKey {
                knock: boolean(1)?,
                deadwood: byte(2)?,
                gin: boolean(3)?,
                opp_known: byte(4)?,
                turns_left: byte(5)?,
            })),
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gin_rummy::cards::Card;
    use crate::games::gin_rummy::melds::MeldTable;
    use crate::games::gin_rummy::state::GameTree;

    fn sample_keys() -> Vec<InfoKey> {
        vec![
            InfoKey::Draw(DrawKey {
                first_round: true,
                take: false,
                improvement: -7,
                completes_meld: false,
                turns_left: 4,
            }),
            InfoKey::Discard(DiscardKey {
                points: 10,
                deadwood_after: 33,
                breaks_meld: false,
                opp_wants: true,
                turns_left: 2,
            }),
            InfoKey::Knock(KnockKey {
                knock: true,
                deadwood: 0,
                gin: true,
                opp_known: 3,
                turns_left: 0,
            }),
        ]
    }

    #[test]
    fn test_key_text_form() {
        let keys = sample_keys();
        assert_eq!(keys[0].to_string(), "D:1:0:-7:0:4");
        assert_eq!(keys[1].to_string(), "X:10:33:0:1:2");
        assert_eq!(keys[2].to_string(), "K:1:0:1:3:0");
        for key in keys {
            assert_eq!(key.to_string().parse::<InfoKey>(), Ok(key));
        }
    }

    #[test]
    fn test_bad_keys_rejected() {
        assert!("".parse::<InfoKey>().is_err());
        assert!("D:1:0:-7:0".parse::<InfoKey>().is_err());
        assert!("Z:1:0:0:0:0".parse::<InfoKey>().is_err());
        assert!("D:2:0:0:0:0".parse::<InfoKey>().is_err());
        assert!("D:1:0:999:0:0".parse::<InfoKey>().is_err());
    }

    #[test]
    fn test_paired_keys() {
        let keys = sample_keys();
        let (yes, no) = keys[0].paired().unwrap();
        assert_eq!(no, keys[0]);
        assert_eq!(yes.to_string(), "D:1:1:-7:0:4");
        assert_eq!(keys[1].paired(), None);
        assert_eq!(keys[2].paired().unwrap().0, keys[2]);
    }

    #[test]
    fn test_draw_keys_share_features() {
        let deck: Vec<Card> = (0..52).map(Card::from_id).collect();
        let (tree, root) = GameTree::new(deck);
        let state = &tree[root];
        let up = state.face_up_card.unwrap();
        let [take, pass] = DrawKey::pair(state, up, MeldTable::shared());
        assert!(take.take);
        assert!(!pass.take);
        assert!(take.first_round);
        assert_eq!(take.improvement, pass.improvement);
        assert_eq!(take.turns_left, 4);
    }

    #[test]
    fn test_knock_key_saturates_deadwood() {
        let deck: Vec<Card> = (0..52).map(Card::from_id).collect();
        let (tree, root) = GameTree::new(deck);
        let [knock, cont] = KnockKey::pair(&tree[root], 300);
        assert_eq!(knock.deadwood, u8::MAX);
        assert_eq!(cont.deadwood, u8::MAX);
        assert!(!knock.gin);
        assert_eq!(KnockKey::pair(&tree[root], 7)[0].deadwood, 7);
    }

    #[test]
    fn test_discard_keys() {
        let deck: Vec<Card> = (0..52).map(Card::from_id).collect();
        let (tree, root) = GameTree::new(deck);
        let state = &tree[root];
        // Unshuffled deck: player 0 holds A-T of clubs.
        let hand = state.me().cards;
        let keys = DiscardKey::for_candidates(state, hand, MeldTable::shared());
        assert_eq!(keys.len(), 10);
        for (card, key) in keys {
            assert!(key.breaks_meld, "{} sits in the run", card);
            assert_eq!(key.points as u32, card.points());
        }
    }
}
