//! End-of-hand scoring after a knock.
//!
//! Scores are from the knocker's perspective:
//!
//! ```text
//! gin       (k == 0)  →  gin_bonus + o
//! win       (k <  o)  →  o - k
//! undercut  (k >= o)  →  -(undercut_bonus + k - o)
//! ```
//!
//! where `k` is the knocker's deadwood and `o` the opponent's deadwood after
//! laying off onto the knocker's melds (no lay-off against gin).

use super::cards::CardSet;
use super::melds::MeldOracle;
use super::state::GameState;
use crate::cfr::config::Rules;
use crate::cfr::error::GameError;

/// Knocker's score given both deadwood totals.
pub fn score(knocker_deadwood: u32, opponent_deadwood: u32, rules: &Rules) -> i32 {
    let k = knocker_deadwood as i32;
    let o = opponent_deadwood as i32;
    if k == 0 {
        rules.gin_bonus + o
    } else if k < o {
        o - k
    } else {
        -(rules.undercut_bonus + k - o)
    }
}

/// Heuristic value of an unfinished hand for the player to act: the
/// opponent's best deadwood minus their own.
pub fn deadwood_margin(state: &GameState, oracle: &dyn MeldOracle) -> i32 {
    oracle.best_deadwood(state.them().cards) as i32 - oracle.best_deadwood(state.me().cards) as i32
}

/// Check that every declared meld is a legal meld drawn from `hand`, with no
/// card used twice.
pub fn validate_melds(
    player: usize,
    melds: &[CardSet],
    hand: CardSet,
    oracle: &dyn MeldOracle,
) -> Result<(), GameError> {
    let mut unmelded = hand;
    for &meld in melds {
        if !oracle.is_meld(meld) || !meld.is_subset(unmelded) {
            return Err(GameError::IllegalMeld { player, meld });
        }
        unmelded = unmelded - meld;
    }
    Ok(())
}

/// Move opponent cards onto the knocker's melds until nothing else fits.
///
/// Returns the opponent's cards that are still unmelded.
pub fn lay_off(melds: &mut [CardSet], mut unmelded: CardSet, oracle: &dyn MeldOracle) -> CardSet {
    loop {
        let placed = unmelded.iter().find_map(|card| {
            melds
                .iter()
                .position(|&m| oracle.is_meld(m.with(card)))
                .map(|i| (card, i))
        });
        match placed {
            Some((card, i)) => {
                melds[i] = melds[i].with(card);
                unmelded = unmelded.without(card);
            }
            None => return unmelded,
        }
    }
}

/// Score a knock by the player to act at `state` with explicitly declared
/// melds for both players.
pub fn settle(
    state: &GameState,
    knocker_melds: &[CardSet],
    opponent_melds: &[CardSet],
    oracle: &dyn MeldOracle,
    rules: &Rules,
) -> Result<i32, GameError> {
    let (knocker, opponent) = (state.current_player(), state.opponent());
    let knocker_hand = state.players[knocker].cards;
    let opponent_hand = state.players[opponent].cards;

    validate_melds(knocker, knocker_melds, knocker_hand, oracle)?;
    validate_melds(opponent, opponent_melds, opponent_hand, oracle)?;

    let knocker_deadwood = oracle.deadwood(knocker_melds, knocker_hand);
    if knocker_deadwood > rules.max_deadwood {
        return Err(GameError::DeadwoodOverCap {
            player: knocker,
            deadwood: knocker_deadwood,
            cap: rules.max_deadwood,
        });
    }

    let melded = opponent_melds.iter().fold(CardSet::EMPTY, |acc, &m| acc | m);
    let mut unmelded = opponent_hand - melded;
    if knocker_deadwood > 0 {
        let mut extended = knocker_melds.to_vec();
        unmelded = lay_off(&mut extended, unmelded, oracle);
    }
    Ok(score(knocker_deadwood, oracle.deadwood_points(unmelded), rules))
}

/// Score a knock with both players declaring their best melds.
///
/// The knocker lays down their best partition; the opponent picks whichever
/// of their best partitions leaves the least deadwood after laying off.
pub fn game_over(state: &GameState, oracle: &dyn MeldOracle, rules: &Rules) -> Result<i32, GameError> {
    let knocker_hand = state.me().cards;
    let opponent_hand = state.them().cards;
    let knocker_melds = oracle
        .best_meld_sets(knocker_hand)
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut candidates = oracle.best_meld_sets(opponent_hand);
    if candidates.is_empty() {
        candidates.push(Vec::new());
    }

    let mut best: Option<i32> = None;
    for opponent_melds in &candidates {
        let utility = settle(state, &knocker_melds, opponent_melds, oracle, rules)?;
        best = Some(best.map_or(utility, |b| b.min(utility)));
    }
    let utility = best.unwrap_or_default();
    log::trace!("knock at dp {} scores {}", state.decision_point, utility);
    Ok(utility)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gin_rummy::cards::Card;
    use crate::games::gin_rummy::melds::MeldTable;

    fn knock_state(knocker: &str, opponent: &str) -> GameState {
        let deck: Vec<Card> = (0..52).map(Card::from_id).collect();
        let mut state = GameState::deal(&deck);
        state.decision_point = 2;
        state.players[0].cards = CardSet::parse(knocker).unwrap();
        state.players[1].cards = CardSet::parse(opponent).unwrap();
        state
    }

    #[test]
    fn test_score_cases() {
        let rules = Rules::default();
        assert_eq!(score(0, 15, &rules), 40);
        assert_eq!(score(5, 12, &rules), 7);
        assert_eq!(score(8, 6, &rules), -27);
        assert_eq!(score(6, 6, &rules), -25);

        let big = Rules {
            gin_bonus: 31,
            undercut_bonus: 10,
            max_deadwood: 10,
        };
        assert_eq!(score(0, 0, &big), 31);
        assert_eq!(score(9, 2, &big), -17);
    }

    #[test]
    fn test_gin_has_no_lay_off() {
        let state = knock_state(
            "AC 2C 3C 4C 5C 6C 7C 8C 9C TC",
            "KC QH JS TD 9H 8S 7D 6H 5S 4D",
        );
        let utility = game_over(&state, MeldTable::shared(), &Rules::default()).unwrap();
        assert_eq!(utility, 25 + 79);
    }

    #[test]
    fn test_lay_off_reduces_opponent_deadwood() {
        // Knocker: A-3C, three 4s, 7-9S, deadwood 2D.
        // Opponent lays 4C, 6S and TS off; QQQ is their own set.
        let state = knock_state(
            "AC 2C 3C 4H 4S 4D 7S 8S 9S 2D",
            "4C TS 6S QH QD QS 9H 8H 5D 3D",
        );
        let utility = game_over(&state, MeldTable::shared(), &Rules::default()).unwrap();
        assert_eq!(utility, 25 - 2);
    }

    #[test]
    fn test_lay_off_is_fixed_point() {
        let oracle = MeldTable::shared();
        let mut melds = vec![CardSet::parse("7S 8S 9S").unwrap()];
        let left = lay_off(&mut melds, CardSet::parse("JS TS 2H").unwrap(), oracle);
        assert_eq!(left, CardSet::parse("2H").unwrap());
        assert_eq!(melds[0], CardSet::parse("7S 8S 9S TS JS").unwrap());
    }

    #[test]
    fn test_illegal_melds_are_fatal() {
        let oracle = MeldTable::shared();
        let rules = Rules::default();
        let state = knock_state(
            "AC 2C 3C 4H 4S 4D 7S 8S 9S 2D",
            "4C TS 6S QH QD QS 9H 8H 5D 3D",
        );

        let bogus = CardSet::parse("AC 2C 4H").unwrap();
        assert_eq!(
            settle(&state, &[bogus], &[], oracle, &rules),
            Err(GameError::IllegalMeld { player: 0, meld: bogus })
        );

        let stolen = CardSet::parse("QC QD QS").unwrap();
        assert_eq!(
            settle(&state, &[], &[stolen], oracle, &rules),
            Err(GameError::IllegalMeld { player: 1, meld: stolen })
        );

        let run = CardSet::parse("AC 2C 3C").unwrap();
        assert_eq!(
            validate_melds(0, &[run, run], state.players[0].cards, oracle),
            Err(GameError::IllegalMeld { player: 0, meld: run })
        );
    }

    #[test]
    fn test_deadwood_margin() {
        let mut state = knock_state(
            "AC 2C 3C 4H 4S 4D 7S 8S 9S 2D",
            "4C TS 6S QH QD QS 9H 8H 5D 3D",
        );
        let oracle = MeldTable::shared();
        assert_eq!(deadwood_margin(&state, oracle), 45 - 2);
        state.decision_point = 5;
        assert_eq!(deadwood_margin(&state, oracle), 2 - 45);
    }

    #[test]
    fn test_knock_over_cap_is_fatal() {
        let state = knock_state(
            "KC QH JS TD 9H 8S 7D 6H 5S 4D",
            "AC 2C 3C 4C 5C 6C 7C 8C 9C TC",
        );
        let err = game_over(&state, MeldTable::shared(), &Rules::default());
        assert_eq!(
            err,
            Err(GameError::DeadwoodOverCap {
                player: 0,
                deadwood: 79,
                cap: 10
            })
        );
    }
}
