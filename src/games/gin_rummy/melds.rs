//! Meld enumeration and deadwood scoring.
//!
//! The engine consumes meld combinatorics through the [`MeldOracle`] trait so a
//! faster enumerator can be swapped in without touching the walkers. The
//! bundled [`MeldTable`] precomputes every legal meld mask (264 runs and 65
//! sets) and finds the best meld partitions of a hand by depth-first search
//! over the melds it contains.

use rustc_hash::FxHashSet;
use std::sync::OnceLock;

use super::cards::{Card, CardSet, NUM_RANKS, NUM_SUITS};

/// Meld and deadwood queries over a hand mask.
///
/// Contract:
/// - `best_meld_sets` returns partitions best-first (lowest deadwood first).
/// - An empty list means no legal meld exists in the hand.
/// - Deadwood is never negative.
pub trait MeldOracle: Send + Sync {
    /// All meld partitions of `hand` achieving the minimal deadwood.
    fn best_meld_sets(&self, hand: CardSet) -> Vec<Vec<CardSet>>;

    /// True if `mask` is a single legal run or set.
    fn is_meld(&self, mask: CardSet) -> bool;

    /// True if adding `card` to `cards` completes a meld containing `card`.
    fn completes_meld(&self, cards: CardSet, card: Card) -> bool;

    /// Deadwood of `hand` once `melds` are laid down.
    fn deadwood(&self, melds: &[CardSet], hand: CardSet) -> u32 {
        let melded = melds.iter().fold(CardSet::EMPTY, |acc, &m| acc | m);
        (hand - melded).points()
    }

    /// Deadwood of `hand` with no melds.
    fn deadwood_points(&self, hand: CardSet) -> u32 {
        hand.points()
    }

    /// Deadwood of the best partition of `hand`.
    fn best_deadwood(&self, hand: CardSet) -> u32 {
        match self.best_meld_sets(hand).first() {
            Some(melds) => self.deadwood(melds, hand),
            None => self.deadwood_points(hand),
        }
    }
}

/// Precomputed table of every legal meld.
#[derive(Debug, Clone)]
pub struct MeldTable {
    melds: Vec<CardSet>,
    lookup: FxHashSet<u64>,
    by_card: Vec<Vec<CardSet>>,
}

impl Default for MeldTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MeldTable {
    /// Build the table of all runs (3+ consecutive ranks in a suit) and
    /// sets (3 or 4 cards of a rank).
    pub fn new() -> Self {
        let mut melds = Vec::new();

        for suit in 0..NUM_SUITS {
            for start in 0..NUM_RANKS {
                let mut run = CardSet::EMPTY;
                for rank in start..NUM_RANKS {
                    run = run.with(Card::new(rank, suit));
                    if run.len() >= 3 {
                        melds.push(run);
                    }
                }
            }
        }

        for rank in 0..NUM_RANKS {
            let full = CardSet::from_cards((0..NUM_SUITS).map(|s| Card::new(rank, s)));
            melds.push(full);
            for skip in 0..NUM_SUITS {
                melds.push(full.without(Card::new(rank, skip)));
            }
        }

        let lookup = melds.iter().map(|m| m.bits()).collect();

        let mut by_card = vec![Vec::new(); NUM_RANKS as usize * NUM_SUITS as usize];
        for &meld in &melds {
            for card in meld {
                by_card[card.id() as usize].push(meld);
            }
        }

        Self {
            melds,
            lookup,
            by_card,
        }
    }

    /// Process-wide shared table.
    pub fn shared() -> &'static MeldTable {
        static TABLE: OnceLock<MeldTable> = OnceLock::new();
        TABLE.get_or_init(MeldTable::new)
    }

    /// Every legal meld.
    pub fn all(&self) -> &[CardSet] {
        &self.melds
    }

    /// Melds fully contained in `hand`.
    pub fn melds_in(&self, hand: CardSet) -> Vec<CardSet> {
        self.melds
            .iter()
            .copied()
            .filter(|m| m.is_subset(hand))
            .collect()
    }

    fn search(
        melds: &[CardSet],
        start: usize,
        used: CardSet,
        hand: CardSet,
        current: &mut Vec<CardSet>,
        best: &mut u32,
        found: &mut Vec<Vec<CardSet>>,
    ) {
        let deadwood = (hand - used).points();
        if deadwood < *best {
            *best = deadwood;
            found.clear();
            found.push(current.clone());
        } else if deadwood == *best {
            found.push(current.clone());
        }

        for i in start..melds.len() {
            let meld = melds[i];
            if (meld & used).is_empty() {
                current.push(meld);
                Self::search(melds, i + 1, used | meld, hand, current, best, found);
                current.pop();
            }
        }
    }
}

impl MeldOracle for MeldTable {
    fn best_meld_sets(&self, hand: CardSet) -> Vec<Vec<CardSet>> {
        let melds = self.melds_in(hand);
        if melds.is_empty() {
            return Vec::new();
        }

        let mut best = u32::MAX;
        let mut found = Vec::new();
        Self::search(
            &melds,
            0,
            CardSet::EMPTY,
            hand,
            &mut Vec::new(),
            &mut best,
            &mut found,
        );
        found.sort_by_key(|partition| partition.len());
        found
    }

    fn is_meld(&self, mask: CardSet) -> bool {
        self.lookup.contains(&mask.bits())
    }

    fn completes_meld(&self, cards: CardSet, card: Card) -> bool {
        let with = cards.with(card);
        self.by_card[card.id() as usize]
            .iter()
            .any(|m| m.is_subset(with))
    }
}
