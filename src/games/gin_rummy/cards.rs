//! Card and card-set representation for Gin Rummy.
//!
//! Cards are numbered 0-51 as `rank + 13 * suit`, with aces low:
//! - Ranks 0-12: A, 2, ..., 9, T, J, Q, K
//! - Suits 0-3: clubs, hearts, spades, diamonds
//!
//! A `CardSet` is a 52-bit mask where bit *i* is set when card *i* is present.
//! Every hand, seen-card overlay and discard pile in the engine is a `CardSet`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not, Sub};

/// Number of cards in the deck.
pub const NUM_CARDS: usize = 52;

/// Number of ranks per suit.
pub const NUM_RANKS: u8 = 13;

/// Number of suits.
pub const NUM_SUITS: u8 = 4;

/// Cards dealt to each player at the start of a hand.
pub const HAND_SIZE: usize = 10;

const RANK_CHARS: [char; 13] = ['A', '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K'];
const SUIT_CHARS: [char; 4] = ['C', 'H', 'S', 'D'];

const ALL_CARDS: u64 = (1u64 << NUM_CARDS) - 1;

/// A single playing card.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    id: u8,
}

impl Card {
    /// Create a card from rank (0-12) and suit (0-3).
    #[inline]
    pub fn new(rank: u8, suit: u8) -> Self {
        debug_assert!(rank < NUM_RANKS, "rank must be 0-12");
        debug_assert!(suit < NUM_SUITS, "suit must be 0-3");
        Self {
            id: rank + NUM_RANKS * suit,
        }
    }

    /// Create a card from its id (0-51).
    #[inline]
    pub fn from_id(id: u8) -> Self {
        debug_assert!((id as usize) < NUM_CARDS, "card id must be 0-51");
        Self { id }
    }

    /// Parse a card from a string like "AC", "TD", "7s".
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let r = chars.next()?.to_ascii_uppercase();
        let u = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() {
            return None;
        }
        let rank = RANK_CHARS.iter().position(|&c| c == r)?;
        let suit = SUIT_CHARS.iter().position(|&c| c == u)?;
        Some(Self::new(rank as u8, suit as u8))
    }

    /// The card's id (0-51).
    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Rank 0-12 (ace low).
    #[inline]
    pub fn rank(&self) -> u8 {
        self.id % NUM_RANKS
    }

    /// Suit 0-3.
    #[inline]
    pub fn suit(&self) -> u8 {
        self.id / NUM_RANKS
    }

    /// Deadwood value: ace 1, pips at face value, face cards 10.
    #[inline]
    pub fn points(&self) -> u32 {
        (self.rank() as u32 + 1).min(10)
    }

    /// Single-card mask.
    #[inline]
    pub fn mask(&self) -> CardSet {
        CardSet(1u64 << self.id)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[self.rank() as usize],
            SUIT_CHARS[self.suit() as usize]
        )
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A set of cards stored as a 52-bit mask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardSet(u64);

impl CardSet {
    /// The empty set.
    pub const EMPTY: CardSet = CardSet(0);

    /// Wrap a raw mask. Bits above 51 are dropped.
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self(bits & ALL_CARDS)
    }

    /// Raw mask.
    #[inline]
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Build a set from cards.
    pub fn from_cards<I: IntoIterator<Item = Card>>(cards: I) -> Self {
        cards.into_iter().fold(Self::EMPTY, |set, c| set.with(c))
    }

    /// Parse a space separated list like "AC 2C 3C".
    pub fn parse(s: &str) -> Option<Self> {
        s.split_whitespace()
            .map(Card::parse)
            .try_fold(Self::EMPTY, |set, c| c.map(|c| set.with(c)))
    }

    /// Number of cards in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True if the set holds no cards.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if `card` is in the set.
    #[inline]
    pub fn contains(&self, card: Card) -> bool {
        self.0 & (1u64 << card.id) != 0
    }

    /// True if every card of `self` is in `other`.
    #[inline]
    pub fn is_subset(&self, other: CardSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Copy with `card` added.
    #[inline]
    pub fn with(self, card: Card) -> Self {
        Self(self.0 | (1u64 << card.id))
    }

    /// Copy with `card` removed.
    #[inline]
    pub fn without(self, card: Card) -> Self {
        Self(self.0 & !(1u64 << card.id))
    }

    /// Lowest card in the set.
    #[inline]
    pub fn first(&self) -> Option<Card> {
        if self.0 == 0 {
            None
        } else {
            Some(Card::from_id(self.0.trailing_zeros() as u8))
        }
    }

    /// Iterate over the cards in id order.
    pub fn iter(&self) -> CardIter {
        CardIter(self.0)
    }

    /// Sum of deadwood values of all cards in the set.
    pub fn points(&self) -> u32 {
        self.iter().map(|c| c.points()).sum()
    }
}

impl BitOr for CardSet {
    type Output = CardSet;
    fn bitor(self, rhs: CardSet) -> CardSet {
        CardSet(self.0 | rhs.0)
    }
}

impl BitAnd for CardSet {
    type Output = CardSet;
    fn bitand(self, rhs: CardSet) -> CardSet {
        CardSet(self.0 & rhs.0)
    }
}

impl BitXor for CardSet {
    type Output = CardSet;
    fn bitxor(self, rhs: CardSet) -> CardSet {
        CardSet(self.0 ^ rhs.0)
    }
}

impl Sub for CardSet {
    type Output = CardSet;
    fn sub(self, rhs: CardSet) -> CardSet {
        CardSet(self.0 & !rhs.0)
    }
}

impl Not for CardSet {
    type Output = CardSet;
    fn not(self) -> CardSet {
        CardSet(!self.0 & ALL_CARDS)
    }
}

impl From<Card> for CardSet {
    fn from(card: Card) -> Self {
        card.mask()
    }
}

impl fmt::Display for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", names.join(" "))
    }
}

impl fmt::Debug for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Iterator over the cards of a `CardSet`.
pub struct CardIter(u64);

impl Iterator for CardIter {
    type Item = Card;

    fn next(&mut self) -> Option<Card> {
        if self.0 == 0 {
            return None;
        }
        let id = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(Card::from_id(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for CardSet {
    type Item = Card;
    type IntoIter = CardIter;

    fn into_iter(self) -> CardIter {
        self.iter()
    }
}

/// A freshly shuffled 52-card deck.
pub fn shuffled_deck<R: Rng>(rng: &mut R) -> Vec<Card> {
    let mut deck: Vec<Card> = (0..NUM_CARDS as u8).map(Card::from_id).collect();
    deck.shuffle(rng);
    deck
}
