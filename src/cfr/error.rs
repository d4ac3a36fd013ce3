//! Error types for tree walks and table persistence.
//!
//! Protocol violations abort a walk immediately. They indicate a bug in the
//! strategy or agent driving the walk, so nothing here is ever retried.

use thiserror::Error;

use crate::games::gin_rummy::cards::{Card, CardSet};
use crate::games::gin_rummy::state::DecisionKind;

/// A rule of the game was broken during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A declared meld is not a legal run/set or is not in the player's hand.
    #[error("player {player} declared an illegal meld {meld}")]
    IllegalMeld {
        /// Offending player.
        player: usize,
        /// The declared meld mask.
        meld: CardSet,
    },

    /// Knocked with more deadwood than the rules allow.
    #[error("player {player} knocked with {deadwood} deadwood (cap {cap})")]
    DeadwoodOverCap {
        /// Offending player.
        player: usize,
        /// Deadwood at knock time.
        deadwood: u32,
        /// Maximum deadwood allowed.
        cap: u32,
    },

    /// Tried to discard the card just taken from the face-up pile.
    #[error("{card} was just taken from the discard pile and cannot be discarded")]
    WithheldDiscard {
        /// The withheld card.
        card: Card,
    },

    /// Tried to discard a card the player does not hold.
    #[error("{card} is not in the current player's hand")]
    CardNotInHand {
        /// The missing card.
        card: Card,
    },

    /// A state mutator was called in the wrong phase.
    #[error("expected a {expected:?} decision, found decision point {decision_point}")]
    OutOfPhase {
        /// Phase the mutator requires.
        expected: DecisionKind,
        /// Actual decision point.
        decision_point: u32,
    },
}

/// Failure while saving or loading regret tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// Underlying I/O failure.
    #[error("table i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The size header was missing or not a number.
    #[error("missing or malformed size header")]
    BadHeader,

    /// Fewer lines than the header promised.
    #[error("expected {expected} entries, found {found}")]
    Truncated {
        /// Entries promised by the header.
        expected: usize,
        /// Entries actually read.
        found: usize,
    },

    /// A line could not be parsed.
    #[error("malformed entry on line {line}: {content:?}")]
    BadEntry {
        /// 1-based line number.
        line: usize,
        /// Raw line content.
        content: String,
    },

    /// JSON checkpoint failure.
    #[error("checkpoint serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
