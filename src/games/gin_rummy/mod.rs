//! Two-player Gin Rummy.
//!
//! Cards are bit positions in a `u64` ([`cards::CardSet`]), so hands, melds and
//! knowledge sets are single words and set algebra is one instruction.
//!
//! - [`cards`]: card encoding and deck handling
//! - [`melds`]: meld enumeration and deadwood
//! - [`state`]: game tree states and transitions
//! - [`info_key`]: information-set abstraction
//! - [`scoring`]: knock scoring with lay-off

pub mod cards;
pub mod info_key;
pub mod melds;
pub mod scoring;
pub mod state;

pub use cards::{Card, CardSet};
pub use info_key::InfoKey;
pub use melds::{MeldOracle, MeldTable};
pub use state::{DecisionKind, GameState, GameTree, Move, NodeId, PlayerView, Transition};
