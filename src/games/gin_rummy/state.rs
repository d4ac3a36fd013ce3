//! Extensive-form game state for Gin Rummy.
//!
//! A walk allocates its states in a [`GameTree`] arena. Each [`GameState`] is
//! immutable once pushed; a child is derived by copying its parent and
//! overriding only the fields the action touches, and it points back to its
//! parent by [`NodeId`]. The shuffled deck lives once in the arena and only
//! `top_card` advances.
//!
//! ## Decision points
//!
//! `decision_point % 6` selects one of:
//!
//! ```text
//! 0  player 0 draw      3  player 1 draw
//! 1  player 0 discard   4  player 1 discard
//! 2  player 0 knock     5  player 1 knock
//! ```
//!
//! Points 0-5 form the opening round, where both players are offered the
//! first face-up card:
//!
//! ```text
//! 0 (P0 offered face-up)
//! ├── take    → 1 discard → 2 knock → 9 (P1 regular draw)
//! └── decline → 3 (P1 offered face-up)
//!               ├── take    → 4 discard → 5 knock → 6
//!               └── decline → 6 (P0 must draw face-down)
//! ```

use rand::Rng;
use std::fmt;
use std::ops::Index;

use super::cards::{shuffled_deck, Card, CardSet, HAND_SIZE, NUM_CARDS};
use crate::cfr::error::GameError;

/// Index of the first undealt card after the deal (two hands plus the face-up card).
pub const FIRST_DRAW: usize = 2 * HAND_SIZE + 1;

/// The hand is cancelled once `top_card` reaches this index without a knock.
pub const DECK_FLOOR: usize = 50;

/// Decision points per full round (both players draw, discard, knock).
pub const POINTS_PER_ROUND: u32 = 6;

/// The three decision types, independent of player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    /// Take the face-up card or draw face-down.
    Draw,
    /// Choose a card to discard.
    Discard,
    /// Knock or continue.
    Knock,
}

impl DecisionKind {
    /// Decision kind for a decision point.
    pub fn of(decision_point: u32) -> Self {
        match decision_point % 3 {
            0 => DecisionKind::Draw,
            1 => DecisionKind::Discard,
            _ => DecisionKind::Knock,
        }
    }
}

/// A move available at some decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// Take the face-up card.
    TakeFaceUp,
    /// Draw the top card of the deck.
    DrawFaceDown,
    /// Pass on the first face-up card (opening round only).
    DeclineFaceUp,
    /// Discard a card.
    Discard(Card),
    /// Knock, ending the hand.
    Knock,
    /// Decline to knock.
    Continue,
}

/// Outcome of applying a [`Move`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The hand continues at `state`.
    Child {
        /// The derived child state, not yet pushed.
        state: GameState,
        /// True when the child's player to act differs from the parent's, so
        /// utilities coming back up must be negated.
        flips: bool,
    },
    /// The current player knocked; the hand is scored from their perspective.
    Knock,
}

/// Reference to a state in a [`GameTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What one player holds and knows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerView {
    /// Cards in hand.
    pub cards: CardSet,
    /// Every card this player has observed (own cards included).
    pub seen_cards: CardSet,
    /// Cards this player knows are in the opponent's hand.
    pub opp_cards: CardSet,
    /// Cards this player discarded.
    pub discard: CardSet,
    /// Face-up cards this player watched the opponent pass on.
    pub forwent: CardSet,
}

/// One node of the game tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// Per-player hands and knowledge.
    pub players: [PlayerView; 2],
    /// Index of the next undealt card in the deck.
    pub top_card: usize,
    /// Top of the discard pile, if any.
    pub face_up_card: Option<Card>,
    /// Monotonic decision counter.
    pub decision_point: u32,
    /// Parent state.
    pub previous: Option<NodeId>,
}

impl GameState {
    /// Deal a fresh hand from `deck`, starting at decision point 0.
    pub fn deal(deck: &[Card]) -> Self {
        Self::deal_at(deck, 0)
    }

    /// Deal a fresh hand from `deck` with an explicit starting decision point.
    pub fn deal_at(deck: &[Card], decision_point: u32) -> Self {
        debug_assert_eq!(deck.len(), NUM_CARDS);
        let face_up = deck[2 * HAND_SIZE];
        let mut players = [PlayerView::default(); 2];
        for (p, view) in players.iter_mut().enumerate() {
            let hand = CardSet::from_cards(deck[p * HAND_SIZE..(p + 1) * HAND_SIZE].iter().copied());
            view.cards = hand;
            view.seen_cards = hand.with(face_up);
        }
        Self {
            players,
            top_card: FIRST_DRAW,
            face_up_card: Some(face_up),
            decision_point,
            previous: None,
        }
    }

    /// Player to act: `(decision_point / 3) % 2`.
    #[inline]
    pub fn current_player(&self) -> usize {
        ((self.decision_point / 3) % 2) as usize
    }

    /// The other player.
    #[inline]
    pub fn opponent(&self) -> usize {
        1 - self.current_player()
    }

    /// Decision type at this node.
    #[inline]
    pub fn kind(&self) -> DecisionKind {
        DecisionKind::of(self.decision_point)
    }

    /// Completed full rounds.
    #[inline]
    pub fn round(&self) -> u32 {
        self.decision_point / POINTS_PER_ROUND
    }

    /// True during the opening round where the first face-up card is offered.
    #[inline]
    pub fn is_first_round(&self) -> bool {
        self.decision_point < POINTS_PER_ROUND
    }

    /// True once the draw pile is down to the reserved floor.
    #[inline]
    pub fn deck_exhausted(&self) -> bool {
        self.top_card >= DECK_FLOOR
    }

    /// Cards left to draw before the floor.
    #[inline]
    pub fn draws_left(&self) -> usize {
        DECK_FLOOR.saturating_sub(self.top_card)
    }

    /// Current player's view.
    #[inline]
    pub fn me(&self) -> &PlayerView {
        &self.players[self.current_player()]
    }

    /// Opponent's view.
    #[inline]
    pub fn them(&self) -> &PlayerView {
        &self.players[self.opponent()]
    }

    fn check_phase(&self, kind: DecisionKind) -> Result<(), GameError> {
        if self.kind() == kind {
            Ok(())
        } else {
            Err(GameError::OutOfPhase {
                expected: kind,
                decision_point: self.decision_point,
            })
        }
    }

    /// Copy of this state as a child of `parent` at `decision_point`.
    fn child(&self, parent: NodeId, decision_point: u32) -> Self {
        Self {
            players: self.players,
            top_card: self.top_card,
            face_up_card: self.face_up_card,
            decision_point,
            previous: Some(parent),
        }
    }

    /// Move the face-up card into the current player's hand.
    ///
    /// The opponent sees the pickup, so the card joins their `opp_cards`.
    pub fn add_face_up_card_to_hand(&self, parent: NodeId) -> Result<Self, GameError> {
        self.check_phase(DecisionKind::Draw)?;
        let card = self.face_up_card.ok_or(GameError::OutOfPhase {
            expected: DecisionKind::Draw,
            decision_point: self.decision_point,
        })?;
        let (me, them) = (self.current_player(), self.opponent());

        let mut next = self.child(parent, self.decision_point + 1);
        next.players[me].cards = next.players[me].cards.with(card);
        next.players[me].seen_cards = next.players[me].seen_cards.with(card);
        next.players[them].opp_cards = next.players[them].opp_cards.with(card);
        next.players[them].seen_cards = next.players[them].seen_cards.with(card);
        next.face_up_card = None;
        Ok(next)
    }

    /// Draw the top card of the deck into the current player's hand.
    ///
    /// Only the drawer learns the card. The opponent infers that the face-up
    /// card left behind was passed on.
    pub fn add_face_down_card_to_hand(
        &self,
        parent: NodeId,
        deck: &[Card],
    ) -> Result<Self, GameError> {
        self.check_phase(DecisionKind::Draw)?;
        let card = deck[self.top_card];
        let (me, them) = (self.current_player(), self.opponent());

        let mut next = self.child(parent, self.decision_point + 1);
        next.top_card += 1;
        next.players[me].cards = next.players[me].cards.with(card);
        next.players[me].seen_cards = next.players[me].seen_cards.with(card);
        if let Some(face_up) = self.face_up_card {
            next.players[them].forwent = next.players[them].forwent.with(face_up);
        }
        Ok(next)
    }

    /// Pass on the first face-up card during the opening round.
    ///
    /// Control jumps straight to the other player's draw (`+3`), skipping this
    /// player's discard and knock.
    pub fn decline_face_up_card(&self, parent: NodeId) -> Result<Self, GameError> {
        self.check_phase(DecisionKind::Draw)?;
        debug_assert!(self.is_first_round());
        let them = self.opponent();

        let mut next = self.child(parent, self.decision_point + 3);
        if let Some(face_up) = self.face_up_card {
            next.players[them].forwent = next.players[them].forwent.with(face_up);
        }
        Ok(next)
    }

    /// Discard `card`, making it the new face-up card.
    ///
    /// `withheld` is the card just taken from the discard pile, if any.
    pub fn discard_card(
        &self,
        parent: NodeId,
        card: Card,
        withheld: Option<Card>,
    ) -> Result<Self, GameError> {
        self.check_phase(DecisionKind::Discard)?;
        let (me, them) = (self.current_player(), self.opponent());
        if !self.players[me].cards.contains(card) {
            return Err(GameError::CardNotInHand { card });
        }
        if withheld == Some(card) {
            return Err(GameError::WithheldDiscard { card });
        }

        let mut next = self.child(parent, self.decision_point + 1);
        next.players[me].cards = next.players[me].cards.without(card);
        next.players[me].discard = next.players[me].discard.with(card);
        next.players[them].seen_cards = next.players[them].seen_cards.with(card);
        next.players[them].opp_cards = next.players[them].opp_cards.without(card);
        next.face_up_card = Some(card);
        Ok(next)
    }

    /// Decline to knock; the turn passes to the opponent.
    ///
    /// After player 0's opening knock decision the opponent has already been
    /// offered the face-up card, so control jumps to their regular draw.
    pub fn pass_knock(&self, parent: NodeId) -> Result<Self, GameError> {
        self.check_phase(DecisionKind::Knock)?;
        let next_point = if self.decision_point == 2 {
            self.decision_point + 7
        } else {
            self.decision_point + 1
        };
        Ok(self.child(parent, next_point))
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let face_up = match self.face_up_card {
            Some(c) => c.to_string(),
            None => "--".to_string(),
        };
        write!(
            f,
            "dp={} P0:{} P1:{} up:{} top:{}",
            self.decision_point, self.players[0].cards, self.players[1].cards, face_up, self.top_card
        )
    }
}

/// Arena holding the states of a single walk.
///
/// Parents always precede their children, so a walker can `truncate` the
/// arena back to a saved length once a subtree has been fully explored.
#[derive(Debug, Clone)]
pub struct GameTree {
    deck: Vec<Card>,
    nodes: Vec<GameState>,
}

impl GameTree {
    /// Build a tree whose root is the deal of `deck`.
    pub fn new(deck: Vec<Card>) -> (Self, NodeId) {
        let root = GameState::deal(&deck);
        Self::with_root(deck, root)
    }

    /// Build a tree from a freshly shuffled deck.
    pub fn random<R: Rng>(rng: &mut R) -> (Self, NodeId) {
        Self::new(shuffled_deck(rng))
    }

    /// Build a tree with an explicit root state.
    pub fn with_root(deck: Vec<Card>, root: GameState) -> (Self, NodeId) {
        let tree = Self {
            deck,
            nodes: vec![root],
        };
        (tree, NodeId(0))
    }

    /// The shuffled deck shared by every node.
    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    /// Add a state and return its id.
    pub fn push(&mut self, state: GameState) -> NodeId {
        self.nodes.push(state);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of states currently allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every state allocated after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Parent of `id`.
    pub fn previous(&self, id: NodeId) -> Option<&GameState> {
        self[id].previous.map(|p| &self[p])
    }

    /// Card the current player just took from the face-up pile, if the last
    /// draw was a pickup. Found from the hand difference with the parent.
    pub fn drawn_face_up(&self, id: NodeId) -> Option<Card> {
        let state = &self[id];
        let parent = self.previous(id)?;
        let drawn = state.me().cards ^ parent.players[state.current_player()].cards;
        match parent.face_up_card {
            Some(up) if drawn == up.mask() => Some(up),
            _ => None,
        }
    }

    /// Derive the result of playing `mv` at `id`.
    pub fn apply(&self, id: NodeId, mv: Move) -> Result<Transition, GameError> {
        let state = &self[id];
        let child = match mv {
            Move::TakeFaceUp => state.add_face_up_card_to_hand(id)?,
            Move::DrawFaceDown => state.add_face_down_card_to_hand(id, &self.deck)?,
            Move::DeclineFaceUp => state.decline_face_up_card(id)?,
            Move::Discard(card) => state.discard_card(id, card, self.drawn_face_up(id))?,
            Move::Continue => state.pass_knock(id)?,
            Move::Knock => {
                state.check_phase(DecisionKind::Knock)?;
                return Ok(Transition::Knock);
            }
        };
        let flips = child.current_player() != state.current_player();
        Ok(Transition::Child { state: child, flips })
    }

    /// True when both players passed on the first face-up card, so the
    /// player at this draw must take from the deck.
    pub fn must_draw_face_down(&self, id: NodeId) -> bool {
        let state = &self[id];
        state.decision_point == POINTS_PER_ROUND
            && self
                .previous(id)
                .is_some_and(|p| p.decision_point == 3)
    }
}

impl Index<NodeId> for GameTree {
    type Output = GameState;

    fn index(&self, id: NodeId) -> &GameState {
        &self.nodes[id.0]
    }
}
