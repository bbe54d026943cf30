use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Supported minigame types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Card,
    Blackjack,
    Rps,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Card => write!(f, "card"),
            GameType::Blackjack => write!(f, "blackjack"),
            GameType::Rps => write!(f, "rps"),
        }
    }
}

/// Currency a bet is denominated in. Stars are the pooled payout
/// currency; coins are a side currency that still settles against the
/// stars pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    Stars,
    Coins,
}

impl CurrencyKind {
    /// The kind backed by the house pool.
    pub fn is_pooled(&self) -> bool {
        matches!(self, CurrencyKind::Stars)
    }
}

impl fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyKind::Stars => write!(f, "stars"),
            CurrencyKind::Coins => write!(f, "coins"),
        }
    }
}

/// Ordinary rock-paper-scissors hand shapes (player-throwable)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HandShape {
    Rock,
    Paper,
    Scissors,
}

impl HandShape {
    pub const ALL: [HandShape; 3] = [HandShape::Rock, HandShape::Paper, HandShape::Scissors];
}

impl fmt::Display for HandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandShape::Rock => write!(f, "rock"),
            HandShape::Paper => write!(f, "paper"),
            HandShape::Scissors => write!(f, "scissors"),
        }
    }
}

/// What the house throws in RPS. The wildcard is the rare house-only
/// shape that beats every ordinary shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HouseThrow {
    Shape { shape: HandShape },
    Wildcard,
}

impl fmt::Display for HouseThrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HouseThrow::Shape { shape } => write!(f, "{}", shape),
            HouseThrow::Wildcard => write!(f, "wildcard"),
        }
    }
}

/// Terminal outcome of a session, from the player's perspective
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Lose,
    Push,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Win => write!(f, "win"),
            GameOutcome::Lose => write!(f, "lose"),
            GameOutcome::Push => write!(f, "push"),
        }
    }
}

/// Actions a caller can feed into `advance`. `Proceed` steps the
/// front-end-driven phases (card reveal/shuffle); the rest are player
/// moves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PlayerAction {
    Proceed,
    Pick { slot: u8 },
    Hit,
    Stand,
    Throw { shape: HandShape },
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerAction::Proceed => write!(f, "proceed"),
            PlayerAction::Pick { slot } => write!(f, "pick({})", slot),
            PlayerAction::Hit => write!(f, "hit"),
            PlayerAction::Stand => write!(f, "stand"),
            PlayerAction::Throw { shape } => write!(f, "throw({})", shape),
        }
    }
}

/// Phase of a card shuffle session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardPhase {
    Revealed,
    Shuffling,
    AwaitingPick,
}

/// Render-ready snapshot of a session's game state (discriminated union)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum RoundView {
    Card {
        phase: CardPhase,
        slots: u8,
        /// The winning slot, shown at the reveal and again at settlement
        #[serde(skip_serializing_if = "Option::is_none")]
        revealed_slot: Option<u8>,
        rare: bool,
    },
    Blackjack {
        player_hand: Vec<String>,
        player_total: u8,
        dealer_upcard: String,
        /// Full dealer hand, populated only once the hand is over
        #[serde(skip_serializing_if = "Option::is_none")]
        dealer_hand: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dealer_total: Option<u8>,
    },
    Rps {
        #[serde(skip_serializing_if = "Option::is_none")]
        thrown: Option<HandShape>,
        #[serde(skip_serializing_if = "Option::is_none")]
        house: Option<HouseThrow>,
    },
}

/// Errors raised by the pure game transition functions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("action {action} does not apply to the current game phase")]
    UnexpectedAction { action: PlayerAction },

    #[error("slot {slot} is out of range (game has {slots} slots)")]
    InvalidSlot { slot: u8, slots: u8 },
}
