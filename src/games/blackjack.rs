//! Blackjack against the house dealer, dealt from a freshly shuffled
//! single deck per session (no shared shoe across sessions).

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

use super::types::{GameError, GameOutcome, PlayerAction, RoundView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    fn symbol(&self) -> char {
        match self {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Base value before any soft-ace downgrade: face cards 10, ace 11.
    fn value(&self) -> u32 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// Hand total with standard soft/hard ace handling: aces count 11 and
/// are downgraded by 10 each while the total exceeds 21.
pub fn hand_value(cards: &[Card]) -> u8 {
    let mut total: u32 = 0;
    let mut aces = 0;
    for card in cards {
        total += card.rank.value();
        if card.rank == Rank::Ace {
            aces += 1;
        }
    }
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    total as u8
}

fn fresh_deck<R: Rng>(rng: &mut R) -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card { rank, suit });
        }
    }
    deck.shuffle(rng);
    deck
}

#[derive(Debug, Clone)]
pub struct BlackjackState {
    pub(crate) deck: Vec<Card>,
    pub(crate) player: Vec<Card>,
    pub(crate) dealer: Vec<Card>,
    pub(crate) dealer_stands_at: u8,
}

impl BlackjackState {
    /// Two cards each to player and dealer.
    pub fn deal<R: Rng>(rng: &mut R, dealer_stands_at: u8) -> Self {
        let mut deck = fresh_deck(rng);
        let dealer = deck.split_off(50);
        let player = deck.split_off(48);
        Self {
            deck,
            player,
            dealer,
            dealer_stands_at,
        }
    }

    pub fn advance<R: Rng>(
        &mut self,
        action: PlayerAction,
        _rng: &mut R,
    ) -> Result<Option<GameOutcome>, GameError> {
        match action {
            PlayerAction::Hit => {
                let Some(card) = self.deck.pop() else {
                    // deck ran dry; play out the dealer with what is left
                    return Ok(Some(self.settle_against_dealer()));
                };
                self.player.push(card);
                if hand_value(&self.player) > 21 {
                    Ok(Some(GameOutcome::Lose))
                } else {
                    Ok(None)
                }
            }
            PlayerAction::Stand => Ok(Some(self.settle_against_dealer())),
            other => Err(GameError::UnexpectedAction { action: other }),
        }
    }

    /// Dealer draws while under the stand threshold, then hands are
    /// compared.
    fn settle_against_dealer(&mut self) -> GameOutcome {
        while hand_value(&self.dealer) < self.dealer_stands_at {
            let Some(card) = self.deck.pop() else {
                break;
            };
            self.dealer.push(card);
        }

        let player = hand_value(&self.player);
        let dealer = hand_value(&self.dealer);
        if player > 21 {
            GameOutcome::Lose
        } else if dealer > 21 || player > dealer {
            GameOutcome::Win
        } else if player == dealer {
            GameOutcome::Push
        } else {
            GameOutcome::Lose
        }
    }

    /// Render snapshot; the dealer's hole card stays hidden until the
    /// hand is over.
    pub fn view(&self, terminal: bool) -> RoundView {
        let player_hand: Vec<String> = self.player.iter().map(|c| c.to_string()).collect();
        let dealer_upcard = self
            .dealer
            .first()
            .map(|c| c.to_string())
            .unwrap_or_default();
        let (dealer_hand, dealer_total) = if terminal {
            (
                Some(self.dealer.iter().map(|c| c.to_string()).collect()),
                Some(hand_value(&self.dealer)),
            )
        } else {
            (None, None)
        };
        RoundView::Blackjack {
            player_total: hand_value(&self.player),
            player_hand,
            dealer_upcard,
            dealer_hand,
            dealer_total,
        }
    }
}
