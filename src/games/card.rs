//! Three-card shuffle. The winning slot is revealed to the player,
//! visibly shuffled away, then picked blind. A rare 1-in-N roll at
//! creation upgrades the session to the high payout tier.

use rand::Rng;

use super::types::{CardPhase, GameError, GameOutcome, PlayerAction, RoundView};

#[derive(Debug, Clone)]
pub struct CardShuffleState {
    pub(crate) winning_slot: u8,
    pub(crate) rare_slot: bool,
    pub(crate) phase: CardPhase,
    pub(crate) slots: u8,
}

impl CardShuffleState {
    /// Roll the starting slot and the rare upgrade. Both are sampled
    /// once here and carried in the session, never re-rolled on render.
    pub fn reveal<R: Rng>(rng: &mut R, slots: u8, rare_odds: u32) -> Self {
        Self {
            winning_slot: rng.gen_range(0..slots),
            rare_slot: rng.gen_range(0..rare_odds) == 0,
            phase: CardPhase::Revealed,
            slots,
        }
    }

    /// Whether this session rolled the rare payout tier.
    pub fn is_rare(&self) -> bool {
        self.rare_slot
    }

    pub fn advance<R: Rng>(
        &mut self,
        action: PlayerAction,
        rng: &mut R,
    ) -> Result<Option<GameOutcome>, GameError> {
        match (self.phase, action) {
            (CardPhase::Revealed, PlayerAction::Proceed) => {
                self.phase = CardPhase::Shuffling;
                Ok(None)
            }
            (CardPhase::Shuffling, PlayerAction::Proceed) => {
                // The shuffle must genuinely relocate the winner:
                // uniform hop onto one of the other slots.
                let hop = rng.gen_range(1..self.slots);
                self.winning_slot = (self.winning_slot + hop) % self.slots;
                self.phase = CardPhase::AwaitingPick;
                Ok(None)
            }
            (CardPhase::AwaitingPick, PlayerAction::Pick { slot }) => {
                if slot >= self.slots {
                    return Err(GameError::InvalidSlot {
                        slot,
                        slots: self.slots,
                    });
                }
                if slot == self.winning_slot {
                    Ok(Some(GameOutcome::Win))
                } else {
                    Ok(Some(GameOutcome::Lose))
                }
            }
            (_, action) => Err(GameError::UnexpectedAction { action }),
        }
    }

    /// The slot is shown at the deal, hidden through the shuffle and
    /// the pick, and shown again once the round settles.
    pub fn view(&self, terminal: bool) -> RoundView {
        let slot_shown = self.phase == CardPhase::Revealed || terminal;
        RoundView::Card {
            phase: self.phase,
            slots: self.slots,
            revealed_slot: slot_shown.then_some(self.winning_slot),
            rare: self.rare_slot,
        }
    }
}
