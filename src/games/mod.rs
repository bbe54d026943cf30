pub mod blackjack;
pub mod card;
pub mod rps;
pub mod types;

pub use blackjack::BlackjackState;
pub use card::CardShuffleState;
pub use rps::RpsState;
pub use types::*;
