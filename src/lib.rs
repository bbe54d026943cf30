//! Starhouse - Session-Based Community Wagering Engine
//!
//! Three minigames played against a shared house ledger: card shuffle,
//! blackjack and rock-paper-scissors. Sessions are ephemeral, in-memory
//! and player-owned; the pooled payout currency is the only resource
//! shared between them, and every mutation of it goes through the
//! ledger store's atomic primitives.

pub mod accounts;
pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod maintenance;
pub mod metrics;
pub mod session;
pub mod settlement;

pub use accounts::{AccountStore, InMemoryAccountStore, PlayerAccount};
pub use config::EngineConfig;
pub use errors::{EngineError, EngineResult};
pub use games::types::{
    CurrencyKind, GameOutcome, GameType, HandShape, PlayerAction, RoundView,
};
pub use ledger::{InMemoryLedgerStore, LedgerDoc, LedgerStore, ResourceCounts};
pub use maintenance::{MaintenanceReport, MaintenanceWorker};
pub use metrics::EngineMetrics;
pub use session::{ExpiryNotice, SessionManager, SessionUpdate, WagerError};
pub use settlement::Settlement;
