//! Root error type for the wagering engine.
//!
//! Module-level errors stay close to the code that raises them; this
//! enum is the single type callers embedding the whole engine match on.

use std::error::Error as StdError;
use std::fmt;

use crate::config::ConfigValidationError;
use crate::ledger::StoreError;
use crate::session::WagerError;

#[derive(Debug)]
pub enum EngineError {
    /// Session creation or play rejected
    Wager(WagerError),

    /// Account/Ledger store failures
    Store(StoreError),

    /// Configuration loading or validation errors
    Configuration(ConfigValidationError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Wager(e) => write!(f, "Wager error: {}", e),
            EngineError::Store(e) => write!(f, "Store error: {}", e),
            EngineError::Configuration(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl StdError for EngineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            EngineError::Wager(e) => Some(e),
            EngineError::Store(e) => Some(e),
            EngineError::Configuration(e) => Some(e),
        }
    }
}

impl From<WagerError> for EngineError {
    fn from(e: WagerError) -> Self {
        EngineError::Wager(e)
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

impl From<ConfigValidationError> for EngineError {
    fn from(e: ConfigValidationError) -> Self {
        EngineError::Configuration(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
