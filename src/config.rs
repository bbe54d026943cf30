//! Configuration management with validation and defaults
//!
//! One nested config tree for the whole engine: session lifetime, game
//! parameters, house seeding and the maintenance schedule.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ledger::ResourceCounts;

/// Complete engine configuration with validation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub games: GamesConfig,
    pub house: HouseConfig,
    pub maintenance: MaintenanceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            games: GamesConfig::default(),
            house: HouseConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

/// Session lifecycle configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time before a session expires; re-armed on every advance.
    pub ttl_secs: u64,
    /// Capacity of the expiry notification channel.
    pub expiry_events_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 180,
            expiry_events_capacity: 64,
        }
    }
}

/// Per-game tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GamesConfig {
    pub card: CardConfig,
    pub blackjack: BlackjackConfig,
    pub rps: RpsConfig,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            card: CardConfig::default(),
            blackjack: BlackjackConfig::default(),
            rps: RpsConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardConfig {
    pub slots: u8,
    pub payout_multiplier: f64,
    /// Payout for the rare slot tier.
    pub rare_payout_multiplier: f64,
    /// The rare tier is a 1-in-N per-session roll.
    pub rare_odds: u32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            slots: 3,
            payout_multiplier: 2.5,
            rare_payout_multiplier: 25.0,
            rare_odds: 50,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlackjackConfig {
    pub payout_multiplier: f64,
    /// Dealer draws while strictly under this total.
    pub dealer_stands_at: u8,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            payout_multiplier: 2.0,
            dealer_stands_at: 17,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpsConfig {
    pub payout_multiplier: f64,
}

impl Default for RpsConfig {
    fn default() -> Self {
        Self {
            payout_multiplier: 2.0,
        }
    }
}

/// House seeding and per-player defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HouseConfig {
    /// Pool value a freshly initialized ledger starts with.
    pub seed_pool: i64,
    /// Shape stock restored by the periodic refill.
    pub default_resources: ResourceCounts,
    /// Base of the per-player quota; redistribution adds the pool share.
    pub base_quota: i64,
    /// Daily allowance floor per shape.
    pub allowance_floor: i64,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            seed_pool: 10,
            default_resources: ResourceCounts::default_stock(),
            base_quota: 30,
            allowance_floor: 1,
        }
    }
}

/// Maintenance scheduler configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// How often the worker checks the persisted schedule.
    pub tick_secs: u64,
    /// Redistribution runs at most once per this interval, even when
    /// triggered more often.
    pub redistribution_min_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            redistribution_min_interval_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl EngineConfig {
    /// Short timers for demos and integration tests.
    pub fn quick_play() -> Self {
        Self {
            session: SessionConfig {
                ttl_secs: 30,
                ..Default::default()
            },
            maintenance: MaintenanceConfig {
                tick_secs: 1,
                redistribution_min_interval_secs: 60,
            },
            ..Default::default()
        }
    }

    /// Production profile: the stock defaults, spelled out.
    pub fn production() -> Self {
        Self {
            session: SessionConfig {
                ttl_secs: 180,
                expiry_events_capacity: 256,
            },
            maintenance: MaintenanceConfig {
                tick_secs: 60,
                redistribution_min_interval_secs: 7 * 24 * 60 * 60,
            },
            ..Default::default()
        }
    }

    /// Load a TOML config file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigValidationError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigValidationError::LoadFailed(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigValidationError::LoadFailed(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.session.ttl_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session.ttl_secs must be > 0".to_string(),
            ));
        }

        if self.games.card.slots < 2 {
            return Err(ConfigValidationError::InvalidValue(
                "games.card.slots must be >= 2".to_string(),
            ));
        }

        if self.games.card.rare_odds == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "games.card.rare_odds must be >= 1".to_string(),
            ));
        }

        for (field, multiplier) in [
            ("games.card.payout_multiplier", self.games.card.payout_multiplier),
            (
                "games.card.rare_payout_multiplier",
                self.games.card.rare_payout_multiplier,
            ),
            (
                "games.blackjack.payout_multiplier",
                self.games.blackjack.payout_multiplier,
            ),
            ("games.rps.payout_multiplier", self.games.rps.payout_multiplier),
        ] {
            if multiplier <= 0.0 {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "{} must be > 0",
                    field
                )));
            }
        }

        if self.games.card.rare_payout_multiplier <= self.games.card.payout_multiplier {
            return Err(ConfigValidationError::LogicalInconsistency(
                "rare card tier must outpay the normal tier".to_string(),
            ));
        }

        if !(2..=21).contains(&self.games.blackjack.dealer_stands_at) {
            return Err(ConfigValidationError::InvalidValue(
                "games.blackjack.dealer_stands_at must be within 2..=21".to_string(),
            ));
        }

        if self.house.seed_pool < 0 || self.house.base_quota < 0 || self.house.allowance_floor < 0 {
            return Err(ConfigValidationError::InvalidValue(
                "house values must be non-negative".to_string(),
            ));
        }

        if self.maintenance.tick_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "maintenance.tick_secs must be > 0".to_string(),
            ));
        }

        if self.maintenance.redistribution_min_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "maintenance.redistribution_min_interval_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert to duration types for internal use
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    pub fn maintenance_tick(&self) -> Duration {
        Duration::from_secs(self.maintenance.tick_secs)
    }

    pub fn redistribution_min_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance.redistribution_min_interval_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue(String),
    LogicalInconsistency(String),
    LoadFailed(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidValue(msg) => {
                write!(f, "Invalid configuration value: {}", msg)
            }
            ConfigValidationError::LogicalInconsistency(msg) => {
                write!(f, "Configuration logical inconsistency: {}", msg)
            }
            ConfigValidationError::LoadFailed(msg) => {
                write!(f, "Failed to load configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quick_play_config_is_valid() {
        let config = EngineConfig::quick_play();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_config_is_valid() {
        let config = EngineConfig::production();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = EngineConfig::default();
        config.games.card.slots = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rare_tier_consistency_validation() {
        let mut config = EngineConfig::default();
        config.games.card.rare_payout_multiplier = 2.0; // below the normal tier
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let config = EngineConfig::default();
        assert_eq!(config.session_ttl(), Duration::from_secs(180));
        assert_eq!(config.maintenance_tick(), Duration::from_secs(60));
        assert_eq!(
            config.redistribution_min_interval(),
            Duration::from_secs(604_800)
        );
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: EngineConfig = toml::from_str(&text).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.session.ttl_secs, config.session.ttl_secs);
        assert_eq!(back.house.seed_pool, config.house.seed_pool);
    }
}
