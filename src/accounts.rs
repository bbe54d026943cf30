//! Per-player account records: currency balances, the daily RPS
//! allowance, and the earnable quota set by redistribution.
//!
//! Accounts are mutated only through atomic increment/conditional
//! operations; balances are per-player and therefore uncontended across
//! different players.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::games::types::{CurrencyKind, HandShape};
use crate::ledger::StoreError;

/// Daily-replenished hand-shape allowance gating RPS play. Distinct
/// from the wagered currency: holding stars does not let a player throw
/// a shape they have run out of.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allowances {
    pub rock: i64,
    pub paper: i64,
    pub scissors: i64,
}

impl Allowances {
    pub fn of(&self, shape: HandShape) -> i64 {
        match shape {
            HandShape::Rock => self.rock,
            HandShape::Paper => self.paper,
            HandShape::Scissors => self.scissors,
        }
    }

    fn of_mut(&mut self, shape: HandShape) -> &mut i64 {
        match shape {
            HandShape::Rock => &mut self.rock,
            HandShape::Paper => &mut self.paper,
            HandShape::Scissors => &mut self.scissors,
        }
    }
}

impl Default for Allowances {
    fn default() -> Self {
        Self {
            rock: 1,
            paper: 1,
            scissors: 1,
        }
    }
}

/// One durable record per player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerAccount {
    pub player_id: String,
    pub stars: i64,
    pub coins: i64,
    pub allowances: Allowances,
    /// Per-day earnable quota, set to `base + share` by redistribution.
    pub quota: i64,
    /// Set by the external elimination feature; blocks new sessions.
    pub eliminated: bool,
}

impl PlayerAccount {
    pub fn new(player_id: impl Into<String>, base_quota: i64) -> Self {
        Self {
            player_id: player_id.into(),
            stars: 0,
            coins: 0,
            allowances: Allowances::default(),
            quota: base_quota,
            eliminated: false,
        }
    }

    pub fn balance(&self, kind: CurrencyKind) -> i64 {
        match kind {
            CurrencyKind::Stars => self.stars,
            CurrencyKind::Coins => self.coins,
        }
    }

    fn balance_mut(&mut self, kind: CurrencyKind) -> &mut i64 {
        match kind {
            CurrencyKind::Stars => &mut self.stars,
            CurrencyKind::Coins => &mut self.coins,
        }
    }
}

/// Atomic access to player records. Like the ledger store, the durable
/// backing document store is external; the in-memory implementation is
/// the single-process reference.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, player_id: &str) -> Result<Option<PlayerAccount>, StoreError>;

    /// Atomic increment of a balance. Missing accounts are a no-op, as
    /// with a document-store update that matches nothing.
    async fn credit(
        &self,
        player_id: &str,
        kind: CurrencyKind,
        amount: i64,
    ) -> Result<(), StoreError>;

    /// Guarded decrement: debit the full `amount` only if it remains,
    /// otherwise fall back to `min(amount, current)`. Returns what was
    /// actually debited, so resolution never blocks on a short balance.
    async fn debit_balance_clamped(
        &self,
        player_id: &str,
        kind: CurrencyKind,
        amount: i64,
    ) -> Result<i64, StoreError>;

    /// Conditional decrement of one allowance unit; `false` when no
    /// unit of the shape remains (nothing is consumed).
    async fn consume_allowance(
        &self,
        player_id: &str,
        shape: HandShape,
    ) -> Result<bool, StoreError>;

    /// Daily refill: raise every player's per-shape allowance to at
    /// least `floor`, never lowering an existing value. Returns the
    /// number of accounts actually changed.
    async fn bump_allowances_to_floor(&self, floor: i64) -> Result<u64, StoreError>;

    /// Redistribution: set the quota of every non-eliminated player.
    /// Returns the number of accounts updated.
    async fn set_quota_all(&self, quota: i64) -> Result<u64, StoreError>;

    /// Number of non-eliminated players, the divisor for redistribution.
    async fn active_player_count(&self) -> Result<i64, StoreError>;
}

/// Single-process reference implementation backed by a `DashMap`.
pub struct InMemoryAccountStore {
    accounts: DashMap<String, PlayerAccount>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Insert or replace an account. Seeding hook for binaries/tests;
    /// profile creation itself belongs to the external join flow.
    pub fn upsert(&self, account: PlayerAccount) {
        self.accounts.insert(account.player_id.clone(), account);
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, player_id: &str) -> Result<Option<PlayerAccount>, StoreError> {
        Ok(self.accounts.get(player_id).map(|a| a.clone()))
    }

    async fn credit(
        &self,
        player_id: &str,
        kind: CurrencyKind,
        amount: i64,
    ) -> Result<(), StoreError> {
        if let Some(mut account) = self.accounts.get_mut(player_id) {
            *account.balance_mut(kind) += amount;
        }
        Ok(())
    }

    async fn debit_balance_clamped(
        &self,
        player_id: &str,
        kind: CurrencyKind,
        amount: i64,
    ) -> Result<i64, StoreError> {
        let Some(mut account) = self.accounts.get_mut(player_id) else {
            return Ok(0);
        };
        let balance = account.balance_mut(kind);
        let applied = amount.clamp(0, (*balance).max(0));
        *balance -= applied;
        Ok(applied)
    }

    async fn consume_allowance(
        &self,
        player_id: &str,
        shape: HandShape,
    ) -> Result<bool, StoreError> {
        let Some(mut account) = self.accounts.get_mut(player_id) else {
            return Ok(false);
        };
        let held = account.allowances.of_mut(shape);
        if *held < 1 {
            return Ok(false);
        }
        *held -= 1;
        Ok(true)
    }

    async fn bump_allowances_to_floor(&self, floor: i64) -> Result<u64, StoreError> {
        let mut changed = 0;
        for mut entry in self.accounts.iter_mut() {
            let before = entry.allowances;
            for shape in HandShape::ALL {
                let held = entry.allowances.of_mut(shape);
                *held = (*held).max(floor);
            }
            if entry.allowances != before {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_quota_all(&self, quota: i64) -> Result<u64, StoreError> {
        let mut updated = 0;
        for mut entry in self.accounts.iter_mut() {
            if entry.eliminated {
                continue;
            }
            entry.quota = quota;
            updated += 1;
        }
        Ok(updated)
    }

    async fn active_player_count(&self) -> Result<i64, StoreError> {
        let count = self.accounts.iter().filter(|a| !a.eliminated).count();
        Ok(count as i64)
    }
}
