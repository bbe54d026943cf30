//! Resolution: the terminal step where an outcome is translated into
//! ledger and account mutations.
//!
//! Wins are paid from the shared pool through the guarded debit, so the
//! amount transferred never exceeds what the pool held at the instant
//! of the operation. Losses flow the other way, collected from the
//! player into the pool. The bet itself is never pre-deducted, so a
//! push moves no currency at all.

use serde::Serialize;
use tracing::{info, warn};

use crate::accounts::AccountStore;
use crate::games::types::{CurrencyKind, GameOutcome, GameType};
use crate::ledger::{LedgerDelta, LedgerStore, StoreError};

/// Inputs to resolution, fixed at session creation plus the outcome.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRequest<'a> {
    pub player_id: &'a str,
    pub game: GameType,
    pub kind: CurrencyKind,
    pub bet: i64,
    pub starting_balance: i64,
    pub outcome: GameOutcome,
    pub multiplier: f64,
}

/// What a terminal session actually moved.
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub outcome: GameOutcome,
    pub bet: i64,
    /// `floor(bet × multiplier)`, what a win wanted to pay.
    pub desired_payout: i64,
    /// What the pool could actually cover; always shown to the player
    /// instead of the desired amount.
    pub paid: i64,
    /// What a loss actually collected from the player.
    pub collected: i64,
    pub balance_after: i64,
    /// `balance_after − starting_balance`.
    pub net_change: i64,
    /// A win drained the pool to zero.
    pub house_broke: bool,
}

pub async fn resolve(
    ledger: &dyn LedgerStore,
    accounts: &dyn AccountStore,
    req: ResolutionRequest<'_>,
) -> Result<Settlement, StoreError> {
    let settlement = match req.outcome {
        GameOutcome::Win => resolve_win(ledger, accounts, &req).await?,
        GameOutcome::Lose => resolve_lose(ledger, accounts, &req).await?,
        GameOutcome::Push => resolve_push(ledger, accounts, &req).await?,
    };

    info!(
        player = %req.player_id,
        game = %req.game,
        outcome = %req.outcome,
        bet = req.bet,
        paid = settlement.paid,
        collected = settlement.collected,
        "session settled"
    );

    Ok(settlement)
}

async fn resolve_win(
    ledger: &dyn LedgerStore,
    accounts: &dyn AccountStore,
    req: &ResolutionRequest<'_>,
) -> Result<Settlement, StoreError> {
    let desired = (req.bet as f64 * req.multiplier).floor() as i64;
    let paid = ledger.debit_pool_clamped(desired).await?;
    if paid < desired {
        warn!(
            player = %req.player_id,
            desired,
            paid,
            "pool could not cover the full payout"
        );
    }

    accounts.credit(req.player_id, req.kind, paid).await?;

    let mut delta = LedgerDelta::default();
    delta.stats.record_win(req.game);
    delta.stats.total_payouts = paid as u64;
    delta.stats.total_bets = req.bet as u64;
    ledger.apply_delta(&delta).await?;

    let pool_after = ledger.snapshot().await?.pooled_currency;
    let balance_after = balance_of(accounts, req).await?;
    Ok(Settlement {
        outcome: GameOutcome::Win,
        bet: req.bet,
        desired_payout: desired,
        paid,
        collected: 0,
        balance_after,
        net_change: balance_after - req.starting_balance,
        house_broke: paid > 0 && pool_after == 0,
    })
}

async fn resolve_lose(
    ledger: &dyn LedgerStore,
    accounts: &dyn AccountStore,
    req: &ResolutionRequest<'_>,
) -> Result<Settlement, StoreError> {
    // Guarded: the player may have spent part of the balance elsewhere
    // mid-session. The pool is credited with what was actually
    // collected so no currency is minted.
    let collected = accounts
        .debit_balance_clamped(req.player_id, req.kind, req.bet)
        .await?;

    let mut delta = LedgerDelta {
        pool: collected,
        ..Default::default()
    };
    delta.stats.record_loss(req.game);
    delta.stats.total_bets = req.bet as u64;
    ledger.apply_delta(&delta).await?;

    let balance_after = balance_of(accounts, req).await?;
    Ok(Settlement {
        outcome: GameOutcome::Lose,
        bet: req.bet,
        desired_payout: 0,
        paid: 0,
        collected,
        balance_after,
        net_change: balance_after - req.starting_balance,
        house_broke: false,
    })
}

async fn resolve_push(
    ledger: &dyn LedgerStore,
    accounts: &dyn AccountStore,
    req: &ResolutionRequest<'_>,
) -> Result<Settlement, StoreError> {
    // No currency moves; the attempted bet is still recorded.
    let mut delta = LedgerDelta::default();
    delta.stats.total_bets = req.bet as u64;
    ledger.apply_delta(&delta).await?;

    let balance_after = balance_of(accounts, req).await?;
    Ok(Settlement {
        outcome: GameOutcome::Push,
        bet: req.bet,
        desired_payout: 0,
        paid: 0,
        collected: 0,
        balance_after,
        net_change: balance_after - req.starting_balance,
        house_broke: false,
    })
}

async fn balance_of(
    accounts: &dyn AccountStore,
    req: &ResolutionRequest<'_>,
) -> Result<i64, StoreError> {
    Ok(accounts
        .get(req.player_id)
        .await?
        .map(|a| a.balance(req.kind))
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{InMemoryAccountStore, PlayerAccount};
    use crate::ledger::{InMemoryLedgerStore, LedgerDoc, ResourceCounts};
    use chrono::{TimeZone, Utc};

    fn ledger_with_pool(pool: i64) -> InMemoryLedgerStore {
        let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        InMemoryLedgerStore::new(LedgerDoc::seeded(
            pool,
            ResourceCounts::default_stock(),
            epoch,
            epoch,
        ))
    }

    fn accounts_with(stars: i64) -> InMemoryAccountStore {
        let store = InMemoryAccountStore::new();
        let mut account = PlayerAccount::new("p1", 30);
        account.stars = stars;
        store.upsert(account);
        store
    }

    fn request(bet: i64, starting: i64, outcome: GameOutcome, multiplier: f64) -> ResolutionRequest<'static> {
        ResolutionRequest {
            player_id: "p1",
            game: GameType::Card,
            kind: CurrencyKind::Stars,
            bet,
            starting_balance: starting,
            outcome,
            multiplier,
        }
    }

    #[tokio::test]
    async fn short_pool_caps_the_payout_and_breaks_the_house() {
        let ledger = ledger_with_pool(5);
        let accounts = accounts_with(10);

        let settlement = resolve(&ledger, &accounts, request(10, 10, GameOutcome::Win, 2.5))
            .await
            .unwrap();

        assert_eq!(settlement.desired_payout, 25);
        assert_eq!(settlement.paid, 5);
        assert!(settlement.house_broke);
        assert_eq!(settlement.balance_after, 15);
        assert_eq!(settlement.net_change, 5);

        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.pooled_currency, 0);
        assert_eq!(doc.stats.card_wins, 1);
        assert_eq!(doc.stats.total_payouts, 5);
        assert_eq!(doc.stats.total_bets, 10);
    }

    #[tokio::test]
    async fn covered_win_pays_the_full_multiplier() {
        let ledger = ledger_with_pool(100);
        let accounts = accounts_with(10);

        let settlement = resolve(&ledger, &accounts, request(10, 10, GameOutcome::Win, 2.5))
            .await
            .unwrap();

        assert_eq!(settlement.paid, 25);
        assert!(!settlement.house_broke);
        assert_eq!(ledger.snapshot().await.unwrap().pooled_currency, 75);
    }

    #[tokio::test]
    async fn loss_moves_the_bet_into_the_pool() {
        let ledger = ledger_with_pool(10);
        let accounts = accounts_with(20);

        let settlement = resolve(&ledger, &accounts, request(8, 20, GameOutcome::Lose, 2.5))
            .await
            .unwrap();

        assert_eq!(settlement.collected, 8);
        assert_eq!(settlement.net_change, -8);

        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.pooled_currency, 18);
        assert_eq!(doc.stats.card_losses, 1);
        assert_eq!(doc.stats.total_bets, 8);
    }

    #[tokio::test]
    async fn loss_with_a_run_down_balance_collects_what_remains() {
        let ledger = ledger_with_pool(10);
        let accounts = accounts_with(3);

        let settlement = resolve(&ledger, &accounts, request(5, 3, GameOutcome::Lose, 2.0))
            .await
            .unwrap();

        assert_eq!(settlement.collected, 3);
        assert_eq!(settlement.balance_after, 0);
        // the pool gains exactly what the player lost
        assert_eq!(ledger.snapshot().await.unwrap().pooled_currency, 13);
    }

    #[tokio::test]
    async fn push_only_records_the_attempted_bet() {
        let ledger = ledger_with_pool(10);
        let accounts = accounts_with(20);

        let settlement = resolve(&ledger, &accounts, request(6, 20, GameOutcome::Push, 2.0))
            .await
            .unwrap();

        assert_eq!(settlement.paid, 0);
        assert_eq!(settlement.collected, 0);
        assert_eq!(settlement.net_change, 0);

        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.pooled_currency, 10);
        assert_eq!(doc.stats.total_bets, 6);
        assert_eq!(doc.stats.card_wins + doc.stats.card_losses, 0);
    }
}
