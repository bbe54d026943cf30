//! Maintenance worker: daily allowance refills and periodic pool
//! redistribution.
//!
//! Both jobs re-arm from next-run timestamps persisted in the ledger
//! document, so a process restart neither loses a scheduled run nor
//! fires it twice. The worker itself only ticks; whether a job actually
//! runs is decided against the persisted schedule on every tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::accounts::AccountStore;
use crate::config::EngineConfig;
use crate::ledger::{LedgerStore, ScheduleUpdate, StoreError};
use crate::metrics::EngineMetrics;

/// First UTC midnight strictly after `now`.
pub fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Days::new(1);
    Utc.from_utc_datetime(&tomorrow.and_time(NaiveTime::MIN))
}

/// First Sunday-midnight UTC strictly after `now`.
pub fn next_sunday_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_ahead = (7 - now.weekday().num_days_from_sunday()) % 7;
    let date = now.date_naive() + Days::new(days_ahead as u64);
    let candidate = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    if candidate <= now {
        candidate + ChronoDuration::days(7)
    } else {
        candidate
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RedistributionSummary {
    /// `floor(pool / player_count)`, added onto the base quota.
    pub per_player_extra: i64,
    /// What the split left pooled.
    pub remainder: i64,
}

/// Outcome of one maintenance pass; also the reply of the manual
/// trigger used for operational recovery.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub ok: bool,
    pub redistributed: Option<RedistributionSummary>,
    pub resource_refill: bool,
    /// Accounts whose allowances were raised, when the daily job ran.
    pub allowance_refill: Option<u64>,
}

pub struct MaintenanceWorker {
    config: EngineConfig,
    ledger: Arc<dyn LedgerStore>,
    accounts: Arc<dyn AccountStore>,
    metrics: EngineMetrics,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl MaintenanceWorker {
    /// Build a worker without starting its tick loop; passes then only
    /// run through the manual [`run_maintenance`](Self::run_maintenance)
    /// trigger.
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountStore>,
        metrics: EngineMetrics,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            ledger,
            accounts,
            metrics,
            running: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
        })
    }

    pub fn spawn(
        config: EngineConfig,
        ledger: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountStore>,
        metrics: EngineMetrics,
    ) -> Arc<Self> {
        let worker = Self::new(config, ledger, accounts, metrics);
        worker.clone().spawn_task();
        worker
    }

    fn spawn_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            // The first tick fires immediately, which doubles as the
            // catch-up pass after a restart.
            let mut tick = tokio::time::interval(self.config.maintenance_tick());

            while self.running.load(Ordering::SeqCst) {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = tick.tick() => {
                        if let Err(e) = self.run_maintenance(Utc::now()).await {
                            warn!("maintenance pass failed: {}", e);
                        }
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
    }

    /// One pass over both jobs. Public so operators can trigger it
    /// manually; the persisted schedule makes extra invocations safe.
    pub async fn run_maintenance(
        &self,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceReport, StoreError> {
        let doc = self.ledger.snapshot().await?;
        let mut report = MaintenanceReport {
            ok: true,
            redistributed: None,
            resource_refill: false,
            allowance_refill: None,
        };
        let mut schedule = ScheduleUpdate::default();

        if now >= doc.next_daily_reset_at {
            let bumped = self
                .accounts
                .bump_allowances_to_floor(self.config.house.allowance_floor)
                .await?;
            schedule.next_daily_reset_at = Some(next_midnight(now));
            report.allowance_refill = Some(bumped);
            info!(bumped, "daily allowance refill applied");
        }

        if now >= doc.next_redistribution_at {
            let min_secs = self.config.maintenance.redistribution_min_interval_secs as i64;
            let ran_recently = doc
                .last_redistribution_at
                .map(|last| (now - last).num_seconds() < min_secs)
                .unwrap_or(false);

            if ran_recently {
                // Duplicate trigger, likely a timer revived by a
                // restart. Re-arm without running.
                debug!("redistribution suppressed by minimum-interval guard");
                schedule.next_redistribution_at = Some(next_sunday_midnight(now));
            } else {
                let players = self.accounts.active_player_count().await?;
                if players > 0 {
                    // the split reports its own remainder so bets
                    // settling mid-pass cannot skew the figure
                    let (share, remainder) =
                        self.ledger.take_redistribution_share(players).await?;
                    self.accounts
                        .set_quota_all(self.config.house.base_quota + share)
                        .await?;
                    report.redistributed = Some(RedistributionSummary {
                        per_player_extra: share,
                        remainder,
                    });
                    info!(players, share, remainder, "pool redistributed into quotas");
                } else {
                    debug!("no active players, nothing to redistribute");
                }

                self.ledger
                    .refill_resources(&self.config.house.default_resources)
                    .await?;
                report.resource_refill = true;
                schedule.next_redistribution_at = Some(next_sunday_midnight(now));
                schedule.last_redistribution_at = Some(now);
            }
        }

        let touched = schedule.next_daily_reset_at.is_some()
            || schedule.next_redistribution_at.is_some()
            || schedule.last_redistribution_at.is_some();
        if touched {
            self.ledger.set_schedule(schedule).await?;
        }
        if report.allowance_refill.is_some() || report.resource_refill {
            self.metrics.record_maintenance_run();
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{InMemoryAccountStore, PlayerAccount};
    use crate::ledger::{InMemoryLedgerStore, LedgerDoc, ResourceCounts};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn worker_with(
        doc: LedgerDoc,
        players: &[(&str, i64)],
    ) -> (
        Arc<MaintenanceWorker>,
        Arc<InMemoryLedgerStore>,
        Arc<InMemoryAccountStore>,
    ) {
        let ledger = Arc::new(InMemoryLedgerStore::new(doc));
        let accounts = Arc::new(InMemoryAccountStore::new());
        for (id, stars) in players {
            let mut account = PlayerAccount::new(*id, 30);
            account.stars = *stars;
            account.allowances.rock = 0;
            account.allowances.paper = 0;
            account.allowances.scissors = 0;
            accounts.upsert(account);
        }
        // manual triggering only; the tick loop would race the fixed
        // timestamps used below against the wall clock
        let worker = MaintenanceWorker::new(
            EngineConfig::default(),
            ledger.clone(),
            accounts.clone(),
            EngineMetrics::new(),
        );
        (worker, ledger, accounts)
    }

    #[test]
    fn midnight_rolls_to_the_next_day() {
        assert_eq!(next_midnight(at(2024, 3, 5, 15, 30)), at(2024, 3, 6, 0, 0));
        // exactly midnight still moves strictly forward
        assert_eq!(next_midnight(at(2024, 3, 5, 0, 0)), at(2024, 3, 6, 0, 0));
    }

    #[test]
    fn sunday_midnight_lands_on_the_coming_sunday() {
        // 2024-03-05 is a Tuesday; the coming Sunday is 2024-03-10.
        assert_eq!(
            next_sunday_midnight(at(2024, 3, 5, 15, 30)),
            at(2024, 3, 10, 0, 0)
        );
        // mid-Sunday rolls a full week ahead
        assert_eq!(
            next_sunday_midnight(at(2024, 3, 10, 9, 0)),
            at(2024, 3, 17, 0, 0)
        );
        assert_eq!(
            next_sunday_midnight(at(2024, 3, 10, 0, 0)),
            at(2024, 3, 17, 0, 0)
        );
    }

    #[tokio::test]
    async fn due_daily_job_bumps_allowances_and_rearms() {
        let past = at(2024, 3, 1, 0, 0);
        let doc = LedgerDoc::seeded(100, ResourceCounts::default_stock(), past, at(2030, 1, 1, 0, 0));
        let (worker, ledger, accounts) = worker_with(doc, &[("p1", 10)]);

        let now = at(2024, 3, 5, 10, 0);
        let report = worker.run_maintenance(now).await.unwrap();

        assert_eq!(report.allowance_refill, Some(1));
        assert!(report.redistributed.is_none());
        assert!(!report.resource_refill);

        let account = accounts.get("p1").await.unwrap().unwrap();
        assert_eq!(account.allowances.rock, 1);

        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.next_daily_reset_at, at(2024, 3, 6, 0, 0));
    }

    #[tokio::test]
    async fn nothing_runs_before_the_scheduled_times() {
        let future = at(2030, 1, 1, 0, 0);
        let doc = LedgerDoc::seeded(100, ResourceCounts::default_stock(), future, future);
        let (worker, ledger, accounts) = worker_with(doc, &[("p1", 10)]);

        let report = worker.run_maintenance(at(2024, 3, 5, 10, 0)).await.unwrap();

        assert!(report.allowance_refill.is_none());
        assert!(report.redistributed.is_none());
        assert!(!report.resource_refill);
        assert_eq!(
            accounts.get("p1").await.unwrap().unwrap().allowances.rock,
            0
        );
        assert_eq!(ledger.snapshot().await.unwrap().pooled_currency, 100);
    }

    #[tokio::test]
    async fn redistribution_splits_the_pool_and_leaves_the_remainder() {
        let past = at(2024, 3, 1, 0, 0);
        let drained = ResourceCounts {
            rock: 0,
            paper: 2,
            scissors: 0,
            wildcard: 0,
        };
        let doc = LedgerDoc::seeded(100, drained, at(2030, 1, 1, 0, 0), past);
        let (worker, ledger, accounts) = worker_with(
            doc,
            &[
                ("p1", 1),
                ("p2", 1),
                ("p3", 1),
                ("p4", 1),
                ("p5", 1),
                ("p6", 1),
                ("p7", 1),
            ],
        );

        let now = at(2024, 3, 5, 10, 0);
        let report = worker.run_maintenance(now).await.unwrap();

        let summary = report.redistributed.unwrap();
        assert_eq!(summary.per_player_extra, 14);
        assert_eq!(summary.remainder, 2);
        assert!(report.resource_refill);

        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.pooled_currency, 2);
        assert_eq!(doc.resources, ResourceCounts::default_stock());
        assert_eq!(doc.last_redistribution_at, Some(now));
        assert_eq!(doc.next_redistribution_at, at(2024, 3, 10, 0, 0));

        for i in 1..=7 {
            let account = accounts.get(&format!("p{i}")).await.unwrap().unwrap();
            assert_eq!(account.quota, 30 + 14);
        }
    }

    #[tokio::test]
    async fn recent_run_suppresses_a_duplicate_trigger() {
        let now = at(2024, 3, 5, 10, 0);
        let mut doc = LedgerDoc::seeded(
            100,
            ResourceCounts::default_stock(),
            at(2030, 1, 1, 0, 0),
            at(2024, 3, 5, 9, 0),
        );
        doc.last_redistribution_at = Some(at(2024, 3, 5, 8, 0));
        let (worker, ledger, _) = worker_with(doc, &[("p1", 10)]);

        let report = worker.run_maintenance(now).await.unwrap();

        assert!(report.redistributed.is_none());
        assert!(!report.resource_refill);

        // still re-armed so the guard does not retrigger every tick
        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.pooled_currency, 100);
        assert_eq!(doc.next_redistribution_at, at(2024, 3, 10, 0, 0));
    }

    #[tokio::test]
    async fn empty_roster_still_restocks_the_house() {
        let past = at(2024, 3, 1, 0, 0);
        let drained = ResourceCounts {
            rock: 0,
            paper: 0,
            scissors: 0,
            wildcard: 0,
        };
        let doc = LedgerDoc::seeded(50, drained, at(2030, 1, 1, 0, 0), past);
        let (worker, ledger, _) = worker_with(doc, &[]);

        let report = worker.run_maintenance(at(2024, 3, 5, 10, 0)).await.unwrap();

        assert!(report.redistributed.is_none());
        assert!(report.resource_refill);

        let doc = ledger.snapshot().await.unwrap();
        assert_eq!(doc.pooled_currency, 50);
        assert_eq!(doc.resources, ResourceCounts::default_stock());
    }

    #[tokio::test(start_paused = true)]
    async fn worker_ticks_run_due_jobs_without_a_manual_trigger() {
        let past = at(2024, 3, 1, 0, 0);
        let doc = LedgerDoc::seeded(100, ResourceCounts::default_stock(), past, at(2030, 1, 1, 0, 0));
        let ledger = Arc::new(InMemoryLedgerStore::new(doc));
        let accounts = Arc::new(InMemoryAccountStore::new());
        let mut account = PlayerAccount::new("p1", 30);
        account.allowances.rock = 0;
        accounts.upsert(account);

        let worker = MaintenanceWorker::spawn(
            EngineConfig::quick_play(),
            ledger.clone(),
            accounts.clone(),
            EngineMetrics::new(),
        );

        // quick_play ticks every second; the first tick fires at once
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let bumped = accounts.get("p1").await.unwrap().unwrap();
        assert_eq!(bumped.allowances.rock, 1);
        worker.stop();
    }
}
