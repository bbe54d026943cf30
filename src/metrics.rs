//! Engine counters for operational visibility.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::games::types::GameOutcome;

/// Cheaply cloneable bundle of counters shared across the session
/// manager and the maintenance worker.
#[derive(Clone)]
pub struct EngineMetrics {
    start_time: Instant,
    sessions_created: Arc<AtomicU64>,
    sessions_resolved: Arc<AtomicU64>,
    sessions_expired: Arc<AtomicU64>,
    wins: Arc<AtomicU64>,
    losses: Arc<AtomicU64>,
    pushes: Arc<AtomicU64>,
    stars_paid_out: Arc<AtomicU64>,
    stars_collected: Arc<AtomicU64>,
    maintenance_runs: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sessions_created: u64,
    pub sessions_resolved: u64,
    pub sessions_expired: u64,
    pub wins: u64,
    pub losses: u64,
    pub pushes: u64,
    pub stars_paid_out: u64,
    pub stars_collected: u64,
    pub maintenance_runs: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            sessions_created: Arc::new(AtomicU64::new(0)),
            sessions_resolved: Arc::new(AtomicU64::new(0)),
            sessions_expired: Arc::new(AtomicU64::new(0)),
            wins: Arc::new(AtomicU64::new(0)),
            losses: Arc::new(AtomicU64::new(0)),
            pushes: Arc::new(AtomicU64::new(0)),
            stars_paid_out: Arc::new(AtomicU64::new(0)),
            stars_collected: Arc::new(AtomicU64::new(0)),
            maintenance_runs: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_resolution(&self, outcome: GameOutcome, paid: i64, collected: i64) {
        self.sessions_resolved.fetch_add(1, Ordering::SeqCst);
        let counter = match outcome {
            GameOutcome::Win => &self.wins,
            GameOutcome::Lose => &self.losses,
            GameOutcome::Push => &self.pushes,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.stars_paid_out
            .fetch_add(paid.max(0) as u64, Ordering::SeqCst);
        self.stars_collected
            .fetch_add(collected.max(0) as u64, Ordering::SeqCst);
    }

    pub fn record_session_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_maintenance_run(&self) {
        self.maintenance_runs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_created: self.sessions_created.load(Ordering::SeqCst),
            sessions_resolved: self.sessions_resolved.load(Ordering::SeqCst),
            sessions_expired: self.sessions_expired.load(Ordering::SeqCst),
            wins: self.wins.load(Ordering::SeqCst),
            losses: self.losses.load(Ordering::SeqCst),
            pushes: self.pushes.load(Ordering::SeqCst),
            stars_paid_out: self.stars_paid_out.load(Ordering::SeqCst),
            stars_collected: self.stars_collected.load(Ordering::SeqCst),
            maintenance_runs: self.maintenance_runs.load(Ordering::SeqCst),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
