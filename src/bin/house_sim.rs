//! Scripted wagering driver against an in-memory house.
//!
//! Seeds a roster of players, plays concurrent rounds of all three
//! games, fires one manual maintenance pass and prints the house
//! summary. Useful for eyeballing pool behavior under load without a
//! front-end attached.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use futures::future::join_all;
use rand::{thread_rng, Rng};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use starhouse::maintenance::{next_midnight, next_sunday_midnight, MaintenanceWorker};
use starhouse::session::SessionManager;
use starhouse::{
    CurrencyKind, EngineConfig, EngineMetrics, EngineResult, GameType, HandShape,
    InMemoryAccountStore, InMemoryLedgerStore, LedgerDoc, LedgerStore, PlayerAccount,
    PlayerAction, RoundView, WagerError,
};

/// Starhouse simulation CLI
#[derive(Parser)]
#[command(name = "house-sim")]
#[command(about = "Drive scripted wagering rounds against an in-memory house")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the quick-play preset (short TTL, fast maintenance ticks)
    #[arg(long)]
    quick: bool,

    /// Number of simulated players
    #[arg(short, long, default_value = "8")]
    players: usize,

    /// Rounds each player plays
    #[arg(short, long, default_value = "20")]
    rounds: usize,

    /// Stars granted to every player up front
    #[arg(long, default_value = "50")]
    stake: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = if let Some(path) = &cli.config {
        EngineConfig::from_toml_file(path)?
    } else if cli.quick {
        EngineConfig::quick_play()
    } else {
        EngineConfig::default()
    };

    let now = Utc::now();
    let ledger = Arc::new(InMemoryLedgerStore::new(LedgerDoc::seeded(
        config.house.seed_pool,
        config.house.default_resources,
        next_midnight(now),
        next_sunday_midnight(now),
    )));
    let accounts = Arc::new(InMemoryAccountStore::new());
    for i in 0..cli.players {
        let mut account = PlayerAccount::new(format!("player-{i}"), config.house.base_quota);
        account.stars = cli.stake;
        accounts.upsert(account);
    }

    let metrics = EngineMetrics::new();
    let manager = SessionManager::new(
        config.clone(),
        ledger.clone(),
        accounts.clone(),
        metrics.clone(),
    );
    let worker = MaintenanceWorker::spawn(
        config.clone(),
        ledger.clone(),
        accounts.clone(),
        metrics.clone(),
    );

    let mut expiries = manager.subscribe_expiry();
    tokio::spawn(async move {
        while let Ok(notice) = expiries.recv().await {
            // the payload a chat front-end would receive
            let payload = serde_json::to_string(&notice).unwrap_or_default();
            info!(%payload, "front-end notified of expiry");
        }
    });

    info!(
        players = cli.players,
        rounds = cli.rounds,
        pool = config.house.seed_pool,
        "simulation starting"
    );

    let mut handles = Vec::with_capacity(cli.players);
    for i in 0..cli.players {
        let manager = manager.clone();
        let rounds = cli.rounds;
        handles.push(tokio::spawn(async move {
            play_rounds(&manager, &format!("player-{i}"), rounds).await;
        }));
    }
    for result in join_all(handles).await {
        if let Err(e) = result {
            warn!("player task panicked: {}", e);
        }
    }

    // Operational trigger: run one maintenance pass by hand.
    match worker.run_maintenance(Utc::now()).await {
        Ok(report) => info!(?report, "manual maintenance pass"),
        Err(e) => warn!("manual maintenance pass failed: {}", e),
    }
    worker.stop();

    let doc = ledger.snapshot().await?;
    info!(
        pool = doc.pooled_currency,
        rock = doc.resources.rock,
        paper = doc.resources.paper,
        scissors = doc.resources.scissors,
        wildcard = doc.resources.wildcard,
        "house closing state"
    );
    info!(stats = ?doc.stats, "house tallies");
    info!(metrics = ?metrics.snapshot(), "engine counters");

    Ok(())
}

async fn play_rounds(manager: &SessionManager, player_id: &str, rounds: usize) {
    for _ in 0..rounds {
        let (game, bet) = {
            let mut rng = thread_rng();
            let game = match rng.gen_range(0..3) {
                0 => GameType::Card,
                1 => GameType::Blackjack,
                _ => GameType::Rps,
            };
            (game, rng.gen_range(1..=5))
        };

        let update = match manager
            .create_session(player_id, "sim", game, CurrencyKind::Stars, bet)
            .await
        {
            Ok(update) => update,
            Err(WagerError::HouseDepleted) => {
                info!(player = %player_id, "house depleted, player walks away");
                return;
            }
            Err(WagerError::InvalidBet { available, .. }) => {
                info!(player = %player_id, available, "player is out of stars");
                return;
            }
            Err(e) => {
                warn!(player = %player_id, "bet rejected: {}", e);
                return;
            }
        };

        let session_id = update.session_id;
        if let Err(e) = play_out(manager, player_id, update).await {
            debug!(player = %player_id, session = %session_id, "round abandoned: {}", e);
        }
    }
}

async fn play_out(
    manager: &SessionManager,
    player_id: &str,
    opened: starhouse::SessionUpdate,
) -> Result<(), WagerError> {
    let session_id = opened.session_id;
    match opened.game {
        GameType::Card => {
            manager
                .advance(session_id, player_id, PlayerAction::Proceed)
                .await?;
            let update = manager
                .advance(session_id, player_id, PlayerAction::Proceed)
                .await?;
            let slots = match update.view {
                RoundView::Card { slots, .. } => slots,
                _ => return Ok(()),
            };
            let slot = {
                let mut rng = thread_rng();
                rng.gen_range(0..slots)
            };
            let update = manager
                .advance(session_id, player_id, PlayerAction::Pick { slot })
                .await?;
            log_result(player_id, &update);
        }
        GameType::Blackjack => {
            // Naive strategy: hit under 17, then stand.
            let mut total = match opened.view {
                RoundView::Blackjack { player_total, .. } => player_total,
                _ => return Ok(()),
            };
            loop {
                let action = if total < 17 {
                    PlayerAction::Hit
                } else {
                    PlayerAction::Stand
                };
                let update = manager.advance(session_id, player_id, action).await?;
                if update.result.is_some() {
                    log_result(player_id, &update);
                    break;
                }
                total = match update.view {
                    RoundView::Blackjack { player_total, .. } => player_total,
                    _ => break,
                };
            }
        }
        GameType::Rps => {
            let shape = {
                let mut rng = thread_rng();
                match rng.gen_range(0..3) {
                    0 => HandShape::Rock,
                    1 => HandShape::Paper,
                    _ => HandShape::Scissors,
                }
            };
            let update = manager
                .advance(session_id, player_id, PlayerAction::Throw { shape })
                .await?;
            log_result(player_id, &update);
        }
    }
    Ok(())
}

fn log_result(player_id: &str, update: &starhouse::SessionUpdate) {
    if let Some(settlement) = &update.result {
        debug!(
            player = %player_id,
            game = %update.game,
            outcome = %settlement.outcome,
            paid = settlement.paid,
            collected = settlement.collected,
            net = settlement.net_change,
            "round settled"
        );
    }
}
