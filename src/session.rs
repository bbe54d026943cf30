//! Player-owned wagering sessions and the manager that holds them.
//!
//! Sessions live only in process memory, keyed by id in a concurrent
//! map. An action checks the session out of the map for the duration
//! of the call, so a session's own state is never touched by two
//! operations at once; the shared pool is the only contended resource
//! and every mutation to it goes through the ledger store's atomic
//! primitives.

use std::sync::Arc;

use dashmap::DashMap;
use rand::thread_rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accounts::AccountStore;
use crate::config::EngineConfig;
use crate::games::types::{
    CurrencyKind, GameError, GameOutcome, GameType, HandShape, PlayerAction, RoundView,
};
use crate::games::{rps, BlackjackState, CardShuffleState, RpsState};
use crate::ledger::{LedgerDelta, LedgerStore, StoreError};
use crate::metrics::EngineMetrics;
use crate::settlement::{self, ResolutionRequest, Settlement};

#[derive(Debug, Error)]
pub enum WagerError {
    #[error("no profile for player {player_id}")]
    NoProfile { player_id: String },

    #[error("player is eliminated from play")]
    Eliminated,

    #[error("invalid bet: requested {requested} with {available} {kind} available")]
    InvalidBet {
        requested: i64,
        available: i64,
        kind: CurrencyKind,
    },

    #[error("the house pool is empty")]
    HouseDepleted,

    #[error("session {session_id} not found")]
    SessionNotFound { session_id: Uuid },

    #[error("session belongs to another player")]
    NotOwner,

    #[error("no {shape} allowance remaining today")]
    NoAllowanceRemaining { shape: HandShape },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-game state carried by a session.
#[derive(Debug, Clone)]
pub enum GameState {
    Card(CardShuffleState),
    Blackjack(BlackjackState),
    Rps(RpsState),
}

impl GameState {
    fn view(&self, terminal: bool) -> RoundView {
        match self {
            GameState::Card(state) => state.view(terminal),
            GameState::Blackjack(state) => state.view(terminal),
            GameState::Rps(state) => state.view(),
        }
    }
}

/// One in-flight minigame. The bet is validated against the balance at
/// creation but not deducted until resolution.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub player_id: String,
    pub guild_id: String,
    pub game: GameType,
    pub kind: CurrencyKind,
    pub bet: i64,
    pub starting_balance: i64,
    state: GameState,
}

struct ActiveSession {
    session: Session,
    timer: JoinHandle<()>,
}

/// Sent to front-end subscribers when a session times out unplayed.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryNotice {
    pub session_id: Uuid,
    pub player_id: String,
    pub guild_id: String,
    pub game: GameType,
}

/// Render-ready reply to a bet or action request.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub session_id: Uuid,
    pub game: GameType,
    pub view: RoundView,
    /// Present exactly when this update resolved the session.
    pub result: Option<Settlement>,
}

#[derive(Clone)]
pub struct SessionManager {
    config: Arc<EngineConfig>,
    ledger: Arc<dyn LedgerStore>,
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<DashMap<Uuid, ActiveSession>>,
    metrics: EngineMetrics,
    expiry_tx: broadcast::Sender<ExpiryNotice>,
}

impl SessionManager {
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountStore>,
        metrics: EngineMetrics,
    ) -> Self {
        let (expiry_tx, _) = broadcast::channel(config.session.expiry_events_capacity);
        Self {
            config: Arc::new(config),
            ledger,
            accounts,
            sessions: Arc::new(DashMap::new()),
            metrics,
            expiry_tx,
        }
    }

    pub fn subscribe_expiry(&self) -> broadcast::Receiver<ExpiryNotice> {
        self.expiry_tx.subscribe()
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Open a session. The bet stays on the player's balance until the
    /// game resolves; only validation happens here.
    pub async fn create_session(
        &self,
        player_id: &str,
        guild_id: &str,
        game: GameType,
        kind: CurrencyKind,
        bet: i64,
    ) -> Result<SessionUpdate, WagerError> {
        let account = self
            .accounts
            .get(player_id)
            .await?
            .ok_or_else(|| WagerError::NoProfile {
                player_id: player_id.to_string(),
            })?;
        if account.eliminated {
            return Err(WagerError::Eliminated);
        }

        let available = account.balance(kind);
        if bet <= 0 || bet > available {
            return Err(WagerError::InvalidBet {
                requested: bet,
                available,
                kind,
            });
        }

        // A pooled-currency bet is pointless when the house cannot pay.
        if kind.is_pooled() && self.ledger.snapshot().await?.pooled_currency == 0 {
            return Err(WagerError::HouseDepleted);
        }

        let games = &self.config.games;
        let state = {
            let mut rng = thread_rng();
            match game {
                GameType::Card => GameState::Card(CardShuffleState::reveal(
                    &mut rng,
                    games.card.slots,
                    games.card.rare_odds,
                )),
                GameType::Blackjack => GameState::Blackjack(BlackjackState::deal(
                    &mut rng,
                    games.blackjack.dealer_stands_at,
                )),
                GameType::Rps => GameState::Rps(RpsState::new()),
            }
        };

        let session = Session {
            id: Uuid::new_v4(),
            player_id: player_id.to_string(),
            guild_id: guild_id.to_string(),
            game,
            kind,
            bet,
            starting_balance: available,
            state,
        };
        let update = SessionUpdate {
            session_id: session.id,
            game,
            view: session.state.view(false),
            result: None,
        };

        info!(
            session = %session.id,
            player = %player_id,
            game = %game,
            kind = %kind,
            bet,
            "session created"
        );
        self.metrics.record_session_created();
        self.check_in(session);
        Ok(update)
    }

    /// Apply one player action. Ownership is enforced before any state
    /// is touched; terminal transitions settle and delete the session,
    /// non-terminal ones re-arm the expiry timer.
    pub async fn advance(
        &self,
        session_id: Uuid,
        player_id: &str,
        action: PlayerAction,
    ) -> Result<SessionUpdate, WagerError> {
        {
            let slot = self
                .sessions
                .get(&session_id)
                .ok_or(WagerError::SessionNotFound { session_id })?;
            if slot.session.player_id != player_id {
                return Err(WagerError::NotOwner);
            }
        }

        // Exclusive checkout: the session leaves the map while held
        // across awaits. A concurrent action or a firing expiry timer
        // finds nothing and backs off.
        let (_, slot) = self
            .sessions
            .remove(&session_id)
            .ok_or(WagerError::SessionNotFound { session_id })?;
        slot.timer.abort();
        let mut session = slot.session;

        let outcome = match self.step(&mut session, action).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // A rejected action leaves the session live.
                self.check_in(session);
                return Err(err);
            }
        };

        let Some(outcome) = outcome else {
            debug!(session = %session_id, "session advanced");
            let update = SessionUpdate {
                session_id,
                game: session.game,
                view: session.state.view(false),
                result: None,
            };
            self.check_in(session);
            return Ok(update);
        };

        let request = ResolutionRequest {
            player_id: &session.player_id,
            game: session.game,
            kind: session.kind,
            bet: session.bet,
            starting_balance: session.starting_balance,
            outcome,
            multiplier: self.multiplier_for(&session),
        };
        let settlement =
            match settlement::resolve(self.ledger.as_ref(), self.accounts.as_ref(), request).await
            {
                Ok(settlement) => settlement,
                Err(err) => {
                    warn!(session = %session_id, error = %err, "settlement failed, session dropped");
                    return Err(err.into());
                }
            };

        self.metrics
            .record_resolution(outcome, settlement.paid, settlement.collected);
        Ok(SessionUpdate {
            session_id,
            game: session.game,
            view: session.state.view(true),
            result: Some(settlement),
        })
    }

    /// Timer target. A session still present is closed as a timeout:
    /// no ledger or balance mutation, just removal and a notice.
    pub fn expire(&self, session_id: Uuid) -> bool {
        let Some((_, slot)) = self.sessions.remove(&session_id) else {
            return false;
        };
        slot.timer.abort();
        let session = slot.session;

        info!(
            session = %session_id,
            player = %session.player_id,
            game = %session.game,
            "session expired unplayed"
        );
        self.metrics.record_session_expired();
        let _ = self.expiry_tx.send(ExpiryNotice {
            session_id,
            player_id: session.player_id,
            guild_id: session.guild_id,
            game: session.game,
        });
        true
    }

    /// Run the game-specific transition. RPS is handled here rather
    /// than in a state machine because its single action touches the
    /// allowance and the house stock before the duel resolves.
    async fn step(
        &self,
        session: &mut Session,
        action: PlayerAction,
    ) -> Result<Option<GameOutcome>, WagerError> {
        match &mut session.state {
            GameState::Card(state) => {
                let mut rng = thread_rng();
                Ok(state.advance(action, &mut rng)?)
            }
            GameState::Blackjack(state) => {
                let mut rng = thread_rng();
                Ok(state.advance(action, &mut rng)?)
            }
            GameState::Rps(state) => {
                let PlayerAction::Throw { shape } = action else {
                    return Err(GameError::UnexpectedAction { action }.into());
                };

                // The unit is spent on play, win or lose.
                if !self
                    .accounts
                    .consume_allowance(&session.player_id, shape)
                    .await?
                {
                    return Err(WagerError::NoAllowanceRemaining { shape });
                }

                let stock = self.ledger.snapshot().await?.resources;
                let response = {
                    let mut rng = thread_rng();
                    rps::house_response(&stock, &mut rng)
                };
                if let Some(resources) = rps::stock_delta(&stock, response) {
                    let delta = LedgerDelta {
                        resources,
                        ..Default::default()
                    };
                    self.ledger.apply_delta(&delta).await?;
                }

                state.record(shape, response);
                Ok(Some(rps::duel(shape, response)))
            }
        }
    }

    fn multiplier_for(&self, session: &Session) -> f64 {
        let games = &self.config.games;
        match &session.state {
            GameState::Card(state) if state.is_rare() => games.card.rare_payout_multiplier,
            GameState::Card(_) => games.card.payout_multiplier,
            GameState::Blackjack(_) => games.blackjack.payout_multiplier,
            GameState::Rps(_) => games.rps.payout_multiplier,
        }
    }

    fn check_in(&self, session: Session) {
        let id = session.id;
        let timer = self.spawn_expiry_timer(id);
        self.sessions.insert(id, ActiveSession { session, timer });
    }

    fn spawn_expiry_timer(&self, session_id: Uuid) -> JoinHandle<()> {
        let manager = self.clone();
        let ttl = self.config.session_ttl();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            manager.expire(session_id);
        })
    }
}
