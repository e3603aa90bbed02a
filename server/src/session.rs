//! Authoritative session engine.
//!
//! Each session runs as its own tokio task: a countdown sleep followed by a
//! fixed-rate tick loop that drains queued control commands, advances the
//! simulation, checks for disconnects and the win threshold, and broadcasts
//! one snapshot per tick. Sessions never share mutable state, so any number
//! of them tick in parallel; the engine itself only keeps a registry of
//! handles keyed by session id.
//!
//! A session produces exactly one terminal result. The tick loop has a
//! single exit point carrying the terminal cause, and the handle is removed
//! from the registry before any cleanup, so a late forfeit or disconnect
//! lands on a session that no longer exists and is dropped as a no-op.

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::physics::{PongState, Slot};
use crate::recorder::ResultRecorder;
use crate::registry::ConnectionRegistry;
use crate::store::UserDirectory;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    ConnectionId, GameMode, KeyDirection, MatchOrigin, MatchOutcome, ServerEvent, SessionId,
    Snapshot, UserId, UserStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, sleep, MissedTickBehavior};

/// One participant seat: the user and the connection that carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub user: UserId,
    pub connection: ConnectionId,
}

/// Session lifecycle. Waiting covers the pre-start countdown; Ended is
/// terminal and also what an unknown session id reads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    Running,
    Ended,
}

enum SessionCommand {
    Key {
        connection: ConnectionId,
        direction: KeyDirection,
    },
    Forfeit {
        user: UserId,
    },
    ConnectionLost {
        connection: ConnectionId,
    },
}

/// Why the tick loop stopped. Forfeit names the slot that loses.
enum Terminal {
    Win(Slot),
    Forfeit(Slot),
}

struct SessionHandle {
    participants: [Participant; 2],
    tx: mpsc::UnboundedSender<SessionCommand>,
    status: SessionStatus,
}

struct EngineShared {
    config: EngineConfig,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    directory: Arc<dyn UserDirectory>,
    recorder: Arc<ResultRecorder>,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    next_session_id: AtomicU64,
}

/// Owns all live sessions and their tick tasks.
pub struct SessionEngine {
    shared: Arc<EngineShared>,
}

fn room_tag(id: SessionId) -> String {
    format!("session-{}", id)
}

fn slot_of(seats: &[Participant; 2], connection: ConnectionId) -> Option<Slot> {
    if seats[0].connection == connection {
        Some(Slot::One)
    } else if seats[1].connection == connection {
        Some(Slot::Two)
    } else {
        None
    }
}

fn slot_of_user(seats: &[Participant; 2], user: UserId) -> Option<Slot> {
    if seats[0].user == user {
        Some(Slot::One)
    } else if seats[1].user == user {
        Some(Slot::Two)
    } else {
        None
    }
}

fn seat(seats: &[Participant; 2], slot: Slot) -> Participant {
    match slot {
        Slot::One => seats[0],
        Slot::Two => seats[1],
    }
}

fn snapshot_of(id: SessionId, seats: &[Participant; 2], state: &PongState) -> Snapshot {
    Snapshot {
        room_id: id,
        user1: seats[0].user,
        user2: seats[1].user,
        paddle1: state.paddle1,
        paddle2: state.paddle2,
        ball_x: state.ball.x,
        ball_y: state.ball.y,
        score1: state.score1,
        score2: state.score2,
    }
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<dyn Dispatcher>,
        directory: Arc<dyn UserDirectory>,
        recorder: Arc<ResultRecorder>,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                config,
                registry,
                dispatcher,
                directory,
                recorder,
                sessions: RwLock::new(HashMap::new()),
                next_session_id: AtomicU64::new(1),
            }),
        }
    }

    /// Forms a session in its countdown phase and schedules the tick task.
    ///
    /// Both participants get the initial snapshot immediately. A
    /// participant who disconnects during the countdown is caught by the
    /// first tick's liveness check.
    pub async fn create_session(
        &self,
        slot1: Participant,
        slot2: Participant,
        mode: GameMode,
        origin: MatchOrigin,
    ) -> SessionId {
        let shared = &self.shared;
        let id = SessionId(shared.next_session_id.fetch_add(1, Ordering::Relaxed));
        let created_at = Utc::now();
        let seats = [slot1, slot2];

        let mut rng = StdRng::from_entropy();
        let state = PongState::new(&mut rng);

        for participant in seats {
            shared
                .registry
                .set_status(participant.user, UserStatus::InGame)
                .await;
            if let Err(e) = shared
                .directory
                .update_status(participant.user, UserStatus::InGame)
            {
                warn!("could not mark user {} in-game: {}", participant.user, e);
            }
        }

        let tag = room_tag(id);
        shared.dispatcher.join_room_channel(slot1.connection, &tag);
        shared.dispatcher.join_room_channel(slot2.connection, &tag);
        shared.dispatcher.notify_many(
            &[slot1.connection, slot2.connection],
            &ServerEvent::MatchFound {
                snapshot: snapshot_of(id, &seats, &state),
            },
        );

        let (tx, rx) = mpsc::unbounded_channel();
        shared.sessions.write().await.insert(
            id,
            SessionHandle {
                participants: seats,
                tx,
                status: SessionStatus::Waiting,
            },
        );
        info!(
            "session {} created ({:?}/{:?}): user {} vs user {}",
            id, mode, origin, slot1.user, slot2.user
        );

        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            run_session(shared, id, state, seats, mode, origin, created_at, rx, rng).await;
        });
        id
    }

    /// Queues a key event for the slot behind this connection.
    ///
    /// Silently ignored if the connection is not a participant or the
    /// session has already ended; input races against termination are
    /// expected and harmless.
    pub async fn apply_key_intent(
        &self,
        session: SessionId,
        connection: ConnectionId,
        direction: KeyDirection,
    ) {
        let sessions = self.shared.sessions.read().await;
        if let Some(handle) = sessions.get(&session) {
            if slot_of(&handle.participants, connection).is_some() {
                let _ = handle.tx.send(SessionCommand::Key {
                    connection,
                    direction,
                });
            }
        }
    }

    /// Ends any session the user is part of as a forfeit against them.
    /// Calling this for a user with no live session is a no-op.
    pub async fn forfeit(&self, user: UserId) {
        let sessions = self.shared.sessions.read().await;
        for handle in sessions.values() {
            if slot_of_user(&handle.participants, user).is_some() {
                let _ = handle.tx.send(SessionCommand::Forfeit { user });
            }
        }
    }

    /// Reports a vanished connection. The owning session forfeits the
    /// corresponding slot on its next tick; sessions the connection does not
    /// participate in are unaffected.
    pub async fn handle_disconnect(&self, connection: ConnectionId) {
        let sessions = self.shared.sessions.read().await;
        for handle in sessions.values() {
            if slot_of(&handle.participants, connection).is_some() {
                let _ = handle.tx.send(SessionCommand::ConnectionLost { connection });
            }
        }
    }

    pub async fn session_status(&self, id: SessionId) -> SessionStatus {
        self.shared
            .sessions
            .read()
            .await
            .get(&id)
            .map(|handle| handle.status)
            .unwrap_or(SessionStatus::Ended)
    }

    pub async fn active_sessions(&self) -> usize {
        self.shared.sessions.read().await.len()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    shared: Arc<EngineShared>,
    id: SessionId,
    mut state: PongState,
    seats: [Participant; 2],
    mode: GameMode,
    origin: MatchOrigin,
    created_at: DateTime<Utc>,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
    mut rng: StdRng,
) {
    sleep(shared.config.countdown).await;

    if let Some(handle) = shared.sessions.write().await.get_mut(&id) {
        handle.status = SessionStatus::Running;
    }
    debug!("session {} entering play", id);

    let tag = room_tag(id);
    let mut ticker = interval(shared.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let terminal = 'game: loop {
        ticker.tick().await;

        // Control mutations queue between ticks and apply here, never
        // mid-tick.
        loop {
            match rx.try_recv() {
                Ok(SessionCommand::Key {
                    connection,
                    direction,
                }) => {
                    if let Some(slot) = slot_of(&seats, connection) {
                        state.apply_intent(slot, direction);
                    }
                }
                Ok(SessionCommand::Forfeit { user }) => {
                    if let Some(slot) = slot_of_user(&seats, user) {
                        break 'game Terminal::Forfeit(slot);
                    }
                }
                Ok(SessionCommand::ConnectionLost { connection }) => {
                    if let Some(slot) = slot_of(&seats, connection) {
                        break 'game Terminal::Forfeit(slot);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if let Some(scorer) = state.step(mode, &mut rng) {
            debug!(
                "session {}: slot {:?} scores, now {}-{}",
                id, scorer, state.score1, state.score2
            );
        }

        // A vanished connection forfeits within one tick interval.
        if !shared.registry.is_live(seats[0].connection).await {
            break Terminal::Forfeit(Slot::One);
        }
        if !shared.registry.is_live(seats[1].connection).await {
            break Terminal::Forfeit(Slot::Two);
        }

        if state.score1 >= shared.config.win_score {
            break Terminal::Win(Slot::One);
        }
        if state.score2 >= shared.config.win_score {
            break Terminal::Win(Slot::Two);
        }

        shared.dispatcher.broadcast_room(
            &tag,
            &ServerEvent::StateTick {
                snapshot: snapshot_of(id, &seats, &state),
            },
        );
    };

    finish_session(&shared, id, &state, &seats, origin, created_at, terminal, &tag).await;
}

#[allow(clippy::too_many_arguments)]
async fn finish_session(
    shared: &Arc<EngineShared>,
    id: SessionId,
    state: &PongState,
    seats: &[Participant; 2],
    origin: MatchOrigin,
    created_at: DateTime<Utc>,
    terminal: Terminal,
    tag: &str,
) {
    // Removing the handle stops any further command or status traffic; the
    // tick recurrence already ended with the loop.
    shared.sessions.write().await.remove(&id);

    let (winner_slot, winner_score, loser_score) = match terminal {
        Terminal::Win(slot) => (slot, state.score_of(slot), state.score_of(slot.other())),
        Terminal::Forfeit(slot) => {
            info!("session {}: slot {:?} forfeits", id, slot);
            (slot.other(), shared.config.win_score, 0)
        }
    };
    let winner = seat(seats, winner_slot);
    let loser = seat(seats, winner_slot.other());

    let outcome = MatchOutcome {
        session_id: id,
        origin,
        winner: winner.user,
        loser: loser.user,
        winner_score,
        loser_score,
        created_at,
        end_at: Utc::now(),
    };
    info!(
        "session {} ended: user {} defeats user {} {}-{}",
        id, winner.user, loser.user, winner_score, loser_score
    );

    shared.dispatcher.broadcast_room(
        tag,
        &ServerEvent::MatchEnded {
            result: outcome.clone(),
        },
    );
    shared.dispatcher.leave_room_channel(seats[0].connection, tag);
    shared.dispatcher.leave_room_channel(seats[1].connection, tag);

    // The session is torn down whether or not persistence succeeds, so the
    // registry is released here rather than in the recorder's shadow.
    for participant in seats {
        let status = if shared.registry.has_live_connection(participant.user).await {
            UserStatus::Online
        } else {
            UserStatus::Offline
        };
        shared.registry.set_status(participant.user, status).await;
    }

    // Persistence is off the hot path: other sessions keep ticking while
    // this write completes.
    let recorder = Arc::clone(&shared.recorder);
    tokio::spawn(async move {
        if let Err(e) = recorder.record(&outcome).await {
            error!(
                "failed to persist result for session {}: {}",
                outcome.session_id, e
            );
        }
    });
}
