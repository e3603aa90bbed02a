//! Matchmaking queue and custom room catalog.
//!
//! The coordinator owns two pieces of state: a strict-FIFO ladder queue and
//! the catalog of open custom/invite rooms. Both live behind one async
//! mutex, so every mutating operation is serialized; no operation here is
//! on a per-tick hot path.
//!
//! The ladder scan deliberately does not check whether a queued connection
//! is still alive. A pair containing a dead connection forms a session
//! anyway, and the session's first tick resolves it as a forfeit. That
//! keeps the scan O(1) per pair with no liveness round-trips.

use crate::dispatch::Dispatcher;
use crate::error::GameError;
use crate::registry::ConnectionRegistry;
use crate::session::{Participant, SessionEngine};
use crate::store::UserDirectory;
use log::{debug, info};
use shared::{
    ConnectionId, GameMode, MatchOrigin, RoomId, RoomInfo, ServerEvent, SessionId, UserId,
    UserStatus,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A connection awaiting ladder matchmaking. The user is resolved once at
/// enqueue time so a later disconnect cannot orphan the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub connection: ConnectionId,
    pub user: UserId,
}

#[derive(Debug, Clone)]
struct CustomRoom {
    id: RoomId,
    title: String,
    password: Option<String>,
    is_private: bool,
    host: Participant,
    guest: Option<Participant>,
}

impl CustomRoom {
    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id,
            title: self.title.clone(),
            is_locked: self.password.is_some(),
            is_private: self.is_private,
            host: self.host.user,
            guest: self.guest.map(|guest| guest.user),
        }
    }

    fn involves(&self, user: UserId) -> bool {
        self.host.user == user || self.guest.is_some_and(|guest| guest.user == user)
    }
}

#[derive(Default)]
struct CoordinatorState {
    queue: VecDeque<QueueEntry>,
    rooms: HashMap<RoomId, CustomRoom>,
    next_room_id: u64,
}

impl CoordinatorState {
    fn allocate_room_id(&mut self) -> RoomId {
        self.next_room_id += 1;
        RoomId(self.next_room_id)
    }

    fn drop_from_queue(&mut self, connection: ConnectionId) {
        self.queue.retain(|entry| entry.connection != connection);
    }
}

/// Turns player intents into sessions: ladder pairing on a fixed scan, and
/// the create/join/start lifecycle of custom and invite rooms.
pub struct MatchCoordinator {
    state: Mutex<CoordinatorState>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    directory: Arc<dyn UserDirectory>,
    engine: Arc<SessionEngine>,
}

impl MatchCoordinator {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<dyn Dispatcher>,
        directory: Arc<dyn UserDirectory>,
        engine: Arc<SessionEngine>,
    ) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            registry,
            dispatcher,
            directory,
            engine,
        }
    }

    async fn entry_for(&self, connection: ConnectionId) -> Result<QueueEntry, GameError> {
        let user = self
            .registry
            .user_for(connection)
            .await
            .ok_or(GameError::UnknownConnection(connection))?;
        Ok(QueueEntry { connection, user })
    }

    /// Adds a connection to the ladder queue. Idempotent: a connection that
    /// is already queued stays where it is.
    pub async fn enqueue_ladder(&self, connection: ConnectionId) -> Result<(), GameError> {
        let entry = self.entry_for(connection).await?;
        let mut state = self.state.lock().await;
        if state
            .queue
            .iter()
            .any(|queued| queued.connection == connection)
        {
            debug!("connection {} is already queued", connection);
            return Ok(());
        }
        state.queue.push_back(entry);
        info!(
            "connection {} (user {}) queued for ladder, depth {}",
            connection,
            entry.user,
            state.queue.len()
        );
        Ok(())
    }

    /// Removes a connection from the queue if it is still there. A request
    /// arriving after the connection was already matched is not an error.
    pub async fn dequeue_ladder(&self, connection: ConnectionId) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        state.drop_from_queue(connection);
        Ok(())
    }

    /// Opens a public custom room hosted by this connection. Title and
    /// password validation belong to the caller; anything is accepted here.
    pub async fn create_custom_room(
        &self,
        connection: ConnectionId,
        title: String,
        password: Option<String>,
    ) -> Result<RoomInfo, GameError> {
        let host = self.entry_for(connection).await?;
        let mut state = self.state.lock().await;
        // Hosting a room and waiting on the ladder are mutually exclusive.
        state.drop_from_queue(connection);

        let id = state.allocate_room_id();
        let room = CustomRoom {
            id,
            title,
            password,
            is_private: false,
            host: Participant {
                user: host.user,
                connection,
            },
            guest: None,
        };
        let info = room.info();
        state.rooms.insert(id, room);
        info!("user {} opened room {} ({:?})", host.user, id, info.title);
        Ok(info)
    }

    /// Snapshot of the publicly listed rooms. Invite rooms are private and
    /// never appear here; passwords are not part of the descriptor at all.
    pub async fn list_custom_rooms(&self) -> Vec<RoomInfo> {
        let state = self.state.lock().await;
        let mut rooms: Vec<RoomInfo> = state
            .rooms
            .values()
            .filter(|room| !room.is_private)
            .map(CustomRoom::info)
            .collect();
        rooms.sort_by_key(|room| room.room_id);
        rooms
    }

    /// Takes the guest slot of a room. The host learns about the join; the
    /// caller gets the descriptor back.
    pub async fn join_custom_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
        password: Option<String>,
    ) -> Result<RoomInfo, GameError> {
        let guest = self.entry_for(connection).await?;
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;

        if room.guest.is_some() {
            return Err(GameError::RoomFull(room_id));
        }
        if room.password != password {
            return Err(GameError::WrongPassword(room_id));
        }

        room.guest = Some(Participant {
            user: guest.user,
            connection,
        });
        let info = room.info();
        let host_connection = room.host.connection;
        state.drop_from_queue(connection);
        self.dispatcher.notify(
            host_connection,
            &ServerEvent::GuestJoined { room: info.clone() },
        );
        info!("user {} joined room {}", guest.user, room_id);
        Ok(info)
    }

    /// Hands the room off to the session engine. Only the host may start,
    /// and only with a guest seated. The room is consumed unconditionally:
    /// whatever happens to session creation, it must not linger in the
    /// catalog.
    pub async fn start_custom_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
        mode: GameMode,
    ) -> Result<SessionId, GameError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get(&room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;
        if room.host.connection != connection {
            return Err(GameError::PermissionDenied(format!(
                "only the host may start room {}",
                room_id
            )));
        }
        if room.guest.is_none() {
            return Err(GameError::Validation(format!(
                "room {} has no guest to play against",
                room_id
            )));
        }

        let room = state
            .rooms
            .remove(&room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;
        let guest = room
            .guest
            .ok_or_else(|| GameError::Validation(format!("room {} lost its guest", room_id)))?;
        info!(
            "room {} starting as a {:?} match: user {} vs user {}",
            room_id, mode, room.host.user, guest.user
        );
        let session = self
            .engine
            .create_session(room.host, guest, mode, MatchOrigin::Custom)
            .await;
        Ok(session)
    }

    /// Leaves a room. The host leaving destroys it and tells the guest; a
    /// guest leaving reopens the slot and tells the host.
    pub async fn exit_custom_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;

        if room.host.connection == connection {
            if let Some(room) = state.rooms.remove(&room_id) {
                if let Some(guest) = room.guest {
                    self.dispatcher
                        .notify(guest.connection, &ServerEvent::RoomDestroyed);
                }
            }
            info!("host closed room {}", room_id);
        } else if room
            .guest
            .is_some_and(|guest| guest.connection == connection)
        {
            room.guest = None;
            let info = room.info();
            let host_connection = room.host.connection;
            self.dispatcher
                .notify(host_connection, &ServerEvent::OpponentLeft { room: info });
            info!("guest left room {}, reopened", room_id);
        } else {
            debug!(
                "connection {} is not a member of room {}, ignoring exit",
                connection, room_id
            );
        }
        Ok(())
    }

    /// Creates a private room and pushes an invite at the target's live
    /// connections. Rejected while either side is tangled up in another
    /// room or the target is mid-game.
    pub async fn invite_to_game(
        &self,
        connection: ConnectionId,
        target: UserId,
    ) -> Result<RoomInfo, GameError> {
        let inviter = self.entry_for(connection).await?;
        let inviter_profile = self.directory.find_user(inviter.user)?;
        // The target must exist even if offline; inviting a ghost is an
        // error, not a silent no-op.
        self.directory.find_user(target)?;

        let mut state = self.state.lock().await;
        if self.registry.status_of(target).await == UserStatus::InGame {
            return Err(GameError::AlreadyInGame(target));
        }
        if state.rooms.values().any(|room| room.involves(inviter.user)) {
            return Err(GameError::AlreadyInGame(inviter.user));
        }
        if state.rooms.values().any(|room| room.involves(target)) {
            return Err(GameError::AlreadyInGame(target));
        }

        let id = state.allocate_room_id();
        let room = CustomRoom {
            id,
            title: format!("{}'s game", inviter_profile.nickname),
            password: None,
            is_private: true,
            host: Participant {
                user: inviter.user,
                connection,
            },
            guest: None,
        };
        let info = room.info();
        state.rooms.insert(id, room);

        let invite = ServerEvent::InviteReceived {
            from: inviter_profile.nickname.clone(),
            room_id: id,
        };
        for target_connection in self.registry.connections_for(target).await {
            self.dispatcher.notify(target_connection, &invite);
        }
        info!("user {} invited user {} (room {})", inviter.user, target, id);
        Ok(info)
    }

    /// Tears down an invite room that was declined or timed out, informing
    /// the inviter.
    pub async fn decline_invite(&self, room_id: RoomId) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .remove(&room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;
        self.dispatcher
            .notify(room.host.connection, &ServerEvent::InviteDismissed);
        info!("invite room {} dismissed", room_id);
        Ok(())
    }

    /// One ladder scan: pairs the two oldest entries until fewer than two
    /// remain. Strict FIFO, no skipping, no rating windows.
    pub async fn run_ladder_matching_tick(&self) {
        let mut state = self.state.lock().await;
        while state.queue.len() >= 2 {
            let (Some(first), Some(second)) = (state.queue.pop_front(), state.queue.pop_front())
            else {
                break;
            };
            info!(
                "ladder pairing user {} with user {}",
                first.user, second.user
            );
            self.engine
                .create_session(
                    Participant {
                        user: first.user,
                        connection: first.connection,
                    },
                    Participant {
                        user: second.user,
                        connection: second.connection,
                    },
                    GameMode::Classic,
                    MatchOrigin::Ladder,
                )
                .await;
        }
    }

    /// Disconnect cleanup: pulls the user out of the queue and resolves any
    /// room they were part of, with the same notifications as an explicit
    /// exit.
    pub async fn clear_user(&self, user: UserId) {
        let mut state = self.state.lock().await;
        state.queue.retain(|entry| entry.user != user);

        let hosted: Vec<RoomId> = state
            .rooms
            .values()
            .filter(|room| room.host.user == user)
            .map(|room| room.id)
            .collect();
        for id in hosted {
            if let Some(room) = state.rooms.remove(&id) {
                if let Some(guest) = room.guest {
                    self.dispatcher
                        .notify(guest.connection, &ServerEvent::RoomDestroyed);
                }
                info!("room {} destroyed, host user {} disconnected", id, user);
            }
        }

        let joined: Vec<RoomId> = state
            .rooms
            .values()
            .filter(|room| room.guest.is_some_and(|guest| guest.user == user))
            .map(|room| room.id)
            .collect();
        for id in joined {
            if let Some(room) = state.rooms.get_mut(&id) {
                room.guest = None;
                let info = room.info();
                let host_connection = room.host.connection;
                self.dispatcher
                    .notify(host_connection, &ServerEvent::OpponentLeft { room: info });
                info!("room {} reopened, guest user {} disconnected", id, user);
            }
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dispatch::RecordingDispatcher;
    use crate::recorder::ResultRecorder;
    use crate::store::{MemoryBackend, UserProfile};
    use shared::Snapshot;
    use std::time::Duration;

    struct Stack {
        coordinator: MatchCoordinator,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<RecordingDispatcher>,
        engine: Arc<SessionEngine>,
    }

    async fn stack() -> Stack {
        let config = EngineConfig {
            tick_interval: Duration::from_millis(5),
            countdown: Duration::from_millis(25),
            ..EngineConfig::default()
        };
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let backend = Arc::new(MemoryBackend::new());
        for (id, name) in [(1, "ada"), (2, "mel"), (3, "kay"), (4, "gus")] {
            backend.insert_user(UserProfile::new(UserId(id), name, 1000));
            registry.bind(ConnectionId(id), UserId(id)).await;
        }

        let recorder = Arc::new(ResultRecorder::new(
            backend.clone(),
            backend.clone(),
            registry.clone(),
            config.clone(),
        ));
        let engine = Arc::new(SessionEngine::new(
            config,
            registry.clone(),
            dispatcher.clone(),
            backend.clone(),
            recorder,
        ));
        let coordinator = MatchCoordinator::new(
            registry.clone(),
            dispatcher.clone(),
            backend,
            engine.clone(),
        );
        Stack {
            coordinator,
            registry,
            dispatcher,
            engine,
        }
    }

    fn first_match_found(dispatcher: &RecordingDispatcher, connection: ConnectionId) -> Snapshot {
        dispatcher
            .events_for(connection)
            .into_iter()
            .find_map(|event| match event {
                ServerEvent::MatchFound { snapshot } => Some(snapshot),
                _ => None,
            })
            .expect("no match-found event delivered")
    }

    #[tokio::test]
    async fn enqueue_is_idempotent() {
        let stack = stack().await;
        stack.coordinator.enqueue_ladder(ConnectionId(1)).await.unwrap();
        stack.coordinator.enqueue_ladder(ConnectionId(1)).await.unwrap();
        assert_eq!(stack.coordinator.queue_len().await, 1);
    }

    #[tokio::test]
    async fn enqueue_rejects_unknown_connections() {
        let stack = stack().await;
        let result = stack.coordinator.enqueue_ladder(ConnectionId(99)).await;
        assert!(matches!(result, Err(GameError::UnknownConnection(_))));
    }

    #[tokio::test]
    async fn dequeue_after_match_is_tolerated() {
        let stack = stack().await;
        stack.coordinator.enqueue_ladder(ConnectionId(1)).await.unwrap();
        stack.coordinator.dequeue_ladder(ConnectionId(1)).await.unwrap();
        // Second leave for a connection that is long gone from the queue.
        stack.coordinator.dequeue_ladder(ConnectionId(1)).await.unwrap();
        assert_eq!(stack.coordinator.queue_len().await, 0);
    }

    #[tokio::test]
    async fn ladder_pairs_strictly_fifo() {
        let stack = stack().await;
        for id in 1..=4 {
            stack
                .coordinator
                .enqueue_ladder(ConnectionId(id))
                .await
                .unwrap();
        }

        stack.coordinator.run_ladder_matching_tick().await;

        assert_eq!(stack.coordinator.queue_len().await, 0);
        assert_eq!(stack.engine.active_sessions().await, 2);

        // Oldest two first: the session delivered to connection 1 pairs
        // users 1 and 2, in slot order.
        let snapshot = first_match_found(&stack.dispatcher, ConnectionId(1));
        assert_eq!(snapshot.user1, UserId(1));
        assert_eq!(snapshot.user2, UserId(2));
        let snapshot = first_match_found(&stack.dispatcher, ConnectionId(3));
        assert_eq!(snapshot.user1, UserId(3));
        assert_eq!(snapshot.user2, UserId(4));
    }

    #[tokio::test]
    async fn odd_entry_stays_queued() {
        let stack = stack().await;
        for id in 1..=3 {
            stack
                .coordinator
                .enqueue_ladder(ConnectionId(id))
                .await
                .unwrap();
        }

        stack.coordinator.run_ladder_matching_tick().await;

        assert_eq!(stack.coordinator.queue_len().await, 1);
        assert_eq!(stack.engine.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn room_join_respects_capacity() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();

        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, None)
            .await
            .unwrap();
        let result = stack
            .coordinator
            .join_custom_room(ConnectionId(3), room.room_id, None)
            .await;

        assert!(matches!(result, Err(GameError::RoomFull(_))));
        // The seated guest is untouched by the failed join.
        let listed = stack.coordinator.list_custom_rooms().await;
        assert_eq!(listed[0].guest, Some(UserId(2)));
    }

    #[tokio::test]
    async fn wrong_password_rejects_without_seating() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "locked".to_string(), Some("sesame".into()))
            .await
            .unwrap();
        assert!(room.is_locked);

        let result = stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, Some("simsim".into()))
            .await;
        assert!(matches!(result, Err(GameError::WrongPassword(_))));

        let listed = stack.coordinator.list_custom_rooms().await;
        assert_eq!(listed[0].guest, None);

        // Correct password gets in.
        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, Some("sesame".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_join_start_consumes_the_room() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "round trip".to_string(), None)
            .await
            .unwrap();
        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, None)
            .await
            .unwrap();

        stack
            .coordinator
            .start_custom_room(ConnectionId(1), room.room_id, GameMode::Wrap)
            .await
            .unwrap();

        assert!(stack.coordinator.list_custom_rooms().await.is_empty());
        assert_eq!(stack.engine.active_sessions().await, 1);
        // Host takes slot one, guest slot two.
        let snapshot = first_match_found(&stack.dispatcher, ConnectionId(2));
        assert_eq!(snapshot.user1, UserId(1));
        assert_eq!(snapshot.user2, UserId(2));
    }

    #[tokio::test]
    async fn only_the_host_may_start() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();
        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, None)
            .await
            .unwrap();

        let result = stack
            .coordinator
            .start_custom_room(ConnectionId(2), room.room_id, GameMode::Classic)
            .await;

        assert!(matches!(result, Err(GameError::PermissionDenied(_))));
        // A rejected start does not consume the room.
        assert_eq!(stack.coordinator.room_count().await, 1);
    }

    #[tokio::test]
    async fn start_without_guest_is_rejected() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "empty".to_string(), None)
            .await
            .unwrap();

        let result = stack
            .coordinator
            .start_custom_room(ConnectionId(1), room.room_id, GameMode::Classic)
            .await;

        assert!(matches!(result, Err(GameError::Validation(_))));
    }

    #[tokio::test]
    async fn host_exit_destroys_and_notifies_guest() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();
        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, None)
            .await
            .unwrap();

        stack
            .coordinator
            .exit_custom_room(ConnectionId(1), room.room_id)
            .await
            .unwrap();

        assert_eq!(stack.coordinator.room_count().await, 0);
        assert!(stack
            .dispatcher
            .events_for(ConnectionId(2))
            .iter()
            .any(|event| matches!(event, ServerEvent::RoomDestroyed)));
    }

    #[tokio::test]
    async fn guest_exit_reopens_and_notifies_host() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();
        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, None)
            .await
            .unwrap();

        stack
            .coordinator
            .exit_custom_room(ConnectionId(2), room.room_id)
            .await
            .unwrap();

        let listed = stack.coordinator.list_custom_rooms().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].guest, None);
        assert!(stack
            .dispatcher
            .events_for(ConnectionId(1))
            .iter()
            .any(|event| matches!(event, ServerEvent::OpponentLeft { .. })));

        // The slot is genuinely open again.
        stack
            .coordinator
            .join_custom_room(ConnectionId(3), room.room_id, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invite_creates_private_room_and_reaches_target() {
        let stack = stack().await;

        let room = stack
            .coordinator
            .invite_to_game(ConnectionId(1), UserId(2))
            .await
            .unwrap();

        assert!(room.is_private);
        assert_eq!(room.title, "ada's game");
        // Private rooms are not listed.
        assert!(stack.coordinator.list_custom_rooms().await.is_empty());
        assert!(stack
            .dispatcher
            .events_for(ConnectionId(2))
            .iter()
            .any(|event| matches!(
                event,
                ServerEvent::InviteReceived { from, .. } if from == "ada"
            )));
    }

    #[tokio::test]
    async fn invite_rejected_while_either_side_is_busy() {
        let stack = stack().await;

        // Inviter already hosts a room.
        stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();
        let result = stack
            .coordinator
            .invite_to_game(ConnectionId(1), UserId(2))
            .await;
        assert!(matches!(result, Err(GameError::AlreadyInGame(user)) if user == UserId(1)));

        // Target is mid-game.
        stack
            .registry
            .set_status(UserId(4), UserStatus::InGame)
            .await;
        let result = stack
            .coordinator
            .invite_to_game(ConnectionId(3), UserId(4))
            .await;
        assert!(matches!(result, Err(GameError::AlreadyInGame(user)) if user == UserId(4)));
    }

    #[tokio::test]
    async fn declined_invite_dismisses_the_room() {
        let stack = stack().await;
        let room = stack
            .coordinator
            .invite_to_game(ConnectionId(1), UserId(2))
            .await
            .unwrap();

        stack.coordinator.decline_invite(room.room_id).await.unwrap();

        assert_eq!(stack.coordinator.room_count().await, 0);
        assert!(stack
            .dispatcher
            .events_for(ConnectionId(1))
            .iter()
            .any(|event| matches!(event, ServerEvent::InviteDismissed)));
    }

    #[tokio::test]
    async fn clear_user_sweeps_queue_and_rooms() {
        let stack = stack().await;
        stack.coordinator.enqueue_ladder(ConnectionId(3)).await.unwrap();
        let room = stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();
        stack
            .coordinator
            .join_custom_room(ConnectionId(2), room.room_id, None)
            .await
            .unwrap();

        // Guest disconnects: the room reopens.
        stack.coordinator.clear_user(UserId(2)).await;
        assert_eq!(stack.coordinator.list_custom_rooms().await[0].guest, None);

        // Host disconnects: the room goes away; the queued user too.
        stack.coordinator.clear_user(UserId(1)).await;
        stack.coordinator.clear_user(UserId(3)).await;
        assert_eq!(stack.coordinator.room_count().await, 0);
        assert_eq!(stack.coordinator.queue_len().await, 0);
    }

    #[tokio::test]
    async fn queued_connection_entering_a_room_leaves_the_queue() {
        let stack = stack().await;
        stack.coordinator.enqueue_ladder(ConnectionId(1)).await.unwrap();

        stack
            .coordinator
            .create_custom_room(ConnectionId(1), "mine".to_string(), None)
            .await
            .unwrap();

        assert_eq!(stack.coordinator.queue_len().await, 0);
    }
}
