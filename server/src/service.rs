//! Front door of the match service.
//!
//! `GameService` wires the registry, coordinator, engine and recorder
//! together, routes inbound client commands to the right component, and
//! owns the periodic ladder scan. The transport gateway holds one of these
//! and calls three things: `on_connect`, `on_disconnect`, and
//! `handle_command`.

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::GameError;
use crate::matchmaker::MatchCoordinator;
use crate::recorder::ResultRecorder;
use crate::registry::ConnectionRegistry;
use crate::session::SessionEngine;
use crate::store::{MatchStore, UserDirectory};
use log::debug;
use shared::{ClientCommand, ConnectionId, RoomId, RoomInfo, ServerEvent, UserId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Synchronous reply to a handled command. Push traffic (snapshots, join
/// notifications, rejections with a wire event) flows through the
/// dispatcher instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    None,
    Room(RoomInfo),
    RoomList(Vec<RoomInfo>),
}

pub struct GameService {
    config: EngineConfig,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    coordinator: Arc<MatchCoordinator>,
    engine: Arc<SessionEngine>,
}

impl GameService {
    pub fn new(
        config: EngineConfig,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<dyn Dispatcher>,
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        let recorder = Arc::new(ResultRecorder::new(
            directory.clone(),
            store,
            registry.clone(),
            config.clone(),
        ));
        let engine = Arc::new(SessionEngine::new(
            config.clone(),
            registry.clone(),
            dispatcher.clone(),
            directory.clone(),
            recorder,
        ));
        let coordinator = Arc::new(MatchCoordinator::new(
            registry.clone(),
            dispatcher.clone(),
            directory,
            engine.clone(),
        ));
        Self {
            config,
            registry,
            dispatcher,
            coordinator,
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<SessionEngine> {
        &self.engine
    }

    pub fn coordinator(&self) -> &Arc<MatchCoordinator> {
        &self.coordinator
    }

    /// Called by the connection layer once a connection is authenticated.
    pub async fn on_connect(&self, connection: ConnectionId, user: UserId) {
        self.registry.bind(connection, user).await;
    }

    /// Called by the connection layer when a connection drops. Any running
    /// session forfeits the leaver, queue entries and rooms are swept, and
    /// the binding is released.
    pub async fn on_disconnect(&self, connection: ConnectionId) {
        self.engine.handle_disconnect(connection).await;
        if let Some(user) = self.registry.unbind(connection).await {
            self.coordinator.clear_user(user).await;
        }
    }

    /// Routes one inbound command. Rejections come back as errors; the ones
    /// with a wire representation (room-full, wrong-password) are also
    /// pushed to the offending connection so thin clients need no reply
    /// plumbing.
    pub async fn handle_command(
        &self,
        connection: ConnectionId,
        command: ClientCommand,
    ) -> Result<CommandReply, GameError> {
        debug!("connection {}: {:?}", connection, command);
        match command {
            ClientCommand::QueueJoin => {
                self.coordinator.enqueue_ladder(connection).await?;
                Ok(CommandReply::None)
            }
            ClientCommand::QueueLeave => {
                self.coordinator.dequeue_ladder(connection).await?;
                Ok(CommandReply::None)
            }
            ClientCommand::RoomCreate { title, password } => {
                let room = self
                    .coordinator
                    .create_custom_room(connection, title, password)
                    .await?;
                Ok(CommandReply::Room(room))
            }
            ClientCommand::RoomList => {
                Ok(CommandReply::RoomList(self.coordinator.list_custom_rooms().await))
            }
            ClientCommand::RoomJoin { room_id, password } => {
                match self
                    .coordinator
                    .join_custom_room(connection, room_id, password)
                    .await
                {
                    Ok(room) => Ok(CommandReply::Room(room)),
                    Err(error) => {
                        self.push_rejection(connection, room_id, &error);
                        Err(error)
                    }
                }
            }
            ClientCommand::RoomStart { room_id, mode } => {
                self.coordinator
                    .start_custom_room(connection, room_id, mode)
                    .await?;
                Ok(CommandReply::None)
            }
            ClientCommand::RoomExit { room_id } => {
                self.coordinator.exit_custom_room(connection, room_id).await?;
                Ok(CommandReply::None)
            }
            ClientCommand::Invite { target_user_id } => {
                let room = self
                    .coordinator
                    .invite_to_game(connection, target_user_id)
                    .await?;
                Ok(CommandReply::Room(room))
            }
            ClientCommand::KeyInput { room_id, direction } => {
                self.engine
                    .apply_key_intent(room_id, connection, direction)
                    .await;
                Ok(CommandReply::None)
            }
        }
    }

    /// Dismisses a pending invite room, typically when the target declines
    /// or the gateway times the invite out.
    pub async fn decline_invite(&self, room_id: RoomId) -> Result<(), GameError> {
        self.coordinator.decline_invite(room_id).await
    }

    fn push_rejection(&self, connection: ConnectionId, room_id: RoomId, error: &GameError) {
        match error {
            GameError::RoomFull(_) => self
                .dispatcher
                .notify(connection, &ServerEvent::RoomFull { room_id }),
            GameError::WrongPassword(_) => self
                .dispatcher
                .notify(connection, &ServerEvent::WrongPassword { room_id }),
            _ => {}
        }
    }

    /// Starts the periodic ladder scan. The returned handle owns the task;
    /// aborting it stops matchmaking without touching running sessions.
    pub fn spawn_matchmaking(&self) -> JoinHandle<()> {
        let coordinator = Arc::clone(&self.coordinator);
        let period = self.config.matchmaking_interval;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                coordinator.run_ladder_matching_tick().await;
            }
        })
    }
}
