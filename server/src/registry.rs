//! Connection-to-user binding and presence tracking
//!
//! This module maps live transport connections to user accounts and keeps a
//! per-user presence status. It is the one piece of shared state the whole
//! service reads: the coordinator consults it to resolve who sits behind a
//! connection, and every session tick checks it to detect disconnects.
//!
//! Only the surrounding connection layer mutates the registry (bind on
//! connect, unbind on disconnect). Everything else treats it as read-mostly.

use log::info;
use shared::{ConnectionId, UserId, UserStatus};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct RegistryState {
    users_by_connection: HashMap<ConnectionId, UserId>,
    connections_by_user: HashMap<UserId, HashSet<ConnectionId>>,
    status_by_user: HashMap<UserId, UserStatus>,
}

/// Tracks which user is behind each live connection, and whether that user
/// is currently online, in a game, or gone.
///
/// A user may hold several connections at once (multiple tabs); they count
/// as offline only when the last one unbinds.
#[derive(Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a connection with a user.
    ///
    /// A user arriving on their first connection becomes Online; a user who
    /// is already in a game keeps that status across reconnects.
    pub async fn bind(&self, connection: ConnectionId, user: UserId) {
        let mut state = self.state.write().await;
        state.users_by_connection.insert(connection, user);
        state
            .connections_by_user
            .entry(user)
            .or_default()
            .insert(connection);
        let status = state.status_by_user.entry(user).or_insert(UserStatus::Offline);
        if *status == UserStatus::Offline {
            *status = UserStatus::Online;
        }
        info!("connection {} bound to user {}", connection, user);
    }

    /// Removes a connection binding and returns the user it carried.
    ///
    /// When the user's last connection goes away their presence entry is
    /// dropped entirely, which reads back as Offline.
    pub async fn unbind(&self, connection: ConnectionId) -> Option<UserId> {
        let mut state = self.state.write().await;
        let user = state.users_by_connection.remove(&connection)?;
        let mut now_offline = false;
        if let Some(connections) = state.connections_by_user.get_mut(&user) {
            connections.remove(&connection);
            if connections.is_empty() {
                state.connections_by_user.remove(&user);
                state.status_by_user.remove(&user);
                now_offline = true;
            }
        }
        info!(
            "connection {} unbound from user {}{}",
            connection,
            user,
            if now_offline { " (now offline)" } else { "" }
        );
        Some(user)
    }

    /// Resolves the user behind a connection, if any.
    pub async fn user_for(&self, connection: ConnectionId) -> Option<UserId> {
        self.state
            .read()
            .await
            .users_by_connection
            .get(&connection)
            .copied()
    }

    /// True while the connection is bound. Session ticks poll this to catch
    /// disconnects within one tick interval.
    pub async fn is_live(&self, connection: ConnectionId) -> bool {
        self.state
            .read()
            .await
            .users_by_connection
            .contains_key(&connection)
    }

    /// All live connections currently held by a user.
    pub async fn connections_for(&self, user: UserId) -> Vec<ConnectionId> {
        self.state
            .read()
            .await
            .connections_by_user
            .get(&user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True if the user holds at least one live connection.
    pub async fn has_live_connection(&self, user: UserId) -> bool {
        self.state
            .read()
            .await
            .connections_by_user
            .get(&user)
            .is_some_and(|set| !set.is_empty())
    }

    pub async fn set_status(&self, user: UserId, status: UserStatus) {
        let mut state = self.state.write().await;
        state.status_by_user.insert(user, status);
    }

    /// Presence of a user. Unknown users read as Offline.
    pub async fn status_of(&self, user: UserId) -> UserStatus {
        self.state
            .read()
            .await
            .status_by_user
            .get(&user)
            .copied()
            .unwrap_or(UserStatus::Offline)
    }

    /// Number of live connections, for monitoring.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.users_by_connection.len()
    }
}
