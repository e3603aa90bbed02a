use shared::{ConnectionId, RoomId, SessionId, UserId};
use thiserror::Error;

/// Everything a coordinator or recorder operation can reject with.
///
/// Rejections are returned synchronously to the initiating caller and never
/// change state. Mid-tick failures inside a running session are not
/// represented here; the session engine resolves those as forfeits instead
/// of surfacing them.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not permitted: {0}")]
    PermissionDenied(String),

    #[error("room {0} already has a guest")]
    RoomFull(RoomId),

    #[error("wrong password for room {0}")]
    WrongPassword(RoomId),

    #[error("user {0} is already in a game or an open room")]
    AlreadyInGame(UserId),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("no user bound to connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("storage failure: {0}")]
    Storage(String),
}
