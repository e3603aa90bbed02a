//! Wire-shape types shared between the match service core and its transport
//! gateway: identifier newtypes, arena constants, the inbound command and
//! outbound event enums, and the authoritative per-tick snapshot.
//!
//! The gateway owns the actual socket layer; these types only fix the event
//! names and payload shapes it carries. Serde renames pin the on-wire casing
//! so the core can evolve field names freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Arena geometry. The simulation uses a centered coordinate system: the
// origin is mid-field, x grows toward slot two's goal, y toward the bottom
// wall. Paddles sit just inside the left and right edges.
pub const ARENA_WIDTH: f32 = 1200.0;
pub const ARENA_HEIGHT: f32 = 800.0;
pub const PADDLE_WIDTH: f32 = 15.0;
pub const PADDLE_HEIGHT: f32 = 120.0;
pub const BALL_RADIUS: f32 = 15.0;

/// Largest offset a paddle center may take from mid-field.
pub const MAX_PADDLE_OFFSET: f32 = (ARENA_HEIGHT - PADDLE_HEIGHT) / 2.0;
/// |y| at which the ball center touches a horizontal wall.
pub const WALL_PLANE: f32 = ARENA_HEIGHT / 2.0 - BALL_RADIUS;
/// |x| of the paddle contact plane.
pub const PADDLE_PLANE: f32 = ARENA_WIDTH / 2.0 - PADDLE_WIDTH - BALL_RADIUS;
/// |x| past which a goal is scored.
pub const SCORE_PLANE: f32 = ARENA_WIDTH / 2.0 - BALL_RADIUS;

/// Paddle travel per tick at full key intent.
pub const PADDLE_STEP: f32 = 12.0;
/// Ball velocity is multiplied by this factor each tick.
pub const BALL_STEP: f32 = 1.5;
/// Serve speed magnitude range, drawn independently per axis.
pub const SERVE_SPEED_MIN: f32 = 3.0;
pub const SERVE_SPEED_MAX: f32 = 6.0;

/// Identifies one live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

/// Identifies a user account, stable across connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifies an open custom/invite room prior to session formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u64);

/// Identifies a running or finished match session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall rule for a match. Classic reflects the ball off the horizontal
/// walls; Wrap teleports it to the opposite wall with velocity unchanged.
/// This is the only behavioral difference between the two modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Classic,
    Wrap,
}

/// How a session came to exist. Only ladder matches move ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOrigin {
    Ladder,
    Custom,
    Invite,
}

/// Vertical key intent reported by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDirection {
    Up,
    Down,
    Released,
}

/// Presence of a user as seen by the rest of the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserStatus {
    Online,
    InGame,
    #[default]
    Offline,
}

/// Authoritative state broadcast to both participants after every tick.
/// Clients render purely from this payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub room_id: SessionId,
    pub user1: UserId,
    pub user2: UserId,
    pub paddle1: f32,
    pub paddle2: f32,
    pub ball_x: f32,
    pub ball_y: f32,
    pub score1: u8,
    pub score2: u8,
}

/// Terminal artifact of a finished session. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub session_id: SessionId,
    pub origin: MatchOrigin,
    pub winner: UserId,
    pub loser: UserId,
    pub winner_score: u8,
    pub loser_score: u8,
    pub created_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Public descriptor of an open room. Never carries the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub title: String,
    pub is_locked: bool,
    pub is_private: bool,
    pub host: UserId,
    pub guest: Option<UserId>,
}

/// Inbound control messages, routed by the gateway to the service core.
/// Replies that are synchronous (a created room's descriptor, the room
/// list) come back as return values rather than push events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientCommand {
    QueueJoin,
    QueueLeave,
    RoomCreate {
        title: String,
        password: Option<String>,
    },
    RoomList,
    #[serde(rename_all = "camelCase")]
    RoomJoin {
        room_id: RoomId,
        password: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RoomStart {
        room_id: RoomId,
        mode: GameMode,
    },
    #[serde(rename_all = "camelCase")]
    RoomExit {
        room_id: RoomId,
    },
    #[serde(rename_all = "camelCase")]
    Invite {
        target_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    KeyInput {
        room_id: SessionId,
        direction: KeyDirection,
    },
}

/// Outbound push events delivered through the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerEvent {
    MatchFound {
        snapshot: Snapshot,
    },
    StateTick {
        snapshot: Snapshot,
    },
    MatchEnded {
        result: MatchOutcome,
    },
    #[serde(rename_all = "camelCase")]
    RoomFull {
        room_id: RoomId,
    },
    #[serde(rename_all = "camelCase")]
    WrongPassword {
        room_id: RoomId,
    },
    GuestJoined {
        room: RoomInfo,
    },
    #[serde(rename_all = "camelCase")]
    InviteReceived {
        from: String,
        room_id: RoomId,
    },
    InviteDismissed,
    OpponentLeft {
        room: RoomInfo,
    },
    RoomDestroyed,
}
