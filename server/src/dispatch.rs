//! Outbound event delivery seam.
//!
//! The core never talks to sockets. It pushes `ServerEvent`s through this
//! capability and the transport gateway decides how they reach the wire.
//! Room channels exist purely for snapshot fan-out: a session joins both
//! participants to one tag and broadcasts to it every tick.

use log::{debug, trace};
use shared::{ConnectionId, ServerEvent};
use std::collections::HashMap;
use std::sync::Mutex;

/// Fire-and-forget push delivery to connected clients.
///
/// Implementations must not block; a slow or gone receiver is the
/// gateway's problem, never the tick loop's.
pub trait Dispatcher: Send + Sync + 'static {
    fn notify(&self, connection: ConnectionId, event: &ServerEvent);

    fn notify_many(&self, connections: &[ConnectionId], event: &ServerEvent) {
        for &connection in connections {
            self.notify(connection, event);
        }
    }

    fn join_room_channel(&self, connection: ConnectionId, tag: &str);

    fn leave_room_channel(&self, connection: ConnectionId, tag: &str);

    fn broadcast_room(&self, tag: &str, event: &ServerEvent);
}

#[derive(Default)]
struct RecordingState {
    events: Vec<(ConnectionId, ServerEvent)>,
    channels: HashMap<String, Vec<ConnectionId>>,
}

/// Captures every delivered event in memory, in delivery order.
///
/// Used by tests and anything else that wants to observe the outbound
/// stream without a transport.
#[derive(Default)]
pub struct RecordingDispatcher {
    state: Mutex<RecordingState>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered to one connection, in order.
    pub fn events_for(&self, connection: ConnectionId) -> Vec<ServerEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|(to, _)| *to == connection)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn all_events(&self) -> Vec<(ConnectionId, ServerEvent)> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn channel_members(&self, tag: &str) -> Vec<ConnectionId> {
        self.state
            .lock()
            .unwrap()
            .channels
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn notify(&self, connection: ConnectionId, event: &ServerEvent) {
        self.state
            .lock()
            .unwrap()
            .events
            .push((connection, event.clone()));
    }

    fn join_room_channel(&self, connection: ConnectionId, tag: &str) {
        let mut state = self.state.lock().unwrap();
        let members = state.channels.entry(tag.to_string()).or_default();
        if !members.contains(&connection) {
            members.push(connection);
        }
    }

    fn leave_room_channel(&self, connection: ConnectionId, tag: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(members) = state.channels.get_mut(tag) {
            members.retain(|&member| member != connection);
        }
    }

    fn broadcast_room(&self, tag: &str, event: &ServerEvent) {
        let mut state = self.state.lock().unwrap();
        let members = state.channels.get(tag).cloned().unwrap_or_default();
        for member in members {
            state.events.push((member, event.clone()));
        }
    }
}

/// Writes events to the log instead of a transport. Snapshot ticks go to
/// trace so a demo run stays readable at info level.
pub struct LogDispatcher;

impl LogDispatcher {
    fn log(&self, target: &str, event: &ServerEvent) {
        match event {
            ServerEvent::StateTick { .. } => trace!("-> {}: {:?}", target, event),
            _ => debug!("-> {}: {:?}", target, event),
        }
    }
}

impl Dispatcher for LogDispatcher {
    fn notify(&self, connection: ConnectionId, event: &ServerEvent) {
        self.log(&format!("conn {}", connection), event);
    }

    fn join_room_channel(&self, connection: ConnectionId, tag: &str) {
        debug!("conn {} joins channel {}", connection, tag);
    }

    fn leave_room_channel(&self, connection: ConnectionId, tag: &str) {
        debug!("conn {} leaves channel {}", connection, tag);
    }

    fn broadcast_room(&self, tag: &str, event: &ServerEvent) {
        self.log(&format!("channel {}", tag), event);
    }
}
