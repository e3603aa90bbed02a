use std::time::Duration;

/// Runtime tuning for the session engine and matchmaking coordinator.
///
/// Defaults match the production values; tests shrink the timers so a full
/// match lifecycle fits in milliseconds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed simulation step. One snapshot is broadcast per tick.
    pub tick_interval: Duration,
    /// Grace period between match formation and the first tick, giving both
    /// clients time to acknowledge the match-found event.
    pub countdown: Duration,
    /// First score to reach this wins. A forfeit awards this score to the
    /// remaining side and zero to the leaver.
    pub win_score: u8,
    /// How often the ladder queue is scanned for pairs.
    pub matchmaking_interval: Duration,
    /// Ladder rating delta range, drawn independently per participant.
    /// Lower bound inclusive, upper bound exclusive.
    pub ladder_delta_min: i32,
    pub ladder_delta_max: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(20),
            countdown: Duration::from_millis(3000),
            win_score: 5,
            matchmaking_interval: Duration::from_secs(1),
            ladder_delta_min: 13,
            ladder_delta_max: 21,
        }
    }
}
