//! Collaborator contracts for user lookup and result persistence, plus an
//! in-memory backend implementing both.
//!
//! The real application keeps profiles and match history in its own
//! database; the core only needs these two narrow capabilities. The
//! in-memory backend serves tests and the demo binary, and doubles as the
//! reference for the atomicity the persistence contract demands.

use crate::error::GameError;
use shared::{MatchOutcome, UserId, UserStatus};
use std::collections::HashMap;
use std::sync::Mutex;

/// Profile data the match core reads and adjusts.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: UserId,
    pub nickname: String,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    pub status: UserStatus,
}

impl UserProfile {
    pub fn new(id: UserId, nickname: impl Into<String>, rating: i32) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            rating,
            wins: 0,
            losses: 0,
            status: UserStatus::Offline,
        }
    }
}

/// Read access to user profiles and their stored presence.
pub trait UserDirectory: Send + Sync + 'static {
    fn find_user(&self, user: UserId) -> Result<UserProfile, GameError>;

    fn update_status(&self, user: UserId, status: UserStatus) -> Result<(), GameError>;
}

/// Everything written for one finished match: the result row plus both
/// profile adjustments. Deltas are signed; the loser's is negative.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub outcome: MatchOutcome,
    pub winner_delta: i32,
    pub loser_delta: i32,
    pub winner_status: UserStatus,
    pub loser_status: UserStatus,
}

/// Persistence for finished matches.
pub trait MatchStore: Send + Sync + 'static {
    /// Writes the result row and both profile updates atomically: all of it
    /// lands, or none of it does.
    fn persist_match(&self, record: &MatchRecord) -> Result<(), GameError>;

    /// Match history involving a user, newest first.
    fn matches_for(&self, user: UserId) -> Result<Vec<MatchRecord>, GameError>;
}

#[derive(Default)]
struct BackendState {
    users: HashMap<UserId, UserProfile>,
    matches: Vec<MatchRecord>,
}

/// In-memory profile and result storage behind a single lock, which is what
/// makes `persist_match` atomic here.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<BackendState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, profile: UserProfile) {
        self.state.lock().unwrap().users.insert(profile.id, profile);
    }

    pub fn match_count(&self) -> usize {
        self.state.lock().unwrap().matches.len()
    }
}

impl UserDirectory for MemoryBackend {
    fn find_user(&self, user: UserId) -> Result<UserProfile, GameError> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(&user)
            .cloned()
            .ok_or(GameError::UserNotFound(user))
    }

    fn update_status(&self, user: UserId, status: UserStatus) -> Result<(), GameError> {
        let mut state = self.state.lock().unwrap();
        let profile = state
            .users
            .get_mut(&user)
            .ok_or(GameError::UserNotFound(user))?;
        profile.status = status;
        Ok(())
    }
}

impl MatchStore for MemoryBackend {
    fn persist_match(&self, record: &MatchRecord) -> Result<(), GameError> {
        let mut state = self.state.lock().unwrap();

        // Validate both rows before touching either, so a failure leaves
        // nothing half-written.
        if !state.users.contains_key(&record.outcome.winner) {
            return Err(GameError::Storage(format!(
                "winner {} has no profile row",
                record.outcome.winner
            )));
        }
        if !state.users.contains_key(&record.outcome.loser) {
            return Err(GameError::Storage(format!(
                "loser {} has no profile row",
                record.outcome.loser
            )));
        }

        if let Some(winner) = state.users.get_mut(&record.outcome.winner) {
            winner.rating += record.winner_delta;
            winner.wins += 1;
            winner.status = record.winner_status;
        }
        if let Some(loser) = state.users.get_mut(&record.outcome.loser) {
            loser.rating += record.loser_delta;
            loser.losses += 1;
            loser.status = record.loser_status;
        }
        state.matches.push(record.clone());
        Ok(())
    }

    fn matches_for(&self, user: UserId) -> Result<Vec<MatchRecord>, GameError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .matches
            .iter()
            .rev()
            .filter(|record| record.outcome.winner == user || record.outcome.loser == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{MatchOrigin, SessionId};

    fn record(winner: UserId, loser: UserId) -> MatchRecord {
        let now = Utc::now();
        MatchRecord {
            outcome: MatchOutcome {
                session_id: SessionId(1),
                origin: MatchOrigin::Ladder,
                winner,
                loser,
                winner_score: 5,
                loser_score: 3,
                created_at: now,
                end_at: now,
            },
            winner_delta: 15,
            loser_delta: -18,
            winner_status: UserStatus::Online,
            loser_status: UserStatus::Offline,
        }
    }

    #[test]
    fn persist_applies_both_profile_updates() {
        let backend = MemoryBackend::new();
        backend.insert_user(UserProfile::new(UserId(1), "ada", 1000));
        backend.insert_user(UserProfile::new(UserId(2), "mel", 1000));

        backend.persist_match(&record(UserId(1), UserId(2))).unwrap();

        let winner = backend.find_user(UserId(1)).unwrap();
        let loser = backend.find_user(UserId(2)).unwrap();
        assert_eq!(winner.rating, 1015);
        assert_eq!(winner.wins, 1);
        assert_eq!(winner.status, UserStatus::Online);
        assert_eq!(loser.rating, 982);
        assert_eq!(loser.losses, 1);
        assert_eq!(loser.status, UserStatus::Offline);
        assert_eq!(backend.match_count(), 1);
    }

    #[test]
    fn persist_with_missing_profile_writes_nothing() {
        let backend = MemoryBackend::new();
        backend.insert_user(UserProfile::new(UserId(1), "ada", 1000));

        let result = backend.persist_match(&record(UserId(1), UserId(2)));

        assert!(matches!(result, Err(GameError::Storage(_))));
        // The winner's row is untouched even though it was valid.
        let winner = backend.find_user(UserId(1)).unwrap();
        assert_eq!(winner.rating, 1000);
        assert_eq!(winner.wins, 0);
        assert_eq!(backend.match_count(), 0);
    }

    #[test]
    fn history_is_newest_first_and_filtered() {
        let backend = MemoryBackend::new();
        backend.insert_user(UserProfile::new(UserId(1), "ada", 1000));
        backend.insert_user(UserProfile::new(UserId(2), "mel", 1000));
        backend.insert_user(UserProfile::new(UserId(3), "kay", 1000));

        let mut first = record(UserId(1), UserId(2));
        first.outcome.session_id = SessionId(1);
        let mut second = record(UserId(3), UserId(1));
        second.outcome.session_id = SessionId(2);
        backend.persist_match(&first).unwrap();
        backend.persist_match(&second).unwrap();

        let history = backend.matches_for(UserId(1)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].outcome.session_id, SessionId(2));
        assert_eq!(history[1].outcome.session_id, SessionId(1));

        assert_eq!(backend.matches_for(UserId(2)).unwrap().len(), 1);
    }
}
