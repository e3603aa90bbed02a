//! Terminal result handling: rating adjustment and exactly-once persistence.

use crate::config::EngineConfig;
use crate::error::GameError;
use crate::registry::ConnectionRegistry;
use crate::store::{MatchRecord, MatchStore, UserDirectory};
use log::info;
use rand::Rng;
use shared::{MatchOrigin, MatchOutcome, UserStatus};
use std::sync::Arc;

/// Consumes one terminal session result: computes rating deltas, recomputes
/// each participant's presence, and hands everything to the store as a
/// single atomic write.
///
/// Failures are returned to the caller and not retried here; the session
/// that produced the result is torn down either way.
pub struct ResultRecorder {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn MatchStore>,
    registry: Arc<ConnectionRegistry>,
    config: EngineConfig,
}

impl ResultRecorder {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MatchStore>,
        registry: Arc<ConnectionRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            directory,
            store,
            registry,
            config,
        }
    }

    pub async fn record(&self, outcome: &MatchOutcome) -> Result<(), GameError> {
        // Both profiles must exist before anything is written.
        let winner = self.directory.find_user(outcome.winner)?;
        let loser = self.directory.find_user(outcome.loser)?;

        let winner_status = self.presence_of(&winner).await;
        let loser_status = self.presence_of(&loser).await;
        let (winner_delta, loser_delta) = self.rating_deltas(outcome.origin);

        let record = MatchRecord {
            outcome: outcome.clone(),
            winner_delta,
            loser_delta,
            winner_status,
            loser_status,
        };
        self.store.persist_match(&record)?;

        // Keep the live registry in step with what was just stored.
        self.registry.set_status(outcome.winner, winner_status).await;
        self.registry.set_status(outcome.loser, loser_status).await;

        info!(
            "recorded session {}: user {} beats user {} {}-{} ({:+}/{:+})",
            outcome.session_id,
            outcome.winner,
            outcome.loser,
            outcome.winner_score,
            outcome.loser_score,
            winner_delta,
            loser_delta
        );
        Ok(())
    }

    async fn presence_of(&self, profile: &crate::store::UserProfile) -> UserStatus {
        if self.registry.has_live_connection(profile.id).await {
            UserStatus::Online
        } else {
            UserStatus::Offline
        }
    }

    /// Ladder moves ratings; custom and invite matches do not. Each side's
    /// delta is drawn independently, so the exchange is not zero-sum.
    fn rating_deltas(&self, origin: MatchOrigin) -> (i32, i32) {
        if origin != MatchOrigin::Ladder {
            return (0, 0);
        }
        let mut rng = rand::thread_rng();
        let gain = rng.gen_range(self.config.ladder_delta_min..self.config.ladder_delta_max);
        let loss = rng.gen_range(self.config.ladder_delta_min..self.config.ladder_delta_max);
        (gain, -loss)
    }
}
