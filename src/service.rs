//! Shared-state orchestration for concurrent rating updates.
//!
//! Each player's record lives behind its own async mutex inside a
//! registry map. A match update locks exactly two records in canonical
//! id order, so concurrent updates touching disjoint players proceed in
//! parallel and overlapping ones serialize without deadlocking.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::instrument;

use crate::{
    error::RatingError,
    model::{
        rating::RatingUpdateEngine,
        structures::{
            match_result::{MatchContext, MatchResult},
            player_record::PlayerSkillRecord,
            rating_update::RatingUpdateResult
        }
    }
};

pub struct RatingService {
    engine: RatingUpdateEngine,
    players: Mutex<HashMap<i32, Arc<Mutex<PlayerSkillRecord>>>>
}

impl Default for RatingService {
    fn default() -> Self {
        RatingService::new(RatingUpdateEngine::default())
    }
}

impl RatingService {
    pub fn new(engine: RatingUpdateEngine) -> RatingService {
        RatingService {
            engine,
            players: Mutex::new(HashMap::new())
        }
    }

    pub fn engine(&self) -> &RatingUpdateEngine {
        &self.engine
    }

    /// Fetches or creates the registry entry for a player. The registry
    /// lock is held only for the map access, never across an update.
    async fn entry(&self, player_id: i32) -> Arc<Mutex<PlayerSkillRecord>> {
        let mut players = self.players.lock().await;
        players
            .entry(player_id)
            .or_insert_with(|| Arc::new(Mutex::new(PlayerSkillRecord::new(player_id))))
            .clone()
    }

    /// Applies a reported result with the default (result-derived)
    /// context.
    pub async fn apply(&self, result: &MatchResult) -> Result<RatingUpdateResult, RatingError> {
        self.apply_with_context(result, &MatchContext::from_result(result)).await
    }

    /// Applies a reported result, committing both new records under the
    /// pairwise locks.
    #[instrument(skip_all, fields(player = result.player_id, opponent = result.opponent_id))]
    pub async fn apply_with_context(
        &self,
        result: &MatchResult,
        context: &MatchContext
    ) -> Result<RatingUpdateResult, RatingError> {
        if result.player_id == result.opponent_id {
            return Err(RatingError::SamePlayer(result.player_id));
        }

        let player_slot = self.entry(result.player_id).await;
        let opponent_slot = self.entry(result.opponent_id).await;

        // Canonical lock order prevents lock cycles between concurrent
        // updates that share a player
        let (mut player_guard, mut opponent_guard) = if result.player_id < result.opponent_id {
            let player = player_slot.lock().await;
            let opponent = opponent_slot.lock().await;
            (player, opponent)
        } else {
            let opponent = opponent_slot.lock().await;
            let player = player_slot.lock().await;
            (player, opponent)
        };

        let update = self
            .engine
            .apply_match_result(&player_guard, &opponent_guard, result.outcome, context);

        *player_guard = update.player.clone();
        *opponent_guard = update.opponent.clone();

        Ok(update)
    }

    /// Point-in-time copy of one player's record.
    pub async fn snapshot(&self, player_id: i32) -> Option<PlayerSkillRecord> {
        let slot = {
            let players = self.players.lock().await;
            players.get(&player_id).cloned()
        };

        match slot {
            Some(slot) => Some(slot.lock().await.clone()),
            None => None
        }
    }

    pub async fn player_count(&self) -> usize {
        self.players.lock().await.len()
    }
}
