//! Deterministic generators shared by unit and integration tests.

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::model::structures::{
    archetype::Archetype,
    match_result::MatchResult,
    outcome::Outcome,
    player_record::PlayerSkillRecord
};
use crate::tournament::structures::TournamentPlayer;

/// Fixed-seed rng so randomized tests are reproducible.
pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

pub fn generate_record(player_id: i32, rating: f64, uncertainty: f64) -> PlayerSkillRecord {
    let mut record = PlayerSkillRecord::new(player_id);
    record.rating = rating;
    record.peak_rating = rating;
    record.uncertainty = uncertainty;

    record
}

pub fn generate_tournament_player(player_id: i32, rating: f64, points: u32, archetype: Archetype) -> TournamentPlayer {
    let mut player = TournamentPlayer::new(generate_record(player_id, rating, 100.0), archetype);
    player.points = points;

    player
}

pub fn generate_match_result(rng: &mut ChaCha8Rng, player_id: i32, opponent_id: i32) -> MatchResult {
    let outcome = match rng.random_range(0..3) {
        0 => Outcome::Loss,
        1 => Outcome::Draw,
        _ => Outcome::Win
    };

    let mut result = MatchResult::new(player_id, opponent_id, outcome, Utc::now());
    result.duration_seconds = rng.random_range(120..2400);
    result.session_length_minutes = rng.random_range(0..240);

    result
}
