use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    constants::{
        INITIAL_RATING, INITIAL_UNCERTAINTY, RECENT_FORM_WINDOW_DAYS, RECENT_MATCH_CAPACITY, TIME_DECAY_FACTOR
    },
    context::ContextTracker,
    playstyle::PlaystyleProfile,
    structures::{archetype::Archetype, outcome::Outcome}
};

/// One entry in the per-player recent match ring buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMatch {
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub rating_delta: f64,
    pub rating_after: f64
}

/// Diagnostic snapshot of the adaptive difficulty damper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveState {
    pub last_factor: f64,
    pub observed_win_rate: f64
}

impl Default for AdaptiveState {
    fn default() -> Self {
        AdaptiveState {
            last_factor: 1.0,
            observed_win_rate: 0.5
        }
    }
}

/// Win/loss tally against one opposing archetype while piloting a
/// specific deck.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupTally {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32
}

impl MatchupTally {
    pub fn record(&mut self, outcome: Outcome) {
        self.games += 1;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            return 0.5;
        }

        (self.wins as f64 + 0.5 * self.draws as f64) / self.games as f64
    }
}

/// Per-deck-archetype skill record for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeRecord {
    pub rating: f64,
    pub uncertainty: f64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub last_played: DateTime<Utc>,
    pub matchups: HashMap<Archetype, MatchupTally>
}

impl ArchetypeRecord {
    /// Seeds a new per-deck record from the player's overall state, with
    /// inflated uncertainty because the deck itself is unproven.
    pub fn seeded(rating: f64, uncertainty: f64, timestamp: DateTime<Utc>) -> ArchetypeRecord {
        ArchetypeRecord {
            rating,
            uncertainty: uncertainty.max(300.0),
            wins: 0,
            losses: 0,
            draws: 0,
            last_played: timestamp,
            matchups: HashMap::new()
        }
    }

    pub fn record(&mut self, outcome: Outcome, rating: f64, uncertainty: f64, opponent: Archetype, timestamp: DateTime<Utc>) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1
        }
        self.rating = rating;
        self.uncertainty = uncertainty;
        self.last_played = timestamp;
        self.matchups.entry(opponent).or_default().record(outcome);
    }
}

/// Complete mutable skill state for one player.
///
/// Updates never mutate a record in place inside the engine; the engine
/// clones, transforms and returns new state so callers can diff, audit
/// or discard an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSkillRecord {
    pub player_id: i32,
    pub rating: f64,
    pub uncertainty: f64,
    pub peak_rating: f64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_streak: u32,
    pub loss_streak: u32,
    pub is_in_placement: bool,
    pub placement_matches_played: u32,
    pub archetype_records: HashMap<Archetype, ArchetypeRecord>,
    pub playstyle: PlaystyleProfile,
    pub context: ContextTracker,
    pub recent_matches: VecDeque<RecentMatch>,
    pub adaptive: AdaptiveState
}

impl PlayerSkillRecord {
    pub fn new(player_id: i32) -> PlayerSkillRecord {
        PlayerSkillRecord {
            player_id,
            rating: INITIAL_RATING,
            uncertainty: INITIAL_UNCERTAINTY,
            peak_rating: INITIAL_RATING,
            wins: 0,
            losses: 0,
            draws: 0,
            win_streak: 0,
            loss_streak: 0,
            is_in_placement: true,
            placement_matches_played: 0,
            archetype_records: HashMap::new(),
            playstyle: PlaystyleProfile::default(),
            context: ContextTracker::default(),
            recent_matches: VecDeque::with_capacity(RECENT_MATCH_CAPACITY),
            adaptive: AdaptiveState::default()
        }
    }

    /// Display rating: mean minus three uncertainty widths. Always
    /// derived, never stored.
    pub fn conservative_rating(&self) -> f64 {
        self.rating - 3.0 * self.uncertainty
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    /// Decisive-game win rate with a neutral fallback before any
    /// decisive game exists.
    pub fn win_rate(&self) -> f64 {
        let decisive = self.wins + self.losses;
        if decisive == 0 {
            return 0.5;
        }

        self.wins as f64 / decisive as f64
    }

    pub fn current_streak(&self) -> u32 {
        self.win_streak.max(self.loss_streak)
    }

    /// Time-decayed score average over the recent window. Matches decay
    /// per day at a fixed factor; an empty window reads as neutral.
    pub fn recent_form(&self, now: DateTime<Utc>) -> f64 {
        let cutoff = now - chrono::Duration::days(RECENT_FORM_WINDOW_DAYS);
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for entry in self.recent_matches.iter().filter(|m| m.timestamp >= cutoff) {
            let age_days = (now - entry.timestamp).num_seconds().max(0) as f64 / 86_400.0;
            let weight = TIME_DECAY_FACTOR.powf(age_days);
            weighted += weight * entry.outcome.score();
            total_weight += weight;
        }

        if total_weight <= 0.0 {
            return 0.5;
        }

        weighted / total_weight
    }

    pub fn has_recent_matches(&self) -> bool {
        !self.recent_matches.is_empty()
    }

    pub fn push_recent(&mut self, entry: RecentMatch) {
        if self.recent_matches.len() == RECENT_MATCH_CAPACITY {
            self.recent_matches.pop_front();
        }
        self.recent_matches.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Utc;

    use super::*;

    #[test]
    fn conservative_rating_is_derived_from_current_state() {
        let mut record = PlayerSkillRecord::new(1);
        assert_abs_diff_eq!(record.conservative_rating(), 1500.0 - 3.0 * 350.0, epsilon = 1e-12);

        record.rating = 1800.0;
        record.uncertainty = 100.0;
        assert_abs_diff_eq!(record.conservative_rating(), 1500.0, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_is_neutral_without_decisive_games() {
        let mut record = PlayerSkillRecord::new(1);
        assert_abs_diff_eq!(record.win_rate(), 0.5, epsilon = 1e-12);

        record.draws = 3;
        assert_abs_diff_eq!(record.win_rate(), 0.5, epsilon = 1e-12);

        record.wins = 3;
        record.losses = 1;
        assert_abs_diff_eq!(record.win_rate(), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn recent_ring_buffer_is_capped() {
        let mut record = PlayerSkillRecord::new(1);
        let now = Utc::now();

        for i in 0..(RECENT_MATCH_CAPACITY + 10) {
            record.push_recent(RecentMatch {
                timestamp: now,
                outcome: Outcome::Win,
                rating_delta: i as f64,
                rating_after: 1500.0
            });
        }

        assert_eq!(record.recent_matches.len(), RECENT_MATCH_CAPACITY);
        // Oldest entries were evicted first
        assert_abs_diff_eq!(record.recent_matches.front().unwrap().rating_delta, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn recent_form_decays_and_windows() {
        let mut record = PlayerSkillRecord::new(1);
        let now = Utc::now();

        // A loss outside the window is ignored entirely
        record.push_recent(RecentMatch {
            timestamp: now - chrono::Duration::days(10),
            outcome: Outcome::Loss,
            rating_delta: -20.0,
            rating_after: 1480.0
        });
        record.push_recent(RecentMatch {
            timestamp: now - chrono::Duration::days(1),
            outcome: Outcome::Win,
            rating_delta: 20.0,
            rating_after: 1500.0
        });

        assert_abs_diff_eq!(record.recent_form(now), 1.0, epsilon = 1e-12);

        // An older loss inside the window weighs less than a fresh win
        record.push_recent(RecentMatch {
            timestamp: now - chrono::Duration::days(6),
            outcome: Outcome::Loss,
            rating_delta: -20.0,
            rating_after: 1480.0
        });
        let form = record.recent_form(now);
        assert!(form > 0.5 && form < 1.0);
    }

    #[test]
    fn recent_form_is_neutral_when_empty() {
        let record = PlayerSkillRecord::new(1);
        assert_abs_diff_eq!(record.recent_form(Utc::now()), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn matchup_tally_counts_draws_as_half() {
        let mut tally = MatchupTally::default();
        tally.record(Outcome::Win);
        tally.record(Outcome::Draw);

        assert_abs_diff_eq!(tally.win_rate(), 0.75, epsilon = 1e-12);
    }
}
