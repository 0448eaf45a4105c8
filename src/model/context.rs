//! Per-player contextual performance tracking.
//!
//! Buckets are deliberately coarse (hour of day, day of week, half-hour
//! session slots, opponent archetype) and stay neutral until they hold
//! enough samples to mean anything.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    constants::{CONTEXT_MIN_SAMPLES, SESSION_BUCKET_MINUTES},
    structures::archetype::Archetype
};

/// Win/loss tally for one contextual bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStats {
    pub games: u32,
    pub wins: u32,
    /// Player rating at the time of the last game in this bucket.
    pub last_rating: f64
}

impl BucketStats {
    pub fn record(&mut self, won: bool, rating: f64) {
        self.games += 1;
        if won {
            self.wins += 1;
        }
        self.last_rating = rating;
    }

    /// Win rate, or `None` while the bucket is under-sampled.
    pub fn sampled_win_rate(&self) -> Option<f64> {
        if self.games < CONTEXT_MIN_SAMPLES {
            return None;
        }

        Some(self.wins as f64 / self.games as f64)
    }

    /// Win rate with a neutral 0.5 fallback for under-sampled buckets.
    pub fn win_rate(&self) -> f64 {
        self.sampled_win_rate().unwrap_or(0.5)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextTracker {
    pub time_of_day: [BucketStats; 24],
    /// Indexed by days since Sunday.
    pub day_of_week: [BucketStats; 7],
    /// Keyed by half-hour session bucket.
    pub session_length: HashMap<u32, BucketStats>,
    pub opponent_archetype: HashMap<Archetype, BucketStats>
}

impl Default for ContextTracker {
    fn default() -> Self {
        ContextTracker {
            time_of_day: [BucketStats::default(); 24],
            day_of_week: [BucketStats::default(); 7],
            session_length: HashMap::new(),
            opponent_archetype: HashMap::new()
        }
    }
}

impl ContextTracker {
    pub fn session_bucket(session_minutes: u32) -> u32 {
        session_minutes / SESSION_BUCKET_MINUTES
    }

    pub fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        session_minutes: u32,
        opponent: Archetype,
        won: bool,
        rating: f64
    ) {
        self.time_of_day[timestamp.hour() as usize].record(won, rating);
        self.day_of_week[timestamp.weekday().num_days_from_sunday() as usize].record(won, rating);
        self.session_length
            .entry(Self::session_bucket(session_minutes))
            .or_default()
            .record(won, rating);
        self.opponent_archetype.entry(opponent).or_default().record(won, rating);
    }

    pub fn hour_stats(&self, hour: u32) -> BucketStats {
        self.time_of_day[(hour as usize).min(23)]
    }

    pub fn day_stats(&self, days_from_sunday: u32) -> BucketStats {
        self.day_of_week[(days_from_sunday as usize).min(6)]
    }

    pub fn session_stats(&self, session_minutes: u32) -> BucketStats {
        self.session_length
            .get(&Self::session_bucket(session_minutes))
            .copied()
            .unwrap_or_default()
    }

    pub fn archetype_stats(&self, archetype: Archetype) -> BucketStats {
        self.opponent_archetype.get(&archetype).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn under_sampled_buckets_stay_neutral() {
        let mut stats = BucketStats::default();
        for _ in 0..4 {
            stats.record(true, 1500.0);
        }

        assert!(stats.sampled_win_rate().is_none());
        assert_abs_diff_eq!(stats.win_rate(), 0.5, epsilon = 1e-12);

        stats.record(true, 1500.0);
        assert_abs_diff_eq!(stats.win_rate(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn records_route_to_the_right_buckets() {
        let mut tracker = ContextTracker::default();
        // 2025-06-01 was a Sunday
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 20, 15, 0).unwrap();

        tracker.record(timestamp, 95, Archetype::Combo, true, 1520.0);

        assert_eq!(tracker.hour_stats(20).games, 1);
        assert_eq!(tracker.day_stats(0).games, 1);
        assert_eq!(tracker.session_stats(95).games, 1);
        assert_eq!(tracker.archetype_stats(Archetype::Combo).wins, 1);
        assert_eq!(tracker.archetype_stats(Archetype::Aggro).games, 0);
    }

    #[test]
    fn session_buckets_are_half_hour_slots() {
        assert_eq!(ContextTracker::session_bucket(0), 0);
        assert_eq!(ContextTracker::session_bucket(29), 0);
        assert_eq!(ContextTracker::session_bucket(30), 1);
        assert_eq!(ContextTracker::session_bucket(150), 5);
    }
}
