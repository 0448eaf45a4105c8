//! Windowed archetype meta analysis.
//!
//! Snapshots are immutable and published atomically through a watch
//! channel, so pairing engines always read a coherent view and never
//! block the analyzer.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tracing::info;

use crate::{
    config::Tables,
    model::structures::{archetype::Archetype, match_result::MatchResult}
};

/// Archetypes above this share of the field are flagged dominant.
pub const DOMINANCE_THRESHOLD: f64 = 0.15;

/// Share-change thresholds for the rising and falling lists.
pub const TREND_THRESHOLD: f64 = 0.05;

/// Default analysis window.
pub const ANALYSIS_WINDOW_DAYS: i64 = 7;

/// Immutable view of the meta at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaSnapshot {
    /// Field share per archetype; sums to 1 when any matches exist.
    pub frequencies: HashMap<Archetype, f64>,
    /// Share change versus the previous snapshot.
    pub trends: HashMap<Archetype, f64>,
    /// Normalized Shannon diversity in `[0, 1]`.
    pub diversity_index: f64,
    /// How close the configured matchup table is to fair, `[0, 1]`.
    pub balance_index: f64,
    /// `0.7 * diversity + 0.3 * balance`.
    pub health_index: f64,
    pub dominant: Vec<Archetype>,
    pub rising: Vec<Archetype>,
    pub falling: Vec<Archetype>,
    pub generated_at: DateTime<Utc>
}

impl MetaSnapshot {
    /// Starting snapshot before any analysis has run.
    pub fn neutral(tables: &Tables, generated_at: DateTime<Utc>) -> MetaSnapshot {
        let balance_index = matchup_balance(tables);

        MetaSnapshot {
            frequencies: HashMap::new(),
            trends: HashMap::new(),
            diversity_index: 0.0,
            balance_index,
            health_index: 0.3 * balance_index,
            dominant: Vec::new(),
            rising: Vec::new(),
            falling: Vec::new(),
            generated_at
        }
    }

    pub fn frequency_or(&self, archetype: Archetype, fallback: f64) -> f64 {
        self.frequencies.get(&archetype).copied().unwrap_or(fallback)
    }
}

/// Shannon diversity normalized by the full archetype roster, so a meta
/// collapsed onto a few decks reads as unhealthy even when those decks
/// are evenly played. One archetype (or none) reads as zero diversity.
pub fn diversity_index(frequencies: &HashMap<Archetype, f64>) -> f64 {
    let present: Vec<f64> = frequencies.values().copied().filter(|f| *f > 0.0).collect();
    if present.len() <= 1 {
        return 0.0;
    }

    let entropy: f64 = present.iter().map(|p| -p * p.log2()).sum();

    (entropy / (Archetype::iter().count() as f64).log2()).clamp(0.0, 1.0)
}

/// Mean complementarity of the configured matchup table. Observed win
/// rates are complementary by construction, so the table is the only
/// meaningful balance source.
pub fn matchup_balance(tables: &Tables) -> f64 {
    let mut total_imbalance = 0.0;
    let mut pairs = 0u32;

    for (a, b) in Archetype::iter().tuple_combinations() {
        let forward = tables.matchups.expected_win_rate(a, b);
        let reverse = tables.matchups.expected_win_rate(b, a);
        total_imbalance += (forward + reverse - 1.0).abs();
        pairs += 1;
    }

    if pairs == 0 {
        return 1.0;
    }

    (1.0 - total_imbalance / pairs as f64).clamp(0.0, 1.0)
}

pub struct MetaAnalyzer {
    tables: Arc<Tables>,
    window: chrono::Duration,
    sender: watch::Sender<Arc<MetaSnapshot>>
}

impl MetaAnalyzer {
    pub fn new(tables: Arc<Tables>) -> MetaAnalyzer {
        let initial = Arc::new(MetaSnapshot::neutral(&tables, Utc::now()));
        let (sender, _) = watch::channel(initial);

        MetaAnalyzer {
            tables,
            window: chrono::Duration::days(ANALYSIS_WINDOW_DAYS),
            sender
        }
    }

    pub fn with_window(tables: Arc<Tables>, window: chrono::Duration) -> MetaAnalyzer {
        MetaAnalyzer {
            window,
            ..MetaAnalyzer::new(tables)
        }
    }

    /// Readers hold a receiver and borrow the current `Arc` snapshot;
    /// publication swaps the whole snapshot at once.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MetaSnapshot>> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> Arc<MetaSnapshot> {
        self.sender.borrow().clone()
    }

    /// Computes a snapshot over the recent window without publishing it.
    pub fn analyze(&self, matches: &[MatchResult], now: DateTime<Utc>) -> MetaSnapshot {
        let previous = self.current();
        let cutoff = now - self.window;

        let mut counts: HashMap<Archetype, u32> = HashMap::new();
        let mut total = 0u32;
        for result in matches.iter().filter(|m| m.timestamp >= cutoff) {
            // Both sides of every match count toward the field
            *counts.entry(result.player_archetype).or_default() += 1;
            *counts.entry(result.opponent_archetype).or_default() += 1;
            total += 2;
        }

        let frequencies: HashMap<Archetype, f64> = if total == 0 {
            HashMap::new()
        } else {
            counts
                .iter()
                .map(|(archetype, count)| (*archetype, *count as f64 / total as f64))
                .collect()
        };

        let mut trends: HashMap<Archetype, f64> = HashMap::new();
        for archetype in frequencies.keys().chain(previous.frequencies.keys()).unique() {
            let current = frequencies.get(archetype).copied().unwrap_or(0.0);
            let before = previous.frequencies.get(archetype).copied().unwrap_or(0.0);
            trends.insert(*archetype, current - before);
        }

        let diversity = diversity_index(&frequencies);
        let balance = matchup_balance(&self.tables);

        let mut dominant: Vec<Archetype> = frequencies
            .iter()
            .filter(|(_, f)| **f > DOMINANCE_THRESHOLD)
            .map(|(a, _)| *a)
            .collect();
        dominant.sort_by(|a, b| {
            frequencies[b]
                .partial_cmp(&frequencies[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut rising: Vec<Archetype> = trends
            .iter()
            .filter(|(_, t)| **t > TREND_THRESHOLD)
            .map(|(a, _)| *a)
            .collect();
        rising.sort();
        let mut falling: Vec<Archetype> = trends
            .iter()
            .filter(|(_, t)| **t < -TREND_THRESHOLD)
            .map(|(a, _)| *a)
            .collect();
        falling.sort();

        MetaSnapshot {
            frequencies,
            trends,
            diversity_index: diversity,
            balance_index: balance,
            health_index: 0.7 * diversity + 0.3 * balance,
            dominant,
            rising,
            falling,
            generated_at: now
        }
    }

    /// Analyzes and atomically publishes the result.
    pub fn recompute(&self, matches: &[MatchResult], now: DateTime<Utc>) -> Arc<MetaSnapshot> {
        let snapshot = Arc::new(self.analyze(matches, now));
        self.sender.send_replace(snapshot.clone());

        info!(
            diversity = snapshot.diversity_index,
            balance = snapshot.balance_index,
            health = snapshot.health_index,
            dominant = snapshot.dominant.len(),
            "meta snapshot published"
        );

        snapshot
    }

    /// Recomputes on a fixed cadence until the returned handle is aborted.
    pub fn spawn_periodic<F>(self: Arc<Self>, every: std::time::Duration, fetch: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> Vec<MatchResult> + Send + Sync + 'static
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let matches = fetch();
                self.recompute(&matches, Utc::now());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::model::structures::outcome::Outcome;

    fn result_with(player: Archetype, opponent: Archetype, now: DateTime<Utc>) -> MatchResult {
        MatchResult {
            player_archetype: player,
            opponent_archetype: opponent,
            ..MatchResult::new(1, 2, Outcome::Win, now)
        }
    }

    fn analyzer() -> MetaAnalyzer {
        MetaAnalyzer::new(Arc::new(Tables::default()))
    }

    #[test]
    fn frequencies_count_both_sides_and_sum_to_one() {
        let analyzer = analyzer();
        let now = Utc::now();
        let matches = vec![
            result_with(Archetype::Aggro, Archetype::Control, now),
            result_with(Archetype::Aggro, Archetype::Combo, now),
        ];

        let snapshot = analyzer.analyze(&matches, now);

        assert_abs_diff_eq!(snapshot.frequencies[&Archetype::Aggro], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(snapshot.frequencies[&Archetype::Control], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(snapshot.frequencies.values().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn matches_outside_the_window_are_ignored() {
        let analyzer = analyzer();
        let now = Utc::now();
        let matches = vec![result_with(Archetype::Ramp, Archetype::Ramp, now - chrono::Duration::days(30))];

        let snapshot = analyzer.analyze(&matches, now);
        assert!(snapshot.frequencies.is_empty());
        assert_abs_diff_eq!(snapshot.diversity_index, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn uniform_meta_has_full_diversity() {
        let mut frequencies = HashMap::new();
        for archetype in Archetype::iter() {
            frequencies.insert(archetype, 1.0 / 6.0);
        }

        assert_abs_diff_eq!(diversity_index(&frequencies), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn narrow_metas_read_as_low_diversity_even_when_balanced() {
        // 50/50 over two of six archetypes is far from healthy
        let mut frequencies = HashMap::new();
        frequencies.insert(Archetype::Aggro, 0.5);
        frequencies.insert(Archetype::Control, 0.5);

        let expected = 1.0 / (Archetype::iter().count() as f64).log2();
        assert_abs_diff_eq!(diversity_index(&frequencies), expected, epsilon = 1e-9);
        assert!(diversity_index(&frequencies) < 0.4);
    }

    #[test]
    fn single_archetype_meta_has_zero_diversity() {
        let mut frequencies = HashMap::new();
        frequencies.insert(Archetype::Aggro, 1.0);

        assert_abs_diff_eq!(diversity_index(&frequencies), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(diversity_index(&HashMap::new()), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn default_table_is_perfectly_balanced() {
        assert_abs_diff_eq!(matchup_balance(&Tables::default()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn dominant_and_trending_archetypes_are_flagged() {
        let analyzer = analyzer();
        let now = Utc::now();

        // First window: all Aggro mirrors
        let first: Vec<MatchResult> = (0..10).map(|_| result_with(Archetype::Aggro, Archetype::Aggro, now)).collect();
        let snapshot = analyzer.recompute(&first, now);
        assert_eq!(snapshot.dominant, vec![Archetype::Aggro]);
        assert!(snapshot.rising.contains(&Archetype::Aggro));

        // Second window: the field shifts to Control
        let second: Vec<MatchResult> = (0..10)
            .map(|_| result_with(Archetype::Control, Archetype::Control, now))
            .collect();
        let snapshot = analyzer.recompute(&second, now);
        assert!(snapshot.falling.contains(&Archetype::Aggro));
        assert!(snapshot.rising.contains(&Archetype::Control));
        assert_eq!(snapshot.dominant, vec![Archetype::Control]);
    }

    #[test]
    fn health_blends_diversity_and_balance() {
        let analyzer = analyzer();
        let now = Utc::now();
        let matches = vec![
            result_with(Archetype::Aggro, Archetype::Control, now),
            result_with(Archetype::Midrange, Archetype::Combo, now),
            result_with(Archetype::Tempo, Archetype::Ramp, now),
        ];

        let snapshot = analyzer.analyze(&matches, now);
        assert_abs_diff_eq!(
            snapshot.health_index,
            0.7 * snapshot.diversity_index + 0.3 * snapshot.balance_index,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(snapshot.diversity_index, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn publication_is_atomic_for_subscribers() {
        let analyzer = analyzer();
        let receiver = analyzer.subscribe();
        let now = Utc::now();

        let before = receiver.borrow().clone();
        assert!(before.frequencies.is_empty());

        analyzer.recompute(&[result_with(Archetype::Combo, Archetype::Tempo, now)], now);

        let after = receiver.borrow().clone();
        assert!(!after.frequencies.is_empty());
        // The old snapshot is untouched
        assert!(before.frequencies.is_empty());
    }
}
