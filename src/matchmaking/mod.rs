//! Asynchronous matchmaking queue.
//!
//! Searchers park themselves in a shared pool and scan it on an
//! interval. Whoever scans first claims the counterpart through a
//! oneshot channel, so a pairing always resolves exactly once: the
//! claimed side's queue entry is gone before either future returns.

pub mod config;

use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::{DateTime, Timelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{oneshot, watch, Mutex},
    time::Instant
};
use tracing::{debug, info, warn};

pub use crate::matchmaking::config::MatchmakingConfig;
use crate::{
    config::Tables,
    error::MatchmakingError,
    model::{
        meta::MetaSnapshot,
        structures::{archetype::Archetype, player_record::PlayerSkillRecord}
    }
};

/// What a searcher tells the queue about the session they want.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPreferences {
    pub archetype: Archetype,
    /// Minutes already played this session.
    pub session_length_minutes: u32
}

/// Per-factor breakdown of a match quality score. Factors that could
/// not be evaluated for a pairing are absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityFactors {
    pub skill: f64,
    pub uncertainty: f64,
    pub playstyle: f64,
    pub deck_balance: f64,
    pub meta_diversity: f64,
    pub time_of_day: Option<f64>,
    pub recent_form: Option<f64>
}

/// Successful search outcome.
#[derive(Debug, Clone, Serialize)]
pub struct MatchFound {
    pub opponent_id: i32,
    pub opponent_rating: f64,
    pub quality: f64,
    pub factors: QualityFactors,
    pub search_time: Duration
}

/// Cancellation handle for one search. Dropping it without calling
/// [`SearchHandle::cancel`] also ends the search.
pub struct SearchHandle {
    sender: watch::Sender<bool>
}

impl SearchHandle {
    pub fn new() -> (SearchHandle, watch::Receiver<bool>) {
        let (sender, receiver) = watch::channel(false);
        (SearchHandle { sender }, receiver)
    }

    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }
}

struct QueuedPlayer {
    record: PlayerSkillRecord,
    preferences: SearchPreferences,
    claim: oneshot::Sender<MatchFound>,
    enqueued_at: Instant
}

#[derive(Default)]
struct WaitTracker {
    samples: VecDeque<Duration>,
    threshold: f64
}

impl WaitTracker {
    fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }

        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }
}

pub struct MatchmakingEngine {
    config: MatchmakingConfig,
    tables: Arc<Tables>,
    meta: watch::Receiver<Arc<MetaSnapshot>>,
    pool: Mutex<IndexMap<i32, QueuedPlayer>>,
    waits: Mutex<WaitTracker>
}

impl MatchmakingEngine {
    pub fn new(config: MatchmakingConfig, tables: Arc<Tables>, meta: watch::Receiver<Arc<MetaSnapshot>>) -> MatchmakingEngine {
        let threshold = config.quality_threshold;

        MatchmakingEngine {
            config,
            tables,
            meta,
            pool: Mutex::new(IndexMap::new()),
            waits: Mutex::new(WaitTracker {
                samples: VecDeque::new(),
                threshold
            })
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.pool.lock().await.len()
    }

    pub async fn current_quality_threshold(&self) -> f64 {
        self.waits.lock().await.threshold
    }

    /// Searches for an opponent. Resolves when this searcher claims a
    /// match, is claimed by another searcher, is cancelled, or times out.
    pub async fn find_match(
        &self,
        record: PlayerSkillRecord,
        preferences: SearchPreferences,
        mut cancel: watch::Receiver<bool>
    ) -> Result<MatchFound, MatchmakingError> {
        let started = Instant::now();
        let player_id = record.player_id;
        let (claim_sender, mut claim_receiver) = oneshot::channel();

        let mut range = (self.config.base_search_range + (record.uncertainty - self.config.min_uncertainty))
            .min(self.config.max_search_range);

        {
            let mut pool = self.pool.lock().await;
            pool.insert(
                player_id,
                QueuedPlayer {
                    record: record.clone(),
                    preferences: preferences.clone(),
                    claim: claim_sender,
                    enqueued_at: started
                }
            );
        }
        debug!(player_id, initial_range = range, "search enqueued");

        let deadline = tokio::time::sleep(self.config.search_deadline);
        tokio::pin!(deadline);
        let mut scan = tokio::time::interval(self.config.scan_interval);
        scan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                claimed = &mut claim_receiver => {
                    return match claimed {
                        Ok(found) => {
                            self.record_wait(started.elapsed()).await;
                            Ok(found)
                        }
                        // Entry dropped without a claim
                        Err(_) => Err(MatchmakingError::Cancelled)
                    };
                }
                changed = cancel.changed() => {
                    // A dropped handle cancels just like an explicit call
                    if changed.is_err() || *cancel.borrow() {
                        self.release(player_id).await;
                        debug!(player_id, "search cancelled");
                        return Err(MatchmakingError::Cancelled);
                    }
                }
                () = &mut deadline => {
                    self.release(player_id).await;
                    self.record_wait(started.elapsed()).await;
                    warn!(player_id, waited = ?started.elapsed(), "search timed out");
                    return Err(MatchmakingError::Timeout { waited: started.elapsed() });
                }
                _ = scan.tick() => {
                    if let Some(found) = self.try_claim(&record, &preferences, range, started).await {
                        self.record_wait(started.elapsed()).await;
                        return Ok(found);
                    }
                    range = (range + self.config.range_increment).min(self.config.max_search_range);
                }
            }
        }
    }

    /// Scans the pool for the best candidate inside the current window
    /// and claims it if the quality clears the adaptive threshold.
    async fn try_claim(
        &self,
        record: &PlayerSkillRecord,
        preferences: &SearchPreferences,
        range: f64,
        started: Instant
    ) -> Option<MatchFound> {
        let meta = self.meta.borrow().clone();
        let threshold = self.waits.lock().await.threshold;
        let now = Utc::now();

        let mut pool = self.pool.lock().await;

        let mut best: Option<(i32, f64, QualityFactors)> = None;
        for (id, candidate) in pool.iter() {
            if *id == record.player_id {
                continue;
            }

            let gap = (candidate.record.rating - record.rating).abs();
            if gap > range.min(self.config.max_skill_difference) {
                continue;
            }

            let (quality, factors) =
                self.match_quality(record, preferences, &candidate.record, &candidate.preferences, &meta, now);
            if best.as_ref().map_or(true, |(_, q, _)| quality > *q) {
                best = Some((*id, quality, factors));
            }
        }

        let (opponent_id, quality, factors) = best?;
        if quality < threshold {
            return None;
        }

        let claimed = pool.shift_remove(&opponent_id)?;
        pool.shift_remove(&record.player_id);
        drop(pool);

        // Resolve the claimed side's future
        let _ = claimed.claim.send(MatchFound {
            opponent_id: record.player_id,
            opponent_rating: record.rating,
            quality,
            factors,
            search_time: claimed.enqueued_at.elapsed()
        });

        info!(
            player = record.player_id,
            opponent = opponent_id,
            quality,
            "match found"
        );

        Some(MatchFound {
            opponent_id,
            opponent_rating: claimed.record.rating,
            quality,
            factors,
            search_time: started.elapsed()
        })
    }

    async fn release(&self, player_id: i32) {
        self.pool.lock().await.shift_remove(&player_id);
    }

    /// Feeds a completed search into the rolling wait average and nudges
    /// the acceptance threshold: long waits loosen it, short waits
    /// tighten it, always inside the configured bounds.
    async fn record_wait(&self, wait: Duration) {
        let config = &self.config;
        let mut tracker = self.waits.lock().await;

        if tracker.samples.len() == config.wait_sample_capacity {
            tracker.samples.pop_front();
        }
        tracker.samples.push_back(wait);

        if let Some(average) = tracker.average() {
            if average > config.long_wait {
                tracker.threshold = (tracker.threshold - 0.05).max(config.quality_threshold_floor);
            } else if average < config.short_wait {
                tracker.threshold = (tracker.threshold + 0.05).min(config.quality_threshold_ceiling);
            }
        }
    }

    /// Weighted multi-factor quality score in `[0, 1]`.
    pub fn match_quality(
        &self,
        a: &PlayerSkillRecord,
        a_preferences: &SearchPreferences,
        b: &PlayerSkillRecord,
        b_preferences: &SearchPreferences,
        meta: &MetaSnapshot,
        now: DateTime<Utc>
    ) -> (f64, QualityFactors) {
        let config = &self.config;
        let mut factors = QualityFactors::default();
        let mut weighted_total = 0.0;
        let mut weight_total = 0.0;
        let mut include = |value: f64, weight: f64| {
            weighted_total += value * weight;
            weight_total += weight;
            value
        };

        factors.skill = include(
            (1.0 - (a.rating - b.rating).abs() / config.max_skill_difference).max(0.0),
            0.4
        );

        let uncertainty_span = crate::model::constants::MAX_UNCERTAINTY - crate::model::constants::MIN_UNCERTAINTY;
        factors.uncertainty = include(
            (1.0 - (a.uncertainty - b.uncertainty).abs() / uncertainty_span).max(0.0),
            0.15
        );

        // Adaptable players enjoy stylistic contrast; rigid players want
        // similar opponents and weigh the factor more heavily.
        let compatibility = a.playstyle.compatibility(&b.playstyle, &self.tables.compatibility);
        let (playstyle_value, playstyle_weight) = if a.playstyle.adaptability > 0.7 {
            (compatibility, 0.2)
        } else if a.playstyle.adaptability < 0.3 {
            (1.0 - compatibility, 0.4)
        } else {
            (compatibility, 0.3)
        };
        factors.playstyle = include(playstyle_value, playstyle_weight);

        let expected = self
            .tables
            .matchups
            .expected_win_rate(a_preferences.archetype, b_preferences.archetype);
        factors.deck_balance = include(1.0 - 2.0 * (expected - 0.5).abs(), 0.15);

        // Facing an underplayed archetype keeps the queue's meta varied
        let opponent_share = meta.frequency_or(b_preferences.archetype, 0.1);
        factors.meta_diversity = include((1.0 - opponent_share).clamp(0.0, 1.0), 0.1);

        let hour = now.hour();
        if let (Some(a_rate), Some(b_rate)) = (
            a.context.hour_stats(hour).sampled_win_rate(),
            b.context.hour_stats(hour).sampled_win_rate()
        ) {
            factors.time_of_day = Some(include((a_rate + b_rate) / 2.0, 0.1));
        }

        if a.has_recent_matches() && b.has_recent_matches() {
            let similarity = 1.0 - (a.recent_form(now) - b.recent_form(now)).abs();
            factors.recent_form = Some(include(similarity, 0.1));
        }

        let quality = if weight_total > 0.0 {
            (weighted_total / weight_total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        (quality, factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::meta::MetaAnalyzer, utils::test_utils::*};

    fn engine() -> MatchmakingEngine {
        let tables = Arc::new(Tables::default());
        let analyzer = MetaAnalyzer::new(tables.clone());
        MatchmakingEngine::new(MatchmakingConfig::default(), tables, analyzer.subscribe())
    }

    fn engine_with(config: MatchmakingConfig) -> MatchmakingEngine {
        let tables = Arc::new(Tables::default());
        let analyzer = MetaAnalyzer::new(tables.clone());
        MatchmakingEngine::new(config, tables, analyzer.subscribe())
    }

    fn preferences(archetype: Archetype) -> SearchPreferences {
        SearchPreferences {
            archetype,
            session_length_minutes: 30
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_players_find_each_other() {
        let engine = Arc::new(engine());
        let a = generate_record(1, 1500.0, 100.0);
        let b = generate_record(2, 1510.0, 100.0);

        let engine_a = engine.clone();
        let (_handle_a, cancel_a) = SearchHandle::new();
        let search_a =
            tokio::spawn(async move { engine_a.find_match(a, preferences(Archetype::Aggro), cancel_a).await });

        let (_handle_b, cancel_b) = SearchHandle::new();
        let found_b = engine
            .find_match(b, preferences(Archetype::Control), cancel_b)
            .await
            .unwrap();
        let found_a = search_a.await.unwrap().unwrap();

        assert_eq!(found_a.opponent_id, 2);
        assert_eq!(found_b.opponent_id, 1);
        assert!(found_a.quality >= 0.5);
        assert_eq!(engine.queue_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lone_searcher_times_out_at_the_deadline() {
        let engine = engine();
        let record = generate_record(1, 1500.0, 100.0);
        let (_handle, cancel) = SearchHandle::new();

        let result = engine.find_match(record, preferences(Archetype::Aggro), cancel).await;

        match result {
            Err(MatchmakingError::Timeout { waited }) => {
                assert!(waited >= Duration::from_secs(300));
            }
            other => panic!("expected timeout, got {other:?}")
        }
        assert_eq!(engine.queue_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_releases_the_queue_slot() {
        let engine = Arc::new(engine());
        let record = generate_record(1, 1500.0, 100.0);
        let (handle, cancel) = SearchHandle::new();

        let engine_clone = engine.clone();
        let search =
            tokio::spawn(async move { engine_clone.find_match(record, preferences(Archetype::Aggro), cancel).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();

        match search.await.unwrap() {
            Err(MatchmakingError::Cancelled) => {}
            other => panic!("expected cancellation, got {other:?}")
        }
        assert_eq!(engine.queue_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expansion_eventually_reaches_distant_players() {
        // Low uncertainty keeps the initial window at 100 points; the
        // 250-point gap only becomes reachable after a few scans. The
        // threshold is relaxed so the test isolates window growth.
        let engine = Arc::new(engine_with(MatchmakingConfig {
            quality_threshold: 0.55,
            ..MatchmakingConfig::default()
        }));
        let a = generate_record(1, 1500.0, 25.0);
        let b = generate_record(2, 1750.0, 25.0);

        let engine_a = engine.clone();
        let (_handle_a, cancel_a) = SearchHandle::new();
        let search_a =
            tokio::spawn(async move { engine_a.find_match(a, preferences(Archetype::Aggro), cancel_a).await });

        let (_handle_b, cancel_b) = SearchHandle::new();
        let found = engine
            .find_match(b, preferences(Archetype::Control), cancel_b)
            .await
            .unwrap();

        assert_eq!(found.opponent_id, 1);
        assert!(found.search_time >= Duration::from_secs(10));
        search_a.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rating_gaps_beyond_the_cap_never_pair() {
        let engine = Arc::new(engine());
        let a = generate_record(1, 1200.0, 350.0);
        let b = generate_record(2, 1900.0, 350.0);

        let engine_a = engine.clone();
        let (_handle_a, cancel_a) = SearchHandle::new();
        let search_a =
            tokio::spawn(async move { engine_a.find_match(a, preferences(Archetype::Aggro), cancel_a).await });

        let (_handle_b, cancel_b) = SearchHandle::new();
        let result = engine.find_match(b, preferences(Archetype::Control), cancel_b).await;

        assert!(matches!(result, Err(MatchmakingError::Timeout { .. })));
        assert!(matches!(search_a.await.unwrap(), Err(MatchmakingError::Timeout { .. })));
    }

    #[tokio::test]
    async fn threshold_adapts_to_wait_times_within_bounds() {
        let engine = engine();

        for _ in 0..20 {
            engine.record_wait(Duration::from_secs(200)).await;
        }
        let loosened = engine.current_quality_threshold().await;
        assert!(loosened >= 0.5);
        assert!(loosened < 0.7);

        for _ in 0..60 {
            engine.record_wait(Duration::from_secs(5)).await;
        }
        let tightened = engine.current_quality_threshold().await;
        assert!(tightened <= 0.8);
        assert!(tightened > loosened);
    }

    #[tokio::test]
    async fn quality_rewards_close_skill_and_balanced_decks() {
        let engine = engine();
        let meta = MetaSnapshot::neutral(&Tables::default(), Utc::now());
        let now = Utc::now();

        let a = generate_record(1, 1500.0, 100.0);
        let close = generate_record(2, 1510.0, 100.0);
        let far = generate_record(3, 1890.0, 100.0);

        let (close_quality, close_factors) = engine.match_quality(
            &a,
            &preferences(Archetype::Aggro),
            &close,
            &preferences(Archetype::Tempo),
            &meta,
            now
        );
        let (far_quality, _) = engine.match_quality(
            &a,
            &preferences(Archetype::Aggro),
            &far,
            &preferences(Archetype::Tempo),
            &meta,
            now
        );

        assert!(close_quality > far_quality);
        assert!(close_factors.skill > 0.9);
        // Aggro vs Tempo is a 45/55 matchup, nearly balanced
        assert!(close_factors.deck_balance > 0.85);
        assert!(close_factors.time_of_day.is_none());
        assert!(close_factors.recent_form.is_none());
    }

    #[tokio::test]
    async fn lopsided_matchups_drag_quality_down() {
        let engine = engine();
        let meta = MetaSnapshot::neutral(&Tables::default(), Utc::now());
        let now = Utc::now();
        let a = generate_record(1, 1500.0, 100.0);
        let b = generate_record(2, 1500.0, 100.0);

        // Combo beats Ramp 80/20 by the default table
        let (lopsided, factors) = engine.match_quality(
            &a,
            &preferences(Archetype::Combo),
            &b,
            &preferences(Archetype::Ramp),
            &meta,
            now
        );
        let (fair, _) = engine.match_quality(
            &a,
            &preferences(Archetype::Combo),
            &b,
            &preferences(Archetype::Combo),
            &meta,
            now
        );

        assert!(factors.deck_balance < 0.5);
        assert!(lopsided < fair);
    }
}
