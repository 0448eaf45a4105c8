//! Bayesian rating updates with contextual and adaptive modifiers.
//!
//! The engine is pure over its inputs: [`RatingUpdateEngine::apply_match_result`]
//! takes the two pre-match records by reference and returns freshly built
//! post-match records, so callers own when (and whether) new state is
//! committed.

use std::sync::Arc;

use chrono::{Datelike, Timelike};
use tracing::debug;

use crate::{
    config::{RatingConfig, Tables},
    model::{
        math,
        playstyle::PlaystyleProfile,
        structures::{
            match_result::MatchContext,
            outcome::Outcome,
            player_record::{ArchetypeRecord, PlayerSkillRecord, RecentMatch},
            rating_update::{BucketImpact, ContextualImpact, MatchupImpact, RatingUpdateResult, SessionImpact}
        }
    }
};

pub struct RatingUpdateEngine {
    config: RatingConfig,
    tables: Arc<Tables>
}

impl Default for RatingUpdateEngine {
    fn default() -> Self {
        RatingUpdateEngine::new(RatingConfig::default(), Arc::new(Tables::default()))
    }
}

impl RatingUpdateEngine {
    pub fn new(config: RatingConfig, tables: Arc<Tables>) -> RatingUpdateEngine {
        RatingUpdateEngine { config, tables }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Total performance spread of a pairing.
    fn performance_spread(&self, a: &PlayerSkillRecord, b: &PlayerSkillRecord) -> f64 {
        (2.0 * self.config.beta.powi(2) + a.uncertainty.powi(2) + b.uncertainty.powi(2)).sqrt()
    }

    /// Pre-match probability that `a` beats `b`.
    pub fn win_probability(&self, a: &PlayerSkillRecord, b: &PlayerSkillRecord) -> f64 {
        math::normal_cdf((a.rating - b.rating) / self.performance_spread(a, b))
    }

    /// Rating-based probability nudged by the stylistic edge between the
    /// two profiles. The nudge is capped, so skill stays the dominant term.
    pub fn predicted_win_probability(&self, a: &PlayerSkillRecord, b: &PlayerSkillRecord) -> f64 {
        let base = self.win_probability(a, b);
        let advantage = a.playstyle.advantage(&b.playstyle);

        PlaystyleProfile::nudged_win_probability(base, advantage)
    }

    /// Per-player K-factor. Stacks uncertainty, rating-gap, experience,
    /// importance and streak multipliers onto the base, then clamps.
    pub fn dynamic_k_factor(
        &self,
        record: &PlayerSkillRecord,
        opponent: &PlayerSkillRecord,
        context: &MatchContext
    ) -> f64 {
        let config = &self.config;
        let mut k = config.k_factor_base;

        k *= (record.uncertainty / config.initial_uncertainty).clamp(0.5, 1.5);
        k *= (1.0 - (record.rating - opponent.rating).abs() / 1000.0).max(0.5);
        k *= (30.0 / record.games_played().max(10) as f64).clamp(0.5, 1.5);
        k *= 1.0 + (context.tournament_importance - 0.5);

        let streak = record.current_streak();
        if streak >= 3 {
            k *= 1.0 + 0.05 * streak as f64;
        }

        k.clamp(config.k_factor_min, config.k_factor_max)
    }

    /// Applies one match result and returns the new state for both
    /// players along with the full diagnostic breakdown.
    pub fn apply_match_result(
        &self,
        player: &PlayerSkillRecord,
        opponent: &PlayerSkillRecord,
        outcome: Outcome,
        context: &MatchContext
    ) -> RatingUpdateResult {
        let config = &self.config;
        let spread = self.performance_spread(player, opponent);
        let win_probability = math::normal_cdf((player.rating - opponent.rating) / spread);
        let score = outcome.score();
        let surprise_factor = (score - win_probability).abs();

        let v = math::v_correction(win_probability, config.draw_probability, score);
        let w = math::w_correction(win_probability, config.draw_probability, score);

        let flipped_context = context.flipped();
        let player_k_factor = self.dynamic_k_factor(player, opponent, context);
        let opponent_k_factor = self.dynamic_k_factor(opponent, player, &flipped_context);

        let shared_modifier = self.shared_delta_modifier(context);

        let mut player_delta =
            (player.uncertainty.powi(2) / spread) * v * (player_k_factor / config.k_factor_base) * shared_modifier;
        let mut opponent_delta = -(opponent.uncertainty.powi(2) / spread)
            * v
            * (opponent_k_factor / config.k_factor_base)
            * shared_modifier;

        // Evaluator-supplied modifiers apply to the reporting player only
        if let Some(quality) = context.performance_quality {
            player_delta *= quality.clamp(0.5, 1.5);
        }
        if let Some(strength) = context.opponent_strength {
            let lean = (strength - 0.5) * 0.5;
            match outcome {
                Outcome::Win => player_delta *= 1.0 + lean,
                Outcome::Loss => player_delta *= 1.0 - lean,
                Outcome::Draw => {}
            }
        }

        let contextual_impact = self.contextual_impact(player, context, surprise_factor);
        if config.apply_contextual_feedback {
            // Opt-in: never flips the sign, at most halves or 1.5x-es
            player_delta *= (1.0 + contextual_impact.total()).clamp(0.5, 1.5);
        }

        let (player_delta, player_adaptive) = self.adaptive_damping(player, outcome, player_delta);
        let (opponent_delta, opponent_adaptive) = self.adaptive_damping(opponent, outcome.reversed(), opponent_delta);

        let player_uncertainty = self.updated_uncertainty(player.uncertainty, spread, w);
        let opponent_uncertainty = self.updated_uncertainty(opponent.uncertainty, spread, w);

        let mut updated_player = player.clone();
        self.commit(
            &mut updated_player,
            player_delta,
            player_uncertainty,
            outcome,
            context,
            player_adaptive
        );

        let mut updated_opponent = opponent.clone();
        self.commit(
            &mut updated_opponent,
            opponent_delta,
            opponent_uncertainty,
            outcome.reversed(),
            &flipped_context,
            opponent_adaptive
        );

        debug!(
            player = player.player_id,
            opponent = opponent.player_id,
            win_probability,
            player_delta,
            opponent_delta,
            "rating update applied"
        );

        RatingUpdateResult {
            player: updated_player,
            opponent: updated_opponent,
            player_delta,
            opponent_delta,
            win_probability,
            surprise_factor,
            player_k_factor,
            opponent_k_factor,
            contextual_impact
        }
    }

    /// Modifiers that describe the match itself and therefore apply
    /// symmetrically: duration, tournament importance and session fatigue.
    fn shared_delta_modifier(&self, context: &MatchContext) -> f64 {
        let mut modifier =
            (context.duration_seconds as f64 / self.config.reference_game_seconds).clamp(0.8, 1.5);
        modifier *= (context.tournament_importance * 2.0).clamp(1.0, 2.0);

        let session_bucket = context.session_length_minutes / 30;
        if session_bucket > 4 {
            modifier *= (1.0 - (session_bucket - 4) as f64 * 0.05).max(0.8);
        }

        modifier
    }

    /// Dampens deltas for players drifting away from the target win
    /// rate. The factor is always positive, so the delta keeps its sign.
    fn adaptive_damping(&self, record: &PlayerSkillRecord, outcome: Outcome, delta: f64) -> (f64, f64) {
        let config = &self.config;
        if record.games_played() < config.adaptive_min_games {
            return (delta, 1.0);
        }

        let deviation = record.win_rate() - config.adaptive_target_win_rate;
        if deviation.abs() <= config.adaptive_deadband {
            return (delta, 1.0);
        }

        let factor = match outcome {
            // Over-performers gain less per win, under-performers more
            Outcome::Win => 1.0 - deviation * config.adaptive_strength,
            // Over-performers lose more per loss, under-performers less
            Outcome::Loss => 1.0 + deviation * config.adaptive_strength,
            Outcome::Draw => 1.0
        };

        (delta * factor, factor)
    }

    /// Shrinks uncertainty by the information gained, floors it, then
    /// adds the fixed drift so ratings never fully freeze.
    fn updated_uncertainty(&self, uncertainty: f64, spread: f64, w: f64) -> f64 {
        let config = &self.config;
        let variance = uncertainty.powi(2);
        let shrunk = (variance * (1.0 - (variance / spread.powi(2)) * w)).max(0.0).sqrt();

        (shrunk.max(config.min_uncertainty) + config.tau).min(config.max_uncertainty)
    }

    /// Diagnostic per-dimension breakdown. A dimension only appears once
    /// its historical bucket has enough samples; the deck matchup always
    /// appears because it comes from the configured table.
    fn contextual_impact(
        &self,
        record: &PlayerSkillRecord,
        context: &MatchContext,
        surprise_factor: f64
    ) -> ContextualImpact {
        let dimension_impact = |win_rate: f64| (win_rate - 0.5) * surprise_factor * 2.0;

        let hour = context.timestamp.hour();
        let time_of_day = record.context.hour_stats(hour).sampled_win_rate().map(|rate| BucketImpact {
            bucket: hour,
            historical_win_rate: rate,
            impact: dimension_impact(rate)
        });

        let day = context.timestamp.weekday().num_days_from_sunday();
        let day_of_week = record.context.day_stats(day).sampled_win_rate().map(|rate| BucketImpact {
            bucket: day,
            historical_win_rate: rate,
            impact: dimension_impact(rate)
        });

        let session_bucket = context.session_length_minutes / 30;
        let fatigue = if session_bucket > 4 {
            (1.0 - (session_bucket - 4) as f64 * 0.05).max(0.8)
        } else {
            1.0
        };
        let session_length = record
            .context
            .session_stats(context.session_length_minutes)
            .sampled_win_rate()
            .map(|rate| SessionImpact {
                bucket: session_bucket,
                historical_win_rate: rate,
                fatigue,
                impact: dimension_impact(rate) * fatigue
            });

        let expected = self
            .tables
            .matchups
            .expected_win_rate(context.player_archetype, context.opponent_archetype);
        let deck_matchup = Some(MatchupImpact {
            expected_win_rate: expected,
            impact: dimension_impact(expected)
        });

        ContextualImpact {
            time_of_day,
            day_of_week,
            session_length,
            deck_matchup
        }
    }

    /// Writes the computed update into a cloned record: rating, bounded
    /// uncertainty, streaks, placement, context buckets, playstyle EMA,
    /// per-deck records and the recent ring buffer.
    fn commit(
        &self,
        record: &mut PlayerSkillRecord,
        delta: f64,
        new_uncertainty: f64,
        outcome: Outcome,
        context: &MatchContext,
        adaptive_factor: f64
    ) {
        let config = &self.config;

        record.rating += delta;
        record.uncertainty = new_uncertainty.clamp(config.min_uncertainty, config.max_uncertainty);
        if record.rating > record.peak_rating {
            record.peak_rating = record.rating;
        }

        match outcome {
            Outcome::Win => {
                record.wins += 1;
                record.win_streak += 1;
                record.loss_streak = 0;
            }
            Outcome::Loss => {
                record.losses += 1;
                record.loss_streak += 1;
                record.win_streak = 0;
            }
            Outcome::Draw => {
                record.draws += 1;
                record.win_streak = 0;
                record.loss_streak = 0;
            }
        }

        if record.is_in_placement {
            record.placement_matches_played += 1;
            if record.placement_matches_played >= config.placement_matches {
                record.is_in_placement = false;
            }
        }

        record.context.record(
            context.timestamp,
            context.session_length_minutes,
            context.opponent_archetype,
            outcome.is_win(),
            record.rating
        );

        if let Some(sample) = &context.player_playstyle_sample {
            record.playstyle.absorb(sample, config.playstyle_learning_rate);
        }

        let (rating_now, uncertainty_now) = (record.rating, record.uncertainty);
        record
            .archetype_records
            .entry(context.player_archetype)
            .or_insert_with(|| ArchetypeRecord::seeded(rating_now, uncertainty_now, context.timestamp))
            .record(outcome, rating_now, uncertainty_now, context.opponent_archetype, context.timestamp);

        record.push_recent(RecentMatch {
            timestamp: context.timestamp,
            outcome,
            rating_delta: delta,
            rating_after: record.rating
        });

        record.adaptive.last_factor = adaptive_factor;
        record.adaptive.observed_win_rate = record.win_rate();
    }
}
