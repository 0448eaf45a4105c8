use serde::{Deserialize, Serialize};

use crate::model::structures::player_record::PlayerSkillRecord;

/// Diagnostic impact of one contextual dimension on a match.
///
/// Impacts are informational only by default; the engine folds them back
/// into the delta only when contextual feedback is explicitly enabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketImpact {
    pub bucket: u32,
    pub historical_win_rate: f64,
    pub impact: f64
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionImpact {
    pub bucket: u32,
    pub historical_win_rate: f64,
    /// Multiplicative fatigue discount for long sessions, `[0.8, 1.0]`.
    pub fatigue: f64,
    pub impact: f64
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupImpact {
    pub expected_win_rate: f64,
    pub impact: f64
}

/// Per-dimension contextual breakdown for one rating update. Dimensions
/// without enough historical samples are absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualImpact {
    pub time_of_day: Option<BucketImpact>,
    pub day_of_week: Option<BucketImpact>,
    pub session_length: Option<SessionImpact>,
    pub deck_matchup: Option<MatchupImpact>
}

impl ContextualImpact {
    /// Sum of all present dimension impacts.
    pub fn total(&self) -> f64 {
        self.time_of_day.map_or(0.0, |i| i.impact)
            + self.day_of_week.map_or(0.0, |i| i.impact)
            + self.session_length.map_or(0.0, |i| i.impact)
            + self.deck_matchup.map_or(0.0, |i| i.impact)
    }
}

/// Full output of one match-result application: the two post-match
/// records plus everything needed to audit how they were produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingUpdateResult {
    pub player: PlayerSkillRecord,
    pub opponent: PlayerSkillRecord,
    pub player_delta: f64,
    pub opponent_delta: f64,
    /// Pre-match probability that the reporting player wins.
    pub win_probability: f64,
    /// Absolute gap between expectation and result, `[0, 1]`.
    pub surprise_factor: f64,
    pub player_k_factor: f64,
    pub opponent_k_factor: f64,
    pub contextual_impact: ContextualImpact
}
