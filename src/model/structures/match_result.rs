use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    playstyle::PlaystyleProfile,
    structures::{archetype::Archetype, outcome::Outcome}
};

/// A completed match as reported by the game server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub id: Uuid,
    pub player_id: i32,
    pub opponent_id: i32,
    /// Outcome from `player_id`'s perspective.
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: u32,
    /// Minutes the reporting player had been playing when the match started.
    pub session_length_minutes: u32,
    pub player_archetype: Archetype,
    pub opponent_archetype: Archetype,
    /// Tournament stake in `[0, 1]`; 0.5 means an ordinary ladder match.
    pub tournament_importance: f64
}

impl MatchResult {
    pub fn new(player_id: i32, opponent_id: i32, outcome: Outcome, timestamp: DateTime<Utc>) -> MatchResult {
        MatchResult {
            id: Uuid::new_v4(),
            player_id,
            opponent_id,
            outcome,
            timestamp,
            duration_seconds: 600,
            session_length_minutes: 30,
            player_archetype: Archetype::Midrange,
            opponent_archetype: Archetype::Midrange,
            tournament_importance: 0.5
        }
    }
}

/// Situational inputs for a single rating update.
///
/// `performance_quality`, `opponent_strength` and the playstyle samples
/// come from external evaluators and are optional; when absent the
/// corresponding modifier is skipped entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchContext {
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: u32,
    pub session_length_minutes: u32,
    pub player_archetype: Archetype,
    pub opponent_archetype: Archetype,
    pub tournament_importance: f64,
    /// How well the player piloted the game, `[0, 1]` with 0.5 neutral.
    pub performance_quality: Option<f64>,
    /// Relative opponent strength, `[0, 1]` with 0.5 neutral.
    pub opponent_strength: Option<f64>,
    pub player_playstyle_sample: Option<PlaystyleProfile>,
    pub opponent_playstyle_sample: Option<PlaystyleProfile>
}

impl MatchContext {
    pub fn from_result(result: &MatchResult) -> MatchContext {
        MatchContext {
            timestamp: result.timestamp,
            duration_seconds: result.duration_seconds,
            session_length_minutes: result.session_length_minutes,
            player_archetype: result.player_archetype,
            opponent_archetype: result.opponent_archetype,
            tournament_importance: result.tournament_importance,
            performance_quality: None,
            opponent_strength: None,
            player_playstyle_sample: None,
            opponent_playstyle_sample: None
        }
    }

    /// The same context seen from the opponent's chair. Player-specific
    /// evaluator inputs do not carry across.
    pub fn flipped(&self) -> MatchContext {
        MatchContext {
            timestamp: self.timestamp,
            duration_seconds: self.duration_seconds,
            session_length_minutes: self.session_length_minutes,
            player_archetype: self.opponent_archetype,
            opponent_archetype: self.player_archetype,
            tournament_importance: self.tournament_importance,
            performance_quality: None,
            opponent_strength: None,
            player_playstyle_sample: self.opponent_playstyle_sample,
            opponent_playstyle_sample: self.player_playstyle_sample
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn flipping_swaps_archetypes_and_drops_evaluator_inputs() {
        let result = MatchResult {
            player_archetype: Archetype::Aggro,
            opponent_archetype: Archetype::Control,
            ..MatchResult::new(1, 2, Outcome::Win, Utc::now())
        };

        let mut context = MatchContext::from_result(&result);
        context.performance_quality = Some(0.9);
        context.opponent_strength = Some(0.7);

        let flipped = context.flipped();
        assert_eq!(flipped.player_archetype, Archetype::Control);
        assert_eq!(flipped.opponent_archetype, Archetype::Aggro);
        assert!(flipped.performance_quality.is_none());
        assert!(flipped.opponent_strength.is_none());
    }
}
