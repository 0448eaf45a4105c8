//! Externalized tuning tables and engine configuration.
//!
//! Every table ships with defaults matching the live balance data but can
//! be replaced wholesale from JSON, so balance patches never require a
//! code change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{constants, structures::archetype::Archetype};

/// Expected win rates for ordered archetype pairs.
///
/// `expected_win_rate(a, b)` answers "how often does `a` beat `b`".
/// Missing pairs read as an even matchup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupTable(pub HashMap<Archetype, HashMap<Archetype, f64>>);

impl MatchupTable {
    pub fn expected_win_rate(&self, player: Archetype, opponent: Archetype) -> f64 {
        self.0
            .get(&player)
            .and_then(|row| row.get(&opponent))
            .copied()
            .unwrap_or(0.5)
    }
}

impl Default for MatchupTable {
    fn default() -> Self {
        const ORDER: [Archetype; 6] = [
            Archetype::Aggro,
            Archetype::Control,
            Archetype::Midrange,
            Archetype::Combo,
            Archetype::Tempo,
            Archetype::Ramp
        ];
        // Row = player archetype, column = opponent archetype. Every
        // ordered pair and its reverse sum to 1.
        const ROWS: [[f64; 6]; 6] = [
            [0.5, 0.65, 0.55, 0.7, 0.45, 0.75],
            [0.35, 0.5, 0.6, 0.4, 0.55, 0.45],
            [0.45, 0.4, 0.5, 0.65, 0.6, 0.5],
            [0.3, 0.6, 0.35, 0.5, 0.4, 0.8],
            [0.55, 0.45, 0.4, 0.6, 0.5, 0.65],
            [0.25, 0.55, 0.5, 0.2, 0.35, 0.5]
        ];

        let mut table = HashMap::new();
        for (row_index, player) in ORDER.iter().enumerate() {
            let mut row = HashMap::new();
            for (column_index, opponent) in ORDER.iter().enumerate() {
                row.insert(*opponent, ROWS[row_index][column_index]);
            }
            table.insert(*player, row);
        }

        MatchupTable(table)
    }
}

/// Quintile-bucketed pairwise compatibility matrices, one per trait the
/// matchmaker scores. Rows index the first player's bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityTables {
    pub aggression: [[f64; 5]; 5],
    pub consistency: [[f64; 5]; 5],
    pub complexity: [[f64; 5]; 5]
}

impl Default for CompatibilityTables {
    fn default() -> Self {
        // Contrast is interesting: scores rise with bucket distance.
        const CONTRAST: [[f64; 5]; 5] = [
            [0.5, 0.6, 0.7, 0.8, 0.9],
            [0.6, 0.5, 0.6, 0.7, 0.8],
            [0.7, 0.6, 0.5, 0.6, 0.7],
            [0.8, 0.7, 0.6, 0.5, 0.6],
            [0.9, 0.8, 0.7, 0.6, 0.5]
        ];

        CompatibilityTables {
            aggression: CONTRAST,
            consistency: CONTRAST,
            complexity: CONTRAST
        }
    }
}

/// How interesting a cross-archetype tournament pairing is to watch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestEntry {
    pub first: Archetype,
    pub second: Archetype,
    pub interest: f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestTable {
    pub entries: Vec<InterestEntry>,
    pub default_interest: f64
}

impl InterestTable {
    /// Symmetric lookup with the configured fallback.
    pub fn interest(&self, a: Archetype, b: Archetype) -> f64 {
        self.entries
            .iter()
            .find(|entry| (entry.first == a && entry.second == b) || (entry.first == b && entry.second == a))
            .map(|entry| entry.interest)
            .unwrap_or(self.default_interest)
    }
}

impl Default for InterestTable {
    fn default() -> Self {
        let entry = |first, second, interest| InterestEntry { first, second, interest };

        InterestTable {
            entries: vec![
                entry(Archetype::Control, Archetype::Aggro, 0.8),
                entry(Archetype::Combo, Archetype::Control, 0.7),
                entry(Archetype::Midrange, Archetype::Aggro, 0.6),
                entry(Archetype::Tempo, Archetype::Control, 0.7),
            ],
            default_interest: 0.5
        }
    }
}

/// All balance tables bundled for injection into the engines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tables {
    pub matchups: MatchupTable,
    pub compatibility: CompatibilityTables,
    pub interest: InterestTable
}

impl Tables {
    pub fn from_json_str(json: &str) -> Result<Tables, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Tunables for the Bayesian rating engine. Defaults mirror the
/// constants module; deployments override via config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingConfig {
    pub initial_rating: f64,
    pub initial_uncertainty: f64,
    pub min_uncertainty: f64,
    pub max_uncertainty: f64,
    pub beta: f64,
    pub tau: f64,
    pub draw_probability: f64,
    pub k_factor_base: f64,
    pub k_factor_min: f64,
    pub k_factor_max: f64,
    pub placement_matches: u32,
    pub reference_game_seconds: f64,
    pub adaptive_target_win_rate: f64,
    pub adaptive_strength: f64,
    pub adaptive_min_games: u32,
    pub adaptive_deadband: f64,
    pub playstyle_learning_rate: f64,
    /// When set, the per-dimension contextual impacts scale the final
    /// delta instead of remaining purely diagnostic.
    pub apply_contextual_feedback: bool
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            initial_rating: constants::INITIAL_RATING,
            initial_uncertainty: constants::INITIAL_UNCERTAINTY,
            min_uncertainty: constants::MIN_UNCERTAINTY,
            max_uncertainty: constants::MAX_UNCERTAINTY,
            beta: constants::BETA,
            tau: constants::TAU,
            draw_probability: constants::DRAW_PROBABILITY,
            k_factor_base: constants::K_FACTOR_BASE,
            k_factor_min: constants::K_FACTOR_MIN,
            k_factor_max: constants::K_FACTOR_MAX,
            placement_matches: constants::PLACEMENT_MATCHES,
            reference_game_seconds: constants::REFERENCE_GAME_SECONDS,
            adaptive_target_win_rate: constants::ADAPTIVE_TARGET_WIN_RATE,
            adaptive_strength: constants::ADAPTIVE_STRENGTH,
            adaptive_min_games: constants::ADAPTIVE_MIN_GAMES,
            adaptive_deadband: constants::ADAPTIVE_DEADBAND,
            playstyle_learning_rate: constants::PLAYSTYLE_LEARNING_RATE,
            apply_contextual_feedback: false
        }
    }
}
