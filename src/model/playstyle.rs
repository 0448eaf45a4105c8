//! Behavioral trait profiles and pairwise compatibility scoring.

use serde::{Deserialize, Serialize};

use crate::config::CompatibilityTables;

/// Five behavioral traits, each in `[0, 1]`. Doubles as the per-match
/// sample type supplied by external gameplay evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaystyleProfile {
    pub aggression: f64,
    pub consistency: f64,
    pub complexity: f64,
    pub adaptability: f64,
    pub risk_taking: f64
}

impl Default for PlaystyleProfile {
    fn default() -> Self {
        PlaystyleProfile {
            aggression: 0.5,
            consistency: 0.5,
            complexity: 0.5,
            adaptability: 0.5,
            risk_taking: 0.5
        }
    }
}

/// Weights used when projecting trait differences onto a scalar advantage.
const ADVANTAGE_WEIGHTS: [f64; 5] = [0.2, 0.2, 0.1, 0.3, 0.2];

/// Largest win-probability shift a playstyle advantage may produce.
const MAX_ADVANTAGE_NUDGE: f64 = 0.1;

impl PlaystyleProfile {
    /// Folds one observed sample into the profile with an exponential
    /// moving average. Traits stay clamped to the unit interval.
    pub fn absorb(&mut self, sample: &PlaystyleProfile, learning_rate: f64) {
        let blend = |current: f64, observed: f64| {
            (current * (1.0 - learning_rate) + observed.clamp(0.0, 1.0) * learning_rate).clamp(0.0, 1.0)
        };

        self.aggression = blend(self.aggression, sample.aggression);
        self.consistency = blend(self.consistency, sample.consistency);
        self.complexity = blend(self.complexity, sample.complexity);
        self.adaptability = blend(self.adaptability, sample.adaptability);
        self.risk_taking = blend(self.risk_taking, sample.risk_taking);
    }

    fn traits(&self) -> [f64; 5] {
        [
            self.aggression,
            self.consistency,
            self.complexity,
            self.adaptability,
            self.risk_taking
        ]
    }

    /// Quintile bucket index for matrix lookups.
    fn bucket(value: f64) -> usize {
        ((value.clamp(0.0, 1.0) * 5.0) as usize).min(4)
    }

    /// Pairwise compatibility in `[0, 1]`, averaged over the aggression,
    /// consistency and complexity matrices.
    pub fn compatibility(&self, other: &PlaystyleProfile, tables: &CompatibilityTables) -> f64 {
        let aggression = tables.aggression[Self::bucket(self.aggression)][Self::bucket(other.aggression)];
        let consistency = tables.consistency[Self::bucket(self.consistency)][Self::bucket(other.consistency)];
        let complexity = tables.complexity[Self::bucket(self.complexity)][Self::bucket(other.complexity)];

        (aggression + consistency + complexity) / 3.0
    }

    /// Signed stylistic advantage of `self` over `other` in `[-1, 1]`.
    pub fn advantage(&self, other: &PlaystyleProfile) -> f64 {
        self.traits()
            .iter()
            .zip(other.traits().iter())
            .zip(ADVANTAGE_WEIGHTS.iter())
            .map(|((a, b), weight)| (a - b) * weight)
            .sum()
    }

    /// Applies a playstyle advantage on top of a skill-based win
    /// probability. The nudge is capped and the result stays a
    /// meaningful probability.
    pub fn nudged_win_probability(base: f64, advantage: f64) -> f64 {
        let nudge = advantage.clamp(-1.0, 1.0) * MAX_ADVANTAGE_NUDGE;
        (base + nudge).clamp(0.01, 0.99)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::config::CompatibilityTables;

    #[test]
    fn absorb_moves_traits_toward_the_sample() {
        let mut profile = PlaystyleProfile::default();
        let sample = PlaystyleProfile {
            aggression: 1.0,
            ..PlaystyleProfile::default()
        };

        profile.absorb(&sample, 0.05);
        assert_abs_diff_eq!(profile.aggression, 0.525, epsilon = 1e-12);
        assert_abs_diff_eq!(profile.consistency, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn absorb_clamps_out_of_range_samples() {
        let mut profile = PlaystyleProfile::default();
        let sample = PlaystyleProfile {
            risk_taking: 7.5,
            ..PlaystyleProfile::default()
        };

        for _ in 0..500 {
            profile.absorb(&sample, 0.05);
        }

        assert!(profile.risk_taking <= 1.0);
    }

    #[test]
    fn identical_profiles_land_on_the_matrix_diagonal() {
        let tables = CompatibilityTables::default();
        let a = PlaystyleProfile::default();

        assert_abs_diff_eq!(a.compatibility(&a, &tables), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn opposite_profiles_score_higher_than_identical_ones() {
        let tables = CompatibilityTables::default();
        let passive = PlaystyleProfile {
            aggression: 0.05,
            consistency: 0.05,
            complexity: 0.05,
            ..PlaystyleProfile::default()
        };
        let aggressive = PlaystyleProfile {
            aggression: 0.95,
            consistency: 0.95,
            complexity: 0.95,
            ..PlaystyleProfile::default()
        };

        assert!(passive.compatibility(&aggressive, &tables) > passive.compatibility(&passive, &tables));
    }

    #[test]
    fn advantage_is_antisymmetric() {
        let a = PlaystyleProfile {
            aggression: 0.9,
            adaptability: 0.8,
            ..PlaystyleProfile::default()
        };
        let b = PlaystyleProfile::default();

        assert_abs_diff_eq!(a.advantage(&b), -b.advantage(&a), epsilon = 1e-12);
        assert!(a.advantage(&b) > 0.0);
    }

    #[test]
    fn nudge_is_capped_and_keeps_probabilities_valid() {
        assert_abs_diff_eq!(PlaystyleProfile::nudged_win_probability(0.5, 1.0), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(PlaystyleProfile::nudged_win_probability(0.5, -1.0), 0.4, epsilon = 1e-12);
        assert_eq!(PlaystyleProfile::nudged_win_probability(0.98, 1.0), 0.99);
        assert_eq!(PlaystyleProfile::nudged_win_probability(0.02, -1.0), 0.01);
    }
}
