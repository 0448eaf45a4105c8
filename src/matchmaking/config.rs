use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::constants::MIN_UNCERTAINTY;

/// Tunables for the matchmaking queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchmakingConfig {
    /// Starting rating window before the uncertainty bonus.
    pub base_search_range: f64,
    /// Window growth applied on every scan without a match.
    pub range_increment: f64,
    pub max_search_range: f64,
    /// Hard cap on pairable rating gaps regardless of window growth.
    pub max_skill_difference: f64,
    /// Uncertainty floor used when seeding the initial window.
    pub min_uncertainty: f64,
    pub scan_interval: Duration,
    pub search_deadline: Duration,
    /// Starting acceptance threshold for match quality.
    pub quality_threshold: f64,
    pub quality_threshold_floor: f64,
    pub quality_threshold_ceiling: f64,
    /// Average waits above this loosen the threshold.
    pub long_wait: Duration,
    /// Average waits below this tighten it.
    pub short_wait: Duration,
    /// Completed searches sampled for the rolling wait average.
    pub wait_sample_capacity: usize
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        MatchmakingConfig {
            base_search_range: 100.0,
            range_increment: 50.0,
            max_search_range: 500.0,
            max_skill_difference: 500.0,
            min_uncertainty: MIN_UNCERTAINTY,
            scan_interval: Duration::from_secs(5),
            search_deadline: Duration::from_secs(300),
            quality_threshold: 0.7,
            quality_threshold_floor: 0.5,
            quality_threshold_ceiling: 0.8,
            long_wait: Duration::from_secs(120),
            short_wait: Duration::from_secs(30),
            wait_sample_capacity: 32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MatchmakingConfig;

    #[test]
    fn defaults_deserialize_from_empty_json() {
        let config: MatchmakingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.scan_interval.as_secs(), 5);
        assert_eq!(config.search_deadline.as_secs(), 300);
        assert_eq!(config.quality_threshold, 0.7);
    }
}
