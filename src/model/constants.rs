/// Rating every player starts at.
pub const INITIAL_RATING: f64 = 1500.0;

/// Uncertainty (sigma) assigned to fresh players.
pub const INITIAL_UNCERTAINTY: f64 = 350.0;

/// Uncertainty never shrinks below this floor.
pub const MIN_UNCERTAINTY: f64 = 25.0;

/// Uncertainty never grows beyond this ceiling.
pub const MAX_UNCERTAINTY: f64 = 350.0;

/// Skill-class width of the performance distribution.
pub const BETA: f64 = 200.0;

/// Additive uncertainty drift applied after every rated match.
pub const TAU: f64 = 6.0;

/// Prior probability of a draw used by the correction terms.
pub const DRAW_PROBABILITY: f64 = 0.1;

pub const K_FACTOR_BASE: f64 = 32.0;
pub const K_FACTOR_MIN: f64 = 16.0;
pub const K_FACTOR_MAX: f64 = 64.0;

/// Matches played before a player leaves placement.
pub const PLACEMENT_MATCHES: u32 = 10;

/// Ring-buffer capacity for per-player recent match history.
pub const RECENT_MATCH_CAPACITY: usize = 50;

/// Window and per-day decay for the recent-form signal.
pub const RECENT_FORM_WINDOW_DAYS: i64 = 7;
pub const TIME_DECAY_FACTOR: f64 = 0.95;

/// Contextual buckets stay neutral until they hold this many games.
pub const CONTEXT_MIN_SAMPLES: u32 = 5;

/// Session lengths are bucketed into half-hour slots.
pub const SESSION_BUCKET_MINUTES: u32 = 30;

/// Game duration treated as normal length by the delta modifiers.
pub const REFERENCE_GAME_SECONDS: f64 = 600.0;

// Adaptive difficulty damping
pub const ADAPTIVE_TARGET_WIN_RATE: f64 = 0.5;
pub const ADAPTIVE_STRENGTH: f64 = 0.2;
pub const ADAPTIVE_MIN_GAMES: u32 = 10;
pub const ADAPTIVE_DEADBAND: f64 = 0.05;

/// EMA learning rate for playstyle trait absorption.
pub const PLAYSTYLE_LEARNING_RATE: f64 = 0.05;
