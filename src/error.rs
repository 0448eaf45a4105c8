use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchmakingError {
    /// The global search deadline elapsed. The search slot has already
    /// been released; callers decide whether to re-queue.
    #[error("no suitable opponent found within {waited:?}")]
    Timeout { waited: Duration },

    /// The search was cancelled, either explicitly or because the
    /// queue entry was claimed away and dropped.
    #[error("matchmaking search cancelled")]
    Cancelled
}

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("a match requires two distinct players, got player {0} on both sides")]
    SamePlayer(i32)
}
