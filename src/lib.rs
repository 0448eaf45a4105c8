//! Competitive skill-rating and matchmaking core.
//!
//! The crate is split into the Bayesian rating model ([`model`]), the
//! queue-based opponent search ([`matchmaking`]) and the Swiss-style
//! tournament pairing engine ([`tournament`]). Match results flow into
//! [`model::rating::RatingUpdateEngine`], which produces new
//! [`model::structures::player_record::PlayerSkillRecord`] values; the
//! meta analyzer periodically folds recent matches into a
//! [`model::meta::MetaSnapshot`] consumed by both pairing engines.
//!
//! Persistence, transport and presentation are owned by external
//! collaborators; everything here is an in-process contract.

pub mod config;
pub mod error;
pub mod matchmaking;
pub mod model;
pub mod service;
pub mod tournament;
pub mod utils;
