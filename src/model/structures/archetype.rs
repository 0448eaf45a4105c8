use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Deck archetypes tracked by the meta analyzer and the matchup tables.
///
/// Serialized by name so archetypes can key JSON configuration maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, EnumString, Display)]
pub enum Archetype {
    Aggro,
    Control,
    Midrange,
    Combo,
    Tempo,
    Ramp
}
