use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::EnumIter;

/// Result of a match from the perspective of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, EnumIter)]
#[repr(u8)]
pub enum Outcome {
    Loss = 0,
    Draw = 1,
    Win = 2
}

impl Outcome {
    /// Numeric score used by the correction terms.
    pub fn score(&self) -> f64 {
        match self {
            Outcome::Loss => 0.0,
            Outcome::Draw => 0.5,
            Outcome::Win => 1.0
        }
    }

    /// The same match seen from the other chair.
    pub fn reversed(&self) -> Outcome {
        match self {
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
            Outcome::Win => Outcome::Loss
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }
}

impl TryFrom<i32> for Outcome {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Loss),
            1 => Ok(Outcome::Draw),
            2 => Ok(Outcome::Win),
            _ => Err(())
        }
    }
}
