use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::EnumIter;

use crate::model::structures::{archetype::Archetype, player_record::PlayerSkillRecord};

/// Competitive tier of an event, ordered by prestige.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, EnumIter)]
#[repr(u8)]
pub enum TournamentTier {
    Casual = 0,
    Local = 1,
    Regional = 2,
    National = 3,
    International = 4
}

impl TournamentTier {
    /// K-factor multiplier for matches at this tier.
    pub fn importance_modifier(&self) -> f64 {
        match self {
            TournamentTier::Casual => 0.7,
            TournamentTier::Local => 1.0,
            TournamentTier::Regional => 1.3,
            TournamentTier::National => 1.6,
            TournamentTier::International => 2.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum StructureKind {
    SwissWithCut,
    DoubleElimination,
    RoundRobin,
    AdaptiveHybrid
}

/// A concrete event structure recommended for a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDescriptor {
    pub kind: StructureKind,
    pub rounds: u32,
    pub time_per_round_minutes: u32,
    /// Players advancing to a single-elimination cut, when the
    /// structure has one.
    pub top_cut: Option<u32>,
    pub suitability: f64
}

impl StructureDescriptor {
    pub fn total_minutes(&self) -> u32 {
        self.rounds * self.time_per_round_minutes
    }
}

/// Stake context of one tournament match for K-factor purposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStakes {
    pub is_elimination: bool,
    pub round: u32,
    pub total_rounds: u32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentPlayer {
    pub record: PlayerSkillRecord,
    pub points: u32,
    pub archetype: Archetype,
    pub active: bool
}

impl TournamentPlayer {
    pub fn new(record: PlayerSkillRecord, archetype: Archetype) -> TournamentPlayer {
        TournamentPlayer {
            record,
            points: 0,
            archetype,
            active: true
        }
    }

    pub fn player_id(&self) -> i32 {
        self.record.player_id
    }
}

/// One table assignment in a round. `opponent_id` of `None` is a bye.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub table: u32,
    pub player_id: i32,
    pub opponent_id: Option<i32>,
    pub score: f64,
    pub round: u32
}

impl Pairing {
    pub fn is_bye(&self) -> bool {
        self.opponent_id.is_none()
    }
}

/// Archetype counts for one completed pairing round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMetaBreakdown {
    pub round: u32,
    pub archetype_counts: HashMap<Archetype, u32>
}

/// Mutable pairing state for one running event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    pub id: i32,
    pub tier: TournamentTier,
    pub structure: StructureDescriptor,
    pub players: Vec<TournamentPlayer>,
    pub current_round: u32,
    /// Canonically ordered id pairs that have already played.
    pub pairing_history: HashSet<(i32, i32)>,
    pub round_meta: Vec<RoundMetaBreakdown>
}

impl TournamentState {
    pub fn new(id: i32, tier: TournamentTier, structure: StructureDescriptor, players: Vec<TournamentPlayer>) -> TournamentState {
        TournamentState {
            id,
            tier,
            structure,
            players,
            current_round: 1,
            pairing_history: HashSet::new(),
            round_meta: Vec::new()
        }
    }

    fn canonical(a: i32, b: i32) -> (i32, i32) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn have_met(&self, a: i32, b: i32) -> bool {
        self.pairing_history.contains(&Self::canonical(a, b))
    }

    /// Records a generated round: pairing history, the per-round
    /// archetype breakdown and the round counter.
    pub fn commit_round(&mut self, pairings: &[Pairing]) {
        let mut counts: HashMap<Archetype, u32> = HashMap::new();
        let players = &self.players;
        let archetype_of = |id: i32| players.iter().find(|p| p.player_id() == id).map(|p| p.archetype);

        for pairing in pairings {
            if let Some(archetype) = archetype_of(pairing.player_id) {
                *counts.entry(archetype).or_default() += 1;
            }
            if let Some(opponent_id) = pairing.opponent_id {
                if let Some(archetype) = archetype_of(opponent_id) {
                    *counts.entry(archetype).or_default() += 1;
                }
                self.pairing_history
                    .insert(Self::canonical(pairing.player_id, opponent_id));
            }
        }

        self.round_meta.push(RoundMetaBreakdown {
            round: self.current_round,
            archetype_counts: counts
        });
        self.current_round += 1;
    }
}

/// Payout line for one final standing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeAward {
    pub place: u32,
    pub share: f64,
    pub amount: f64
}

/// One side of a parallel bracket split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub player_ids: Vec<i32>,
    pub structure: StructureDescriptor,
    pub prizes: Vec<PrizeAward>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSplit {
    pub main: Bracket,
    pub consolation: Bracket
}

/// Participation incentive for one archetype, derived from its field
/// share relative to the diversity target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeIncentive {
    pub multiplier: f64,
    pub bonus_points: f64
}
