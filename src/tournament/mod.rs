//! Swiss-style tournament pairing, structure selection, parallel
//! brackets and participation incentives.

pub mod structures;

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::{RatingConfig, Tables},
    model::structures::{archetype::Archetype, player_record::PlayerSkillRecord},
    tournament::structures::{
        ArchetypeIncentive, Bracket, BracketSplit, MatchStakes, Pairing, PrizeAward, StructureDescriptor,
        StructureKind, TournamentPlayer, TournamentState, TournamentTier
    }
};

/// Field share above which an archetype mirror is penalized and its
/// participation incentives shrink.
pub const DIVERSITY_TARGET: f64 = 0.15;

/// Tunables for structure selection, bracket splits and prize pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TournamentConfig {
    /// Share of the field placed in the main bracket of a split.
    pub main_bracket_ratio: f64,
    pub main_time_budget_minutes: u32,
    pub consolation_time_budget_minutes: u32,
    /// Prize pool contribution per player, per bracket.
    pub main_pool_per_player: f64,
    pub consolation_pool_per_player: f64,
    pub main_prize_shares: Vec<f64>,
    pub consolation_prize_shares: Vec<f64>
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            main_bracket_ratio: 0.5,
            main_time_budget_minutes: 300,
            consolation_time_budget_minutes: 240,
            main_pool_per_player: 10.0,
            consolation_pool_per_player: 3.0,
            main_prize_shares: vec![0.4, 0.25, 0.15, 0.1, 0.05, 0.05],
            consolation_prize_shares: vec![0.5, 0.3, 0.2]
        }
    }
}

pub struct TournamentPairingEngine {
    config: TournamentConfig,
    rating: RatingConfig,
    tables: Arc<Tables>
}

impl TournamentPairingEngine {
    pub fn new(config: TournamentConfig, rating: RatingConfig, tables: Arc<Tables>) -> TournamentPairingEngine {
        TournamentPairingEngine { config, rating, tables }
    }

    /// Greedy Swiss pairing over the active field. Players are sorted by
    /// points, then rating; each unpaired player takes the best-scoring
    /// available opponent below them. An odd field gives the
    /// lowest-standing unpaired player a bye.
    pub fn generate_pairings(&self, state: &TournamentState) -> Vec<Pairing> {
        let mut standings: Vec<&TournamentPlayer> = state.players.iter().filter(|p| p.active).collect();
        standings.sort_by(|a, b| {
            b.points.cmp(&a.points).then(
                b.record
                    .rating
                    .partial_cmp(&a.record.rating)
                    .unwrap_or(Ordering::Equal)
            )
        });

        let field_shares = Self::field_shares(&standings);
        let mut paired = vec![false; standings.len()];
        let mut pairings = Vec::new();

        for i in 0..standings.len() {
            if paired[i] {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for j in (i + 1)..standings.len() {
                if paired[j] {
                    continue;
                }

                let score = self.pairing_score(standings[i], standings[j], state, &field_shares);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((j, score));
                }
            }

            if let Some((j, score)) = best {
                paired[i] = true;
                paired[j] = true;
                pairings.push(Pairing {
                    table: pairings.len() as u32 + 1,
                    player_id: standings[i].player_id(),
                    opponent_id: Some(standings[j].player_id()),
                    score,
                    round: state.current_round
                });
            }
        }

        // Odd field: the lowest-standing unpaired player sits out
        if let Some(index) = (0..standings.len()).rev().find(|i| !paired[*i]) {
            pairings.push(Pairing {
                table: pairings.len() as u32 + 1,
                player_id: standings[index].player_id(),
                opponent_id: None,
                score: 1.0,
                round: state.current_round
            });
        }

        debug!(
            tournament = state.id,
            round = state.current_round,
            tables = pairings.len(),
            "round paired"
        );

        pairings
    }

    fn field_shares(standings: &[&TournamentPlayer]) -> HashMap<Archetype, f64> {
        let mut counts: HashMap<Archetype, u32> = HashMap::new();
        for player in standings {
            *counts.entry(player.archetype).or_default() += 1;
        }

        let total = standings.len().max(1) as f64;
        counts
            .into_iter()
            .map(|(archetype, count)| (archetype, count as f64 / total))
            .collect()
    }

    /// Pairing desirability in roughly `[-0.3, 1.0]`: rating proximity,
    /// rematch avoidance, meta variety, uncertainty similarity and
    /// playstyle compatibility.
    pub fn pairing_score(
        &self,
        a: &TournamentPlayer,
        b: &TournamentPlayer,
        state: &TournamentState,
        field_shares: &HashMap<Archetype, f64>
    ) -> f64 {
        let mut score = 0.0;

        let rating_gap = (a.record.rating - b.record.rating).abs();
        score += (1.0 - rating_gap / 400.0).max(0.0) * 0.3;

        if !state.have_met(a.player_id(), b.player_id()) {
            score += 0.25;
        }

        score += self.meta_variety(a, b, field_shares) * 0.2;

        let uncertainty_gap = (a.record.uncertainty - b.record.uncertainty).abs();
        score += (1.0 - uncertainty_gap / 100.0).max(0.0) * 0.15;

        score += a.record.playstyle.compatibility(&b.record.playstyle, &self.tables.compatibility) * 0.1;

        score
    }

    /// Cross-archetype pairings score their configured interest; mirrors
    /// of an over-represented archetype are penalized outright.
    fn meta_variety(&self, a: &TournamentPlayer, b: &TournamentPlayer, field_shares: &HashMap<Archetype, f64>) -> f64 {
        if a.archetype == b.archetype {
            let share = field_shares.get(&a.archetype).copied().unwrap_or(0.0);
            if share > DIVERSITY_TARGET {
                return -1.5; // times the 0.2 weight: a flat -0.3
            }
            return 0.0;
        }

        self.tables.interest.interest(a.archetype, b.archetype)
    }

    /// Tournament-scope K-factor: the ladder base scaled by tier,
    /// player experience and match stakes, clamped to the usual bounds.
    pub fn tournament_k_factor(&self, record: &PlayerSkillRecord, tier: TournamentTier, stakes: &MatchStakes) -> f64 {
        let k = self.rating.k_factor_base
            * tier.importance_modifier()
            * Self::experience_modifier(record.games_played())
            * Self::stakes_modifier(stakes);

        k.clamp(self.rating.k_factor_min, self.rating.k_factor_max)
    }

    fn experience_modifier(games: u32) -> f64 {
        match games {
            0..=9 => 1.5,
            10..=49 => 1.2,
            50..=199 => 1.0,
            _ => 0.8
        }
    }

    fn stakes_modifier(stakes: &MatchStakes) -> f64 {
        if stakes.is_elimination {
            1.4
        } else if stakes.total_rounds > 0 && stakes.round as f64 > 0.75 * stakes.total_rounds as f64 {
            1.2
        } else if stakes.round <= 2 {
            0.9
        } else {
            1.0
        }
    }

    /// Picks the best feasible structure for a field. Candidates outside
    /// their player bounds or over the time budget are discarded; Swiss
    /// is the fallback because it tolerates any field.
    pub fn select_structure(&self, participants: usize, time_budget_minutes: u32, skill_variance: f64) -> StructureDescriptor {
        let candidates = Self::candidate_structures(participants, skill_variance);

        let mut selected: Option<&(usize, usize, StructureDescriptor)> = None;
        for candidate in &candidates {
            let (min_players, max_players, descriptor) = candidate;
            if participants < *min_players || participants > *max_players {
                continue;
            }
            if descriptor.total_minutes() > time_budget_minutes {
                continue;
            }
            // Strict comparison keeps the earlier candidate on ties
            if selected.map_or(true, |(_, _, best)| descriptor.suitability > best.suitability) {
                selected = Some(candidate);
            }
        }

        let structure = match selected {
            Some((_, _, descriptor)) => descriptor.clone(),
            None => candidates[0].2.clone()
        };

        info!(
            participants,
            time_budget_minutes,
            kind = ?structure.kind,
            rounds = structure.rounds,
            "structure selected"
        );

        structure
    }

    fn candidate_structures(participants: usize, skill_variance: f64) -> Vec<(usize, usize, StructureDescriptor)> {
        let log2_rounds = if participants >= 2 {
            (participants as f64).log2().ceil() as u32
        } else {
            1
        };

        vec![
            (
                8,
                512,
                StructureDescriptor {
                    kind: StructureKind::SwissWithCut,
                    rounds: log2_rounds,
                    time_per_round_minutes: 50,
                    top_cut: Some(8),
                    suitability: Self::suitability(StructureKind::SwissWithCut, participants, skill_variance)
                }
            ),
            (
                4,
                64,
                StructureDescriptor {
                    kind: StructureKind::DoubleElimination,
                    rounds: 2 * log2_rounds - 1,
                    time_per_round_minutes: 50,
                    top_cut: None,
                    suitability: Self::suitability(StructureKind::DoubleElimination, participants, skill_variance)
                }
            ),
            (
                3,
                12,
                StructureDescriptor {
                    kind: StructureKind::RoundRobin,
                    rounds: participants.saturating_sub(1).max(1) as u32,
                    time_per_round_minutes: 50,
                    top_cut: None,
                    suitability: Self::suitability(StructureKind::RoundRobin, participants, skill_variance)
                }
            ),
            (
                16,
                256,
                StructureDescriptor {
                    kind: StructureKind::AdaptiveHybrid,
                    rounds: log2_rounds + 2,
                    time_per_round_minutes: 45,
                    top_cut: Some(8),
                    suitability: Self::suitability(StructureKind::AdaptiveHybrid, participants, skill_variance)
                }
            ),
        ]
    }

    /// Additive fit score; only relative order matters.
    fn suitability(kind: StructureKind, participants: usize, skill_variance: f64) -> f64 {
        match kind {
            StructureKind::SwissWithCut => {
                (if participants > 16 { 0.8 } else { 0.5 }) + (if skill_variance > 200.0 { 0.7 } else { 0.4 })
            }
            StructureKind::DoubleElimination => {
                (if participants <= 32 { 0.9 } else { 0.3 }) + (if skill_variance < 150.0 { 0.8 } else { 0.5 })
            }
            StructureKind::RoundRobin => {
                (if participants <= 8 { 1.0 } else { 0.1 }) + (if skill_variance < 100.0 { 0.9 } else { 0.3 })
            }
            StructureKind::AdaptiveHybrid => {
                (if (16..=64).contains(&participants) { 0.9 } else { 0.6 }) + 0.7
            }
        }
    }

    /// Splits a field into rating-sorted main and consolation brackets,
    /// each with its own structure and prize table.
    pub fn create_parallel_brackets(&self, players: &[TournamentPlayer]) -> BracketSplit {
        let mut sorted: Vec<&TournamentPlayer> = players.iter().collect();
        sorted.sort_by(|a, b| {
            b.record
                .rating
                .partial_cmp(&a.record.rating)
                .unwrap_or(Ordering::Equal)
        });

        let main_size = (players.len() as f64 * self.config.main_bracket_ratio) as usize;
        let (main, consolation) = sorted.split_at(main_size.min(sorted.len()));

        BracketSplit {
            main: self.bracket(
                main,
                self.config.main_time_budget_minutes,
                self.config.main_pool_per_player,
                &self.config.main_prize_shares
            ),
            consolation: self.bracket(
                consolation,
                self.config.consolation_time_budget_minutes,
                self.config.consolation_pool_per_player,
                &self.config.consolation_prize_shares
            )
        }
    }

    fn bracket(
        &self,
        players: &[&TournamentPlayer],
        time_budget_minutes: u32,
        pool_per_player: f64,
        shares: &[f64]
    ) -> Bracket {
        let ratings: Vec<f64> = players.iter().map(|p| p.record.rating).collect();
        let pool = players.len() as f64 * pool_per_player;

        Bracket {
            player_ids: players.iter().map(|p| p.player_id()).collect(),
            structure: self.select_structure(players.len(), time_budget_minutes, skill_variance(&ratings)),
            prizes: prize_table(pool, shares)
        }
    }

    /// Per-archetype participation incentives: over-represented decks
    /// earn less, under-represented decks earn a boost plus bonus points.
    pub fn archetype_incentives(&self, field_shares: &HashMap<Archetype, f64>) -> HashMap<Archetype, ArchetypeIncentive> {
        field_shares
            .iter()
            .map(|(archetype, share)| {
                let multiplier = if *share > DIVERSITY_TARGET * 2.0 {
                    0.8
                } else if *share < DIVERSITY_TARGET * 0.5 {
                    1.3
                } else {
                    1.0
                };

                let incentive = ArchetypeIncentive {
                    multiplier,
                    bonus_points: ((DIVERSITY_TARGET - share) * 10.0).max(0.0)
                };

                (*archetype, incentive)
            })
            .collect()
    }
}

/// Population standard deviation of a rating list.
pub fn skill_variance(ratings: &[f64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    let variance = ratings.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ratings.len() as f64;

    variance.sqrt()
}

fn prize_table(pool: f64, shares: &[f64]) -> Vec<PrizeAward> {
    shares
        .iter()
        .enumerate()
        .map(|(index, share)| PrizeAward {
            place: index as u32 + 1,
            share: *share,
            amount: pool * share
        })
        .collect()
}
