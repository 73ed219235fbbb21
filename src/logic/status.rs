//! Read-only bracket status projection for UI and ops polling.

use crate::models::{
    Match, MatchId, MatchStatus, ParticipantId, Section, Tournament, TournamentId,
    TournamentStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RoundCounts {
    pub round: u32,
    pub section: Section,
    pub total: u32,
    pub pending: u32,
    pub ready: u32,
    pub completed: u32,
}

/// A match waiting for a result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReadyMatch {
    pub match_id: MatchId,
    pub match_number: u32,
    pub round_number: u32,
    pub slot_a: Option<ParticipantId>,
    pub slot_b: Option<ParticipantId>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BracketStatus {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub champion: Option<ParticipantId>,
    pub per_round_counts: Vec<RoundCounts>,
    pub ready_matches: Vec<ReadyMatch>,
}

pub fn bracket_status(tournament: &Tournament, matches: &[Match]) -> BracketStatus {
    let mut rounds: BTreeMap<u32, RoundCounts> = BTreeMap::new();
    for m in matches {
        let counts = rounds.entry(m.round_number).or_insert_with(|| RoundCounts {
            round: m.round_number,
            section: Section::of_round(m.round_number),
            total: 0,
            pending: 0,
            ready: 0,
            completed: 0,
        });
        counts.total += 1;
        match m.status {
            MatchStatus::Pending => counts.pending += 1,
            MatchStatus::Ready => counts.ready += 1,
            MatchStatus::Completed => counts.completed += 1,
        }
    }

    let ready_matches = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Ready)
        .map(|m| ReadyMatch {
            match_id: m.id,
            match_number: m.match_number,
            round_number: m.round_number,
            slot_a: m.slot_a,
            slot_b: m.slot_b,
        })
        .collect();

    BracketStatus {
        tournament_id: tournament.id,
        status: tournament.status,
        champion: tournament.champion,
        per_round_counts: rounds.into_values().collect(),
        ready_matches,
    }
}
