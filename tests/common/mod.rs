//! Shared fixtures for integration tests.
#![allow(dead_code)]

use bracket_engine::{
    BracketEngine, BracketError, BracketStore, Format, Match, MatchStatus, MemoryStore,
    Participant, ParticipantId, RecordOutcome, Tournament, TournamentId, ValidationReport,
};
use std::collections::HashMap;

pub fn participants(n: u32) -> Vec<Participant> {
    (1..=n).map(|seed| Participant::new(format!("P{seed}"), seed)).collect()
}

pub struct Fixture {
    pub engine: BracketEngine,
    pub store: MemoryStore,
    pub tournament_id: TournamentId,
    pub participants: Vec<Participant>,
}

impl Fixture {
    /// Draft tournament with a participant list, bracket not generated.
    pub fn draft(format: Format, capacity: u32) -> Self {
        let engine = BracketEngine::new();
        let store = MemoryStore::new();
        let t = engine
            .create_tournament(&store, "Test Cup", format, capacity)
            .unwrap();
        Self {
            engine,
            store,
            tournament_id: t.id,
            participants: participants(capacity),
        }
    }

    /// Generated bracket, round one seeded.
    pub fn new(format: Format, capacity: u32) -> Self {
        let f = Self::draft(format, capacity);
        f.engine
            .generate_bracket(&f.store, f.tournament_id, format, &f.participants)
            .unwrap();
        f
    }

    pub fn seed_of(&self, id: ParticipantId) -> u32 {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.seed)
            .unwrap()
    }

    pub fn by_seed(&self, seed: u32) -> ParticipantId {
        self.participants.iter().find(|p| p.seed == seed).unwrap().id
    }

    pub fn tournament(&self) -> Tournament {
        self.store.tournament(self.tournament_id).unwrap()
    }

    pub fn matches(&self) -> Vec<Match> {
        self.store.matches(self.tournament_id).unwrap()
    }

    pub fn get(&self, match_number: u32) -> Match {
        self.matches()
            .into_iter()
            .find(|m| m.match_number == match_number)
            .unwrap()
    }

    pub fn ready(&self) -> Vec<Match> {
        self.matches()
            .into_iter()
            .filter(|m| m.status == MatchStatus::Ready)
            .collect()
    }

    /// Lower seed number of the two occupants.
    pub fn favourite(&self, m: &Match) -> ParticipantId {
        let (a, b) = (m.slot_a.unwrap(), m.slot_b.unwrap());
        if self.seed_of(a) < self.seed_of(b) {
            a
        } else {
            b
        }
    }

    pub fn underdog(&self, m: &Match) -> ParticipantId {
        m.opponent_of(self.favourite(m)).unwrap()
    }

    pub fn record(&self, m: &Match, winner: ParticipantId) -> Result<RecordOutcome, BracketError> {
        self.engine
            .record_match_result(&self.store, m.id, winner, None)
    }

    /// Record favourites for every ready match, in match-number order, until nothing is ready
    /// except `hold` (left unplayed).
    pub fn play_favourites(&self, hold: Option<u32>) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let next = self
                .ready()
                .into_iter()
                .find(|m| Some(m.match_number) != hold);
            let Some(m) = next else {
                return outcomes;
            };
            outcomes.push(self.record(&m, self.favourite(&m)).unwrap());
        }
    }

    pub fn validate(&self) -> ValidationReport {
        self.engine.validate(&self.store, self.tournament_id).unwrap()
    }

    /// Losses per participant from completed matches.
    pub fn losses(&self) -> HashMap<ParticipantId, u32> {
        let mut losses: HashMap<ParticipantId, u32> =
            self.participants.iter().map(|p| (p.id, 0)).collect();
        for m in self.matches() {
            if let Some(l) = m.loser_id() {
                *losses.entry(l).or_default() += 1;
            }
        }
        losses
    }
}

/// Slots, winner and status: the parts of a match a result or undo may change.
pub fn state_of(matches: &[Match]) -> Vec<(u32, Option<ParticipantId>, Option<ParticipantId>, Option<ParticipantId>, MatchStatus)> {
    matches
        .iter()
        .map(|m| (m.match_number, m.slot_a, m.slot_b, m.winner_id, m.status))
        .collect()
}
