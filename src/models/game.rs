//! Persisted match row: two write-once slots, winner, status.

use crate::models::bracket::MatchSpec;
use crate::models::format::Slot;
use crate::models::participant::ParticipantId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Fewer than two slots filled.
    #[default]
    Pending,
    /// Both slots filled, no winner yet.
    Ready,
    Completed,
}

/// Optional score reported with a result. Not interpreted by the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub slot_a: u32,
    pub slot_b: u32,
}

/// Result of an attempt to place a participant into a slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotFill {
    Filled,
    /// The participant already sits in this slot.
    AlreadyPresent,
    /// The slot holds someone else; nothing was written.
    Occupied(ParticipantId),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_number: u32,
    /// Unique within the tournament.
    pub match_number: u32,
    pub slot_a: Option<ParticipantId>,
    pub slot_b: Option<ParticipantId>,
    pub winner_id: Option<ParticipantId>,
    pub status: MatchStatus,
    pub score: Option<Score>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(tournament_id: TournamentId, spec: &MatchSpec) -> Self {
        Self::with_id(Uuid::new_v4(), tournament_id, spec)
    }

    pub fn with_id(id: MatchId, tournament_id: TournamentId, spec: &MatchSpec) -> Self {
        Self {
            id,
            tournament_id,
            round_number: spec.round,
            match_number: spec.match_number,
            slot_a: None,
            slot_b: None,
            winner_id: None,
            status: MatchStatus::Pending,
            score: None,
            completed_at: None,
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<ParticipantId> {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<ParticipantId> {
        match slot {
            Slot::A => &mut self.slot_a,
            Slot::B => &mut self.slot_b,
        }
    }

    /// Slot occupied by `participant`, if any.
    pub fn slot_of(&self, participant: ParticipantId) -> Option<Slot> {
        if self.slot_a == Some(participant) {
            Some(Slot::A)
        } else if self.slot_b == Some(participant) {
            Some(Slot::B)
        } else {
            None
        }
    }

    /// Occupant of the other slot.
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        self.slot_of(participant).and_then(|s| self.slot(s.other()))
    }

    /// Write-once placement: an occupied slot is never overwritten.
    pub fn fill_slot(&mut self, slot: Slot, participant: ParticipantId) -> SlotFill {
        match self.slot(slot) {
            Some(existing) if existing == participant => SlotFill::AlreadyPresent,
            Some(existing) => SlotFill::Occupied(existing),
            None => {
                *self.slot_mut(slot) = Some(participant);
                self.refresh_status();
                SlotFill::Filled
            }
        }
    }

    /// Remove `participant` from `slot`. Returns false if they were not there.
    pub fn clear_slot(&mut self, slot: Slot, participant: ParticipantId) -> bool {
        if self.slot(slot) != Some(participant) {
            return false;
        }
        *self.slot_mut(slot) = None;
        self.refresh_status();
        true
    }

    pub fn complete(&mut self, winner: ParticipantId, score: Option<Score>) {
        self.winner_id = Some(winner);
        self.score = score;
        self.completed_at = Some(Utc::now());
        self.status = MatchStatus::Completed;
    }

    /// Back to `ready` (or `pending`) with no winner.
    pub fn reopen(&mut self) {
        self.winner_id = None;
        self.score = None;
        self.completed_at = None;
        self.status = MatchStatus::Pending;
        self.refresh_status();
    }

    pub fn loser_id(&self) -> Option<ParticipantId> {
        self.winner_id.and_then(|w| self.opponent_of(w))
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    fn refresh_status(&mut self) {
        if self.status == MatchStatus::Completed {
            return;
        }
        self.status = if self.slot_a.is_some() && self.slot_b.is_some() {
            MatchStatus::Ready
        } else {
            MatchStatus::Pending
        };
    }
}

/// A participant placed into, or retracted from, a match slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SlotWrite {
    pub match_id: MatchId,
    pub match_number: u32,
    pub slot: Slot,
    pub participant: ParticipantId,
}

/// An advancement that found its designated slot held by someone else.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SlotConflict {
    pub match_id: MatchId,
    pub match_number: u32,
    pub slot: Slot,
    pub occupant: ParticipantId,
    pub incoming: ParticipantId,
}
