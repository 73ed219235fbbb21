//! Tournament record and BracketError.

use crate::models::format::Format;
use crate::models::game::{MatchId, SlotConflict, SlotWrite};
use crate::models::participant::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur during bracket operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BracketError {
    /// Format cannot be generated for this participant count. Nothing was created.
    StructureError { format: Format, capacity: u32 },
    /// Participant count differs from tournament capacity. Nothing was created.
    SeedMismatch { expected: u32, actual: usize },
    /// Seed outside `1..=capacity` or used twice.
    InvalidSeed(u32),
    /// Same participant id listed twice.
    DuplicateParticipant(ParticipantId),
    /// One or more advancement writes found their slot taken. The match result itself stands;
    /// `writes` lists what was placed successfully.
    SlotConflict {
        conflicts: Vec<SlotConflict>,
        writes: Vec<SlotWrite>,
    },
    /// Result recorded before both slots were filled.
    NotReady(MatchId),
    /// Match already has a different winner.
    AlreadyCompleted {
        match_id: MatchId,
        recorded: ParticipantId,
        submitted: ParticipantId,
    },
    /// Submitted winner does not play in this match.
    NotAParticipant {
        match_id: MatchId,
        participant: ParticipantId,
    },
    /// Undo requested on a match without a result.
    NotCompleted(MatchId),
    /// Undo would retract a participant from a match that is already decided. Needs manual
    /// reconciliation.
    UndoBlocked {
        match_id: MatchId,
        blocking_match: u32,
    },
    TournamentNotFound(TournamentId),
    MatchNotFound(MatchId),
    /// Tournament is not in a state that allows this action.
    InvalidState,
    Csv(String),
    /// Backing store failed (e.g. poisoned lock).
    Storage(String),
}

impl std::fmt::Display for BracketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketError::StructureError { format, capacity } => {
                write!(f, "Format {} does not support {} participants", format, capacity)
            }
            BracketError::SeedMismatch { expected, actual } => {
                write!(f, "Expected {} participants, got {}", expected, actual)
            }
            BracketError::InvalidSeed(seed) => write!(f, "Invalid or duplicate seed {}", seed),
            BracketError::DuplicateParticipant(id) => {
                write!(f, "Participant {} is listed more than once", id)
            }
            BracketError::SlotConflict { conflicts, .. } => {
                write!(f, "Slot conflict in {} advancement(s):", conflicts.len())?;
                for c in conflicts {
                    write!(
                        f,
                        " match {} slot {:?} holds {}, refused {};",
                        c.match_number, c.slot, c.occupant, c.incoming
                    )?;
                }
                Ok(())
            }
            BracketError::NotReady(_) => write!(f, "Match is not ready (both slots must be filled)"),
            BracketError::AlreadyCompleted { .. } => {
                write!(f, "Match already completed with a different winner")
            }
            BracketError::NotAParticipant { .. } => {
                write!(f, "Winner is not a participant of this match")
            }
            BracketError::NotCompleted(_) => write!(f, "Match has no result to undo"),
            BracketError::UndoBlocked { blocking_match, .. } => write!(
                f,
                "Cannot undo: match {} has already been completed; manual reconciliation required",
                blocking_match
            ),
            BracketError::TournamentNotFound(_) => write!(f, "Tournament not found"),
            BracketError::MatchNotFound(_) => write!(f, "Match not found"),
            BracketError::InvalidState => write!(f, "Invalid state for this action"),
            BracketError::Csv(e) => write!(f, "Invalid participant CSV: {}", e),
            BracketError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for BracketError {}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Registered, no bracket yet.
    #[default]
    Draft,
    /// Bracket generated, results being recorded.
    Active,
    /// A champion has been decided.
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: Format,
    /// Participant count.
    pub capacity: u32,
    pub status: TournamentStatus,
    pub champion: Option<ParticipantId>,
    pub runner_up: Option<ParticipantId>,
    /// Identity reserved for the grand-final reset so it survives undo/redo.
    pub reset_match_id: Option<MatchId>,
    pub created_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a new tournament in Draft with no bracket.
    pub fn new(name: impl Into<String>, format: Format, capacity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            format,
            capacity,
            status: TournamentStatus::Draft,
            champion: None,
            runner_up: None,
            reset_match_id: None,
            created_at: Utc::now(),
            generated_at: None,
            completed_at: None,
        }
    }

    /// Mark the bracket as decided.
    pub fn complete(&mut self, champion: ParticipantId, runner_up: Option<ParticipantId>) {
        self.champion = Some(champion);
        self.runner_up = runner_up;
        self.status = TournamentStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Undo of the deciding match: back to Active.
    pub fn reopen(&mut self) {
        self.champion = None;
        self.runner_up = None;
        self.status = TournamentStatus::Active;
        self.completed_at = None;
    }
}
