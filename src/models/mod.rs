//! Data structures for the bracket engine: topology, matches, participants, tournament state.

mod bracket;
mod format;
mod game;
mod participant;
mod tournament;

pub use bracket::{AdvancementRule, BracketStructure, MatchSpec, Role, RoundSpec, Target, Terminal};
pub use format::{Format, Section, Slot};
pub use game::{Match, MatchId, MatchStatus, Score, SlotConflict, SlotFill, SlotWrite};
pub use participant::{load_participants_csv, Participant, ParticipantId};
pub use tournament::{BracketError, Tournament, TournamentId, TournamentStatus};
