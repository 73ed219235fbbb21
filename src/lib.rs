//! Elimination bracket engine: topology generation, seeding, and match advancement for
//! single, double and branched double elimination.

pub mod config;
pub mod engine;
pub mod logic;
pub mod models;
pub mod store;

pub use engine::{BracketEngine, GeneratedBracket};
pub use logic::{
    generate_structure, BracketStatus, Placement, RecordOutcome, UndoOutcome, ValidationReport,
    Violation,
};
pub use models::{
    load_participants_csv, AdvancementRule, BracketError, BracketStructure, Format, Match, MatchId,
    MatchStatus, Participant, ParticipantId, Role, Score, Section, Slot, SlotConflict, SlotWrite,
    Target, Terminal, Tournament, TournamentId, TournamentStatus,
};
pub use store::{BracketStore, MemoryStore};
