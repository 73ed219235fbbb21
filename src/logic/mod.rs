//! Bracket business logic: structure generation, advancement, seeding, progression, validation.

mod advancement;
mod progression;
mod seeding;
mod status;
mod structure;
mod validator;

pub use advancement::{feeders, resolve};
pub use progression::{
    record_match_result, undo_match_result, Placement, RecordOutcome, UndoOutcome,
};
pub use seeding::{assign_seeds, seed_pairings};
pub use status::{bracket_status, BracketStatus, ReadyMatch, RoundCounts};
pub use structure::generate_structure;
pub use validator::{validate_bracket, validate_structure, ValidationReport, Violation};
