//! Participant data structure and CSV import.

use crate::models::tournament::BracketError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use uuid::Uuid;

/// Unique identifier for a participant (used in match slots and results).
pub type ParticipantId = Uuid;

/// A seeded entrant. Owned by registration; the engine only reads it when generating.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// 1 is the strongest seed.
    pub seed: u32,
}

impl Participant {
    pub fn new(name: impl Into<String>, seed: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            seed,
        }
    }
}

#[derive(Deserialize)]
struct CsvRow {
    seed: u32,
    name: String,
}

/// Read participants from CSV with a `seed,name` header. Ids are freshly generated.
pub fn load_participants_csv<R: Read>(reader: R) -> Result<Vec<Participant>, BracketError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut participants = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        let row = row.map_err(|e| BracketError::Csv(e.to_string()))?;
        participants.push(Participant::new(row.name, row.seed));
    }
    participants.sort_by_key(|p| p.seed);
    Ok(participants)
}
