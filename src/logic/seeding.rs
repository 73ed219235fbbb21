//! Seed assignment: places the participant list into the opening round.

use crate::models::{
    BracketError, BracketStructure, Format, Match, Participant, ParticipantId, Slot, SlotFill,
    SlotWrite,
};
use std::collections::HashSet;

/// Seed pair `(slot A, slot B)` for each opening-round position.
///
/// Branched brackets pair adjacent seeds (1v2, 3v4, ...). Other formats use the standard
/// power-of-two order, where every pair sums to `capacity + 1` and the top two seeds sit in
/// opposite halves.
pub fn seed_pairings(format: Format, capacity: u32) -> Vec<(u32, u32)> {
    match format {
        Format::BranchedDe16 => (1..=capacity / 2).map(|i| (2 * i - 1, 2 * i)).collect(),
        Format::SingleElimination | Format::DoubleElimination => {
            let mut order = vec![1u32];
            while (order.len() as u32) < capacity {
                let sum = 2 * order.len() as u32 + 1;
                order = order.iter().flat_map(|&s| [s, sum - s]).collect();
            }
            order.chunks_exact(2).map(|p| (p[0], p[1])).collect()
        }
    }
}

/// Check the list and order it by seed.
fn ordered_by_seed<'a>(
    capacity: u32,
    participants: &'a [Participant],
) -> Result<Vec<&'a Participant>, BracketError> {
    if participants.len() != capacity as usize {
        return Err(BracketError::SeedMismatch {
            expected: capacity,
            actual: participants.len(),
        });
    }
    let mut ids: HashSet<ParticipantId> = HashSet::new();
    let mut by_seed: Vec<Option<&Participant>> = vec![None; capacity as usize];
    for p in participants {
        if !ids.insert(p.id) {
            return Err(BracketError::DuplicateParticipant(p.id));
        }
        let cell = p
            .seed
            .checked_sub(1)
            .and_then(|i| by_seed.get_mut(i as usize))
            .ok_or(BracketError::InvalidSeed(p.seed))?;
        if cell.replace(p).is_some() {
            return Err(BracketError::InvalidSeed(p.seed));
        }
    }
    // Count and uniqueness checks above guarantee every seed is present.
    Ok(by_seed.into_iter().flatten().collect())
}

/// Fill the opening-round slots of freshly created `matches`.
///
/// Deterministic: the same seed list always produces the same placement.
pub fn assign_seeds(
    structure: &BracketStructure,
    participants: &[Participant],
    matches: &mut [Match],
) -> Result<Vec<SlotWrite>, BracketError> {
    let seeded = ordered_by_seed(structure.capacity, participants)?;
    let invalid = || BracketError::StructureError {
        format: structure.format,
        capacity: structure.capacity,
    };
    let opening = structure.opening_round().ok_or_else(invalid)?;

    let mut writes = Vec::with_capacity(seeded.len());
    for (&number, (seed_a, seed_b)) in opening
        .matches
        .iter()
        .zip(seed_pairings(structure.format, structure.capacity))
    {
        let m = matches
            .iter_mut()
            .find(|m| m.match_number == number)
            .ok_or_else(invalid)?;
        for (slot, seed) in [(Slot::A, seed_a), (Slot::B, seed_b)] {
            let participant = seeded[seed as usize - 1].id;
            if let SlotFill::Occupied(_) = m.fill_slot(slot, participant) {
                return Err(BracketError::InvalidState);
            }
            writes.push(SlotWrite {
                match_id: m.id,
                match_number: number,
                slot,
                participant,
            });
        }
    }
    Ok(writes)
}
