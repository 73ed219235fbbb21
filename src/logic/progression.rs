//! Match progression: recording results, advancing participants, and undoing results.
//!
//! Every operation locks the source match together with its destination matches, so a slot is
//! checked and written in one step and an undo cannot interleave with the advancement it
//! reverts. Destinations always have larger match numbers than their source, which keeps the
//! ascending lock order of [`BracketStore::with_matches`] deadlock-free.

use crate::models::{
    BracketError, BracketStructure, Match, MatchId, MatchSpec, MatchStatus, ParticipantId, Role,
    Score, Slot, SlotConflict, SlotFill, SlotWrite, Target, Terminal, TournamentId,
};
use crate::store::BracketStore;
use serde::Serialize;
use uuid::Uuid;

/// A participant leaving the bracket with a final placement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Placement {
    pub participant: ParticipantId,
    pub outcome: Terminal,
}

/// Everything a recorded result changed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RecordOutcome {
    pub match_id: MatchId,
    pub match_number: u32,
    pub winner: ParticipantId,
    pub loser: ParticipantId,
    pub writes: Vec<SlotWrite>,
    pub placements: Vec<Placement>,
    /// Grand-final reset created by this result.
    pub reset_match: Option<MatchId>,
    pub tournament_completed: bool,
    /// Same result was already recorded; nothing was written.
    pub replayed: bool,
}

/// Everything an undo reverted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UndoOutcome {
    pub match_id: MatchId,
    pub match_number: u32,
    pub retracted: Vec<SlotWrite>,
    pub reset_removed: Option<MatchId>,
    pub tournament_reopened: bool,
}

fn locked_index(locked: &[&mut Match], match_number: u32) -> Option<usize> {
    locked.iter().position(|m| m.match_number == match_number)
}

/// Matches to lock for an operation on `spec`: itself, its destinations, and the reset when
/// it is the grand final.
fn lock_set(structure: &BracketStructure, spec: &MatchSpec) -> Vec<u32> {
    let mut numbers = vec![spec.match_number];
    numbers.extend(spec.rule.winner.match_number());
    numbers.extend(spec.rule.loser.match_number());
    if spec.grand_final {
        numbers.extend(structure.reset.as_ref().map(|r| r.match_number));
    }
    numbers
}

/// Whether a completed grand final was won from slot B, which forces the reset.
fn forces_reset(spec: &MatchSpec, m: &Match) -> bool {
    spec.grand_final && m.winner_id.is_some() && m.winner_id == m.slot_b
}

/// Record `winner` for a match and advance both participants to their designated slots.
///
/// A duplicate submission with the same winner succeeds with `replayed` set and writes nothing.
/// If a destination slot already holds someone else, that single write is skipped, the result
/// itself stands, and `SlotConflict` reports the conflicts along with the writes that succeeded.
pub fn record_match_result(
    store: &dyn BracketStore,
    structure: &BracketStructure,
    tournament_id: TournamentId,
    match_id: MatchId,
    winner: ParticipantId,
    score: Option<Score>,
) -> Result<RecordOutcome, BracketError> {
    let (_, number) = store.locate(match_id)?;
    let spec = structure
        .spec(number)
        .ok_or(BracketError::MatchNotFound(match_id))?;
    let reset_id = store.tournament(tournament_id)?.reset_match_id;

    let mut outcome: Option<RecordOutcome> = None;
    let mut conflicts: Vec<SlotConflict> = Vec::new();

    store.with_matches(tournament_id, &lock_set(structure, spec), &mut |locked| {
        let si = locked_index(locked, number).ok_or(BracketError::MatchNotFound(match_id))?;

        let source = &*locked[si];
        match (source.status, source.winner_id) {
            (MatchStatus::Completed, Some(recorded)) => {
                if recorded != winner {
                    log::warn!(
                        "Match {} already won by {}, rejected result for {}",
                        number,
                        recorded,
                        winner
                    );
                    return Err(BracketError::AlreadyCompleted {
                        match_id,
                        recorded,
                        submitted: winner,
                    });
                }
                outcome = Some(RecordOutcome {
                    match_id,
                    match_number: number,
                    winner,
                    loser: source.loser_id().unwrap_or(winner),
                    writes: Vec::new(),
                    placements: Vec::new(),
                    reset_match: None,
                    tournament_completed: false,
                    replayed: true,
                });
                return Ok(());
            }
            (MatchStatus::Ready, _) => {}
            _ => return Err(BracketError::NotReady(match_id)),
        }
        let loser = source
            .opponent_of(winner)
            .ok_or(BracketError::NotAParticipant {
                match_id,
                participant: winner,
            })?;

        // Destinations must exist before anything changes.
        for role in [Role::Winner, Role::Loser] {
            if let Some(n) = spec.rule.target(role).match_number() {
                if locked_index(locked, n).is_none() {
                    return Err(BracketError::Storage(format!("match {} is missing", n)));
                }
            }
        }
        let reset_spec = structure.reset.as_ref();
        let reset = spec.grand_final && source.slot_b == Some(winner);
        if reset {
            if let Some(r) = reset_spec {
                if locked_index(locked, r.match_number).is_some() {
                    return Err(BracketError::InvalidState);
                }
            }
        }

        locked[si].complete(winner, score);
        let (slot_a, slot_b) = (locked[si].slot_a, locked[si].slot_b);

        let mut writes = Vec::new();
        let mut placements = Vec::new();
        let mut reset_match = None;

        if reset {
            let r = reset_spec.ok_or(BracketError::InvalidState)?;
            let mut m = Match::with_id(reset_id.unwrap_or_else(Uuid::new_v4), tournament_id, r);
            for (slot, p) in [(Slot::A, slot_a), (Slot::B, slot_b)] {
                if let Some(p) = p {
                    m.fill_slot(slot, p);
                    writes.push(SlotWrite {
                        match_id: m.id,
                        match_number: m.match_number,
                        slot,
                        participant: p,
                    });
                }
            }
            reset_match = Some(m.id);
            log::info!(
                "Grand final {} won by loser-bracket champion {}, reset match {} created",
                number,
                winner,
                m.match_number
            );
            store.insert_matches(tournament_id, vec![m])?;
        } else {
            for (role, participant) in [(Role::Winner, winner), (Role::Loser, loser)] {
                match spec.rule.target(role) {
                    Target::Match { match_number, slot } => {
                        let ti = locked_index(locked, match_number)
                            .ok_or(BracketError::InvalidState)?;
                        let target = &mut *locked[ti];
                        match target.fill_slot(slot, participant) {
                            SlotFill::Filled => {
                                log::debug!(
                                    "Match {} {:?}: {} -> match {} slot {:?}",
                                    number,
                                    role,
                                    participant,
                                    match_number,
                                    slot
                                );
                                writes.push(SlotWrite {
                                    match_id: target.id,
                                    match_number,
                                    slot,
                                    participant,
                                });
                            }
                            SlotFill::AlreadyPresent => {}
                            SlotFill::Occupied(occupant) => {
                                log::error!(
                                    "Slot conflict: match {} slot {:?} holds {}, cannot place {} from match {}",
                                    match_number,
                                    slot,
                                    occupant,
                                    participant,
                                    number
                                );
                                conflicts.push(SlotConflict {
                                    match_id: target.id,
                                    match_number,
                                    slot,
                                    occupant,
                                    incoming: participant,
                                });
                            }
                        }
                    }
                    Target::Terminal { outcome } => placements.push(Placement {
                        participant,
                        outcome,
                    }),
                }
            }
        }

        let champion = placements
            .iter()
            .find(|p| p.outcome == Terminal::Champion)
            .map(|p| p.participant);
        let runner_up = placements
            .iter()
            .find(|p| p.outcome == Terminal::RunnerUp)
            .map(|p| p.participant);
        if let Some(champion) = champion {
            store.update_tournament(tournament_id, &mut |t| {
                t.complete(champion, runner_up);
                Ok(())
            })?;
            log::info!("Tournament {} completed, champion {}", tournament_id, champion);
        }

        outcome = Some(RecordOutcome {
            match_id,
            match_number: number,
            winner,
            loser,
            writes,
            placements,
            reset_match,
            tournament_completed: champion.is_some(),
            replayed: false,
        });
        Ok(())
    })?;

    let outcome = outcome.ok_or(BracketError::InvalidState)?;
    if !conflicts.is_empty() {
        return Err(BracketError::SlotConflict {
            conflicts,
            writes: outcome.writes,
        });
    }
    Ok(outcome)
}

/// Revert a completed match to `ready` and retract what it advanced.
///
/// Fails with `UndoBlocked`, changing nothing, if a destination match has already been decided.
///
/// Recording the same winner again restores slots, winners, statuses and the tournament
/// outcome exactly. `completed_at` timestamps are stamped anew by the redo.
pub fn undo_match_result(
    store: &dyn BracketStore,
    structure: &BracketStructure,
    tournament_id: TournamentId,
    match_id: MatchId,
) -> Result<UndoOutcome, BracketError> {
    let (_, number) = store.locate(match_id)?;
    let spec = structure
        .spec(number)
        .ok_or(BracketError::MatchNotFound(match_id))?;

    let mut outcome: Option<UndoOutcome> = None;

    store.with_matches(tournament_id, &lock_set(structure, spec), &mut |locked| {
        let si = locked_index(locked, number).ok_or(BracketError::MatchNotFound(match_id))?;
        let source = &*locked[si];
        let (winner, loser) = match (source.is_completed(), source.winner_id, source.loser_id()) {
            (true, Some(w), Some(l)) => (w, l),
            _ => return Err(BracketError::NotCompleted(match_id)),
        };

        let blocked = |blocking_match: u32| {
            log::error!(
                "Undo of match {} blocked: match {} already completed",
                number,
                blocking_match
            );
            BracketError::UndoBlocked {
                match_id,
                blocking_match,
            }
        };

        // Check everything first; nothing changes if any destination is decided.
        let mut retract: Vec<(usize, Slot, ParticipantId)> = Vec::new();
        let mut remove_reset: Option<(u32, MatchId)> = None;
        let mut reopen = false;
        if forces_reset(spec, source) {
            let r = structure.reset.as_ref().ok_or(BracketError::InvalidState)?;
            if let Some(ri) = locked_index(locked, r.match_number) {
                if locked[ri].is_completed() {
                    return Err(blocked(r.match_number));
                }
                remove_reset = Some((r.match_number, locked[ri].id));
            }
        } else {
            for (role, participant) in [(Role::Winner, winner), (Role::Loser, loser)] {
                match spec.rule.target(role) {
                    Target::Match { match_number, slot } => {
                        let Some(ti) = locked_index(locked, match_number) else {
                            continue;
                        };
                        if locked[ti].is_completed() {
                            return Err(blocked(match_number));
                        }
                        // A slot that never received this participant (earlier conflict) is
                        // left alone.
                        if locked[ti].slot(slot) == Some(participant) {
                            retract.push((ti, slot, participant));
                        }
                    }
                    Target::Terminal { outcome } => {
                        reopen |= outcome == Terminal::Champion;
                    }
                }
            }
        }

        let mut retracted = Vec::new();
        for (ti, slot, participant) in retract {
            let target = &mut *locked[ti];
            if target.clear_slot(slot, participant) {
                log::debug!(
                    "Undo match {}: retracted {} from match {} slot {:?}",
                    number,
                    participant,
                    target.match_number,
                    slot
                );
                retracted.push(SlotWrite {
                    match_id: target.id,
                    match_number: target.match_number,
                    slot,
                    participant,
                });
            }
        }
        if let Some((reset_number, reset_id)) = remove_reset {
            for (slot, p) in [(Slot::A, locked[si].slot_a), (Slot::B, locked[si].slot_b)] {
                if let Some(participant) = p {
                    retracted.push(SlotWrite {
                        match_id: reset_id,
                        match_number: reset_number,
                        slot,
                        participant,
                    });
                }
            }
            store.remove_match(tournament_id, reset_number)?;
            log::info!("Undo match {}: removed reset match {}", number, reset_number);
        }
        if reopen {
            store.update_tournament(tournament_id, &mut |t| {
                t.reopen();
                Ok(())
            })?;
        }
        locked[si].reopen();

        outcome = Some(UndoOutcome {
            match_id,
            match_number: number,
            retracted,
            reset_removed: remove_reset.map(|(_, id)| id),
            tournament_reopened: reopen,
        });
        Ok(())
    })?;

    outcome.ok_or(BracketError::InvalidState)
}
