//! Read-only invariant checks for generated and in-progress brackets.

use crate::logic::advancement::feeders;
use crate::models::{
    BracketStructure, Match, MatchStatus, ParticipantId, Role, Slot, Target, Terminal, Tournament,
    TournamentStatus,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One broken invariant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MatchCount { expected: u32, actual: u32 },
    DuplicateMatchNumber { match_number: u32 },
    /// Target points at an earlier round or a lower match number.
    BackwardReference { match_number: u32, target: u32 },
    /// Number of matches whose winner is declared champion unconditionally.
    ChampionRules { count: u32 },
    /// Slot fed by zero or several sources.
    SlotFeed { match_number: u32, slot: Slot, sources: u32 },
    /// Match row with no counterpart in the structure.
    UnknownMatch { match_number: u32 },
    DuplicateInRound { round: u32, participant: ParticipantId },
    SameParticipantBothSlots { match_number: u32, participant: ParticipantId },
    /// Slot holds someone other than the participant its source delivered.
    SlotProvenance {
        match_number: u32,
        slot: Slot,
        occupant: ParticipantId,
        expected: Option<ParticipantId>,
    },
    /// Source decided but the participant never arrived.
    MissingAdvancement { match_number: u32, slot: Slot, expected: ParticipantId },
    WinnerNotInMatch { match_number: u32 },
    StatusMismatch { match_number: u32 },
    /// Decided matches that produced a champion, against the tournament status.
    ChampionCount { count: u32, tournament_completed: bool },
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Static checks of a topology: closed-form size, numbering, forward-only targets, a single
/// champion and exactly one source per fed slot.
pub fn validate_structure(structure: &BracketStructure) -> ValidationReport {
    let mut violations = Vec::new();

    if let Some(expected) = structure.format.match_count(structure.capacity) {
        if structure.match_count() != expected {
            violations.push(Violation::MatchCount {
                expected,
                actual: structure.match_count(),
            });
        }
    }

    let mut seen = HashSet::new();
    for spec in structure.all_specs() {
        if !seen.insert(spec.match_number) {
            violations.push(Violation::DuplicateMatchNumber {
                match_number: spec.match_number,
            });
        }
    }

    let mut champions = 0;
    for spec in &structure.matches {
        for role in [Role::Winner, Role::Loser] {
            match spec.rule.target(role) {
                Target::Match { match_number, .. } => {
                    let target_round = structure.spec(match_number).map(|t| t.round);
                    if match_number <= spec.match_number
                        || target_round.map_or(true, |r| r < spec.round)
                    {
                        violations.push(Violation::BackwardReference {
                            match_number: spec.match_number,
                            target: match_number,
                        });
                    }
                }
                Target::Terminal { outcome } => {
                    if role == Role::Winner && outcome == Terminal::Champion {
                        champions += 1;
                    }
                }
            }
        }
    }
    if champions != 1 {
        violations.push(Violation::ChampionRules { count: champions });
    }

    let fed = feeders(structure);
    let opening = structure.opening_round().map(|r| r.matches.clone()).unwrap_or_default();
    for spec in &structure.matches {
        for slot in [Slot::A, Slot::B] {
            let sources = fed.get(&(spec.match_number, slot)).map_or(0, |v| v.len()) as u32;
            let expected = if opening.contains(&spec.match_number) { 0 } else { 1 };
            if sources != expected {
                violations.push(Violation::SlotFeed {
                    match_number: spec.match_number,
                    slot,
                    sources,
                });
            }
        }
    }

    ValidationReport { violations }
}

/// Expected occupant of a fed slot given the current state of its source, or `None` while the
/// source is undecided.
fn delivered(source: &Match, role: Role) -> Option<ParticipantId> {
    if !source.is_completed() {
        return None;
    }
    match role {
        Role::Winner => source.winner_id,
        Role::Loser => source.loser_id(),
    }
}

/// Full check of persisted state against its structure. Never mutates.
pub fn validate_bracket(
    structure: &BracketStructure,
    tournament: &Tournament,
    matches: &[Match],
) -> ValidationReport {
    let mut report = validate_structure(structure);
    let violations = &mut report.violations;

    let by_number: HashMap<u32, &Match> = matches.iter().map(|m| (m.match_number, m)).collect();
    if by_number.len() != matches.len() {
        let mut seen = HashSet::new();
        for m in matches {
            if !seen.insert(m.match_number) {
                violations.push(Violation::DuplicateMatchNumber {
                    match_number: m.match_number,
                });
            }
        }
    }

    let reset = structure
        .reset
        .as_ref()
        .and_then(|r| by_number.get(&r.match_number).copied());
    let expected = structure.match_count() + u32::from(reset.is_some());
    if matches.len() as u32 != expected {
        violations.push(Violation::MatchCount {
            expected,
            actual: matches.len() as u32,
        });
    }

    let mut per_round: HashMap<u32, HashSet<ParticipantId>> = HashMap::new();
    for m in matches {
        if structure.spec(m.match_number).is_none() {
            violations.push(Violation::UnknownMatch {
                match_number: m.match_number,
            });
        }
        if let (Some(a), Some(b)) = (m.slot_a, m.slot_b) {
            if a == b {
                violations.push(Violation::SameParticipantBothSlots {
                    match_number: m.match_number,
                    participant: a,
                });
            }
        }
        let round = per_round.entry(m.round_number).or_default();
        for p in [m.slot_a, m.slot_b].into_iter().flatten() {
            if !round.insert(p) && m.slot_a != m.slot_b {
                violations.push(Violation::DuplicateInRound {
                    round: m.round_number,
                    participant: p,
                });
            }
        }
        if let Some(w) = m.winner_id {
            if m.slot_of(w).is_none() {
                violations.push(Violation::WinnerNotInMatch {
                    match_number: m.match_number,
                });
            }
        }
        let full = m.slot_a.is_some() && m.slot_b.is_some();
        let status_ok = match m.status {
            MatchStatus::Pending => !full && m.winner_id.is_none(),
            MatchStatus::Ready => full && m.winner_id.is_none(),
            MatchStatus::Completed => full && m.winner_id.is_some(),
        };
        if !status_ok {
            violations.push(Violation::StatusMismatch {
                match_number: m.match_number,
            });
        }
    }

    // Write-once compliance: every occupied slot holds exactly what its source delivered.
    let fed = feeders(structure);
    let grand_final = structure.grand_final().and_then(|g| by_number.get(&g.match_number).copied());
    for m in matches {
        for slot in [Slot::A, Slot::B] {
            let expected = if reset.is_some_and(|r| r.match_number == m.match_number) {
                grand_final
                    .filter(|g| g.is_completed() && g.winner_id == g.slot_b)
                    .and_then(|g| g.slot(slot))
            } else {
                match fed.get(&(m.match_number, slot)).map(|v| v.as_slice()) {
                    Some([(source, role)]) => by_number
                        .get(source)
                        .and_then(|s| delivered(s, *role)),
                    // Opening-round slot, or a feed problem already reported.
                    _ => continue,
                }
            };
            match (m.slot(slot), expected) {
                (Some(occupant), expected) if Some(occupant) != expected => {
                    violations.push(Violation::SlotProvenance {
                        match_number: m.match_number,
                        slot,
                        occupant,
                        expected,
                    });
                }
                (None, Some(expected)) => violations.push(Violation::MissingAdvancement {
                    match_number: m.match_number,
                    slot,
                    expected,
                }),
                _ => {}
            }
        }
    }

    // Single champion: decided matches whose winner target is CHAMPION, excluding a grand
    // final that forced the reset.
    let decided = matches
        .iter()
        .filter(|m| m.is_completed())
        .filter(|m| {
            structure.spec(m.match_number).is_some_and(|s| {
                s.rule.winner == Target::terminal(Terminal::Champion)
                    && !(s.grand_final && m.winner_id == m.slot_b)
            })
        })
        .count() as u32;
    let completed = tournament.status == TournamentStatus::Completed;
    if decided > 1 || (decided == 1) != completed {
        violations.push(Violation::ChampionCount {
            count: decided,
            tournament_completed: completed,
        });
    }

    report
}
