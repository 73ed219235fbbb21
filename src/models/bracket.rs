//! Immutable bracket topology: rounds, match slots and the advancement table.

use crate::models::format::{Format, Section, Slot};
use serde::{Deserialize, Serialize};

/// Final placement produced when a participant leaves the bracket.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Terminal {
    Champion,
    RunnerUp,
    Eliminated,
}

/// Where the winner or loser of a match goes next.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Match { match_number: u32, slot: Slot },
    Terminal { outcome: Terminal },
}

impl Target {
    pub const ELIMINATED: Target = Target::Terminal {
        outcome: Terminal::Eliminated,
    };

    pub fn to_match(match_number: u32, slot: Slot) -> Self {
        Target::Match { match_number, slot }
    }

    pub fn terminal(outcome: Terminal) -> Self {
        Target::Terminal { outcome }
    }

    /// Destination match number, if the target is not terminal.
    pub fn match_number(&self) -> Option<u32> {
        match self {
            Target::Match { match_number, .. } => Some(*match_number),
            Target::Terminal { .. } => None,
        }
    }
}

/// Which result of a match a target belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Winner,
    Loser,
}

/// Winner and loser destinations of one match.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdvancementRule {
    pub winner: Target,
    pub loser: Target,
}

impl AdvancementRule {
    pub fn target(&self, role: Role) -> Target {
        match role {
            Role::Winner => self.winner,
            Role::Loser => self.loser,
        }
    }
}

/// One match of the topology.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchSpec {
    pub match_number: u32,
    pub round: u32,
    pub rule: AdvancementRule,
    /// Grand final of standard double elimination: a slot B win forces the reset match.
    pub grand_final: bool,
}

impl MatchSpec {
    pub fn section(&self) -> Section {
        Section::of_round(self.round)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundSpec {
    pub number: u32,
    pub section: Section,
    /// Match numbers in position order.
    pub matches: Vec<u32>,
}

/// Complete bracket for a `(format, capacity)` pair.
///
/// Match numbers are contiguous from 1 and ascend with the round number, so every
/// advancement target has a larger match number than its source.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BracketStructure {
    pub format: Format,
    pub capacity: u32,
    pub rounds: Vec<RoundSpec>,
    /// Indexed by `match_number - 1`.
    pub matches: Vec<MatchSpec>,
    /// Conditional grand-final reset; only materialized when the loser-bracket champion wins
    /// the grand final.
    pub reset: Option<MatchSpec>,
}

impl BracketStructure {
    /// Spec for a match number, including the reset placeholder.
    pub fn spec(&self, match_number: u32) -> Option<&MatchSpec> {
        match match_number.checked_sub(1) {
            Some(i) if (i as usize) < self.matches.len() => self.matches.get(i as usize),
            _ => self
                .reset
                .as_ref()
                .filter(|r| r.match_number == match_number),
        }
    }

    pub fn round(&self, number: u32) -> Option<&RoundSpec> {
        self.rounds.iter().find(|r| r.number == number)
    }

    /// First winner-bracket round, the one seeded from the participant list.
    pub fn opening_round(&self) -> Option<&RoundSpec> {
        self.round(Section::Winner.round(1))
    }

    /// Matches unconditionally created at generation time.
    pub fn match_count(&self) -> u32 {
        self.matches.len() as u32
    }

    pub fn grand_final(&self) -> Option<&MatchSpec> {
        self.matches.iter().find(|m| m.grand_final)
    }

    /// All specs including the reset placeholder.
    pub fn all_specs(&self) -> impl Iterator<Item = &MatchSpec> {
        self.matches.iter().chain(self.reset.iter())
    }
}
