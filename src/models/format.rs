//! Bracket format, round sections and slot identifiers.

use serde::{Deserialize, Serialize};

/// Elimination format of a tournament.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    SingleElimination,
    DoubleElimination,
    /// Double elimination with two independent loser branches converging through two
    /// semifinals. Only defined for 16 participants.
    #[serde(rename = "branched_de16")]
    BranchedDe16,
}

impl Format {
    /// Whether `capacity` participants can be bracketed in this format.
    pub fn supports(self, capacity: u32) -> bool {
        match self {
            Format::SingleElimination | Format::DoubleElimination => {
                matches!(capacity, 4 | 8 | 16 | 32 | 64)
            }
            Format::BranchedDe16 => capacity == 16,
        }
    }

    /// Closed-form match count of a freshly generated bracket (grand-final reset excluded).
    pub fn match_count(self, capacity: u32) -> Option<u32> {
        if !self.supports(capacity) {
            return None;
        }
        Some(match self {
            Format::SingleElimination => capacity - 1,
            Format::DoubleElimination => 2 * capacity - 2,
            // WB without its final round, branch A, branch B, two semifinals and a final.
            Format::BranchedDe16 => (capacity - 2) + (capacity / 2 - 1) + (capacity / 4 - 1) + 3,
        })
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Format::SingleElimination => "single_elimination",
            Format::DoubleElimination => "double_elimination",
            Format::BranchedDe16 => "branched_de16",
        };
        f.write_str(s)
    }
}

/// Part of the bracket a round belongs to. Encoded in the round number's hundreds digit.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Winner,
    /// Branch A of the branched format; the whole loser bracket in standard double elimination.
    LoserA,
    LoserB,
    Final,
}

impl Section {
    pub const fn offset(self) -> u32 {
        match self {
            Section::Winner => 0,
            Section::LoserA => 100,
            Section::LoserB => 200,
            Section::Final => 300,
        }
    }

    /// Section of a section-encoded round number.
    pub fn of_round(round: u32) -> Section {
        match round / 100 {
            0 => Section::Winner,
            1 => Section::LoserA,
            2 => Section::LoserB,
            _ => Section::Final,
        }
    }

    /// Round number of the `n`th (1-based) round within this section.
    pub const fn round(self, n: u32) -> u32 {
        self.offset() + n
    }
}

/// One of the two participant positions of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Slot fed by the `index`th (1-based) source when two sources pair into one match:
    /// odd indices land in A, even in B.
    pub fn by_parity(index: u32) -> Slot {
        if index % 2 == 1 {
            Slot::A
        } else {
            Slot::B
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}
