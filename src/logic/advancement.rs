//! Advancement rules: where every match sends its winner and loser.
//!
//! Rules are linked while the structure is generated and stored with it. Each target names the
//! exact destination slot, so two sources can never compete for the same position.

use crate::models::{
    AdvancementRule, BracketError, BracketStructure, Format, Role, RoundSpec, Section, Slot,
    Target, Terminal,
};
use std::collections::HashMap;

/// Rounds with assigned match numbers, used to address matches by `(round, position)`.
pub(crate) struct Layout {
    pub format: Format,
    pub capacity: u32,
    pub rounds: Vec<RoundSpec>,
}

impl Layout {
    fn round(&self, number: u32) -> Result<&RoundSpec, BracketError> {
        self.rounds
            .iter()
            .find(|r| r.number == number)
            .ok_or(BracketError::StructureError {
                format: self.format,
                capacity: self.capacity,
            })
    }

    fn size(&self, round: u32) -> Result<u32, BracketError> {
        Ok(self.round(round)?.matches.len() as u32)
    }

    /// Match number at a 1-based position of a round.
    fn at(&self, round: u32, position: u32) -> Result<u32, BracketError> {
        let r = self.round(round)?;
        position
            .checked_sub(1)
            .and_then(|i| r.matches.get(i as usize))
            .copied()
            .ok_or(BracketError::StructureError {
                format: self.format,
                capacity: self.capacity,
            })
    }

    fn total(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }
}

/// Per-match rules indexed by `match_number - 1`. Unlinked targets default to elimination.
pub(crate) struct RuleTable {
    pub rules: Vec<AdvancementRule>,
    pub grand_final: Option<u32>,
}

impl RuleTable {
    fn new(len: usize) -> Self {
        Self {
            rules: vec![
                AdvancementRule {
                    winner: Target::ELIMINATED,
                    loser: Target::ELIMINATED,
                };
                len
            ],
            grand_final: None,
        }
    }

    fn set(&mut self, from: u32, role: Role, target: Target) {
        if let Some(rule) = from.checked_sub(1).and_then(|i| self.rules.get_mut(i as usize)) {
            match role {
                Role::Winner => rule.winner = target,
                Role::Loser => rule.loser = target,
            }
        }
    }

    fn decide(&mut self, from: u32) {
        self.set(from, Role::Winner, Target::terminal(Terminal::Champion));
        self.set(from, Role::Loser, Target::terminal(Terminal::RunnerUp));
    }

    /// Send `role` of every match in `from` into `to`, two sources per destination match
    /// (odd positions to slot A, even to slot B).
    fn pair_into(&mut self, layout: &Layout, from: u32, to: u32, role: Role) -> Result<(), BracketError> {
        for m in 1..=layout.size(from)? {
            let target = Target::to_match(layout.at(to, m.div_ceil(2))?, Slot::by_parity(m));
            self.set(layout.at(from, m)?, role, target);
        }
        Ok(())
    }

    /// One-to-one into `slot` of the same position, optionally in reverse order.
    fn straight_into(
        &mut self,
        layout: &Layout,
        from: u32,
        to: u32,
        role: Role,
        slot: Slot,
        reversed: bool,
    ) -> Result<(), BracketError> {
        let count = layout.size(from)?;
        for m in 1..=count {
            let position = if reversed { count + 1 - m } else { m };
            self.set(layout.at(from, m)?, role, Target::to_match(layout.at(to, position)?, slot));
        }
        Ok(())
    }
}

/// Link every rule for the layout's format.
pub(crate) fn link(layout: &Layout) -> Result<RuleTable, BracketError> {
    let mut table = RuleTable::new(layout.total());
    match layout.format {
        Format::SingleElimination => link_single(layout, &mut table)?,
        Format::DoubleElimination => link_double(layout, &mut table)?,
        Format::BranchedDe16 => link_branched(layout, &mut table)?,
    }
    Ok(table)
}

fn winner_rounds(capacity: u32) -> u32 {
    capacity.trailing_zeros()
}

fn link_single(layout: &Layout, table: &mut RuleTable) -> Result<(), BracketError> {
    let k = winner_rounds(layout.capacity);
    for r in 1..k {
        table.pair_into(layout, Section::Winner.round(r), Section::Winner.round(r + 1), Role::Winner)?;
    }
    table.decide(layout.at(Section::Winner.round(k), 1)?);
    Ok(())
}

/// Loser round `i` receives winner-bracket losers when `i` is 1 or even.
fn link_double(layout: &Layout, table: &mut RuleTable) -> Result<(), BracketError> {
    let k = winner_rounds(layout.capacity);
    let wb = |r: u32| Section::Winner.round(r);
    let lb = |i: u32| Section::LoserA.round(i);
    let last_lb = 2 * (k - 1);
    let grand_final = layout.at(Section::Final.round(1), 1)?;

    for r in 1..k {
        table.pair_into(layout, wb(r), wb(r + 1), Role::Winner)?;
    }
    table.set(layout.at(wb(k), 1)?, Role::Winner, Target::to_match(grand_final, Slot::A));

    table.pair_into(layout, wb(1), lb(1), Role::Loser)?;
    for r in 2..=k {
        // Alternate drop order so early rematches are pushed apart.
        let j = r - 1;
        table.straight_into(layout, wb(r), lb(2 * j), Role::Loser, Slot::B, j % 2 == 1)?;
    }

    for i in 1..last_lb {
        if i % 2 == 1 {
            table.straight_into(layout, lb(i), lb(i + 1), Role::Winner, Slot::A, false)?;
        } else {
            table.pair_into(layout, lb(i), lb(i + 1), Role::Winner)?;
        }
    }
    table.set(layout.at(lb(last_lb), 1)?, Role::Winner, Target::to_match(grand_final, Slot::B));

    table.decide(grand_final);
    table.grand_final = Some(grand_final);
    Ok(())
}

fn link_branched(layout: &Layout, table: &mut RuleTable) -> Result<(), BracketError> {
    let wb = |r: u32| Section::Winner.round(r);
    let a = |r: u32| Section::LoserA.round(r);
    let b = |r: u32| Section::LoserB.round(r);
    let semi = |m: u32| layout.at(Section::Final.round(1), m);
    let final_match = layout.at(Section::Final.round(2), 1)?;

    table.pair_into(layout, wb(1), wb(2), Role::Winner)?;
    table.pair_into(layout, wb(2), wb(3), Role::Winner)?;
    table.pair_into(layout, wb(1), a(1), Role::Loser)?;
    table.pair_into(layout, wb(2), b(1), Role::Loser)?;
    // Winner-round-3 losers stay eliminated.
    table.straight_into(layout, wb(3), Section::Final.round(1), Role::Winner, Slot::A, false)?;

    table.pair_into(layout, a(1), a(2), Role::Winner)?;
    table.pair_into(layout, a(2), a(3), Role::Winner)?;
    table.set(layout.at(a(3), 1)?, Role::Winner, Target::to_match(semi(1)?, Slot::B));

    table.pair_into(layout, b(1), b(2), Role::Winner)?;
    table.set(layout.at(b(2), 1)?, Role::Winner, Target::to_match(semi(2)?, Slot::B));

    table.pair_into(layout, Section::Final.round(1), Section::Final.round(2), Role::Winner)?;
    table.decide(final_match);
    Ok(())
}

/// Winner and loser targets of a match.
pub fn resolve(structure: &BracketStructure, match_number: u32) -> Option<AdvancementRule> {
    structure.spec(match_number).map(|m| m.rule)
}

/// Inverse table: which `(source match, role)` feeds each destination slot.
pub fn feeders(structure: &BracketStructure) -> HashMap<(u32, Slot), Vec<(u32, Role)>> {
    let mut map: HashMap<(u32, Slot), Vec<(u32, Role)>> = HashMap::new();
    for spec in structure.all_specs() {
        for role in [Role::Winner, Role::Loser] {
            if let Target::Match { match_number, slot } = spec.rule.target(role) {
                map.entry((match_number, slot))
                    .or_default()
                    .push((spec.match_number, role));
            }
        }
    }
    map
}
