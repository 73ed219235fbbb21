//! Bracket structure generation: rounds, match numbering and the advancement table.

use crate::logic::advancement::{self, Layout};
use crate::models::{
    AdvancementRule, BracketError, BracketStructure, Format, MatchSpec, RoundSpec, Section, Target,
    Terminal,
};

/// Compute the full topology for `format` with `capacity` participants.
///
/// Pure: the same input always yields the same structure. Fails with `StructureError`
/// before anything is built if the size is not supported.
pub fn generate_structure(format: Format, capacity: u32) -> Result<BracketStructure, BracketError> {
    if !format.supports(capacity) {
        return Err(BracketError::StructureError { format, capacity });
    }

    let layout = Layout {
        format,
        capacity,
        rounds: number_rounds(round_sizes(format, capacity)),
    };
    let table = advancement::link(&layout)?;

    let mut matches = Vec::with_capacity(table.rules.len());
    for round in &layout.rounds {
        for &number in &round.matches {
            let rule = table
                .rules
                .get(number as usize - 1)
                .copied()
                .ok_or(BracketError::StructureError { format, capacity })?;
            matches.push(MatchSpec {
                match_number: number,
                round: round.number,
                rule,
                grand_final: table.grand_final == Some(number),
            });
        }
    }

    let reset = table.grand_final.map(|_| MatchSpec {
        match_number: matches.len() as u32 + 1,
        round: Section::Final.round(2),
        rule: AdvancementRule {
            winner: Target::terminal(Terminal::Champion),
            loser: Target::terminal(Terminal::RunnerUp),
        },
        grand_final: false,
    });

    Ok(BracketStructure {
        format,
        capacity,
        rounds: layout.rounds,
        matches,
        reset,
    })
}

/// `(round number, match count)` in ascending round order.
fn round_sizes(format: Format, capacity: u32) -> Vec<(u32, u32)> {
    let k = capacity.trailing_zeros();
    let mut rounds = Vec::new();
    match format {
        Format::SingleElimination => {
            rounds.extend((1..=k).map(|r| (Section::Winner.round(r), capacity >> r)));
        }
        Format::DoubleElimination => {
            rounds.extend((1..=k).map(|r| (Section::Winner.round(r), capacity >> r)));
            // Loser rounds come in pairs of equal size, halving after each pair.
            rounds.extend(
                (1..=2 * (k - 1)).map(|i| (Section::LoserA.round(i), capacity >> ((i + 1) / 2 + 1))),
            );
            rounds.push((Section::Final.round(1), 1));
        }
        Format::BranchedDe16 => {
            rounds.extend((1..=3).map(|r| (Section::Winner.round(r), capacity >> r)));
            rounds.extend((1..=3).map(|r| (Section::LoserA.round(r), capacity >> (r + 1))));
            rounds.extend((1..=2).map(|r| (Section::LoserB.round(r), capacity >> (r + 2))));
            rounds.push((Section::Final.round(1), 2));
            rounds.push((Section::Final.round(2), 1));
        }
    }
    rounds
}

fn number_rounds(sizes: Vec<(u32, u32)>) -> Vec<RoundSpec> {
    let mut next = 1;
    sizes
        .into_iter()
        .map(|(number, count)| {
            let matches: Vec<u32> = (next..next + count).collect();
            next += count;
            RoundSpec {
                number,
                section: Section::of_round(number),
                matches,
            }
        })
        .collect()
}
