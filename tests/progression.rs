//! Integration tests for recording results, advancement, grand-final reset and undo.

mod common;

use bracket_engine::{
    BracketError, BracketStore, Format, Match, MatchStatus, ParticipantId, RecordOutcome, Slot,
    Terminal, TournamentStatus, Violation,
};
use common::{state_of, Fixture};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const SIZES: [u32; 5] = [4, 8, 16, 32, 64];

#[test]
fn result_on_pending_match_is_not_ready() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let m = f.get(5);
    assert_eq!(m.status, MatchStatus::Pending);
    assert_eq!(f.record(&m, f.by_seed(1)), Err(BracketError::NotReady(m.id)));
}

#[test]
fn winner_must_play_in_the_match() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let m = f.get(1);
    let outsider = f.by_seed(3);
    assert_eq!(
        f.record(&m, outsider),
        Err(BracketError::NotAParticipant {
            match_id: m.id,
            participant: outsider
        })
    );
    assert_eq!(f.get(1).status, MatchStatus::Ready);
}

#[test]
fn duplicate_submission_is_idempotent() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let m = f.get(1);
    let first = f.record(&m, f.favourite(&m)).unwrap();
    assert!(!first.replayed);
    assert_eq!(first.writes.len(), 1);
    let before = state_of(&f.matches());

    let again = f.record(&m, f.favourite(&m)).unwrap();
    assert!(again.replayed);
    assert!(again.writes.is_empty());
    assert_eq!(state_of(&f.matches()), before);
}

#[test]
fn different_winner_on_completed_match_is_rejected() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let m = f.get(1);
    let (fav, dog) = (f.favourite(&m), f.underdog(&m));
    f.record(&m, fav).unwrap();
    assert_eq!(
        f.record(&m, dog),
        Err(BracketError::AlreadyCompleted {
            match_id: m.id,
            recorded: fav,
            submitted: dog
        })
    );
    assert_eq!(f.get(1).winner_id, Some(fav));
}

#[test]
fn single_elimination_winner_advances_loser_is_eliminated() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let m = f.get(2);
    let out = f.record(&m, f.favourite(&m)).unwrap();
    assert_eq!(out.writes.len(), 1);
    assert_eq!(out.writes[0].match_number, 5);
    assert_eq!(out.writes[0].slot, Slot::B);
    assert_eq!(out.placements.len(), 1);
    assert_eq!(out.placements[0].participant, f.underdog(&m));
    assert_eq!(out.placements[0].outcome, Terminal::Eliminated);

    let next = f.get(5);
    assert_eq!(next.slot_b, Some(f.favourite(&m)));
    assert_eq!(next.status, MatchStatus::Pending);
}

#[test]
fn single_elimination_playout_crowns_one_champion() {
    for n in SIZES {
        let f = Fixture::new(Format::SingleElimination, n);
        let outcomes = f.play_favourites(None);
        assert_eq!(outcomes.len() as u32, n - 1);
        let t = f.tournament();
        assert_eq!(t.status, TournamentStatus::Completed);
        assert_eq!(t.champion, Some(f.by_seed(1)));
        assert_eq!(t.runner_up, Some(f.by_seed(2)));
        assert!(f.validate().is_clean(), "{:?}", f.validate().violations);
    }
}

#[test]
fn double_elimination_every_non_champion_loses_twice() {
    for n in SIZES {
        let f = Fixture::new(Format::DoubleElimination, n);
        f.play_favourites(None);
        let t = f.tournament();
        assert_eq!(t.status, TournamentStatus::Completed);
        let champion = t.champion.unwrap();
        assert_eq!(champion, f.by_seed(1));
        for (p, losses) in f.losses() {
            if p == champion {
                assert_eq!(losses, 0);
            } else {
                assert_eq!(losses, 2, "seed {} in DE {}", f.seed_of(p), n);
            }
        }
        assert_eq!(f.matches().len() as u32, 2 * n - 2);
        assert!(f.validate().is_clean(), "{:?}", f.validate().violations);
    }
}

#[test]
fn grand_final_won_from_winner_side_ends_the_tournament() {
    let f = Fixture::new(Format::DoubleElimination, 4);
    f.play_favourites(Some(6));
    let gf = f.get(6);
    assert_eq!(gf.round_number, 301);
    assert_eq!(gf.slot_a, Some(f.by_seed(1)));
    assert_eq!(gf.slot_b, Some(f.by_seed(2)));

    let out = f.record(&gf, f.by_seed(1)).unwrap();
    assert!(out.tournament_completed);
    assert!(out.reset_match.is_none());
    assert_eq!(f.matches().len(), 6);
    assert_eq!(f.tournament().champion, Some(f.by_seed(1)));
    assert!(f.validate().is_clean());
}

#[test]
fn grand_final_won_from_loser_side_creates_reset() {
    let f = Fixture::new(Format::DoubleElimination, 4);
    f.play_favourites(Some(6));
    let gf = f.get(6);

    let out = f.record(&gf, f.by_seed(2)).unwrap();
    assert!(!out.tournament_completed);
    assert!(out.placements.is_empty());
    let reset_id = out.reset_match.unwrap();
    assert_eq!(Some(reset_id), f.tournament().reset_match_id);
    assert_eq!(f.tournament().status, TournamentStatus::Active);

    let matches = f.matches();
    assert_eq!(matches.len(), 7);
    let reset = f.get(7);
    assert_eq!(reset.id, reset_id);
    assert_eq!(reset.round_number, 302);
    assert_eq!(reset.slot_a, gf.slot_a);
    assert_eq!(reset.slot_b, gf.slot_b);
    assert_eq!(reset.status, MatchStatus::Ready);
    assert!(f.validate().is_clean(), "{:?}", f.validate().violations);

    let done = f.record(&reset, f.by_seed(2)).unwrap();
    assert!(done.tournament_completed);
    let t = f.tournament();
    assert_eq!(t.champion, Some(f.by_seed(2)));
    assert_eq!(t.runner_up, Some(f.by_seed(1)));
    assert!(f.validate().is_clean(), "{:?}", f.validate().violations);
}

#[test]
fn branched_round_one_losers_fill_loser_branch_a() {
    let f = Fixture::new(Format::BranchedDe16, 16);
    for number in 1..=8 {
        let m = f.get(number);
        let out = f.record(&m, f.favourite(&m)).unwrap();
        assert_eq!(out.loser, f.by_seed(2 * number));
    }
    for (i, number) in (15..=18).enumerate() {
        let m = f.get(number);
        assert_eq!(m.status, MatchStatus::Ready);
        let i = i as u32;
        assert_eq!(f.seed_of(m.slot_a.unwrap()), 4 * i + 2);
        assert_eq!(f.seed_of(m.slot_b.unwrap()), 4 * i + 4);
    }
    // Branch B waits on round two.
    assert!(f.get(22).slot_a.is_none());
    assert!(f.validate().is_clean());
}

#[test]
fn branched_playout_completes() {
    let f = Fixture::new(Format::BranchedDe16, 16);
    let outcomes = f.play_favourites(None);
    assert_eq!(outcomes.len(), 27);
    assert_eq!(f.tournament().champion, Some(f.by_seed(1)));
    assert!(f.validate().is_clean(), "{:?}", f.validate().violations);
}

#[test]
fn occupied_slot_reports_conflict_and_keeps_result() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let intruder = f.by_seed(4);
    f.store
        .with_matches(f.tournament_id, &[5], &mut |ms| {
            ms[0].fill_slot(Slot::A, intruder);
            Ok(())
        })
        .unwrap();

    let m = f.get(1);
    let winner = f.favourite(&m);
    match f.record(&m, winner) {
        Err(BracketError::SlotConflict { conflicts, writes }) => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].match_number, 5);
            assert_eq!(conflicts[0].slot, Slot::A);
            assert_eq!(conflicts[0].occupant, intruder);
            assert_eq!(conflicts[0].incoming, winner);
            assert!(writes.is_empty());
        }
        other => panic!("expected slot conflict, got {other:?}"),
    }

    // Result stands; the slot was not overwritten.
    assert_eq!(f.get(1).winner_id, Some(winner));
    assert_eq!(f.get(5).slot_a, Some(intruder));
    let report = f.validate();
    assert!(report.violations.contains(&Violation::SlotProvenance {
        match_number: 5,
        slot: Slot::A,
        occupant: intruder,
        expected: Some(winner),
    }));

    // Resubmitting the same result is a replay, not a second conflict.
    assert!(f.record(&m, winner).unwrap().replayed);
}

#[test]
fn undo_before_result_is_rejected() {
    let f = Fixture::new(Format::SingleElimination, 4);
    let m = f.get(1);
    assert_eq!(
        f.engine.undo_match_result(&f.store, m.id),
        Err(BracketError::NotCompleted(m.id))
    );
}

#[test]
fn undo_is_blocked_once_the_destination_is_decided() {
    let f = Fixture::new(Format::SingleElimination, 4);
    f.play_favourites(None);
    let before = state_of(&f.matches());
    let m = f.get(1);
    assert_eq!(
        f.engine.undo_match_result(&f.store, m.id),
        Err(BracketError::UndoBlocked {
            match_id: m.id,
            blocking_match: 3
        })
    );
    assert_eq!(state_of(&f.matches()), before);
    assert_eq!(f.tournament().status, TournamentStatus::Completed);
}

#[test]
fn undo_retracts_both_advancements() {
    let f = Fixture::new(Format::DoubleElimination, 8);
    let before = state_of(&f.matches());
    let m = f.get(1);
    let recorded = f.record(&m, f.underdog(&m)).unwrap();
    assert_eq!(recorded.writes.len(), 2);

    let undone = f.engine.undo_match_result(&f.store, m.id).unwrap();
    assert_eq!(undone.retracted, recorded.writes);
    assert!(!undone.tournament_reopened);
    assert_eq!(state_of(&f.matches()), before);

    // Any winner can be recorded again.
    let redo = f.record(&m, f.favourite(&m)).unwrap();
    assert!(!redo.replayed);
}

#[test]
fn undo_of_the_final_reopens_the_tournament() {
    let f = Fixture::new(Format::SingleElimination, 4);
    f.play_favourites(None);
    let out = f.engine.undo_match_result(&f.store, f.get(3).id).unwrap();
    assert!(out.tournament_reopened);

    let t = f.tournament();
    assert_eq!(t.status, TournamentStatus::Active);
    assert!(t.champion.is_none() && t.runner_up.is_none());
    assert_eq!(f.get(3).status, MatchStatus::Ready);
    assert!(f.validate().is_clean());

    f.record(&f.get(3), f.by_seed(2)).unwrap();
    assert_eq!(f.tournament().champion, Some(f.by_seed(2)));
}

#[test]
fn undo_of_reset_forcing_grand_final_removes_the_reset() {
    let f = Fixture::new(Format::DoubleElimination, 4);
    f.play_favourites(Some(6));
    let before = state_of(&f.matches());
    let gf = f.get(6);

    let first = f.record(&gf, f.by_seed(2)).unwrap().reset_match.unwrap();
    let undone = f.engine.undo_match_result(&f.store, gf.id).unwrap();
    assert_eq!(undone.reset_removed, Some(first));
    assert_eq!(undone.retracted.len(), 2);
    assert_eq!(state_of(&f.matches()), before);
    assert!(f.validate().is_clean());

    // Recreated under the same identity.
    let second = f.record(&gf, f.by_seed(2)).unwrap().reset_match.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        f.engine.undo_match_result(&f.store, gf.id).unwrap().reset_removed,
        Some(first)
    );
}

#[test]
fn grand_final_undo_blocked_by_played_reset() {
    let f = Fixture::new(Format::DoubleElimination, 4);
    f.play_favourites(Some(6));
    let gf = f.get(6);
    f.record(&gf, f.by_seed(2)).unwrap();
    f.record(&f.get(7), f.by_seed(1)).unwrap();
    assert_eq!(f.tournament().champion, Some(f.by_seed(1)));

    assert_eq!(
        f.engine.undo_match_result(&f.store, gf.id),
        Err(BracketError::UndoBlocked {
            match_id: gf.id,
            blocking_match: 7
        })
    );
    assert_eq!(f.matches().len(), 7);
}

#[test]
fn status_lists_round_counts_and_ready_matches() {
    let f = Fixture::new(Format::SingleElimination, 8);
    let status = f.engine.get_bracket_status(&f.store, f.tournament_id).unwrap();
    assert_eq!(status.status, TournamentStatus::Active);
    assert!(status.champion.is_none());
    assert_eq!(status.per_round_counts.len(), 3);
    let r1 = &status.per_round_counts[0];
    assert_eq!((r1.round, r1.total, r1.ready, r1.pending), (1, 4, 4, 0));
    let r2 = &status.per_round_counts[1];
    assert_eq!((r2.round, r2.total, r2.ready, r2.pending), (2, 2, 0, 2));
    assert_eq!(status.ready_matches.len(), 4);

    f.record(&f.get(1), f.by_seed(1)).unwrap();
    f.record(&f.get(2), f.by_seed(4)).unwrap();
    let status = f.engine.get_bracket_status(&f.store, f.tournament_id).unwrap();
    assert_eq!(status.per_round_counts[0].completed, 2);
    assert_eq!(status.per_round_counts[1].ready, 1);
    let numbers: Vec<u32> = status.ready_matches.iter().map(|m| m.match_number).collect();
    assert_eq!(numbers, vec![3, 4, 5]);
}

/// Play out a bracket choosing the next ready match and its winner at random.
fn random_playout(f: &Fixture, rng: &mut StdRng) -> Vec<RecordOutcome> {
    let mut outcomes = Vec::new();
    loop {
        let ready = f.ready();
        let Some(m) = ready.choose(rng) else {
            return outcomes;
        };
        let winner = if rng.gen_bool(0.5) { m.slot_a } else { m.slot_b };
        outcomes.push(f.record(m, winner.unwrap()).unwrap());
    }
}

#[test]
fn random_completion_order_keeps_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut cases: Vec<(Format, u32)> = SIZES
        .iter()
        .flat_map(|&n| [(Format::SingleElimination, n), (Format::DoubleElimination, n)])
        .collect();
    cases.push((Format::BranchedDe16, 16));

    for (format, n) in cases {
        for _ in 0..3 {
            let f = Fixture::new(format, n);
            let outcomes = random_playout(&f, &mut rng);
            let report = f.validate();
            assert!(report.is_clean(), "{format} {n}: {:?}", report.violations);

            let champions: Vec<_> = outcomes
                .iter()
                .flat_map(|o| &o.placements)
                .filter(|p| p.outcome == Terminal::Champion)
                .collect();
            assert_eq!(champions.len(), 1, "{format} {n}");
            let t = f.tournament();
            assert_eq!(t.status, TournamentStatus::Completed);
            let champion = champions[0].participant;
            assert_eq!(t.champion, Some(champion));

            for (p, losses) in f.losses() {
                match (format, p == champion) {
                    (Format::SingleElimination, true) => assert_eq!(losses, 0),
                    (Format::SingleElimination, false) => assert_eq!(losses, 1),
                    (Format::DoubleElimination, true) => assert!(losses <= 1),
                    (Format::DoubleElimination, false) => assert_eq!(losses, 2),
                    (Format::BranchedDe16, true) => assert!(losses <= 1),
                    (Format::BranchedDe16, false) => assert!((1..=2).contains(&losses)),
                }
            }
        }
    }
}

#[test]
fn undo_in_reverse_restores_the_seeded_bracket() {
    let mut rng = StdRng::seed_from_u64(42);
    for format in [Format::DoubleElimination, Format::BranchedDe16] {
        let f = Fixture::new(format, 16);
        let seeded = state_of(&f.matches());
        let outcomes = random_playout(&f, &mut rng);
        for out in outcomes.iter().rev() {
            f.engine.undo_match_result(&f.store, out.match_id).unwrap();
        }
        assert_eq!(state_of(&f.matches()), seeded);
        assert_eq!(f.tournament().status, TournamentStatus::Active);
        assert!(f.validate().is_clean());
    }
}

type Snapshot = (
    Vec<(u32, Option<ParticipantId>, Option<ParticipantId>, Option<ParticipantId>, MatchStatus)>,
    TournamentStatus,
    Option<ParticipantId>,
    Option<ParticipantId>,
);

fn snapshot(f: &Fixture) -> Snapshot {
    let t = f.tournament();
    (state_of(&f.matches()), t.status, t.champion, t.runner_up)
}

/// Record `winner`, then undo and record it again; the bracket must end up where the first
/// record left it.
fn record_twice(f: &Fixture, m: &Match, winner: ParticipantId) -> RecordOutcome {
    let first = f.record(m, winner).unwrap();
    let recorded = snapshot(f);
    f.engine.undo_match_result(&f.store, m.id).unwrap();
    let again = f.record(m, winner).unwrap();
    assert_eq!(snapshot(f), recorded, "match {}", m.match_number);
    assert_eq!(again.writes, first.writes);
    assert_eq!(again.placements, first.placements);
    assert_eq!(again.reset_match, first.reset_match);
    again
}

#[test]
fn undo_then_same_result_restores_every_match() {
    for (format, n) in [
        (Format::SingleElimination, 8),
        (Format::DoubleElimination, 8),
        (Format::BranchedDe16, 16),
    ] {
        let f = Fixture::new(format, n);
        let mut played = 0;
        while let Some(m) = f.ready().into_iter().next() {
            let winner = if m.match_number % 3 == 0 {
                f.underdog(&m)
            } else {
                f.favourite(&m)
            };
            record_twice(&f, &m, winner);
            played += 1;
        }
        assert_eq!(played, f.matches().len());
        assert_eq!(f.tournament().status, TournamentStatus::Completed);
        assert!(f.validate().is_clean(), "{format} {n}: {:?}", f.validate().violations);
    }
}

#[test]
fn undo_then_same_result_restores_grand_final_and_reset() {
    for n in SIZES {
        let f = Fixture::new(Format::DoubleElimination, n);
        let gf_number = 2 * n - 2;
        f.play_favourites(Some(gf_number));
        let gf = f.get(gf_number);

        let out = record_twice(&f, &gf, gf.slot_b.unwrap());
        let reset = f.get(2 * n - 1);
        assert_eq!(Some(reset.id), out.reset_match);
        assert_eq!(f.matches().len() as u32, 2 * n - 1);

        let done = record_twice(&f, &reset, reset.slot_b.unwrap());
        assert!(done.tournament_completed);
        let t = f.tournament();
        assert_eq!(t.champion, gf.slot_b);
        assert_eq!(t.runner_up, gf.slot_a);
        assert!(f.validate().is_clean(), "DE {n}: {:?}", f.validate().violations);
    }
}
