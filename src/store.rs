//! Persistence interface consumed by the engine, and an in-memory implementation.

use crate::models::{BracketError, Match, MatchId, Tournament, TournamentId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Storage the engine reads and writes through. Passed into every operation; the engine keeps
/// no handle of its own.
pub trait BracketStore: Send + Sync {
    fn insert_tournament(&self, tournament: Tournament) -> Result<(), BracketError>;

    fn tournament(&self, id: TournamentId) -> Result<Tournament, BracketError>;

    fn tournament_ids(&self) -> Result<Vec<TournamentId>, BracketError>;

    /// Run `f` with the tournament locked and return the updated record. Nothing is saved if
    /// `f` fails.
    fn update_tournament(
        &self,
        id: TournamentId,
        f: &mut dyn FnMut(&mut Tournament) -> Result<(), BracketError>,
    ) -> Result<Tournament, BracketError>;

    fn insert_matches(&self, id: TournamentId, matches: Vec<Match>) -> Result<(), BracketError>;

    /// Returns whether a match was removed. Safe to call while holding that match's lock.
    fn remove_match(&self, id: TournamentId, match_number: u32) -> Result<bool, BracketError>;

    /// Tournament and match number of a match id.
    fn locate(&self, match_id: MatchId) -> Result<(TournamentId, u32), BracketError>;

    /// Snapshot of all matches ordered by match number.
    fn matches(&self, id: TournamentId) -> Result<Vec<Match>, BracketError>;

    /// Lock the named matches in ascending match-number order and run `f` over them.
    ///
    /// Numbers with no match are skipped. The set of present matches does not change while
    /// `f` runs. Changes made by `f` are kept even if it returns an error, so `f` must
    /// validate before it mutates.
    fn with_matches(
        &self,
        id: TournamentId,
        numbers: &[u32],
        f: &mut dyn FnMut(&mut [&mut Match]) -> Result<(), BracketError>,
    ) -> Result<(), BracketError>;
}

fn poisoned<T>(_: PoisonError<T>) -> BracketError {
    BracketError::Storage("lock poisoned".to_string())
}

struct TournamentEntry {
    tournament: Mutex<Tournament>,
    matches: RwLock<BTreeMap<u32, Arc<Mutex<Match>>>>,
}

/// Process-local store. Each match sits behind its own mutex so concurrent results for
/// different matches never wait on each other.
#[derive(Default)]
pub struct MemoryStore {
    tournaments: RwLock<HashMap<TournamentId, Arc<TournamentEntry>>>,
    index: RwLock<HashMap<MatchId, (TournamentId, u32)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: TournamentId) -> Result<Arc<TournamentEntry>, BracketError> {
        self.tournaments
            .read()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .ok_or(BracketError::TournamentNotFound(id))
    }
}

impl BracketStore for MemoryStore {
    fn insert_tournament(&self, tournament: Tournament) -> Result<(), BracketError> {
        let id = tournament.id;
        let entry = Arc::new(TournamentEntry {
            tournament: Mutex::new(tournament),
            matches: RwLock::new(BTreeMap::new()),
        });
        self.tournaments.write().map_err(poisoned)?.insert(id, entry);
        Ok(())
    }

    fn tournament(&self, id: TournamentId) -> Result<Tournament, BracketError> {
        let entry = self.entry(id)?;
        let t = entry.tournament.lock().map_err(poisoned)?;
        Ok(t.clone())
    }

    fn tournament_ids(&self) -> Result<Vec<TournamentId>, BracketError> {
        Ok(self.tournaments.read().map_err(poisoned)?.keys().copied().collect())
    }

    fn update_tournament(
        &self,
        id: TournamentId,
        f: &mut dyn FnMut(&mut Tournament) -> Result<(), BracketError>,
    ) -> Result<Tournament, BracketError> {
        let entry = self.entry(id)?;
        let mut guard = entry.tournament.lock().map_err(poisoned)?;
        let mut updated = guard.clone();
        f(&mut updated)?;
        *guard = updated.clone();
        Ok(updated)
    }

    fn insert_matches(&self, id: TournamentId, matches: Vec<Match>) -> Result<(), BracketError> {
        let entry = self.entry(id)?;
        let mut index = self.index.write().map_err(poisoned)?;
        let mut map = entry.matches.write().map_err(poisoned)?;
        for m in matches {
            index.insert(m.id, (id, m.match_number));
            map.insert(m.match_number, Arc::new(Mutex::new(m)));
        }
        Ok(())
    }

    fn remove_match(&self, id: TournamentId, match_number: u32) -> Result<bool, BracketError> {
        let entry = self.entry(id)?;
        let mut index = self.index.write().map_err(poisoned)?;
        let removed = entry
            .matches
            .write()
            .map_err(poisoned)?
            .remove(&match_number)
            .is_some();
        if removed {
            index.retain(|_, at| *at != (id, match_number));
        }
        Ok(removed)
    }

    fn locate(&self, match_id: MatchId) -> Result<(TournamentId, u32), BracketError> {
        self.index
            .read()
            .map_err(poisoned)?
            .get(&match_id)
            .copied()
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    fn matches(&self, id: TournamentId) -> Result<Vec<Match>, BracketError> {
        let entry = self.entry(id)?;
        let handles: Vec<Arc<Mutex<Match>>> = entry
            .matches
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();
        handles
            .iter()
            .map(|h| h.lock().map(|m| m.clone()).map_err(poisoned))
            .collect()
    }

    fn with_matches(
        &self,
        id: TournamentId,
        numbers: &[u32],
        f: &mut dyn FnMut(&mut [&mut Match]) -> Result<(), BracketError>,
    ) -> Result<(), BracketError> {
        let entry = self.entry(id)?;
        let mut wanted = numbers.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        loop {
            let handles: Vec<Arc<Mutex<Match>>> = {
                let map = entry.matches.read().map_err(poisoned)?;
                wanted.iter().filter_map(|n| map.get(n).cloned()).collect()
            };
            let mut guards = Vec::with_capacity(handles.len());
            for h in &handles {
                guards.push(h.lock().map_err(poisoned)?);
            }

            // A match may have been created or removed while we waited; start over if so.
            let stable = {
                let map = entry.matches.read().map_err(poisoned)?;
                let present: Vec<&Arc<Mutex<Match>>> =
                    wanted.iter().filter_map(|n| map.get(n)).collect();
                present.len() == handles.len()
                    && present.iter().zip(&handles).all(|(a, b)| Arc::ptr_eq(a, b))
            };
            if !stable {
                continue;
            }

            let mut locked: Vec<&mut Match> = guards.iter_mut().map(|g| &mut **g).collect();
            return f(&mut locked);
        }
    }
}
