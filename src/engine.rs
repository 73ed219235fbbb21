//! Engine entry points. Holds only the structure cache; all state lives in the store passed
//! into each call.

use crate::logic::{
    assign_seeds, bracket_status, generate_structure, record_match_result, undo_match_result,
    validate_bracket, BracketStatus, RecordOutcome, UndoOutcome, ValidationReport,
};
use crate::models::{
    BracketError, BracketStructure, Format, Match, MatchId, Participant, ParticipantId, Score,
    SlotWrite, Tournament, TournamentId, TournamentStatus,
};
use crate::store::BracketStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// A freshly generated bracket.
#[derive(Clone, Debug)]
pub struct GeneratedBracket {
    pub tournament: Tournament,
    pub structure: Arc<BracketStructure>,
    pub matches: Vec<Match>,
    /// Opening-round placements.
    pub seeded: Vec<SlotWrite>,
}

fn cache_poisoned<T>(_: PoisonError<T>) -> BracketError {
    BracketError::Storage("structure cache poisoned".to_string())
}

#[derive(Default)]
pub struct BracketEngine {
    structures: RwLock<HashMap<(Format, u32), Arc<BracketStructure>>>,
}

impl BracketEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached topology for `(format, capacity)`, generated on first use.
    pub fn structure(&self, format: Format, capacity: u32) -> Result<Arc<BracketStructure>, BracketError> {
        if let Some(s) = self.structures.read().map_err(cache_poisoned)?.get(&(format, capacity)) {
            return Ok(Arc::clone(s));
        }
        let built = Arc::new(generate_structure(format, capacity)?);
        let mut cache = self.structures.write().map_err(cache_poisoned)?;
        Ok(Arc::clone(cache.entry((format, capacity)).or_insert(built)))
    }

    /// Register a draft tournament. Fails with `StructureError` if the size is unsupported.
    pub fn create_tournament(
        &self,
        store: &dyn BracketStore,
        name: &str,
        format: Format,
        capacity: u32,
    ) -> Result<Tournament, BracketError> {
        if !format.supports(capacity) {
            return Err(BracketError::StructureError { format, capacity });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(BracketError::InvalidState);
        }
        let tournament = Tournament::new(name, format, capacity);
        store.insert_tournament(tournament.clone())?;
        Ok(tournament)
    }

    /// Create every match and seed the opening round. The tournament becomes `active`.
    ///
    /// Aborts without writing anything on `StructureError`, `SeedMismatch` or an invalid seed list.
    pub fn generate_bracket(
        &self,
        store: &dyn BracketStore,
        tournament_id: TournamentId,
        format: Format,
        participants: &[Participant],
    ) -> Result<GeneratedBracket, BracketError> {
        let current = store.tournament(tournament_id)?;
        if current.status != TournamentStatus::Draft {
            return Err(BracketError::InvalidState);
        }
        let structure = self.structure(format, current.capacity)?;
        let mut matches: Vec<Match> = structure
            .matches
            .iter()
            .map(|spec| Match::new(tournament_id, spec))
            .collect();
        let seeded = assign_seeds(&structure, participants, &mut matches)?;
        let reset_id = structure.reset.as_ref().map(|_| Uuid::new_v4());

        let tournament = store.update_tournament(tournament_id, &mut |t| {
            if t.status != TournamentStatus::Draft {
                return Err(BracketError::InvalidState);
            }
            t.format = format;
            t.status = TournamentStatus::Active;
            t.reset_match_id = reset_id;
            t.generated_at = Some(Utc::now());
            store.insert_matches(tournament_id, matches.clone())
        })?;

        log::info!(
            "Generated {} bracket for tournament {}: {} matches, {} participants",
            format,
            tournament_id,
            matches.len(),
            participants.len()
        );
        Ok(GeneratedBracket {
            tournament,
            structure,
            matches,
            seeded,
        })
    }

    fn structure_for_match(
        &self,
        store: &dyn BracketStore,
        match_id: MatchId,
    ) -> Result<(TournamentId, Arc<BracketStructure>), BracketError> {
        let (tournament_id, _) = store.locate(match_id)?;
        let t = store.tournament(tournament_id)?;
        Ok((tournament_id, self.structure(t.format, t.capacity)?))
    }

    pub fn record_match_result(
        &self,
        store: &dyn BracketStore,
        match_id: MatchId,
        winner_id: ParticipantId,
        score: Option<Score>,
    ) -> Result<RecordOutcome, BracketError> {
        let (tournament_id, structure) = self.structure_for_match(store, match_id)?;
        record_match_result(store, &structure, tournament_id, match_id, winner_id, score)
    }

    pub fn undo_match_result(
        &self,
        store: &dyn BracketStore,
        match_id: MatchId,
    ) -> Result<UndoOutcome, BracketError> {
        let (tournament_id, structure) = self.structure_for_match(store, match_id)?;
        undo_match_result(store, &structure, tournament_id, match_id)
    }

    pub fn get_bracket_status(
        &self,
        store: &dyn BracketStore,
        tournament_id: TournamentId,
    ) -> Result<BracketStatus, BracketError> {
        let tournament = store.tournament(tournament_id)?;
        let matches = store.matches(tournament_id)?;
        Ok(bracket_status(&tournament, &matches))
    }

    /// Consistency sweep of one tournament. Draft tournaments have nothing to check.
    pub fn validate(
        &self,
        store: &dyn BracketStore,
        tournament_id: TournamentId,
    ) -> Result<ValidationReport, BracketError> {
        let tournament = store.tournament(tournament_id)?;
        if tournament.status == TournamentStatus::Draft {
            return Ok(ValidationReport::default());
        }
        let structure = self.structure(tournament.format, tournament.capacity)?;
        let matches = store.matches(tournament_id)?;
        Ok(validate_bracket(&structure, &tournament, &matches))
    }
}
