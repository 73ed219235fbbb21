//! Single binary web server: JSON API over the bracket engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST, PORT, BRACKET_SWEEP_SECS (0 disables the consistency sweep).

use actix_web::{
    get, post,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use bracket_engine::config::ServerConfig;
use bracket_engine::{
    load_participants_csv, BracketEngine, BracketError, BracketStore, Format, MatchId,
    MemoryStore, Participant, ParticipantId, Score, TournamentId,
};
use serde::Deserialize;

/// Engine plus the store injected into each call.
struct AppContext {
    engine: BracketEngine,
    store: MemoryStore,
}

type AppState = Data<AppContext>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    format: Format,
    capacity: u32,
}

#[derive(Deserialize)]
struct ParticipantInput {
    name: String,
    seed: u32,
    /// Existing registration id; a new one is generated if absent.
    #[serde(default)]
    id: Option<ParticipantId>,
}

#[derive(Deserialize)]
struct GenerateBracketBody {
    format: Format,
    #[serde(default)]
    participants: Vec<ParticipantInput>,
    /// Alternative to `participants`: CSV text with a `seed,name` header.
    #[serde(default)]
    participants_csv: Option<String>,
}

#[derive(Deserialize)]
struct RecordResultBody {
    winner_id: ParticipantId,
    #[serde(default)]
    score: Option<Score>,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segment: match id (e.g. /api/matches/{id})
#[derive(Deserialize)]
struct MatchPath {
    id: MatchId,
}

/// Map engine errors to HTTP responses with a JSON `error` body.
fn error_response(e: BracketError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match &e {
        BracketError::TournamentNotFound(_) | BracketError::MatchNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        BracketError::SlotConflict { conflicts, writes } => HttpResponse::Conflict().json(
            serde_json::json!({ "error": e.to_string(), "conflicts": conflicts, "writes": writes }),
        ),
        BracketError::AlreadyCompleted { .. } | BracketError::UndoBlocked { .. } => {
            HttpResponse::Conflict().json(body)
        }
        BracketError::Storage(_) => HttpResponse::InternalServerError().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "bracket-engine",
    })
}

/// Create a draft tournament (returns it with id).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    match state
        .engine
        .create_tournament(&state.store, &body.name, body.format, body.capacity)
    {
        Ok(t) => HttpResponse::Ok().json(t),
        Err(e) => error_response(e),
    }
}

/// Get a tournament and all its matches.
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let tournament = match state.store.tournament(path.id) {
        Ok(t) => t,
        Err(e) => return error_response(e),
    };
    match state.store.matches(path.id) {
        Ok(matches) => HttpResponse::Ok().json(serde_json::json!({
            "tournament": tournament,
            "matches": matches,
        })),
        Err(e) => error_response(e),
    }
}

/// Generate the bracket and seed round one (tournament must be in Draft).
#[post("/api/tournaments/{id}/bracket")]
async fn api_generate_bracket(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<GenerateBracketBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let participants = match body.participants_csv {
        Some(csv_text) => match load_participants_csv(csv_text.as_bytes()) {
            Ok(p) => p,
            Err(e) => return error_response(e),
        },
        None => body
            .participants
            .into_iter()
            .map(|p| {
                let mut participant = Participant::new(p.name.trim(), p.seed);
                if let Some(id) = p.id {
                    participant.id = id;
                }
                participant
            })
            .collect(),
    };
    match state
        .engine
        .generate_bracket(&state.store, path.id, body.format, &participants)
    {
        Ok(generated) => HttpResponse::Ok().json(serde_json::json!({
            "tournament": generated.tournament,
            "participants": participants,
            "matches": generated.matches,
            "rounds": generated.structure.rounds,
        })),
        Err(e) => error_response(e),
    }
}

/// Rounds counts and matches waiting for a result.
#[get("/api/tournaments/{id}/status")]
async fn api_bracket_status(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.engine.get_bracket_status(&state.store, path.id) {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => error_response(e),
    }
}

/// Run the invariant checks on demand.
#[get("/api/tournaments/{id}/validate")]
async fn api_validate(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.engine.validate(&state.store, path.id) {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => error_response(e),
    }
}

/// Record the winner of a ready match.
#[post("/api/matches/{id}/result")]
async fn api_record_result(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<RecordResultBody>,
) -> HttpResponse {
    match state
        .engine
        .record_match_result(&state.store, path.id, body.winner_id, body.score)
    {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response(e),
    }
}

/// Revert a completed match.
#[post("/api/matches/{id}/undo")]
async fn api_undo_result(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    match state.engine.undo_match_result(&state.store, path.id) {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response(e),
    }
}

/// Validate every tournament and log what is broken. Read-only.
fn consistency_sweep(ctx: &AppContext) {
    let ids = match ctx.store.tournament_ids() {
        Ok(ids) => ids,
        Err(e) => {
            log::error!("Consistency sweep failed: {}", e);
            return;
        }
    };
    let mut dirty = 0;
    for id in &ids {
        match ctx.engine.validate(&ctx.store, *id) {
            Ok(report) if report.is_clean() => {}
            Ok(report) => {
                dirty += 1;
                for v in &report.violations {
                    log::error!("Tournament {}: {:?}", id, v);
                }
            }
            Err(e) => log::error!("Tournament {}: validation failed: {}", id, e),
        }
    }
    log::info!("Consistency sweep: {} tournament(s), {} with violations", ids.len(), dirty);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(AppContext {
        engine: BracketEngine::new(),
        store: MemoryStore::new(),
    });

    if let Some(every) = config.sweep_interval {
        let state_sweep = state.clone();
        actix_web::rt::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately; nothing to check at startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                consistency_sweep(&state_sweep);
            }
        });
    }

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_generate_bracket)
            .service(api_bracket_status)
            .service(api_validate)
            .service(api_record_result)
            .service(api_undo_result)
    })
    .bind(bind)?
    .run()
    .await
}
