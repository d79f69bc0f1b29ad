use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::models::{CombatAnalysis, SessionSummary};
use crate::parser;
use crate::stats;
use crate::storage::Database;

struct AppState {
    /// `None` when the database could not be opened at startup; the
    /// analyzer keeps working, sessions just aren't stored.
    db: Option<Mutex<Database>>,
}

pub fn create_router(db: Option<Database>) -> Router {
    let state = Arc::new(AppState {
        db: db.map(Mutex::new),
    });

    Router::new()
        .route("/api/analyze", post(analyze_log))
        .route("/api/sessions", get(list_sessions))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    log_text: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct SessionsResponse {
    sessions: Vec<SessionSummary>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// Parse and analyze a combat log, then kick off best-effort persistence.
async fn analyze_log(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<CombatAnalysis>, ApiError> {
    if body.log_text.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Invalid log text provided",
        ));
    }

    // Parsing is CPU-bound; keep it off the async worker threads
    let log_text = body.log_text;
    let analysis = tokio::task::spawn_blocking(move || {
        let start = std::time::Instant::now();
        let session = parser::parse_combat_log(&log_text);
        let analysis = stats::build_analysis(session);
        println!(
            "Analyzed {} events in {:.1}ms",
            analysis.session.total_events,
            start.elapsed().as_secs_f64() * 1000.0
        );
        analysis
    })
    .await
    .map_err(|e| {
        eprintln!("Analysis task failed: {}", e);
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to analyze combat log",
        )
    })?;

    if analysis.session.total_events == 0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No valid events found in the log",
        ));
    }

    // Fire-and-forget: a storage failure must never affect the response
    if state.db.is_some() {
        let state = state.clone();
        let session = analysis.session.clone();
        let player_stats = analysis.player_stats.clone();
        let item_usage = analysis.item_usage.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(db) = &state.db {
                let mut db = db.lock().unwrap();
                if let Err(e) = db.store_session(&session, &player_stats, &item_usage) {
                    eprintln!("Failed to store combat session {}: {}", session.session_id, e);
                }
            }
        });
    }

    Ok(Json(analysis))
}

/// Latest stored sessions; an absent database yields an empty list.
async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let Some(db) = &state.db else {
        return Ok(Json(SessionsResponse {
            sessions: Vec::new(),
        }));
    };

    let result = db.lock().unwrap().list_sessions(20);
    match result {
        Ok(sessions) => Ok(Json(SessionsResponse { sessions })),
        Err(e) => {
            eprintln!("Failed to fetch sessions: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch sessions",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_without_db() -> Arc<AppState> {
        Arc::new(AppState { db: None })
    }

    #[tokio::test]
    async fn empty_log_text_is_rejected() {
        let result = analyze_log(
            State(state_without_db()),
            Json(AnalyzeRequest {
                log_text: "   ".to_string(),
            }),
        )
        .await;
        let (status, _) = result.err().expect("expected a client error");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn log_with_no_valid_events_is_rejected() {
        let result = analyze_log(
            State(state_without_db()),
            Json(AnalyzeRequest {
                log_text: "this has no tabs\nneither does this".to_string(),
            }),
        )
        .await;
        let (status, Json(body)) = result.err().expect("expected a client error");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "No valid events found in the log");
    }

    #[tokio::test]
    async fn valid_log_returns_full_analysis() {
        let result = analyze_log(
            State(state_without_db()),
            Json(AnalyzeRequest {
                log_text: "1.5s\tAlice\tSword inflicted 10 Damage to Bob".to_string(),
            }),
        )
        .await;
        let Json(analysis) = result.expect("expected analysis");
        assert_eq!(analysis.session.total_events, 1);
        assert_eq!(analysis.session.player_names, vec!["Alice"]);
        assert_eq!(analysis.player_stats[0].total_damage, 10);
    }

    #[tokio::test]
    async fn sessions_without_db_is_empty_list() {
        let result = list_sessions(State(state_without_db())).await;
        let Json(body) = result.expect("expected empty listing");
        assert!(body.sessions.is_empty());
    }

    #[tokio::test]
    async fn analysis_is_stored_when_db_present() {
        let db = Database::open_in_memory().unwrap();
        let state = Arc::new(AppState {
            db: Some(Mutex::new(db)),
        });

        let result = analyze_log(
            State(state.clone()),
            Json(AnalyzeRequest {
                log_text: "1.0s\tAlice\tSword inflicted 10 Damage".to_string(),
            }),
        )
        .await;
        assert!(result.is_ok());

        // the store runs on a blocking task; wait for it to land
        let mut stored = Vec::new();
        for _ in 0..50 {
            stored = state.db.as_ref().unwrap().lock().unwrap().list_sessions(20).unwrap();
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].player_names, vec!["Alice"]);
    }
}
