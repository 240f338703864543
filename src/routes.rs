use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::translate::{Language, TranslateRequest, TranslateResponse};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(list_languages))
        .route("/translate", post(translate))
}

/// Full application: routes, middleware and state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "model": state.translator.model_id()
    }))
}

async fn list_languages(State(state): State<AppState>) -> Json<Vec<Language>> {
    let pair = state.translator.language_pair();
    Json(vec![pair.source.clone(), pair.target.clone()])
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, AppError> {
    let Json(request) = payload?;

    let text = strip_input(&request.q);
    if text.is_empty() {
        return Ok(Json(TranslateResponse {
            translated: String::new(),
        }));
    }

    // Hints are accepted but the loaded model decides the direction.
    let pair = state.translator.language_pair();
    if !pair.matches_hint(&request.source, &request.target) {
        debug!(
            "Ignoring language hints {} -> {}, serving {} -> {}",
            request.source, request.target, pair.source.code, pair.target.code
        );
    }

    let request_id = Uuid::new_v4();
    let span = info_span!("translate", %request_id, chars = text.chars().count());
    let translated = state.translator.translate(text).instrument(span).await?;

    Ok(Json(TranslateResponse { translated }))
}

/// Trims Unicode whitespace plus the ASCII separators U+001C..=U+001F, which
/// `str::trim` keeps.
fn strip_input(q: &str) -> &str {
    q.trim_matches(|c: char| c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c))
}
