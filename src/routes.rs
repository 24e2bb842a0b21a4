use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::converter::{ConversionRequest, ConversionResult};
use crate::error::ConvertError;
use crate::languages::{find_language, language_names};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    let static_dir = &state.config.server.static_dir;

    Router::new()
        // WebSocket
        .route("/client-ws", get(crate::websocket::websocket_handler))
        // Health and readiness
        .route("/api/health", get(health_check))
        .route("/api/status", get(readiness_status))
        // Languages
        .route("/api/languages", get(get_languages))
        .route("/api/languages/:name/example", get(get_example))
        // Conversion
        .route("/api/convert", post(convert))
        // Browser page
        .fallback_service(ServeDir::new(static_dir))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ai_ready": state.readiness.is_ready(),
        "provider": state.provider_name(),
        "clients": state.client_sessions.len(),
    }))
}

async fn readiness_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ready": state.readiness.is_ready(),
        "probing": state.readiness.is_probing(),
    }))
}

async fn get_languages() -> Json<Value> {
    Json(json!(language_names()))
}

async fn get_example(Path(name): Path<String>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let language = find_language(&name).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Unknown language: {}", name)})),
        )
    })?;

    Ok(Json(json!({
        "language": language.name,
        "example": language.example,
    })))
}

async fn convert(
    State(state): State<AppState>,
    Json(request): Json<ConversionRequest>,
) -> Result<Json<ConversionResult>, ConvertError> {
    let result = state.converter.convert(&state.api_gate, &request).await?;
    Ok(Json(result))
}
