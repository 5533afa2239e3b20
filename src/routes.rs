//! REST endpoints for intake sessions, summary download and booking.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::warn;
use uuid::Uuid;

use crate::booking::SLOTS;
use crate::error::{IntakeError, LlmError, RenderError};
use crate::intake::SessionView;
use crate::sessions::{SessionError, SessionRegistry};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
}

/// Build the Axum router for the intake service.
pub fn intake_routes(sessions: Arc<SessionRegistry>) -> Router {
    let state = AppState { sessions };

    Router::new()
        .route("/health", get(health))
        .route("/api/slots", get(list_slots))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(end_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/sessions/{id}/summary.pdf", get(download_summary))
        .route("/api/sessions/{id}/booking/start", post(start_booking))
        .route("/api/sessions/{id}/booking/select", post(select_slot))
        .route("/api/sessions/{id}/booking/confirm", post(confirm_booking))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP status for a failed session operation.
pub fn status_for(error: &SessionError) -> StatusCode {
    match error {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Intake(IntakeError::EmptyInput) => StatusCode::BAD_REQUEST,
        SessionError::Intake(IntakeError::Model(LlmError::RateLimited { .. })) => {
            StatusCode::TOO_MANY_REQUESTS
        }
        SessionError::Intake(IntakeError::Model(_)) => StatusCode::BAD_GATEWAY,
        SessionError::Booking(_) => StatusCode::CONFLICT,
        SessionError::Render(RenderError::NothingToRender) => StatusCode::NOT_FOUND,
        SessionError::Render(RenderError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(serde_json::json!({"error": message.to_string()})),
    )
        .into_response()
}

fn session_error(error: SessionError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!(status = status.as_u16(), error = %error, "Session request failed");
    }
    error_response(status, error)
}

fn parse_session_id(id: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(id).map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid session ID"))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "wellness-intake",
        "model": state.sessions.controller().model_name(),
        "sessions": state.sessions.count().await,
    }))
}

async fn list_slots() -> impl IntoResponse {
    Json(SLOTS)
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.sessions.create().await;
    (StatusCode::CREATED, Json(view))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, Response> {
    let id = parse_session_id(&id)?;
    state.sessions.view(id).await.map(Json).map_err(session_error)
}

async fn end_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if state.sessions.end(id).await {
        (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ended"})),
        )
            .into_response()
    } else {
        session_error(SessionError::NotFound(id))
    }
}

#[derive(Deserialize)]
struct MessageRequest {
    content: String,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> Result<Response, Response> {
    let id = parse_session_id(&id)?;
    let (outcome, view) = state
        .sessions
        .send_message(id, &body.content)
        .await
        .map_err(session_error)?;

    Ok(Json(serde_json::json!({
        "reply": outcome.reply,
        "classified": outcome.classified,
        "session": view,
    }))
    .into_response())
}

// ── Summary ─────────────────────────────────────────────────────────────

async fn download_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id = parse_session_id(&id)?;
    let doc = state.sessions.summary(id).await.map_err(session_error)?;

    let disposition = format!("attachment; filename=\"{}\"", doc.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.bytes,
    )
        .into_response())
}

// ── Booking ─────────────────────────────────────────────────────────────

async fn start_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, Response> {
    let id = parse_session_id(&id)?;
    state
        .sessions
        .start_booking(id)
        .await
        .map(Json)
        .map_err(session_error)
}

#[derive(Deserialize)]
struct SelectSlotRequest {
    slot: String,
}

async fn select_slot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SelectSlotRequest>,
) -> Result<Json<SessionView>, Response> {
    let id = parse_session_id(&id)?;
    state
        .sessions
        .select_slot(id, &body.slot)
        .await
        .map(Json)
        .map_err(session_error)
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id = parse_session_id(&id)?;
    let (confirmation, view) = state
        .sessions
        .confirm_booking(id)
        .await
        .map_err(session_error)?;

    Ok(Json(serde_json::json!({
        "confirmation": confirmation,
        "session": view,
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::BookingError;

    #[test]
    fn model_failures_map_to_gateway_errors() {
        let failed = SessionError::Intake(IntakeError::Model(LlmError::RequestFailed {
            provider: "groq".to_string(),
            reason: "timeout".to_string(),
        }));
        assert_eq!(status_for(&failed), StatusCode::BAD_GATEWAY);

        let limited = SessionError::Intake(IntakeError::Model(LlmError::RateLimited {
            provider: "groq".to_string(),
            retry_after: Some(Duration::from_secs(2)),
        }));
        assert_eq!(status_for(&limited), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            status_for(&SessionError::NotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&SessionError::Intake(IntakeError::EmptyInput)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SessionError::Booking(BookingError::NotStarted)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&SessionError::Render(RenderError::NothingToRender)),
            StatusCode::NOT_FOUND
        );
    }
}
