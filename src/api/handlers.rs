//! HTTP request handlers

use super::types::{ConversationView, ErrorResponse, SendMessageRequest};
use super::{AppState, Session, SessionHandle};
use crate::runtime::DriverError;
use crate::state_machine::Effect;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/conversations", post(create_conversation))
        .route("/api/conversations/:id", get(get_conversation))
        // Turns
        .route("/api/conversations/:id/messages", post(send_message))
        .route("/api/conversations/:id/reply", post(retry_reply))
        .route("/api/conversations/:id/evaluation", post(retry_evaluation))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_conversation(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ConversationView>), AppError> {
    state.sweep_sessions_at(Utc::now()).await;

    let conv = {
        let mut rng = rand::thread_rng();
        state.driver.start(&mut rng)
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session = %session_id, "Session created");

    let view = ConversationView::new(&session_id, &conv);
    state.insert_session(session_id, conv).await;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(ConversationView::new(&id, &session.conv)))
}

// ============================================================
// Turns
// ============================================================

/// Accept a human message, then run the automated turn and, if that ends the
/// conversation, the evaluation and archive.
async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ConversationView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    session.last_active = Utc::now();

    state.driver.submit_human(&mut session.conv, &req.text)?;
    advance(&state, &id, &mut session).await?;
    Ok(Json(ConversationView::new(&id, &session.conv)))
}

/// Retry an automated turn whose earlier attempt failed
async fn retry_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    resume(&state, &id, Effect::RequestReply, "No automated reply is pending").await
}

/// Retry the evaluation of a finished conversation
async fn retry_evaluation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    resume(&state, &id, Effect::RequestEvaluation, "No evaluation is pending").await
}

async fn resume(
    state: &AppState,
    id: &str,
    pending: Effect,
    nothing_pending: &str,
) -> Result<Json<ConversationView>, AppError> {
    let handle = find_session(state, id).await?;
    let mut session = handle.lock().await;
    session.last_active = Utc::now();

    if session.conv.next_effect() != pending {
        return Err(AppError::Conflict(format!(
            "{nothing_pending} for this session"
        )));
    }
    advance(state, id, &mut session).await?;
    Ok(Json(ConversationView::new(id, &session.conv)))
}

/// Perform the pending automated work: reply, then evaluation and archive
/// once the conversation is finished.
///
/// A retryable evaluation failure leaves the session unarchived so the client
/// can try again; a permanent one archives the conversation without an
/// evaluation. Either way the error reaches the client.
async fn advance(state: &AppState, id: &str, session: &mut Session) -> Result<(), AppError> {
    if session.conv.next_effect() == Effect::RequestReply {
        state
            .driver
            .generate_reply(id, &mut session.conv, &state.shutdown)
            .await?;
    }

    if session.conv.next_effect() == Effect::RequestEvaluation {
        let result = state
            .driver
            .evaluate(id, &mut session.conv, &state.shutdown)
            .await;
        if let Err(e) = result {
            if !e.is_retryable() && !session.archived {
                archive(state, id, session);
            }
            return Err(e.into());
        }
        archive(state, id, session);
    }
    Ok(())
}

fn archive(state: &AppState, id: &str, session: &mut Session) {
    // Fire and forget; the response does not wait on the store
    drop(state.driver.archive(id, &session.conv));
    session.archived = true;
    tracing::info!(
        session = %id,
        evaluated = session.conv.evaluation().is_some(),
        "Conversation finished"
    );
}

async fn find_session(state: &AppState, id: &str) -> Result<SessionHandle, AppError> {
    state
        .session(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("reveal_chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(String),
    /// Backend failure; `retryable` tells the client whether to call the
    /// reply endpoint again
    Upstream {
        status: StatusCode,
        message: String,
        retryable: bool,
    },
    Internal(String),
}

impl From<DriverError> for AppError {
    fn from(e: DriverError) -> Self {
        let message = e.to_string();
        match e {
            DriverError::EmptyMessage => AppError::BadRequest(message),
            DriverError::WrongTurn { .. } | DriverError::Transition(_) => {
                AppError::Conflict(message)
            }
            DriverError::RateLimited => AppError::TooManyRequests(message),
            DriverError::Timeout(_) => AppError::Upstream {
                status: StatusCode::GATEWAY_TIMEOUT,
                message,
                retryable: true,
            },
            DriverError::Generation(_) | DriverError::Parse { .. } => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                retryable: e.is_retryable(),
                message,
            },
            DriverError::Cancelled => AppError::Upstream {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message,
                retryable: false,
            },
            DriverError::InputClosed | DriverError::Config(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, false),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, false),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg, false),
            AppError::Upstream {
                status,
                message,
                retryable,
            } => (status, message, retryable),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, false),
        };

        if status.is_server_error() {
            tracing::warn!(status = %status, error = %message, "Request failed");
        }

        let body = Json(ErrorResponse::new(message, retryable));
        (status, body).into_response()
    }
}
