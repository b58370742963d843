//! REST endpoints for messages, intake and the blocklist.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::intake::{NotificationRecord, SnsEvent};
use crate::message::Message;
use crate::pipeline::IntakePipeline;
use crate::store::{BlocklistStore, MessageStore};
use crate::throttle::{BlocklistEntry, BlocklistKind};

/// Shared state for API routes.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<IntakePipeline>,
    pub messages: Arc<dyn MessageStore>,
    pub blocklist: Arc<dyn BlocklistStore>,
}

/// Body of `PUT /api/blocklist/{type}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlocklistValues {
    #[serde(default)]
    values: BTreeSet<String>,
}

/// Build the API router.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api", get(base))
        .route("/api/messages", get(list_messages))
        .route("/api/messages/{id}", get(get_message).put(put_message))
        .route("/api/intake", post(intake))
        .route("/api/blocklist", get(list_blocklist))
        .route(
            "/api/blocklist/{throttle_type}",
            put(put_blocklist).delete(delete_blocklist),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn path_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"Path": "Not Found"}))).into_response()
}

fn store_failure(e: impl std::fmt::Display) -> Response {
    error!(error = %e, "Store request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

// ── Health / base ───────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "lordlaser"
    }))
}

async fn base() -> impl IntoResponse {
    Json(json!({"Path": "Base API"}))
}

// ── Messages ────────────────────────────────────────────────────────────

/// GET /api/messages
async fn list_messages(State(state): State<ApiState>) -> Response {
    match state.messages.scan_all().await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => store_failure(e),
    }
}

/// GET /api/messages/{id}
///
/// Only UUID ids are routable; anything else is a 404 on the path itself.
async fn get_message(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if Uuid::parse_str(&id).is_err() {
        return path_not_found();
    }
    match state.messages.get(&id).await {
        Ok(Some(message)) => Json(message).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("message {id} not found")),
        Err(e) => store_failure(e),
    }
}

/// PUT /api/messages/{id}
///
/// Full replace. An empty body `ID` takes the path id; a different one is rejected.
async fn put_message(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<Message>, JsonRejection>,
) -> Response {
    if Uuid::parse_str(&id).is_err() {
        return path_not_found();
    }
    let Json(mut message) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    if message.id.is_empty() {
        message.id = id;
    } else if message.id != id {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("body ID {} does not match path id {id}", message.id),
        );
    }

    match state.messages.put(&message).await {
        Ok(()) => {
            info!(id = %message.id, status = %message.status, "Message updated via API");
            Json(message).into_response()
        }
        Err(e) => store_failure(e),
    }
}

// ── Intake ──────────────────────────────────────────────────────────────

/// POST /api/intake
///
/// Runs the pipeline over an SNS event.
async fn intake(
    State(state): State<ApiState>,
    body: Result<Json<SnsEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let records: Vec<NotificationRecord> = event.into();
    match state.pipeline.run(&records).await {
        Ok(written) => Json(json!({"written": written})).into_response(),
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(json!({"error": e.to_string(), "written": e.written()})),
            )
                .into_response()
        }
    }
}

// ── Blocklist ───────────────────────────────────────────────────────────

/// GET /api/blocklist
async fn list_blocklist(State(state): State<ApiState>) -> Response {
    match state.blocklist.list_entries().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => store_failure(e),
    }
}

/// PUT /api/blocklist/{throttle_type}
async fn put_blocklist(
    State(state): State<ApiState>,
    Path(throttle_type): Path<String>,
    body: Result<Json<BlocklistValues>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let entry = BlocklistEntry {
        r#type: throttle_type,
        values: body.values,
    };
    if entry.kind() == BlocklistKind::Unrecognized {
        warn!(throttle_type = %entry.r#type, "Storing blocklist entry of unrecognized type");
    }
    match state.blocklist.put_entry(&entry).await {
        Ok(()) => Json(entry).into_response(),
        Err(e) => store_failure(e),
    }
}

/// DELETE /api/blocklist/{throttle_type}
async fn delete_blocklist(
    State(state): State<ApiState>,
    Path(throttle_type): Path<String>,
) -> Response {
    match state.blocklist.delete_entry(&throttle_type).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("blocklist entry {throttle_type} not found"),
        ),
        Err(e) => store_failure(e),
    }
}
