use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use lkv_core::{CoreError, Dispatcher, ErrorBody, ErrorCode, OperationName, Path, Request};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler() -> Json<serde_json::Value> {
    let names = |path: Path| -> Vec<&'static str> {
        path.operations().into_iter().map(OperationName::as_str).collect()
    };
    Json(json!({
        "name": "lkv-server",
        "version": env!("CARGO_PKG_VERSION"),
        "operations": {
            "query": names(Path::Query),
            "invoke": names(Path::Invoke),
        },
    }))
}

pub async fn query_handler(State(state): State<AppState>, Json(request): Json<Request>) -> Response {
    run(state, Path::Query, request).await
}

pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(request): Json<Request>,
) -> Response {
    run(state, Path::Invoke, request).await
}

async fn run(state: AppState, path: Path, request: Request) -> Response {
    let dispatcher = state.dispatcher;
    // Ledger access and password hashing block; keep them off the runtime threads.
    let joined = tokio::task::spawn_blocking(move || {
        dispatcher.dispatch(path, &request.function, &request.args)
    })
    .await;

    match joined {
        Ok(Ok(payload)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            payload,
        )
            .into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join_err) => {
            tracing::error!(path = %path, "dispatch task failed: {join_err}");
            let body = ErrorBody {
                code: ErrorCode::Internal,
                message: "dispatch task failed".into(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn error_response(err: &CoreError) -> Response {
    let body = ErrorBody::from(err);
    (status_for(body.code), Json(body)).into_response()
}

/// HTTP status for a wire error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArguments | ErrorCode::UnknownOperation => StatusCode::BAD_REQUEST,
        ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ErrorCode::UserNotFound | ErrorCode::ReadFailed => StatusCode::NOT_FOUND,
        ErrorCode::UserAlreadyExists => StatusCode::CONFLICT,
        ErrorCode::CorruptRecord | ErrorCode::StoreError | ErrorCode::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
