//! HTTP surface for the bridge.
//!
//! - `POST /api/v1/chatbot` - ask a question
//! - `GET /health` - liveness plus limiter occupancy

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{Instrument, info, info_span, warn};

use crate::bridge::{Answer, Bridge};
use crate::consts::{CHATBOT_ROUTE, MSG_INVALID_BODY};
use crate::error::{BridgeError, ErrorKind};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub verbose_errors: bool,
    pub max_body_bytes: usize,
    next_request_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>, verbose_errors: bool, max_body_bytes: usize) -> Self {
        Self {
            bridge,
            verbose_errors,
            max_body_bytes,
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    pub question: String,
    pub response: String,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            success: true,
            question: answer.question,
            response: answer.response,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: bool,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub engine: String,
    pub in_flight: usize,
    pub capacity: usize,
}

/// A bridge error together with how much of it the client may see.
struct ApiError {
    err: BridgeError,
    verbose: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.err.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            success: false,
            error: true,
            kind,
            message: self.err.client_message(self.verbose),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHATBOT_ROUTE, post(ask_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, engine = state.bridge.engine_name(), "bridge listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let request_id = state.next_request_id.fetch_add(1, Ordering::Relaxed);
    let span = info_span!("ask", request_id);

    async move {
        let verbose = state.verbose_errors;
        let Json(request) = payload.map_err(|rejection| {
            warn!(error = %rejection, "rejected request body");
            ApiError {
                err: BridgeError::InvalidInput(MSG_INVALID_BODY),
                verbose,
            }
        })?;

        match state.bridge.ask(request.question.as_deref()).await {
            Ok(answer) => Ok(Json(answer.into())),
            Err(err) => {
                info!(kind = ?err.kind(), error = %err, "question failed");
                Err(ApiError { err, verbose })
            }
        }
    }
    .instrument(span)
    .await
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthBody> {
    let limiter = state.bridge.limiter();
    Json(HealthBody {
        status: "ok",
        engine: state.bridge.engine_name().to_string(),
        in_flight: limiter.in_flight(),
        capacity: limiter.capacity(),
    })
}
