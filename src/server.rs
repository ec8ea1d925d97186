//! HTTP surface for the loader.
//!
//! Acts as the external message channel and exposes the acquisition paths
//! that do not need a local picker.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/messages` | Deliver a `RENDER_OFFICE` chunk or `CLOSE_EDITOR` |
//! | `POST` | `/documents/url` | Fetch and open `{ "url", "file_name"? }` |
//! | `POST` | `/documents/new` | Open a blank `{ "kind": "word" \| "cell" \| "slide" }` |
//! | `GET`  | `/documents/current` | Current document metadata |
//! | `GET`  | `/ui` | Panel view, loading and guide state |
//! | `POST` | `/ui/guide/dismiss` | Dismiss the menu guide for good |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "network_failure", "message": "Failed to fetch document: 404 Not Found" } }
//! ```

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::channel::{ChannelDispatcher, ChannelMessage, DispatchReport};
use crate::error::AcquisitionError;
use crate::models::{AcquisitionResult, DocumentKind};
use crate::orchestrator::AcquisitionOrchestrator;
use crate::ui::{PanelView, VisibilityController};

/// Shared state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AcquisitionOrchestrator>,
    pub panel: Arc<VisibilityController>,
    dispatcher: ChannelDispatcher,
}

impl AppState {
    pub fn new(orchestrator: Arc<AcquisitionOrchestrator>, panel: Arc<VisibilityController>) -> Self {
        let dispatcher = ChannelDispatcher::new(orchestrator.clone());
        Self {
            orchestrator,
            panel,
            dispatcher,
        }
    }
}

/// Build the router. Split out from [`run_server`] so tests can serve it
/// on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/messages", post(handle_message))
        .route("/documents/url", post(handle_open_url))
        .route("/documents/new", post(handle_new_document))
        .route("/documents/current", get(handle_current_document))
        .route("/ui", get(handle_ui_state))
        .route("/ui/guide/dismiss", post(handle_dismiss_guide))
        .layer(cors)
        .with_state(state)
}

/// Bind to `bind` and serve until the process is terminated.
pub async fn run_server(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind, "loader listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<AcquisitionError> for AppError {
    fn from(err: AcquisitionError) -> Self {
        let status = match &err {
            AcquisitionError::TransferProtocolViolation(_)
            | AcquisitionError::UnsupportedFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AcquisitionError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            AcquisitionError::ConversionEngineFailure(_) | AcquisitionError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /messages ============

/// Channel messages never produce an HTTP error; the report says what
/// happened.
async fn handle_message(
    State(state): State<AppState>,
    Json(message): Json<ChannelMessage>,
) -> Json<DispatchReport> {
    Json(state.dispatcher.dispatch(message).await)
}

// ============ POST /documents/url ============

#[derive(Deserialize)]
struct OpenUrlRequest {
    url: String,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum AcquisitionResponse {
    Opened { file_name: String, size: usize },
    Cancelled,
    Failed { reason: String },
}

impl From<AcquisitionResult> for AcquisitionResponse {
    fn from(result: AcquisitionResult) -> Self {
        match result {
            AcquisitionResult::Success { file_name, binary } => Self::Opened {
                file_name,
                size: binary.map(|b| b.len()).unwrap_or(0),
            },
            AcquisitionResult::Cancelled => Self::Cancelled,
            AcquisitionResult::Failed { reason } => Self::Failed { reason },
        }
    }
}

async fn handle_open_url(
    State(state): State<AppState>,
    Json(req): Json<OpenUrlRequest>,
) -> Result<Json<AcquisitionResponse>, AppError> {
    if req.url.trim().is_empty() {
        return Err(bad_request("url must not be empty"));
    }
    let result = state
        .orchestrator
        .open_url(&req.url, req.file_name.as_deref())
        .await?;
    Ok(Json(result.into()))
}

// ============ POST /documents/new ============

#[derive(Deserialize)]
struct NewDocumentRequest {
    kind: String,
}

async fn handle_new_document(
    State(state): State<AppState>,
    Json(req): Json<NewDocumentRequest>,
) -> Result<Json<AcquisitionResponse>, AppError> {
    let kind = DocumentKind::parse(&req.kind).ok_or_else(|| {
        bad_request(format!(
            "unknown document kind '{}': expected word, cell or slide",
            req.kind
        ))
    })?;
    let result = state.orchestrator.create_new(kind).await?;
    Ok(Json(result.into()))
}

// ============ GET /documents/current ============

#[derive(Serialize)]
struct CurrentDocumentResponse {
    loaded: bool,
    file_name: Option<String>,
    kind: Option<DocumentKind>,
    size: usize,
    blank: bool,
    source_url: Option<String>,
    sha256: Option<String>,
}

async fn handle_current_document(State(state): State<AppState>) -> Json<CurrentDocumentResponse> {
    let record = state.orchestrator.session().get();
    if record.is_empty() {
        return Json(CurrentDocumentResponse {
            loaded: false,
            file_name: None,
            kind: None,
            size: 0,
            blank: false,
            source_url: None,
            sha256: None,
        });
    }

    let sha256 = record.binary.as_ref().map(|b| {
        let mut hasher = Sha256::new();
        hasher.update(b.as_ref());
        format!("{:x}", hasher.finalize())
    });

    Json(CurrentDocumentResponse {
        loaded: true,
        file_name: Some(record.file_name.clone()),
        kind: record.kind(),
        size: record.size(),
        blank: record.is_blank(),
        source_url: record.source_url.clone(),
        sha256,
    })
}

// ============ GET /ui ============

#[derive(Serialize)]
struct UiStateResponse {
    panel: PanelView,
    loading: bool,
    pending_chunks: usize,
    guide_showing: bool,
    guide_dismissed: bool,
    last_alert: Option<String>,
}

async fn handle_ui_state(State(state): State<AppState>) -> Json<UiStateResponse> {
    let orchestrator = &state.orchestrator;
    Json(UiStateResponse {
        panel: state.panel.view(),
        loading: orchestrator.loading().is_visible(),
        pending_chunks: orchestrator.pending_chunks(),
        guide_showing: orchestrator.guide().is_showing(),
        guide_dismissed: orchestrator.guide().is_dismissed(),
        last_alert: state.panel.last_alert(),
    })
}

// ============ POST /ui/guide/dismiss ============

async fn handle_dismiss_guide(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.orchestrator.guide().dismiss().map_err(|e| AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: e.to_string(),
    })?;
    Ok(StatusCode::NO_CONTENT)
}
