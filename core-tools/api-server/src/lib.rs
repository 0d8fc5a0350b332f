//! API Server
//!
//! JSON-over-HTTP front door for the browser client. Every route is a thin
//! adapter from an axum extractor to one [`CoreContext`] handle call; failures
//! are rendered as `{"error": ...}` with the status chosen by
//! [`MibuErrorExt::status_code`].
//!
//! # Endpoints
//!
//! - POST /api/plan, /api/classify - Classify free text
//! - POST /api/execute - Execute a classification
//! - GET /api/execute?category= - List records of one category
//! - POST /api/travel-time - Travel duration between two places
//! - GET /api/travel-time - Directions API quota usage
//! - POST /api/analyze-receipt - Receipt photo (multipart `file`, `save`)
//! - POST /api/transcribe - Speech to text (multipart `audio`)
//! - POST /api/speak - Text to speech, returns audio/mpeg
//! - POST /api/team/availability - Shared free slots
//! - GET /api/briefing?userId= - Morning briefing
//! - GET /health, /api/status - Liveness and version

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::types::{
    AvailabilityRequest, AvailabilityResponse, Briefing, ClassifyRequest, ClassifyResponse,
    ExecuteRequest, ExecuteResponse, ReceiptOutcome, SpeakRequest, TranscribeResponse,
    TravelTimeRequest, TravelTimeResponse, TravelUsage, Upload,
};
use sdk::{CoreContext, EngineError, MibuErrorExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Uploads (audio, receipt photos) may be larger than axum's 2 MB default
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Error rendered as a JSON body
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(EngineError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Rejected request: {}", self.0);
        }

        let mut body = json!({ "error": self.0.to_string() });
        if let Some(raw) = self.0.raw() {
            body["raw"] = Value::String(raw.to_string());
        }

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Shared handler state
#[derive(Clone)]
struct ServerState {
    ctx: CoreContext,
    version: String,
}

/// Build the router over a context.
///
/// Exposed separately from [`APIServer`] so tests can drive it with
/// `tower::ServiceExt::oneshot` without binding a socket.
pub fn router(ctx: CoreContext, version: impl Into<String>, permissive_cors: bool) -> Router {
    let state = ServerState {
        ctx,
        version: version.into(),
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/plan", post(classify_handler))
        .route("/api/classify", post(classify_handler))
        .route("/api/execute", post(execute_handler).get(list_handler))
        .route(
            "/api/travel-time",
            post(travel_time_handler).get(travel_usage_handler),
        )
        .route("/api/analyze-receipt", post(receipt_handler))
        .route("/api/transcribe", post(transcribe_handler))
        .route("/api/speak", post(speak_handler))
        .route("/api/team/availability", post(availability_handler))
        .route("/api/briefing", get(briefing_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if permissive_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// API server
pub struct APIServer {
    ctx: CoreContext,
    version: String,
    permissive_cors: bool,
    addr: Option<SocketAddr>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl APIServer {
    pub fn new(ctx: CoreContext, version: impl Into<String>) -> Self {
        Self {
            ctx,
            version: version.into(),
            permissive_cors: true,
            addr: None,
            shutdown_tx: None,
            task: None,
        }
    }

    pub fn with_permissive_cors(mut self, enabled: bool) -> Self {
        self.permissive_cors = enabled;
        self
    }

    /// Address the server is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Bind `host:port` and serve in a background task. Port 0 picks a free port.
    pub async fn start(&mut self, host: &str, port: u16) -> Result<SocketAddr, EngineError> {
        if let Some(addr) = self.addr {
            return Ok(addr);
        }

        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .map_err(|e| EngineError::Network(format!("Failed to bind {}:{}: {}", host, port, e)))?;

        let addr = listener
            .local_addr()
            .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;

        let app = router(self.ctx.clone(), self.version.clone(), self.permissive_cors);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let task = tokio::spawn(async move {
            tracing::info!("API server listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                    tracing::info!("API server shutting down gracefully");
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("API server error: {}", e);
                });
        });

        self.addr = Some(addr);
        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        Ok(addr)
    }

    /// Signal shutdown and wait for in-flight requests to finish
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            shutdown_tx.send(()).ok();
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| EngineError::Network(format!("API server task failed: {}", e)))?;
            tracing::info!("API server stopped");
        }
        self.addr = None;
        Ok(())
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status_handler(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "version": state.version,
    }))
}

async fn classify_handler(
    State(state): State<ServerState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> ApiResult<ClassifyResponse> {
    let Json(request) = payload?;
    Ok(Json(state.ctx.assistant.classify(request).await?))
}

async fn execute_handler(
    State(state): State<ServerState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<ExecuteResponse> {
    let Json(request) = payload?;
    Ok(Json(state.ctx.assistant.execute(request).await?))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    category: Option<String>,
}

async fn list_handler(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    Ok(Json(state.ctx.assistant.list(query.category).await?))
}

async fn travel_time_handler(
    State(state): State<ServerState>,
    payload: Result<Json<TravelTimeRequest>, JsonRejection>,
) -> ApiResult<TravelTimeResponse> {
    let Json(request) = payload?;
    Ok(Json(state.ctx.travel.estimate(request).await?))
}

async fn travel_usage_handler(State(state): State<ServerState>) -> Json<TravelUsage> {
    Json(state.ctx.travel.usage())
}

/// Read a multipart form, keeping the named file field and any text fields
async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<(Upload, Vec<(String, String)>), ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        ApiError(EngineError::InvalidRequest(format!("Invalid form data: {}", e)))
    };

    let mut upload = Upload::default();
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            upload.file_name = field.file_name().map(str::to_string);
            upload.content_type = field.content_type().map(str::to_string);
            upload.bytes = field.bytes().await.map_err(bad)?.to_vec();
        } else {
            let value = field.text().await.map_err(bad)?;
            fields.push((name, value));
        }
    }

    Ok((upload, fields))
}

async fn receipt_handler(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> ApiResult<ReceiptOutcome> {
    let (image, fields) = read_form(multipart, "file").await?;
    let save = fields
        .iter()
        .any(|(name, value)| name == "save" && value.trim() == "true");

    Ok(Json(state.ctx.media.analyze_receipt(image, save).await?))
}

async fn transcribe_handler(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> ApiResult<TranscribeResponse> {
    let (audio, _) = read_form(multipart, "audio").await?;
    let text = state.ctx.media.transcribe(audio).await?;
    Ok(Json(TranscribeResponse {
        success: true,
        text,
    }))
}

async fn speak_handler(
    State(state): State<ServerState>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let audio = state
        .ctx
        .media
        .speak(request.text.unwrap_or_default())
        .await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

async fn availability_handler(
    State(state): State<ServerState>,
    payload: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> ApiResult<AvailabilityResponse> {
    let Json(request) = payload?;
    let user_ids = request
        .user_ids()
        .ok_or_else(|| EngineError::InvalidRequest("Invalid userIds".to_string()))?;

    Ok(Json(
        state.ctx.team.availability(user_ids, request.date).await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BriefingQuery {
    user_id: Option<String>,
}

async fn briefing_handler(
    State(state): State<ServerState>,
    Query(query): Query<BriefingQuery>,
) -> ApiResult<Briefing> {
    Ok(Json(state.ctx.assistant.briefing(query.user_id).await?))
}
