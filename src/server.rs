use crate::config::Config;
use crate::detect::{DetectRequest, Detection, DetectionResponse, Detector};
use crate::engine::{EngineHandle, OcrEngine};
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::{DetectError, OcrError};
use crate::ocr::MultiPassExecutor;
use crate::preprocessing::Pipeline;
use crate::plate::normalize_plate;
use crate::registry::{
    DetectionLogEntry, InMemoryRegistry, MemoryDetectionLog, VehicleLookup, VehicleRecord,
};
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    pub lookup: Arc<dyn VehicleLookup>,
    pub detection_log: Arc<MemoryDetectionLog>,
    pub engine: EngineInfo,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn OcrEngine>, lookup: Arc<dyn VehicleLookup>) -> Self {
        let detection_log = Arc::new(MemoryDetectionLog::default());
        let engine_info = EngineInfo {
            name: engine.name(),
            description: engine.description(),
        };

        let detector = Detector::new(
            Pipeline::new(config.preset),
            MultiPassExecutor::new(EngineHandle::new(engine)),
            lookup.clone(),
            detection_log.clone(),
        )
        .with_max_candidates(config.max_candidates);

        Self {
            detector: Arc::new(detector),
            lookup,
            detection_log,
            engine: engine_info,
            config: Arc::new(config),
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ProfileInfo {
    pub name: String,
    pub config: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: EngineInfo,
    pub language: String,
    pub preset: String,
    pub profiles: Vec<ProfileInfo>,
    pub max_candidates: usize,
    pub max_file_size_bytes: usize,
    pub detect_timeout_secs: u64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

const DEFAULT_LOG_LIMIT: usize = 50;

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engines = EngineRegistry::new(&config)?;
    tracing::info!(
        "Available engines: {:?} (default: {})",
        engines.info().iter().map(|e| e.name).collect::<Vec<_>>(),
        engines.default_name()
    );
    let engine = engines.default().ok_or_else(|| {
        OcrError::InitializationError("default engine is not registered".to_string())
    })?;

    let registry = match &config.registry {
        Some(path) => {
            let registry = InMemoryRegistry::from_file(path)?;
            tracing::info!("Loaded {} vehicles from {:?}", registry.len(), path);
            registry
        }
        None => {
            tracing::warn!("No vehicle registry configured; lookups will not match");
            InMemoryRegistry::default()
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, engine, Arc::new(registry));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let body_limit = request_body_limit(state.config.max_file_size);

    Router::new()
        .route("/detect", post(handle_detect))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/vehicles/:plate", get(handle_vehicle))
        .route("/detection-logs", get(handle_detection_logs))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Room for multipart framing and the text fields around the image
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Length of the base64 text encoding `size` bytes
fn base64_len(size: usize) -> usize {
    size.div_ceil(3).saturating_mul(4)
}

/// Largest request body accepted: an image of `max_file_size` bytes sent
/// as a base64 data URL, plus framing
pub fn request_body_limit(max_file_size: usize) -> usize {
    base64_len(max_file_size).saturating_add(MULTIPART_OVERHEAD)
}

/// Handle detection requests. Always answers with a structured body.
async fn handle_detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<DetectionResponse> {
    let request = match multipart {
        Ok(multipart) => read_detect_request(multipart, state.config.max_file_size).await,
        Err(rejection) => Err(DetectError::InvalidRequest(rejection.body_text())),
    };

    let result = match request {
        Ok(request) => run_detection(&state, request).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        tracing::warn!(error = %e, "Detection request failed");
    }

    Json(DetectionResponse::from(result))
}

async fn read_detect_request(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<DetectRequest, DetectError> {
    let mut request = DetectRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DetectError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                request.file = Some(read_limited(field, max_file_size, max_file_size).await?);
            }
            "image_data" => {
                let data =
                    read_limited(field, base64_len(max_file_size) + 256, max_file_size).await?;
                request.image_data = Some(String::from_utf8(data).map_err(|_| {
                    DetectError::InvalidRequest("image_data is not valid UTF-8".to_string())
                })?);
            }
            "manual_plate" => {
                request.manual_plate = Some(field.text().await.map_err(|e| {
                    DetectError::InvalidRequest(format!("Invalid manual_plate: {}", e))
                })?);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(request)
}

/// Read one field chunk by chunk, giving up with `ImageTooLarge` once it
/// exceeds `limit` bytes or the request body limit cuts it off.
///
/// `max_file_size` is the limit reported to the client. When the body limit
/// hits first, `size` is the number of field bytes received before that.
async fn read_limited(
    mut field: Field<'_>,
    limit: usize,
    max_file_size: usize,
) -> Result<Vec<u8>, DetectError> {
    let mut data = Vec::new();
    let mut received = 0usize;

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                received += chunk.len();
                if received <= limit {
                    data.extend_from_slice(&chunk);
                }
            }
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(DetectError::ImageTooLarge {
                    size: received.max(limit + 1),
                    max: max_file_size,
                });
            }
            Err(e) => {
                return Err(DetectError::InvalidRequest(format!(
                    "Failed to read field data: {}",
                    e
                )));
            }
        }
    }

    if received > limit {
        return Err(DetectError::ImageTooLarge {
            size: received,
            max: max_file_size,
        });
    }
    Ok(data)
}

/// Run the blocking pipeline off the async runtime, bounded by the
/// configured timeout. A timed-out pipeline keeps running to completion on
/// its blocking thread; its result is discarded.
async fn run_detection(
    state: &AppState,
    request: DetectRequest,
) -> Result<Detection, DetectError> {
    let detector = state.detector.clone();
    let timeout = state.config.detect_timeout;
    let task = tokio::task::spawn_blocking(move || detector.detect(request));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(DetectError::Internal(format!(
            "detection task failed: {}",
            join_error
        ))),
        Err(_) => Err(DetectError::Timeout(timeout)),
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let profiles = state
        .detector
        .executor()
        .profiles()
        .iter()
        .map(|p| ProfileInfo {
            name: p.name.clone(),
            config: p.config_string(),
        })
        .collect();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.engine.clone(),
        language: state.config.language.clone(),
        preset: state.detector.pipeline().preset().as_str().to_string(),
        profiles,
        max_candidates: state.detector.max_candidates(),
        max_file_size_bytes: state.config.max_file_size,
        detect_timeout_secs: state.config.detect_timeout.as_secs(),
    })
}

/// Look up a registered vehicle by any formatting of its plate
async fn handle_vehicle(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<VehicleRecord>, (StatusCode, Json<ErrorResponse>)> {
    state
        .lookup
        .find_by_plate(&normalize_plate(&plate))
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Vehicle not found".to_string(),
                    code: "VEHICLE_NOT_FOUND".to_string(),
                }),
            )
        })
}

/// Most recent detections, newest first, paged with `skip` and `limit`
async fn handle_detection_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<DetectionLogEntry>> {
    Json(
        state
            .detection_log
            .recent(query.skip.unwrap_or(0), query.limit.unwrap_or(DEFAULT_LOG_LIMIT)),
    )
}
