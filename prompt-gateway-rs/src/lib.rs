use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

pub mod inference_client;
pub mod logging;
pub mod templates;
pub mod validation;

#[cfg(test)]
mod tests;

use inference_client::TextGenerator;
use templates::{PromptTemplate, DEFAULT_PLATFORM};
use validation::{
    sanitize_json_input, sanitize_json_object, validate_content_type, validate_generate_request,
    ApiValidationError, ValidationErrorResponse, MAX_PAYLOAD_SIZE,
};

pub const SERVICE_NAME: &str = "prompt-gateway";

const GENERATE_PATH: &str = "/generate";

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

/// Generate request body (JSON)
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub template: PromptTemplate,
}

/// Generate response body (JSON)
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub expanded_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: u64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    generator: Arc<dyn TextGenerator>,
    started_at: Instant,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            started_at: Instant::now(),
        }
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(GENERATE_PATH, post(generate_handler))
        .layer(middleware::from_fn(validate_request_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// GET / - Root endpoint
async fn root_handler() -> impl IntoResponse {
    let templates: Vec<&str> = PromptTemplate::ALL.iter().map(PromptTemplate::as_str).collect();

    Json(serde_json::json!({
        "service": "Prompt Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "POST /generate"
        ],
        "templates": templates,
    }))
}

/// GET /health - Health check endpoint
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        service_name: SERVICE_NAME.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        status: "SERVING".to_string(),
    })
}

/// POST /generate - Expand an idea into a platform-tuned prompt
async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "generate",
        %request_id,
        platform = %request.platform,
        template = request.template.as_str()
    );

    async move {
        tracing::info!(prompt_len = request.prompt.len(), "Generate request");

        let instruction = request.template.render(&request.platform, &request.prompt);

        match state.generator.complete(&instruction).await {
            Ok(text) => (
                StatusCode::OK,
                Json(GenerateResponse {
                    expanded_prompt: text.trim().to_string(),
                }),
            )
                .into_response(),
            Err(err) => {
                tracing::error!(error = %err, "Generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: err.to_string(),
                        code: 500,
                    }),
                )
                    .into_response()
            }
        }
    }
    .instrument(span)
    .await
}

/// Validates and sanitizes the JSON body of `POST /generate`
///
/// Responds with a JSON error before the handler runs when the content type,
/// body, schema or prompt is unacceptable.
async fn validate_request_middleware(
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ValidationErrorResponse>)> {
    if req.method() != Method::POST || req.uri().path() != GENERATE_PATH {
        return Ok(next.run(req).await);
    }

    if let Err(err) = validate_content_type(req.headers(), "application/json") {
        return Err(err.to_response());
    }

    let (mut parts, body) = req.into_parts();

    // With a live client the only read failure is the size limit
    let body_bytes = to_bytes(body, MAX_PAYLOAD_SIZE).await.map_err(|e| {
        ApiValidationError::PayloadTooLarge(format!(
            "Failed to read request body within {} bytes: {}",
            MAX_PAYLOAD_SIZE, e
        ))
        .to_response()
    })?;

    let body_str = std::str::from_utf8(&body_bytes).map_err(|_| {
        ApiValidationError::InvalidFormat("Request body is not valid UTF-8".to_string())
            .to_response()
    })?;

    let mut json_value = sanitize_json_input(body_str).map_err(|err| err.to_response())?;

    if let Err(err) = validate_generate_request(&json_value) {
        tracing::warn!(error = %err, "Rejected generate request");
        return Err(err.to_response());
    }

    sanitize_json_object(&mut json_value);

    let sanitized_body = serde_json::to_vec(&json_value).map_err(|err| {
        ApiValidationError::InvalidFormat(format!(
            "Failed to serialize sanitized request: {}",
            err
        ))
        .to_response()
    })?;

    // Body length may have changed during sanitization
    parts.headers.remove(CONTENT_LENGTH);

    Ok(next
        .run(Request::from_parts(parts, Body::from(sanitized_body)))
        .await)
}
