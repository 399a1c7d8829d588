//! Prompt Gateway Input Validation
//!
//! Request checks that run before a generation request reaches the handler:
//! content type, payload size, JSON shape, and a non-empty prompt.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};

/// Maximum request payload size (64KB)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

lazy_static::lazy_static! {
    /// Schema for generate request
    pub static ref GENERATE_REQUEST_SCHEMA: JSONSchema = {
        let schema = json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string"
                },
                "platform": {
                    "type": "string"
                },
                "template": {
                    "type": "string",
                    "enum": ["rewrite", "cinematic", "structured"]
                }
            }
        });

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .expect("Invalid schema")
    };
}

/// Error response for validation failures
#[derive(Debug, serde::Serialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Validation error for API requests
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Invalid request format: {0}")]
    InvalidFormat(String),

    #[error("Content type must be {0}")]
    ContentType(String),

    #[error("Request payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Schema validation error")]
    Schema(Vec<String>),

    #[error("Prompt is empty")]
    EmptyPrompt,
}

impl ApiValidationError {
    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ValidationErrorResponse>) {
        let status = match self {
            Self::InvalidFormat(_) | Self::Schema(_) | Self::EmptyPrompt => StatusCode::BAD_REQUEST,
            Self::ContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        };

        let details = match self {
            Self::Schema(details) if !details.is_empty() => Some(details.clone()),
            _ => None,
        };

        (
            status,
            Json(ValidationErrorResponse {
                error: self.to_string(),
                code: status.as_u16(),
                details,
            }),
        )
    }
}

/// Validate the Content-Type header
pub fn validate_content_type(headers: &HeaderMap, expected: &str) -> Result<(), ApiValidationError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !content_type.starts_with(expected) {
        return Err(ApiValidationError::ContentType(format!(
            "'{}', got '{}'",
            expected, content_type
        )));
    }

    Ok(())
}

/// Parse a raw body into JSON after the size check
pub fn sanitize_json_input(json_str: &str) -> Result<Value, ApiValidationError> {
    if json_str.len() > MAX_PAYLOAD_SIZE {
        return Err(ApiValidationError::PayloadTooLarge(format!(
            "Payload size ({} bytes) exceeds maximum allowed size ({} bytes)",
            json_str.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    serde_json::from_str::<Value>(json_str.trim())
        .map_err(|e| ApiValidationError::InvalidFormat(format!("Invalid JSON: {}", e)))
}

/// Validate a generate request body against its schema
pub fn validate_json_schema(json: &Value) -> Result<(), ApiValidationError> {
    if let Err(errors) = GENERATE_REQUEST_SCHEMA.validate(json) {
        let details: Vec<String> = errors
            .map(|err| format!("{} at '{}'", err, err.instance_path))
            .collect();
        return Err(ApiValidationError::Schema(details));
    }

    Ok(())
}

/// Full check for `/generate`: schema first, then a non-blank prompt
pub fn validate_generate_request(json: &Value) -> Result<(), ApiValidationError> {
    validate_json_schema(json)?;

    let prompt = json.get("prompt").and_then(Value::as_str).unwrap_or_default();
    if prompt.trim().is_empty() {
        return Err(ApiValidationError::EmptyPrompt);
    }

    Ok(())
}

/// Strip NUL characters from every string value, recursively
pub fn sanitize_json_object(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains('\u{0000}') {
                *s = s.replace('\u{0000}', "");
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_json_object),
        Value::Object(fields) => fields.values_mut().for_each(sanitize_json_object),
        _ => {}
    }
}
