use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline_api_pipeline::PipelineError;
use serde_json::{Value, json};

/// Request-level failures of the REST transport.
#[derive(Debug)]
pub(crate) enum RestError {
    /// Input rejected by a declared schema.
    Validation {
        message: String,
        violations: Vec<Value>,
    },
    /// Malformed request (wrong body shape, unexpected query parameters).
    BadRequest(String),
    NotFound {
        resource: String,
        id: String,
    },
    Pipeline(PipelineError),
}

impl From<PipelineError> for RestError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

fn pipeline_status(e: &PipelineError) -> (StatusCode, &'static str) {
    match e {
        PipelineError::Unsupported(_) => (StatusCode::METHOD_NOT_ALLOWED, "unsupported"),
        PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        PipelineError::NotFound(_) => (StatusCode::NOT_FOUND, "not-found"),
        PipelineError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        PipelineError::Schema(_) | PipelineError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            RestError::Validation {
                message,
                violations,
            } => {
                tracing::debug!(%message, violations = violations.len(), "request rejected");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "code": "validation", "message": message, "violations": violations }),
                )
            }
            RestError::BadRequest(message) => {
                tracing::debug!(%message, "bad request");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "code": "bad-request", "message": message }),
                )
            }
            RestError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({ "code": "not-found", "message": format!("{resource} '{id}' not found") }),
            ),
            RestError::Pipeline(e) => {
                let (status, code) = pipeline_status(&e);
                if status.is_server_error() {
                    tracing::warn!(error = %e, "pipeline call failed");
                }
                (status, json!({ "code": code, "message": e.to_string() }))
            }
        };
        (status, Json(body)).into_response()
    }
}
