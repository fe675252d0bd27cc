use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dispatch::FieldErrors;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Body returned for every non-validation error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level failures, rendered as `{"errors": {field: [messages]}}`.
    #[error("validation failed")]
    Validation(#[from] FieldErrors),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Validation(errors) => {
                tracing::debug!(?errors, "Request rejected by validation");
                return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
            }
            ApiError::MalformedBody(message) => {
                tracing::debug!(%message, "Malformed request body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "errors": { "body": [message] } })),
                )
                    .into_response();
            }
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "Unauthorized", message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "Forbidden", message),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(%message, "Publish failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ServiceUnavailable",
                    "Message could not be enqueued, retry later".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_shape() {
        let mut errors = FieldErrors::default();
        errors.add("To", "'To' field is required");
        errors.add("To", "second");

        let response = ApiError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(response).await,
            json!({"errors": {"To": ["'To' field is required", "second"]}})
        );
    }

    #[tokio::test]
    async fn test_unavailable_hides_transport_detail() {
        let response = ApiError::ServiceUnavailable("no responders".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body(response).await;
        assert_eq!(body["error"], "ServiceUnavailable");
        assert!(!body["message"].as_str().unwrap().contains("no responders"));
    }
}
