//! Errors raised while sending a message.

use http::StatusCode;
use messaging::ProcessingError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SendError {
    /// The message cannot be sent as given (e.g. no recipients).
    #[error("{0}")]
    Precondition(String),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    /// The provider answered with a status other than success or 400.
    /// Carries the raw response body.
    #[error("provider returned {status}: {body}")]
    Request {
        status: StatusCode,
        body: String,
        retry_after: Option<Duration>,
    },

    /// The provider or blob store could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SendError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SendError::Precondition(_)
                | SendError::AttachmentNotFound(_)
                | SendError::Serialization(_)
        )
    }
}

impl From<reqwest::Error> for SendError {
    fn from(error: reqwest::Error) -> Self {
        SendError::Transport(error.to_string())
    }
}

impl From<SendError> for ProcessingError {
    fn from(error: SendError) -> Self {
        match error {
            SendError::Request {
                status: StatusCode::TOO_MANY_REQUESTS,
                retry_after,
                ..
            } => ProcessingError::rate_limited(error.to_string(), retry_after),
            e if e.is_permanent() => ProcessingError::permanent_with_source(e.to_string(), e),
            e => ProcessingError::transient_with_source(e.to_string(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::ErrorCategory;

    #[test]
    fn test_request_error_carries_body() {
        let err = SendError::Request {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"errors":[{"message":"bad key"}]}"#.to_string(),
            retry_after: None,
        };
        assert!(err.to_string().contains("bad key"));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_maps_to_processing_categories() {
        let cases = [
            (SendError::precondition("no recipients"), ErrorCategory::Permanent),
            (
                SendError::AttachmentNotFound("https://blob/x.pdf".into()),
                ErrorCategory::Permanent,
            ),
            (
                SendError::Transport("connection reset".into()),
                ErrorCategory::Transient,
            ),
            (
                SendError::Request {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: String::new(),
                    retry_after: None,
                },
                ErrorCategory::Transient,
            ),
            (
                SendError::Request {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    body: String::new(),
                    retry_after: None,
                },
                ErrorCategory::RateLimited,
            ),
        ];

        for (error, expected) in cases {
            let processing: ProcessingError = error.into();
            assert_eq!(processing.category(), expected);
        }
    }

    #[test]
    fn test_retry_after_survives_mapping() {
        let processing: ProcessingError = SendError::Request {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
            retry_after: Some(Duration::from_secs(9)),
        }
        .into();
        assert_eq!(processing.backoff_delay(1), Duration::from_secs(9));
    }

    #[test]
    fn test_attachment_message_names_uri() {
        let err = SendError::AttachmentNotFound("https://blob/reports/q1.pdf".into());
        assert_eq!(
            err.to_string(),
            "Attachment not found: https://blob/reports/q1.pdf"
        );
    }
}
