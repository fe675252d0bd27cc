//! Error types for message processing.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How a failed message should be treated by the transport.
///
/// - **Transient**: redeliver with exponential backoff (1s doubling, capped at 30s)
/// - **Permanent**: never redeliver, dead-letter immediately
/// - **RateLimited**: redeliver with a longer backoff (5s doubling, capped at 2min)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transient,
    Permanent,
    RateLimited,
}

impl ErrorCategory {
    fn backoff_bounds_ms(&self) -> (u64, u64) {
        match self {
            ErrorCategory::Transient => (1_000, 30_000),
            ErrorCategory::Permanent => (0, 0),
            ErrorCategory::RateLimited => (5_000, 120_000),
        }
    }

    /// Backoff before the next delivery, given how many attempts already failed.
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        let (base, max) = self.backoff_bounds_ms();
        let delay = base.saturating_mul(2u64.saturating_pow(failed_attempts.saturating_sub(1)));
        Duration::from_millis(delay.min(max))
    }

    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`Processor`](crate::Processor).
///
/// The variant decides whether the transport redelivers the message.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("transient error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("permanent error: {message}")]
    Permanent {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The payload could not be decoded into the expected message type.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ProcessingError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Permanent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcessingError::Transient { .. } => ErrorCategory::Transient,
            ProcessingError::Permanent { .. } | ProcessingError::Malformed(_) => {
                ErrorCategory::Permanent
            }
            ProcessingError::RateLimited { .. } => ErrorCategory::RateLimited,
        }
    }

    /// Delay before redelivery. A provider `Retry-After` hint wins over the
    /// category backoff.
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        match self {
            ProcessingError::RateLimited {
                retry_after: Some(hint),
                ..
            } => *hint,
            _ => self.category().backoff_delay(failed_attempts),
        }
    }
}
