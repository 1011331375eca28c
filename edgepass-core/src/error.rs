//! Unified error handling system
//!
//! Errors are split into what the caller did wrong (safe to echo back) and
//! what went wrong on our side (logged with an error id, never echoed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type EdgepassResult<T> = Result<T, EdgepassError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Message returned to callers for every server-side failure class.
pub const GENERIC_ISSUANCE_MESSAGE: &str = "Failed to generate pre-signed URL";
pub const GENERIC_LISTING_MESSAGE: &str = "Failed to fetch files.";
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Error context providing additional information for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID, reported to the caller so logs can be correlated
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Main error type for the Edgepass system
#[derive(Error, Debug)]
pub enum EdgepassError {
    /// Malformed or missing caller input
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    /// Unresolvable or untiered identity
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        context: ErrorContext,
    },

    /// The upload boundary authorization could not be produced
    #[error("Upload grant issuance failed: {message}")]
    IssuanceFailure {
        message: String,
        #[source]
        source: Option<BoxedSource>,
        context: ErrorContext,
    },

    /// The content boundary could not be enumerated
    #[error("Content listing failed: {message}")]
    ListingFailure {
        message: String,
        #[source]
        source: Option<BoxedSource>,
        context: ErrorContext,
    },

    /// A single read authorization could not be signed
    #[error("Signing failed: {message}")]
    Signing {
        message: String,
        #[source]
        source: Option<BoxedSource>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EdgepassError {
    pub fn invalid_request(message: impl Into<String>, field: Option<&str>, component: &str) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: field.map(str::to_string),
            context: ErrorContext::new(component),
        }
    }

    pub fn unauthorized(message: impl Into<String>, component: &str) -> Self {
        Self::Unauthorized {
            message: message.into(),
            context: ErrorContext::new(component),
        }
    }

    pub fn issuance<E>(message: impl Into<String>, component: &str, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::IssuanceFailure {
            message: message.into(),
            source: source.map(|e| Box::new(e) as BoxedSource),
            context: ErrorContext::new(component),
        }
    }

    pub fn listing<E>(message: impl Into<String>, component: &str, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ListingFailure {
            message: message.into(),
            source: source.map(|e| Box::new(e) as BoxedSource),
            context: ErrorContext::new(component),
        }
    }

    pub fn signing<E>(message: impl Into<String>, component: &str, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Signing {
            message: message.into(),
            source: source.map(|e| Box::new(e) as BoxedSource),
            context: ErrorContext::new(component),
        }
    }

    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            EdgepassError::InvalidRequest { context, .. } => Some(context),
            EdgepassError::Unauthorized { context, .. } => Some(context),
            EdgepassError::IssuanceFailure { context, .. } => Some(context),
            EdgepassError::ListingFailure { context, .. } => Some(context),
            EdgepassError::Signing { context, .. } => Some(context),
            EdgepassError::Config { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Attach an operation name to the error context
    pub fn in_operation(mut self, operation: &str) -> Self {
        match &mut self {
            EdgepassError::InvalidRequest { context, .. }
            | EdgepassError::Unauthorized { context, .. }
            | EdgepassError::IssuanceFailure { context, .. }
            | EdgepassError::ListingFailure { context, .. }
            | EdgepassError::Signing { context, .. }
            | EdgepassError::Config { context, .. } => {
                context.operation = Some(operation.to_string());
            }
            _ => {}
        }
        self
    }

    /// Whether the caller caused this error (4xx) rather than us (5xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EdgepassError::InvalidRequest { .. } | EdgepassError::Unauthorized { .. }
        )
    }

    /// Message that is safe to hand back to the caller.
    ///
    /// Server-side failures collapse to a fixed string; their detail only
    /// ever reaches the log.
    pub fn public_message(&self) -> String {
        match self {
            EdgepassError::InvalidRequest { message, .. } => message.clone(),
            EdgepassError::Unauthorized { message, .. } => message.clone(),
            EdgepassError::IssuanceFailure { .. } => GENERIC_ISSUANCE_MESSAGE.to_string(),
            EdgepassError::ListingFailure { .. } => GENERIC_LISTING_MESSAGE.to_string(),
            _ => GENERIC_INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        let component = self.context().map(|c| c.component.as_str());
        let operation = self.context().and_then(|c| c.operation.as_deref());

        if self.is_client_error() {
            warn!(error_id = ?error_id, component = ?component, operation = ?operation, error = %self, "Request rejected");
            return;
        }

        match self {
            EdgepassError::Signing { .. } => {
                warn!(
                    error_id = ?error_id,
                    component = ?component,
                    operation = ?operation,
                    error = %self,
                    source = ?std::error::Error::source(self).map(|s| s.to_string()),
                    "Read authorization could not be signed"
                );
            }
            _ => {
                error!(
                    error_id = ?error_id,
                    component = ?component,
                    operation = ?operation,
                    error = %self,
                    source = ?std::error::Error::source(self).map(|s| s.to_string()),
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! invalid_request {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::EdgepassError::InvalidRequest {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::EdgepassError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component).with_operation("validate"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::EdgepassError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_hide_their_detail() {
        let err = EdgepassError::issuance(
            "secret key AKIA... rejected",
            "upload",
            None::<std::io::Error>,
        );
        assert!(!err.is_client_error());
        assert_eq!(err.public_message(), GENERIC_ISSUANCE_MESSAGE);
        assert!(!err.public_message().contains("AKIA"));

        let err = EdgepassError::listing("bucket unreachable", "content", None::<std::io::Error>);
        assert_eq!(err.public_message(), GENERIC_LISTING_MESSAGE);
    }

    #[test]
    fn client_errors_are_shown_verbatim() {
        let err = invalid_request!("Filename is required", "filename", "upload");
        assert!(err.is_client_error());
        assert_eq!(err.public_message(), "Filename is required");
        match &err {
            EdgepassError::InvalidRequest { field, .. } => {
                assert_eq!(field.as_deref(), Some("filename"))
            }
            _ => panic!("Expected InvalidRequest"),
        }
    }

    #[test]
    fn operation_is_recorded_in_context() {
        let err = EdgepassError::unauthorized("unknown user", "tier").in_operation("resolve");
        let context = err.context().unwrap();
        assert_eq!(context.component, "tier");
        assert_eq!(context.operation.as_deref(), Some("resolve"));
        assert!(!context.error_id.is_empty());
    }
}
