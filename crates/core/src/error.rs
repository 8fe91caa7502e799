//! Error taxonomy shared by Marquee services
//!
//! Unknown ids are not errors anywhere in the recommendation path, so they have
//! no variant here. What remains separates caller mistakes (`Validation`) from
//! infrastructure failures (`StoreUnavailable`) so a handler never has to mask
//! one as the other.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};

#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store unavailable during {operation}: {message}")]
    StoreUnavailable { message: String, operation: String },

    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarqueeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn store_unavailable(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            operation: operation.into(),
        }
    }

    /// Stable machine-readable code used in response bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::ConfigurationError { .. } => "configuration_error",
            Self::Training(_) => "training_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// True for failures caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Unauthorized(_))
    }
}

impl From<sqlx::Error> for MarqueeError {
    fn from(err: sqlx::Error) -> Self {
        MarqueeError::store_unavailable(err.to_string(), "query")
    }
}

impl From<serde_json::Error> for MarqueeError {
    fn from(err: serde_json::Error) -> Self {
        MarqueeError::Internal(format!("serialization failed: {}", err))
    }
}

impl ResponseError for MarqueeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigurationError { .. } | Self::Training(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let description = match self {
            // Infrastructure details stay in the logs.
            Self::StoreUnavailable { .. } => "Backing store is unavailable".to_string(),
            Self::ConfigurationError { .. } | Self::Training(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let mut body = serde_json::json!({
            "error": self.error_code(),
            "error_description": description,
        });
        if let Self::Validation {
            field: Some(field), ..
        } = self
        {
            body["field"] = serde_json::Value::String(field.clone());
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = MarqueeError::validation_field("rating is required", "rating");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "validation_error");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_unavailable_maps_to_503() {
        let err = MarqueeError::store_unavailable("connection refused", "fetch_page");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("fetch_page"));
    }

    #[test]
    fn test_sqlx_error_is_store_unavailable() {
        let err: MarqueeError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, MarqueeError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let err = MarqueeError::Unauthorized("missing admin token".to_string());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "unauthorized");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = MarqueeError::Internal("secret stack".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
