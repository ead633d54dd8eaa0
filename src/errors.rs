//! Error types for quakeboard.
//!
//! Uses `thiserror` for library-style error definitions. Every variant is a
//! refresh-cycle failure: the scheduler catches them and none of them reach
//! the view layer.

use thiserror::Error;

/// Errors that can occur while fetching or decoding the earthquake feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// API returned an error status
    #[error("USGS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Event validation failed
    #[error("Invalid event data: {0}")]
    Validation(String),
}

impl FeedError {
    /// Whether the document arrived but could not be understood.
    ///
    /// Transport failures and non-success statuses return `false`.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        match self {
            Self::Http(e) => e.is_decode(),
            Self::Parse(_) | Self::InvalidResponse(_) | Self::Validation(_) => true,
            Self::Api { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_classification() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(FeedError::Parse(parse).is_decode());
        assert!(FeedError::Validation("empty event ID".into()).is_decode());
        assert!(
            !FeedError::Api {
                status: 503,
                message: "unavailable".into()
            }
            .is_decode()
        );
    }

    #[test]
    fn test_api_error_message() {
        let err = FeedError::Api {
            status: 404,
            message: "not found".into(),
        };
        assert_eq!(err.to_string(), "USGS API error (HTTP 404): not found");
    }
}
