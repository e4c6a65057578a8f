use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        /// InfluxDB error code such as `not found` or `conflict`
        code: Option<String>,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected_by_status() {
        let err = ApiError::ApiError {
            status: 404,
            code: Some("not found".to_string()),
            message: "bucket not found".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "API returned error (HTTP 404): bucket not found"
        );

        assert!(!ApiError::RateLimited.is_not_found());
        assert_eq!(ApiError::Timeout(30).status(), None);
    }
}
