use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to start fetcher '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetcher exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("Invalid fetcher output: {0:?}")]
    InvalidOutput(String),

    #[error("Fetch timed out after {0}s")]
    Timeout(u64),

    #[error("No Apify token configured - set APIFY_TOKEN or run `followwatch set-token`")]
    MissingToken,

    #[error("Unauthorized - Apify token rejected")]
    Unauthorized,

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No profile data returned for {0}")]
    NoData(String),
}

/// Maximum length for error bodies and stderr kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        let body = body.trim();
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => FetchError::Unauthorized,
            429 => FetchError::RateLimited,
            500..=599 => FetchError::ServerError(truncated),
            _ => FetchError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(FetchError::truncate_body("  short \n"), "short");

        let long = "x".repeat(600);
        let truncated = FetchError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(400);
        // Must not panic slicing through a multi-byte char
        let truncated = FetchError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_from_status() {
        use reqwest::StatusCode;
        assert!(matches!(
            FetchError::from_status(StatusCode::UNAUTHORIZED, ""),
            FetchError::Unauthorized
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            FetchError::RateLimited
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            FetchError::ServerError(body) if body == "upstream"
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::NOT_FOUND, "nope"),
            FetchError::InvalidResponse(_)
        ));
    }
}
