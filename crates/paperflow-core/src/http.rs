//! Shared HTTP client and error classification for external APIs

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout (LLM completions over long transcripts are slow)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// HTTP error with optional status code
#[derive(Debug)]
pub struct HttpError {
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(s) => write!(f, "HTTP {s}: {}", self.message),
            None => write!(f, "HTTP error: {}", self.message),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Rate limits, server errors and transport failures are worth retrying;
    /// other 4xx (bad key, bad request, context too long) are not.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(429) => true,
            Some(s) => s >= 500,
        }
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Turn a non-success response into an [`HttpError`] carrying the body text.
pub async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, HttpError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = if body.chars().count() > 300 {
        body.chars().take(300).collect::<String>() + "..."
    } else {
        body
    };
    Err(HttpError {
        status: Some(status.as_u16()),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(status: Option<u16>) -> HttpError {
        HttpError {
            status,
            message: "x".to_string(),
        }
    }

    #[test]
    fn retryable_statuses() {
        assert!(err(None).is_retryable());
        assert!(err(Some(429)).is_retryable());
        assert!(err(Some(500)).is_retryable());
        assert!(err(Some(503)).is_retryable());
    }

    #[test]
    fn client_errors_not_retryable() {
        assert!(!err(Some(400)).is_retryable());
        assert!(!err(Some(401)).is_retryable());
        assert!(!err(Some(404)).is_retryable());
    }

    #[test]
    fn display_with_and_without_status() {
        assert_eq!(err(Some(502)).to_string(), "HTTP 502: x");
        assert_eq!(err(None).to_string(), "HTTP error: x");
    }
}
