//! Error raised while processing a single work item

use crate::http::HttpError;

/// Error from processing one work item (load → external call → sink write).
///
/// Recovered at the item boundary by the runner and turned into an
/// [`Outcome`](crate::Outcome) with status `error`; never aborts a run.
#[derive(Debug)]
pub enum ItemError {
    /// Network / HTTP failure talking to an external API
    Http(HttpError),
    /// Local filesystem error
    Io(std::io::Error),
    /// Malformed input or service response
    Parse(String),
    /// External process exited unsuccessfully
    Process(String),
    /// Sink (vector index, database) rejected a read or write
    Sink(String),
    /// Handler panicked
    Panic(String),
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Process(msg) => write!(f, "process: {msg}"),
            Self::Sink(msg) => write!(f, "sink: {msg}"),
            Self::Panic(msg) => write!(f, "panic: {msg}"),
        }
    }
}

impl std::error::Error for ItemError {}

impl ItemError {
    pub fn parse(msg: impl std::fmt::Display) -> Self {
        Self::Parse(msg.to_string())
    }

    pub fn sink(msg: impl std::fmt::Display) -> Self {
        Self::Sink(msg.to_string())
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_retryable(),
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            Self::Parse(_) | Self::Process(_) | Self::Sink(_) | Self::Panic(_) => false,
        }
    }
}

impl From<std::io::Error> for ItemError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<HttpError> for ItemError {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn http_err(status: u16) -> HttpError {
        HttpError {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_429_retryable() {
        assert!(ItemError::Http(http_err(429)).is_retryable());
    }

    #[test]
    fn http_401_not_retryable() {
        assert!(!ItemError::Http(http_err(401)).is_retryable());
    }

    #[test]
    fn io_storage_full_not_retryable() {
        let err = ItemError::Io(std::io::Error::new(ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn parse_not_retryable() {
        assert!(!ItemError::parse("bad json").is_retryable());
    }

    #[test]
    fn display_prefixes() {
        let err = ItemError::Io(std::io::Error::new(ErrorKind::NotFound, "not found"));
        assert!(err.to_string().starts_with("IO:"));
        assert_eq!(ItemError::sink("locked").to_string(), "sink: locked");
    }
}
