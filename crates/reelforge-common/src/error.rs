//! Common error types used throughout reelforge.
//!
//! Most failures in the poster pipeline are recoverable and never reach the
//! caller as an error: they degrade to a fallback instead. This type covers
//! the cases that do propagate between crates (store access, filesystem,
//! image encoding, provider responses).

/// Common error type for reelforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The metadata provider failed or returned an unusable response.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Decoding, rendering or encoding an image failed.
    #[error("Image error: {0}")]
    Image(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Provider error.
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new Image error.
    pub fn image<S: Into<String>>(msg: S) -> Self {
        Self::Image(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means the backing store could not be reached or
    /// queried. Callers treat these as a cache miss rather than a failure.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON: {err}"))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("poster");
        assert_eq!(err.to_string(), "Not found: poster");

        let err = Error::database("connection failed");
        assert_eq!(err.to_string(), "Database error: connection failed");

        let err = Error::invalid_input("bad format");
        assert_eq!(err.to_string(), "Invalid input: bad format");

        let err = Error::provider("tmdb 503");
        assert_eq!(err.to_string(), "Provider error: tmdb 503");

        let err = Error::image("decode failed");
        assert_eq!(err.to_string(), "Image error: decode failed");

        let err = Error::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_store_unavailable() {
        assert!(Error::database("locked").is_store_unavailable());
        assert!(!Error::not_found("x").is_store_unavailable());
        assert!(!Error::internal("x").is_store_unavailable());
    }
}
