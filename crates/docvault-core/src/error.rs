//! Error types module
//!
//! This module provides the engine-wide error taxonomy. Transient
//! infrastructure failures are retried inside the component that hit them;
//! callers only see final outcomes. Variants self-describe their response
//! characteristics through the `ErrorMetadata` trait.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like transient backend errors
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code a transport adapter should return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INTEGRITY_MISMATCH")
    fn error_code(&self) -> &'static str;

    /// Whether the caller can retry the operation as-is
    fn is_retryable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Blocked by security policy: {0}")]
    Quarantined(String),

    #[error("Threat scan failed: {0}")]
    ScanFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Static metadata for each variant: (http_status, error_code, retryable, log_level).
/// client_message stays per-variant for dynamic content.
fn static_metadata(err: &EngineError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        EngineError::Validation(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        EngineError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        EngineError::FileTooLarge { .. } => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        EngineError::IntegrityMismatch { .. } => (422, "INTEGRITY_MISMATCH", true, LogLevel::Warn),
        EngineError::Unavailable(_) => (503, "STORAGE_UNAVAILABLE", true, LogLevel::Warn),
        EngineError::QuotaExceeded(_) => (507, "QUOTA_EXCEEDED", false, LogLevel::Warn),
        EngineError::Quarantined(_) => (423, "QUARANTINED", false, LogLevel::Debug),
        EngineError::ScanFailed(_) => (502, "SCAN_FAILED", false, LogLevel::Error),
        EngineError::Internal(_) => (500, "INTERNAL_ERROR", false, LogLevel::Error),
    }
}

impl ErrorMetadata for EngineError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn is_retryable(&self) -> bool {
        static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            EngineError::Validation(msg) => msg.clone(),
            EngineError::NotFound(msg) => msg.clone(),
            EngineError::FileTooLarge {
                size_bytes,
                limit_bytes,
            } => format!(
                "File too large: {} bytes exceeds limit of {} bytes",
                size_bytes, limit_bytes
            ),
            EngineError::IntegrityMismatch { .. } => {
                "Uploaded content did not match the supplied checksum".to_string()
            }
            EngineError::Unavailable(_) => "Storage temporarily unavailable".to_string(),
            EngineError::QuotaExceeded(_) => "Storage quota exceeded".to_string(),
            EngineError::Quarantined(msg) => msg.clone(),
            EngineError::ScanFailed(_) => "Threat scan could not be completed".to_string(),
            EngineError::Internal(_) => "Internal error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = EngineError::NotFound("Document not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_retryable());
        assert_eq!(err.client_message(), "Document not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_unavailable_is_retryable() {
        let err = EngineError::Unavailable("connect timed out".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert!(err.is_retryable());
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.client_message(), "Storage temporarily unavailable");
    }

    #[test]
    fn test_error_metadata_integrity_mismatch() {
        let err = EngineError::IntegrityMismatch {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "INTEGRITY_MISMATCH");
        // Retryable by re-upload, not internally.
        assert!(err.is_retryable());
        assert!(err.to_string().contains("expected aa"));
    }

    #[test]
    fn test_error_metadata_quarantined_is_distinct() {
        let err = EngineError::Quarantined("content blocked by scan result".to_string());
        assert_eq!(err.error_code(), "QUARANTINED");
        assert_ne!(err.http_status_code(), 500);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_file_too_large_message() {
        let err = EngineError::FileTooLarge {
            size_bytes: 200,
            limit_bytes: 100,
        };
        assert_eq!(err.http_status_code(), 413);
        assert!(err.client_message().contains("200"));
        assert!(err.client_message().contains("100"));
    }
}
