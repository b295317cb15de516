//! Error types for watch_sync

use thiserror::Error;

/// Unified error type for watch_sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Marketplace answered with a non-success status
    #[error("HTTP error: {status} - {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Quantity token in the feed could not be normalized
    #[error("Invalid quantity '{token}' for code '{code}'")]
    InvalidQuantity { code: String, token: String },

    /// Price token in the feed could not be normalized
    #[error("Invalid price '{token}' for code '{code}'")]
    InvalidPrice { code: String, token: String },

    /// Response is missing a field the pagination protocol depends on
    #[error("Unexpected response shape: {0}")]
    ProtocolShape(String),

    /// Failed to parse JSON response
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Remnants table is unusable (missing columns, no tabular entry, ...)
    #[error("Feed error: {0}")]
    Feed(String),

    /// Remnants table could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Remnants archive could not be opened
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Remnants workbook could not be read
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a failed run is reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server did not answer within the client timeout
    Timeout,
    /// No connection could be established
    Connect,
    Other,
}

impl SyncError {
    pub fn kind(&self) -> FailureKind {
        if self.is_timeout() {
            FailureKind::Timeout
        } else if self.is_connect() {
            FailureKind::Connect
        } else {
            FailureKind::Other
        }
    }

    /// True when the underlying transport gave up waiting for the server
    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncError::Transport(e) if e.is_timeout())
    }

    /// True when no connection to the server could be established
    pub fn is_connect(&self) -> bool {
        matches!(self, SyncError::Transport(e) if e.is_connect())
    }
}

/// Result alias for watch_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
