// Error types for tplsync.
// Separates API failures (rate limits, malformed bodies) from lifecycle failures.

use thiserror::Error;

/// Failure of a single API call.
///
/// `RateLimited` is transient and safe to retry once the countdown elapses.
/// `Malformed` means the response did not match the expected shape.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("GitHub API error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: access denied")]
    Unauthorized,

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }
}

/// Failure of a version-control subprocess.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to launch `git {command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with code {code}")]
    Failed { command: String, code: i32 },
}

/// Failure of a template lifecycle operation.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Git(#[from] GitError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub type Result<T> = std::result::Result<T, SyncError>;
