//! Error types for parley.
//!
//! [`SubmitError`] is what the session refuses before anything is sent.  [`Error`] is why a
//! completion failed once it was: the service said no, the exchange never finished, the
//! reply could not be read, or the completion task itself died.  Local configuration
//! problems are reported as [`Error::Validation`] before any request exists.

use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Reasons a submission is refused before any request is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The input was empty after trimming whitespace.
    EmptyInput,
    /// A completion is already outstanding and the session allows one at a time.
    RequestInFlight,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::EmptyInput => write!(f, "nothing to send"),
            SubmitError::RequestInFlight => {
                write!(f, "still waiting for the previous reply")
            }
        }
    }
}

impl error::Error for SubmitError {}

type Source = Arc<dyn error::Error + Send + Sync>;

/// Why a completion failed.
#[derive(Clone, Debug)]
pub enum Error {
    /// The service answered with a non-success status.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// The `type` field of the error body, when there was one.
        error_type: Option<String>,
        /// The error body's message, or the raw body.
        message: String,
        /// The `x-request-id` header.
        request_id: Option<String>,
        /// The `retry-after` header, in seconds.
        retry_after: Option<u64>,
    },

    /// No reply arrived within the client's timeout.
    Timeout {
        message: String,
        after: Option<Duration>,
    },

    /// The service could not be reached.
    Connection {
        message: String,
        source: Option<Source>,
    },

    /// The HTTP exchange failed for any other reason.
    HttpClient {
        message: String,
        source: Option<Source>,
    },

    /// A success reply that does not decode as a completion.
    Serialization {
        message: String,
        source: Option<Source>,
    },

    /// Configuration rejected before any request was made.
    Validation {
        message: String,
        /// The offending setting.
        param: Option<String>,
    },

    /// The completion task ended without producing a result.
    Task { message: String },
}

impl Error {
    /// A non-success reply with the given status.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            error_type: None,
            message: message.into(),
            request_id: None,
            retry_after: None,
        }
    }

    /// Attach the error body's `type` to an [`Error::Api`].  Other variants are unchanged.
    pub fn with_error_type(mut self, value: Option<String>) -> Self {
        if let Error::Api { error_type, .. } = &mut self {
            *error_type = value;
        }
        self
    }

    /// Attach a request id to an [`Error::Api`].  Other variants are unchanged.
    pub fn with_request_id(mut self, value: Option<String>) -> Self {
        if let Error::Api { request_id, .. } = &mut self {
            *request_id = value;
        }
        self
    }

    /// Attach a retry hint to an [`Error::Api`].  Other variants are unchanged.
    pub fn with_retry_after(mut self, value: Option<u64>) -> Self {
        if let Error::Api { retry_after, .. } = &mut self {
            *retry_after = value;
        }
        self
    }

    pub fn timeout(message: impl Into<String>, after: Option<Duration>) -> Self {
        Error::Timeout {
            message: message.into(),
            after,
        }
    }

    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Error::Task {
            message: message.into(),
        }
    }

    /// Whether sending the same prompt again could succeed.
    ///
    /// The session never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status_code, .. } => {
                matches!(status_code, 408 | 409 | 429 | 500..=599)
            }
            Error::Timeout { .. } | Error::Connection { .. } => true,
            _ => false,
        }
    }

    /// The HTTP status of an [`Error::Api`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The service's request id, when it sent one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// How long the service asked callers to back off, in seconds.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                error_type,
                message,
                request_id,
                retry_after,
            } => {
                match (status_code, error_type) {
                    (400, _) => write!(f, "Bad request: {message}")?,
                    (401, _) => write!(f, "Authentication error: {message}")?,
                    (403, _) => write!(f, "Permission error: {message}")?,
                    (404, _) => write!(f, "Not found: {message}")?,
                    (429, _) => write!(f, "Rate limit exceeded: {message}")?,
                    (500..=599, _) => write!(f, "Server error {status_code}: {message}")?,
                    (_, Some(error_type)) => write!(f, "{error_type}: {message}")?,
                    (_, None) => write!(f, "API error {status_code}: {message}")?,
                }
                if let Some(seconds) = retry_after {
                    write!(f, " (retry after {seconds} seconds)")?;
                }
                if let Some(request_id) = request_id {
                    write!(f, " (Request ID: {request_id})")?;
                }
                Ok(())
            }
            Error::Timeout { message, after } => match after {
                Some(after) => write!(f, "Timed out after {}s: {message}", after.as_secs_f64()),
                None => write!(f, "Timed out: {message}"),
            },
            Error::Connection { message, .. } => write!(f, "Connection error: {message}"),
            Error::HttpClient { message, .. } => write!(f, "HTTP client error: {message}"),
            Error::Serialization { message, .. } => write!(f, "Unreadable reply: {message}"),
            Error::Validation {
                message,
                param: Some(param),
            } => write!(f, "Invalid {param}: {message}"),
            Error::Validation {
                message,
                param: None,
            } => write!(f, "Invalid configuration: {message}"),
            Error::Task { message } => write!(f, "Completion task failed: {message}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

/// A specialized Result type for parley operations.
pub type Result<T> = std::result::Result<T, Error>;
