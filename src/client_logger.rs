//! Logging hook for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request and outcome passing through a [`CompletionClient`](crate::CompletionClient).

use crate::Error;
use crate::types::{CompletionRequest, CompletionResponse};

/// A trait for logging completion client operations.
///
/// Implement this trait to capture and record all API interactions.  Every request
/// produces exactly one call to `log_request` followed by exactly one call to either
/// `log_response` or `log_error`.
///
/// # Example
///
/// ```rust,ignore
/// use parley::{ClientLogger, CompletionRequest, CompletionResponse, Error};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &CompletionRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_response(&self, response: &CompletionResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Response: {}", serde_json::to_string(response).unwrap()).unwrap();
///     }
///
///     fn log_error(&self, error: &Error) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Error: {error}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &CompletionRequest);

    /// Log a successfully decoded response.
    fn log_response(&self, response: &CompletionResponse);

    /// Log a failed request.
    fn log_error(&self, error: &Error);
}
