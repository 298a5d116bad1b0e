// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod completer;
pub mod error;
pub mod observability;
pub mod render;
pub mod session;
pub mod types;

// Re-exports
pub use client::{ClientConfig, CompletionClient};
pub use client_logger::ClientLogger;
pub use completer::Completer;
pub use error::{Error, Result, SubmitError};
pub use observability::register_biometrics;
pub use session::{
    ChatSession, FailurePolicy, PendingRequest, SessionState, SessionStats, SubmissionPolicy,
};
pub use types::*;
