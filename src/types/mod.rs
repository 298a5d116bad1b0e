// Public modules
pub mod completion;
pub mod message;
pub mod model;
pub mod usage;

// Re-exports
pub use completion::{Choice, CompletionRequest, CompletionResponse};
pub use message::{Message, RequestId, Sender};
pub use model::{KnownModel, Model};
pub use usage::Usage;
