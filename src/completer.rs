//! The completion collaborator seam.
//!
//! A [`Completer`] turns a prompt into generated text.  The session never talks to the
//! network directly; it hands prompts to a completer on a background task and reconciles
//! the results itself.

use std::sync::Arc;

use crate::error::Result;

/// Asynchronously produces a completion for a prompt.
///
/// Implementations own their transport, credentials, and thread usage.  The returned text
/// is untrimmed; an empty string means the service answered with nothing.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    /// Complete `prompt`, resolving exactly once.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait::async_trait]
impl<C: Completer + ?Sized> Completer for Arc<C> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.as_ref().complete(prompt).await
    }
}

#[async_trait::async_trait]
impl<C: Completer + ?Sized> Completer for Box<C> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.as_ref().complete(prompt).await
    }
}
