//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::fmt;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::ClientConfig;
use crate::session::{FailurePolicy, SubmissionPolicy};
use crate::types::Model;

/// Command-line arguments for the parley-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for completions.
    #[arrrg(optional, "Model to use (default: gpt-3.5-turbo-instruct)", "MODEL")]
    pub model: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 256)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: server)", "TEMP")]
    pub temperature: Option<String>,

    /// API base URL.
    #[arrrg(optional, "API base URL (default: https://api.openai.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Allow sending while a reply is outstanding.
    #[arrrg(flag, "Allow overlapping requests; replies show in arrival order")]
    pub concurrent: bool,

    /// Drop failed completions instead of showing them.
    #[arrrg(flag, "Do not show failed completions in the transcript")]
    pub discard_errors: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// A command-line value that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArgsError {
    /// The offending flag, without dashes.
    pub flag: &'static str,
    /// What was wrong with it.
    pub message: String,
}

impl fmt::Display for ChatArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}: {}", self.flag, self.message)
    }
}

impl std::error::Error for ChatArgsError {}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Settings handed to the completion client.
    pub client: ClientConfig,

    /// Whether submissions may overlap.
    pub submission_policy: SubmissionPolicy,

    /// What failed completions leave in the transcript.
    pub failure_policy: FailurePolicy,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Client: [`ClientConfig::new`]
    /// - One request at a time
    /// - Failures shown in the transcript
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            client: ClientConfig::new(),
            submission_policy: SubmissionPolicy::SingleFlight,
            failure_policy: FailurePolicy::Surface,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.client.model = model;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.client.max_tokens = max_tokens;
        self
    }

    /// Sets the submission policy.
    pub fn with_submission_policy(mut self, policy: SubmissionPolicy) -> Self {
        self.submission_policy = policy;
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let mut client = ClientConfig::new();
        if let Some(model) = args.model {
            client.model = model.parse().unwrap_or(Model::Custom(model));
        }
        if let Some(max_tokens) = args.max_tokens {
            client.max_tokens = max_tokens;
        }
        if let Some(temperature) = args.temperature {
            let value = temperature.parse::<f32>().map_err(|_| ChatArgsError {
                flag: "temperature",
                message: format!("expected a number, got {temperature:?}"),
            })?;
            client.temperature = Some(value);
        }
        if let Some(base_url) = args.base_url {
            client.base_url = base_url;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            if timeout_secs == 0 {
                return Err(ChatArgsError {
                    flag: "timeout-secs",
                    message: "must be positive".to_string(),
                });
            }
            client.timeout = Duration::from_secs(timeout_secs);
        }

        Ok(ChatConfig {
            client,
            submission_policy: if args.concurrent {
                SubmissionPolicy::Concurrent
            } else {
                SubmissionPolicy::SingleFlight
            },
            failure_policy: if args.discard_errors {
                FailurePolicy::Discard
            } else {
                FailurePolicy::Surface
            },
            use_color: !args.no_color,
        })
    }
}
