use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Model, Usage};

/// Body of a `POST /completions` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// The model that should complete the prompt.
    pub model: Model,

    /// The prompt text, already trimmed by the session.
    pub prompt: String,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,

    /// Sampling temperature; the server default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a new request with the server's default sampling.
    pub fn new(model: Model, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            max_tokens,
            temperature: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// One generated alternative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Generated text, untrimmed.
    #[serde(default)]
    pub text: String,

    /// Position of this choice in the response.
    #[serde(default)]
    pub index: u32,

    /// Why generation stopped ("stop", "length", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Body of a successful completion response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    /// Server-assigned identifier.
    pub id: String,

    /// Object type, usually "text_completion".
    #[serde(default)]
    pub object: String,

    /// Creation time.
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,

    /// The model that served the request.
    pub model: Model,

    /// Generated alternatives.  May be empty.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Token accounting, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// The text of the first choice, or `None` when the server returned no choices.
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn request_serialization_omits_unset_temperature() {
        let request = CompletionRequest::new(KnownModel::Davinci002.into(), "Hello", 16);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "davinci-002",
                "prompt": "Hello",
                "max_tokens": 16
            })
        );

        let request = request.with_temperature(Some(0.5));
        assert_eq!(to_value(&request).unwrap()["temperature"], json!(0.5));
    }

    #[test]
    fn response_deserialization() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "object": "text_completion",
            "created": 1680000000,
            "model": "gpt-3.5-turbo-instruct",
            "choices": [
                {"text": "\n\nHi there", "index": 0, "logprobs": null, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 1, "completion_tokens": 3, "total_tokens": 4}
        }))
        .unwrap();

        assert_eq!(response.first_text(), Some("\n\nHi there"));
        assert_eq!(response.created.unix_timestamp(), 1680000000);
        assert_eq!(response.usage, Some(Usage::new(1, 3)));
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn response_without_choices() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "cmpl-2",
            "created": 1680000000,
            "model": "my-finetune"
        }))
        .unwrap();
        assert!(response.first_text().is_none());
        assert!(response.usage.is_none());
    }
}
