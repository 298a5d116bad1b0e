use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::completer::Completer;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_EMPTY_CHOICES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS,
};
use crate::types::{CompletionRequest, CompletionResponse, Model};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TOKENS: u32 = 256;
const API_KEY_VAR: &str = "PARLEY_API_KEY";

/// Request and transport settings for a [`CompletionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// The model every request asks for.
    pub model: Model,

    /// Upper bound on generated tokens per request.
    pub max_tokens: u32,

    /// Sampling temperature; `None` leaves it to the server.
    pub temperature: Option<f32>,

    /// Base URL of the API; `completions` is resolved against it.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Model: gpt-3.5-turbo-instruct
    /// - Max tokens: 256
    /// - Base URL: https://api.openai.com/v1/
    /// - Timeout: 60 seconds
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::validation(
                "must be positive",
                Some("max_tokens".to_string()),
            ));
        }
        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
                return Err(Error::validation(
                    format!("must be between 0 and 2, got {temperature}"),
                    Some("temperature".to_string()),
                ));
            }
        }
        if self.timeout.is_zero() {
            return Err(Error::validation(
                "must be positive",
                Some("timeout".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for an OpenAI-compatible text-completion API.
///
/// The credential and settings are fixed at construction; clone the client to share it.
#[derive(Clone)]
pub struct CompletionClient {
    api_key: String,
    client: ReqwestClient,
    endpoint: Url,
    config: ClientConfig,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl CompletionClient {
    /// Create a new client.
    ///
    /// The API key can be provided directly or read from the PARLEY_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>, config: ClientConfig) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_VAR).map_err(|_| {
                Error::validation(
                    "not provided and PARLEY_API_KEY is not set",
                    Some("api_key".to_string()),
                )
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::validation("empty", Some("api_key".to_string())));
        }
        config.validate()?;
        let endpoint = completions_endpoint(&config.base_url)?;

        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            endpoint,
            config,
            logger: None,
        })
    }

    /// Attach a logger that observes every request and outcome.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The fully resolved completions URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the request this client sends for `prompt`.
    pub fn request_for(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest::new(self.config.model.clone(), prompt, self.config.max_tokens)
            .with_temperature(self.config.temperature)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| {
                Error::validation(
                    "contains invalid header characters",
                    Some("api_key".to_string()),
                )
            })?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|parsed| parsed.error);
        let (error_type, error_message) = match detail {
            Some(ErrorDetail {
                error_type,
                message: Some(message),
            }) => (error_type, message),
            Some(ErrorDetail { error_type, .. }) => (error_type, error_body),
            None => (None, error_body),
        };

        Error::api(status_code, error_message)
            .with_error_type(error_type)
            .with_request_id(request_id)
            .with_retry_after(retry_after)
    }

    /// Send a completion request and wait for the full response.
    pub async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        CLIENT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_request(request);
        }
        let start = Instant::now();
        let outcome = self.send_inner(request).await;
        let elapsed = start.elapsed();
        CLIENT_REQUEST_DURATION.add(elapsed.as_secs_f64());

        match &outcome {
            Ok(response) => {
                tracing::debug!(
                    id = %response.id,
                    model = %response.model,
                    choices = response.choices.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "completion received"
                );
                if let Some(logger) = &self.logger {
                    logger.log_response(response);
                }
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(
                    status = ?err.status_code(),
                    retryable = err.is_retryable(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "completion request failed"
                );
                if let Some(logger) = &self.logger {
                    logger.log_error(err);
                }
            }
        }
        outcome
    }

    async fn send_inner(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(e.to_string(), Some(self.config.timeout))
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<CompletionResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.send(&self.request_for(prompt)).await?;
        match response.first_text() {
            Some(text) => Ok(text.to_string()),
            None => {
                // No choices reads as an empty answer, not a failure.
                CLIENT_EMPTY_CHOICES.click();
                tracing::debug!(id = %response.id, "completion returned no choices");
                Ok(String::new())
            }
        }
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Resolve `completions` against `base_url`, treating the base as a directory.
fn completions_endpoint(base_url: &str) -> Result<Url> {
    let invalid = |e: url::ParseError| {
        Error::validation(format!("{base_url:?}: {e}"), Some("base_url".to_string()))
    };
    let mut base = Url::parse(base_url).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("completions").map_err(invalid)
}
