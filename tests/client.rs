//! CompletionClient against a canned local HTTP server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use parley::{
    ChatSession, ClientConfig, ClientLogger, Completer, CompletionClient, CompletionRequest,
    CompletionResponse, Error, KnownModel, Sender,
};

/// A request as the server saw it.
struct Captured {
    head: String,
    body: Value,
}

/// Serves exactly one response and hands back the request it received.
async fn serve_once(
    status: &str,
    extra_headers: &[(&str, &str)],
    body: String,
) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut response = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n",
        body.len()
    );
    for (name, value) in extra_headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(&body);

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = serde_json::from_slice(&buf[header_end..header_end + content_length])
            .unwrap_or(Value::Null);
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        Captured { head, body }
    });

    (format!("http://{addr}/v1/"), handle)
}

fn completion_body(choices: Value) -> String {
    json!({
        "id": "cmpl-test",
        "object": "text_completion",
        "created": 1680000000,
        "model": "gpt-3.5-turbo-instruct",
        "choices": choices,
        "usage": {"prompt_tokens": 1, "completion_tokens": 3, "total_tokens": 4}
    })
    .to_string()
}

fn client_for(base_url: &str) -> CompletionClient {
    let config = ClientConfig::new()
        .with_base_url(base_url)
        .with_max_tokens(16)
        .with_timeout(Duration::from_secs(5));
    CompletionClient::new(Some("test-key".to_string()), config).unwrap()
}

#[tokio::test]
async fn completes_with_first_choice() {
    let body = completion_body(json!([
        {"text": "\n\nHi there", "index": 0, "finish_reason": "stop"},
        {"text": "ignored", "index": 1, "finish_reason": "stop"}
    ]));
    let (base_url, server) = serve_once("200 OK", &[], body).await;
    let client = client_for(&base_url);

    let text = client.complete("Hello").await.unwrap();
    assert_eq!(text, "\n\nHi there");

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("post /v1/completions http/1.1"));
    assert!(captured.head.contains("authorization: bearer test-key"));
    assert_eq!(
        captured.body,
        json!({"model": "gpt-3.5-turbo-instruct", "prompt": "Hello", "max_tokens": 16})
    );
}

#[tokio::test]
async fn no_choices_is_an_empty_completion() {
    let (base_url, _server) = serve_once("200 OK", &[], completion_body(json!([]))).await;
    let client = client_for(&base_url);
    assert_eq!(client.complete("Hello").await.unwrap(), "");
}

#[tokio::test]
async fn send_returns_full_response() {
    let body = completion_body(json!([{"text": "ok", "index": 0}]));
    let (base_url, _server) = serve_once("200 OK", &[], body).await;
    let client = client_for(&base_url);

    let request = CompletionRequest::new(KnownModel::Davinci002.into(), "ping", 4);
    let response = client.send(&request).await.unwrap();
    assert_eq!(response.id, "cmpl-test");
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(4));
    assert_eq!(response.first_text(), Some("ok"));
}

#[tokio::test]
async fn rate_limit_maps_retry_after() {
    let body = json!({
        "error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}
    })
    .to_string();
    let (base_url, _server) =
        serve_once("429 Too Many Requests", &[("retry-after", "7")], body).await;
    let client = client_for(&base_url);

    match client.complete("Hello").await.unwrap_err() {
        Error::Api {
            status_code,
            error_type,
            message,
            retry_after,
            ..
        } => {
            assert_eq!(status_code, 429);
            assert_eq!(error_type.as_deref(), Some("insufficient_quota"));
            assert_eq!(message, "You exceeded your current quota");
            assert_eq!(retry_after, Some(7));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_not_retryable() {
    let body = json!({"error": {"message": "Incorrect API key provided"}}).to_string();
    let (base_url, _server) = serve_once("401 Unauthorized", &[], body).await;
    let err = client_for(&base_url).complete("Hello").await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
    assert_eq!(err.to_string(), "Authentication error: Incorrect API key provided");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_keeps_request_id() {
    let body = json!({"error": {"message": "The server had an error"}}).to_string();
    let (base_url, _server) =
        serve_once("500 Internal Server Error", &[("x-request-id", "req_42")], body).await;
    let err = client_for(&base_url).complete("Hello").await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.request_id(), Some("req_42"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unmapped_status_is_generic_api_error() {
    let body = json!({"error": {"message": "short and stout", "type": "teapot"}}).to_string();
    let (base_url, _server) = serve_once("418 I'm a teapot", &[], body).await;
    let err = client_for(&base_url).complete("Hello").await.unwrap_err();
    assert_eq!(err.status_code(), Some(418));
    assert_eq!(err.to_string(), "teapot: short and stout");
}

#[tokio::test]
async fn non_json_error_body_becomes_message() {
    let (base_url, _server) = serve_once("400 Bad Request", &[], "nope".to_string()).await;
    let err = client_for(&base_url).complete("Hello").await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.to_string(), "Bad request: nope");
}

#[tokio::test]
async fn malformed_success_body_is_serialization_error() {
    let (base_url, _server) = serve_once("200 OK", &[], "{\"id\": 3}".to_string()).await;
    let err = client_for(&base_url).complete("Hello").await.unwrap_err();
    assert!(matches!(err, Error::Serialization { .. }));
}

#[tokio::test]
async fn refused_connection_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(&format!("http://{addr}/v1/"))
        .complete("Hello")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
    assert!(err.is_retryable());
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ClientLogger for Recorder {
    fn log_request(&self, request: &CompletionRequest) {
        self.events
            .lock()
            .unwrap()
            .push(format!("request {}", request.prompt));
    }

    fn log_response(&self, response: &CompletionResponse) {
        self.events
            .lock()
            .unwrap()
            .push(format!("response {}", response.id));
    }

    fn log_error(&self, error: &Error) {
        self.events.lock().unwrap().push(format!("error {error}"));
    }
}

#[tokio::test]
async fn logger_sees_request_and_outcome() {
    let body = completion_body(json!([{"text": "hi", "index": 0}]));
    let (base_url, _server) = serve_once("200 OK", &[], body).await;
    let recorder = Arc::new(Recorder::default());
    let client = client_for(&base_url).with_logger(recorder.clone());
    client.complete("Hello").await.unwrap();

    let body = json!({"error": {"message": "bad key"}}).to_string();
    let (base_url, _server) = serve_once("401 Unauthorized", &[], body).await;
    let client = client_for(&base_url).with_logger(recorder.clone());
    client.complete("Again").await.unwrap_err();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "request Hello".to_string(),
            "response cmpl-test".to_string(),
            "request Again".to_string(),
            "error Authentication error: bad key".to_string(),
        ]
    );
}

#[tokio::test]
async fn session_over_http_appends_trimmed_reply() {
    let body = completion_body(json!([{"text": "\n\n  Hi there  ", "index": 0}]));
    let (base_url, _server) = serve_once("200 OK", &[], body).await;
    let mut session = ChatSession::new(client_for(&base_url));

    let id = session.submit("Hello").unwrap();
    assert_eq!(session.next_completion().await, Some(id));

    let texts: Vec<_> = session.transcript().iter().map(|m| m.to_string()).collect();
    assert_eq!(texts, vec!["Me: Hello", "Bot: Hi there"]);
}

#[tokio::test]
async fn session_over_http_surfaces_failure() {
    let body = json!({"error": {"message": "Rate limit reached"}}).to_string();
    let (base_url, _server) = serve_once("429 Too Many Requests", &[], body).await;
    let mut session = ChatSession::new(client_for(&base_url));

    session.submit("Hello").unwrap();
    session.settle().await;

    assert_eq!(session.transcript().len(), 2);
    let last = session.transcript().last().unwrap();
    assert_eq!(last.sender(), Sender::Error);
    assert_eq!(last.text(), "Rate limit exceeded: Rate limit reached");
}
