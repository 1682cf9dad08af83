// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the external command interpreter.
//!
//! Posts `{"input": "...", "tools": [...]}` as JSON and decodes a camelCase
//! [`Interpretation`]. Transport failures, non-2xx statuses, and undecodable
//! bodies are errors; a decoded `success: false` is not.

use std::time::Duration;

use async_trait::async_trait;
use boardq_config::model::InterpreterConfig;
use boardq_core::{BoardqError, CommandInterpreter, Interpretation};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Serialize)]
struct InterpretRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
}

/// [`CommandInterpreter`] backed by an HTTP service.
///
/// Transient statuses (429, 500, 502, 503) are retried once after a short
/// delay.
#[derive(Debug, Clone)]
pub struct HttpInterpreter {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    tools: Vec<Value>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpInterpreter {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, BoardqError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BoardqError::Interpreter {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            tools: Vec::new(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Builds a client from `[interpreter]`. Fails when no endpoint is set.
    pub fn from_config(config: &InterpreterConfig) -> Result<Self, BoardqError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            BoardqError::Config("interpreter.endpoint must be set to process commands".into())
        })?;
        Self::new(
            endpoint,
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Sends the tool catalogue along with every request.
    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, input: &str) -> Result<reqwest::Response, BoardqError> {
        let body = InterpretRequest {
            input,
            tools: (!self.tools.is_empty()).then_some(self.tools.as_slice()),
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await.map_err(|e| BoardqError::Interpreter {
            message: format!("interpreter request failed: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl CommandInterpreter for HttpInterpreter {
    async fn process_command(&self, input: &str) -> Result<Interpretation, BoardqError> {
        let mut attempt = 0;
        loop {
            let response = self.send(input).await?;
            let status = response.status();
            debug!(status = %status, attempt, "interpreter response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| BoardqError::Interpreter {
                    message: format!("failed to read interpreter response: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| BoardqError::Interpreter {
                    message: format!("failed to parse interpreter response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient interpreter error, will retry");
                attempt += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            let message = match error_detail(&body) {
                Some(detail) => format!("interpreter returned {status}: {detail}"),
                None => format!("interpreter returned {status}"),
            };
            return Err(BoardqError::interpreter(message));
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

/// Pulls a message out of `{"error": "..."}`, `{"error": {"message": "..."}}`,
/// or `{"message": "..."}`, falling back to the raw body.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Some(body.to_string());
    };
    let error = value.get("error");
    error
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| Some(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpInterpreter {
        HttpInterpreter::new(
            format!("{}/interpret", server.uri()),
            Some("secret-token".into()),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn decodes_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/interpret"))
            .and(header("authorization", "Bearer secret-token"))
            .and(body_partial_json(json!({"input": "Create a red note"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "1 action",
                "toolCalls": [{
                    "id": "call-1",
                    "name": "createStickyNote",
                    "arguments": {"text": "note", "color": "#ff0000"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .process_command("Create a red note")
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].name, "createStickyNote");
        assert_eq!(result.tool_calls[0].id.as_deref(), Some("call-1"));
        assert_eq!(result.tool_calls[0].arguments["color"], "#ff0000");
    }

    #[tokio::test]
    async fn sends_tool_catalogue_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"tools": [{"name": "getBoardState"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .with_tools(vec![json!({"name": "getBoardState"})])
            .process_command("what is on the board?")
            .await
            .unwrap();
        assert!(result.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn rejection_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "Could not understand",
                "errors": ["no board object matches 'the blue one'"]
            })))
            .mount(&server)
            .await;

        let result = client(&server).process_command("move the blue one").await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.failure_message(),
            "no board object matches 'the blue one'"
        );
    }

    #[tokio::test]
    async fn client_errors_carry_the_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "input too long"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).process_command("x").await.unwrap_err();
        assert!(matches!(err, BoardqError::Interpreter { .. }));
        assert_eq!(
            err.user_message(),
            "interpreter returned 400 Bad Request: input too long"
        );
    }

    #[tokio::test]
    async fn retries_once_on_transient_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let result = client(&server).process_command("x").await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn gives_up_after_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server).process_command("x").await.unwrap_err();
        assert!(err.user_message().contains("upstream exploded"), "got: {err}");
    }

    #[tokio::test]
    async fn garbage_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).process_command("x").await.unwrap_err();
        assert!(err.user_message().starts_with("failed to parse interpreter response"));
    }

    #[tokio::test]
    async fn request_timeout_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let interpreter = HttpInterpreter::new(server.uri(), None, Duration::from_millis(100)).unwrap();
        let err = interpreter.process_command("x").await.unwrap_err();
        assert!(err.user_message().starts_with("interpreter request failed"));
    }

    #[test]
    fn from_config_requires_endpoint() {
        let err = HttpInterpreter::from_config(&InterpreterConfig::default()).unwrap_err();
        assert!(matches!(err, BoardqError::Config(_)));

        let config = InterpreterConfig {
            endpoint: Some("http://127.0.0.1:9/interpret".into()),
            ..InterpreterConfig::default()
        };
        let interpreter = HttpInterpreter::from_config(&config).unwrap();
        assert_eq!(interpreter.endpoint(), "http://127.0.0.1:9/interpret");
    }

    #[test]
    fn error_detail_shapes() {
        assert_eq!(error_detail(r#"{"error":"bad"}"#).as_deref(), Some("bad"));
        assert_eq!(error_detail(r#"{"message":"worse"}"#).as_deref(), Some("worse"));
        assert_eq!(error_detail("plain text").as_deref(), Some("plain text"));
        assert_eq!(error_detail("  "), None);
    }
}
