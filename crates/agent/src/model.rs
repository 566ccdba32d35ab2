//! Chat-completion wire types and the gateway to the model provider.
//!
//! Both the operation-selection exchange and the triage classification go
//! through the one [`ModelGateway`] seam. The gateway returns the raw body
//! of a successful exchange; callers decide how strictly to parse it (the
//! engine treats a malformed envelope as a hard failure, the classifier
//! degrades to a deterministic fallback).

use std::time::Duration;

use async_trait::async_trait;
use issuepilot_core::config::LlmConfig;
use issuepilot_core::errors::{EngineError, UpstreamService};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolFunction {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ToolFunction,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: AssistantMessage,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// One request/response exchange with the model provider.
///
/// Returns the raw response body of a 2xx exchange. A missing credential is
/// a `Configuration` failure raised before any network call; a non-2xx
/// response or transport failure is `Upstream` with the unparsed body
/// attached.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, EngineError>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| EngineError::transport(UpstreamService::ModelProvider, err))?;
        Ok(Self { http, config })
    }

    fn api_key(&self) -> Result<&SecretString, EngineError> {
        self.config
            .api_key
            .as_ref()
            .ok_or_else(|| EngineError::configuration("llm.api_key is not configured"))
    }
}

#[async_trait]
impl ModelGateway for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, EngineError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| EngineError::transport(UpstreamService::ModelProvider, err))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| EngineError::transport(UpstreamService::ModelProvider, err))?;

        if !(200..300).contains(&status) {
            return Err(EngineError::Upstream {
                service: UpstreamService::ModelProvider,
                status,
                body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use issuepilot_core::config::LlmConfig;
    use issuepilot_core::errors::EngineError;

    use super::{ChatRequest, ChatResponse, ModelGateway, OpenAiClient};

    fn keyless_config() -> LlmConfig {
        LlmConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        let client = OpenAiClient::new(keyless_config()).expect("client should build");
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            messages: vec![],
            tools: vec![],
            tool_choice: None,
        };

        let error = client.complete(request).await.expect_err("completion should fail");
        assert!(matches!(error, EngineError::Configuration(_)));
    }

    #[test]
    fn request_serialization_omits_empty_tooling() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            messages: vec![super::ChatMessage::user("hello")],
            tools: vec![],
            tool_choice: None,
        };

        let encoded = serde_json::to_value(&request).expect("request should serialize");
        assert!(encoded.get("tools").is_none());
        assert!(encoded.get("tool_choice").is_none());
        assert_eq!(encoded["messages"][0]["role"], "user");
    }

    #[test]
    fn response_parses_tool_call_shape() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_issues", "arguments": "{\"owner\":\"octo\"}"}
                    }]
                }
            }]
        }"#;

        let response: ChatResponse = serde_json::from_str(raw).expect("response should parse");
        let call = &response.choices[0].message.tool_calls[0];
        assert_eq!(call.function.name, "list_issues");
        assert!(call.function.arguments.contains("octo"));
    }
}
