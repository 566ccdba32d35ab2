//! Orchestration of one instruction: selection, dispatch, trace.
//!
//! The engine is a strict single pass. One chat-completion exchange either
//! yields a natural-language reply (Done) or exactly one operation choice,
//! which is handed to the dispatcher (Dispatching) and terminates the
//! invocation on success or failure alike (Done). There are no retries and
//! no tool chaining beyond the composite routine the dispatcher owns.

use std::sync::Arc;
use std::time::Instant;

use issuepilot_core::config::AppConfig;
use issuepilot_core::errors::{EngineError, UpstreamService};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::dispatch::{DispatchOutcome, Dispatcher, OperationChoice};
use crate::model::{
    ChatMessage, ChatRequest, ChatResponse, ModelGateway, OpenAiClient, ToolDefinition,
    ToolFunction,
};
use crate::registry::OperationRegistry;
use crate::tracker::{GitHubClient, IssueTracker};
use crate::triage::TriageClassifier;

const SELECTION_INSTRUCTION: &str = "You are a GitHub operations agent. Analyze the user's \
                                     request and choose the most appropriate tool to fulfill it. \
                                     If the request lacks specific details (like owner/repo/issue \
                                     number), make reasonable inferences from context or use \
                                     common examples. If no tool is suitable, provide helpful \
                                     guidance in natural language.";

const NO_RESPONSE_SENTINEL: &str = "(no response)";

/// Uniform result envelope for one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Reply { reply: String },
    Operation(DispatchOutcome),
}

/// Observability record for one invocation. Emitted through `tracing`,
/// never stored or read back.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionTrace {
    pub chosen_operation: String,
    pub arguments: Value,
    pub duration_ms: u128,
    pub success: bool,
}

pub struct Engine {
    registry: OperationRegistry,
    gateway: Arc<dyn ModelGateway>,
    dispatcher: Dispatcher,
    model: String,
    temperature: f32,
}

impl Engine {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        tracker: Arc<dyn IssueTracker>,
        model: String,
        temperature: f32,
    ) -> Self {
        let classifier = TriageClassifier::new(gateway.clone(), model.clone(), temperature);
        Self {
            registry: OperationRegistry::new(),
            gateway,
            dispatcher: Dispatcher::new(tracker, classifier),
            model,
            temperature,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        let gateway: Arc<dyn ModelGateway> = Arc::new(OpenAiClient::new(config.llm.clone())?);
        let tracker: Arc<dyn IssueTracker> = Arc::new(GitHubClient::new(config.github.clone())?);
        Ok(Self::new(gateway, tracker, config.llm.model.clone(), config.llm.temperature))
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Runs one free-text instruction to completion and emits exactly one
    /// `ExecutionTrace`, on success and failure alike.
    pub async fn run_instruction(&self, input: &str) -> Result<Outcome, EngineError> {
        let started = Instant::now();
        let mut trace = ExecutionTrace {
            chosen_operation: "unknown".to_string(),
            arguments: Value::Null,
            duration_ms: 0,
            success: false,
        };

        let result = self.run_inner(input, &mut trace).await;

        trace.duration_ms = started.elapsed().as_millis();
        trace.success = result.is_ok();

        match &result {
            Ok(_) => info!(
                event_name = "agent.execution_trace",
                chosen_operation = %trace.chosen_operation,
                arguments = %trace.arguments,
                duration_ms = trace.duration_ms as u64,
                success = trace.success,
                "instruction completed"
            ),
            Err(error) => warn!(
                event_name = "agent.execution_trace",
                chosen_operation = %trace.chosen_operation,
                arguments = %trace.arguments,
                duration_ms = trace.duration_ms as u64,
                success = trace.success,
                status = error.status_code(),
                error = %error,
                "instruction failed"
            ),
        }

        result
    }

    async fn run_inner(
        &self,
        input: &str,
        trace: &mut ExecutionTrace,
    ) -> Result<Outcome, EngineError> {
        if input.trim().is_empty() {
            return Err(EngineError::validation("instruction text is required"));
        }

        let raw = self.gateway.complete(self.selection_request(input)).await?;
        let response: ChatResponse = serde_json::from_str(&raw).map_err(|err| {
            EngineError::Upstream {
                service: UpstreamService::ModelProvider,
                status: 500,
                body: format!("malformed completion envelope: {err}"),
            }
        })?;

        let message =
            response.choices.into_iter().next().map(|choice| choice.message).unwrap_or_default();

        let Some(call) = message.tool_calls.into_iter().next() else {
            trace.chosen_operation = "none".to_string();
            let reply = message
                .content
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| NO_RESPONSE_SENTINEL.to_string());
            return Ok(Outcome::Reply { reply });
        };

        // The engine trusts the model to emit valid JSON for a call it
        // originated; malformed arguments are a hard failure, not a fallback.
        let arguments: Value = if call.function.arguments.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|err| {
                EngineError::validation(format!(
                    "operation `{}` carried malformed JSON arguments: {err}",
                    call.function.name
                ))
            })?
        };

        trace.chosen_operation = call.function.name.clone();
        trace.arguments = arguments.clone();

        let choice = OperationChoice { name: call.function.name, arguments };
        let outcome = self.dispatcher.dispatch(&choice).await?;
        Ok(Outcome::Operation(outcome))
    }

    fn selection_request(&self, input: &str) -> ChatRequest {
        let tools = self
            .registry
            .all()
            .iter()
            .map(|spec| ToolDefinition {
                kind: "function",
                function: ToolFunction {
                    name: spec.name,
                    description: spec.description,
                    parameters: spec.parameters.clone(),
                },
            })
            .collect();

        ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![
                ChatMessage::system(SELECTION_INSTRUCTION),
                ChatMessage::user(input.to_string()),
            ],
            tools,
            tool_choice: Some("auto"),
        }
    }
}
