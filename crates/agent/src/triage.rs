//! AI classification of an issue into summary, priority, and labels.
//!
//! The classifier demands strict JSON from the model but never lets a
//! non-compliant judgment block issue creation: a 2xx response that does not
//! parse as the expected shape degrades to a deterministic fallback. Real
//! upstream failures (non-2xx, transport) still propagate.

use std::sync::Arc;

use issuepilot_core::errors::EngineError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{ChatMessage, ChatRequest, ChatResponse, ModelGateway};

const SYSTEM_INSTRUCTION: &str = "You are a GitHub issue triage assistant. Return strict JSON \
                                  with keys: summary, priority(P0|P1|P2|P3), suggestedLabels \
                                  (array).";

const FALLBACK_SUMMARY_LIMIT: usize = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    #[default]
    P2,
    P3,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }

    /// Lower-cased form used as the provenance label on triaged issues.
    pub fn label(self) -> &'static str {
        match self {
            Self::P0 => "p0",
            Self::P1 => "p1",
            Self::P2 => "p2",
            Self::P3 => "p3",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub summary: String,
    pub priority: Priority,
    #[serde(default)]
    pub suggested_labels: Vec<String>,
}

pub struct TriageClassifier {
    gateway: Arc<dyn ModelGateway>,
    model: String,
    temperature: f32,
}

impl TriageClassifier {
    pub fn new(gateway: Arc<dyn ModelGateway>, model: String, temperature: f32) -> Self {
        Self { gateway, model, temperature }
    }

    pub async fn classify(
        &self,
        title: &str,
        body: Option<&str>,
    ) -> Result<TriageResult, EngineError> {
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(user_prompt(title, body)),
            ],
            tools: vec![],
            tool_choice: None,
        };

        let raw = self.gateway.complete(request).await?;

        match parse_judgment(&raw) {
            Some(triage) => Ok(triage),
            None => {
                // The raw provider text is deliberately discarded here;
                // degraded quality must never block issue creation.
                warn!(
                    event_name = "agent.triage_fallback",
                    title = %truncate(title, 100),
                    "classifier returned a malformed judgment; using deterministic fallback"
                );
                Ok(fallback(title))
            }
        }
    }
}

fn user_prompt(title: &str, body: Option<&str>) -> String {
    format!(
        "Title: {title}\n\nBody:\n{}\n\nReturn JSON exactly: {{\"summary\": string, \
         \"priority\": \"P0\"|\"P1\"|\"P2\"|\"P3\", \"suggestedLabels\": string[]}}",
        body.unwrap_or("")
    )
}

fn parse_judgment(raw: &str) -> Option<TriageResult> {
    let envelope: ChatResponse = serde_json::from_str(raw).ok()?;
    let choice = envelope.choices.first()?;
    let content = choice.message.content.as_deref()?;
    serde_json::from_str(content).ok()
}

pub(crate) fn fallback(title: &str) -> TriageResult {
    TriageResult {
        summary: truncate(&format!("Analysis of: {title}"), FALLBACK_SUMMARY_LIMIT),
        priority: Priority::P2,
        suggested_labels: vec!["needs-triage".to_string()],
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
