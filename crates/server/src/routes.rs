//! HTTP surface for the engine.
//!
//! Endpoints:
//! - `POST /agent`  — run one free-text instruction, JSON in/out
//! - `GET  /health` — readiness report
//!
//! A successful invocation returns the outcome's operation-specific shape at
//! the top level. A failed one returns `{"error": ...}` with the HTTP status
//! taken from the error taxonomy, so a client can tell bad input (400) from
//! upstream trouble (the provider's own status) and missing configuration
//! (500).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use issuepilot_agent::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
    model_configured: bool,
}

impl AppState {
    pub fn new(engine: Engine, model_configured: bool) -> Self {
        Self { engine: Arc::new(engine), model_configured }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    #[serde(default)]
    pub input: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub model_provider: HealthCheck,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/agent", post(run_agent))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_agent(
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> (StatusCode, Json<Value>) {
    match state.engine.run_instruction(&request.input).await {
        Ok(outcome) => match serde_json::to_value(&outcome) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(encode_error) => {
                error!(
                    event_name = "system.server.encode_error",
                    error = %encode_error,
                    "outcome could not be encoded"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "outcome could not be encoded"})),
                )
            }
        },
        Err(engine_error) => {
            let status = StatusCode::from_u16(engine_error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"error": engine_error.to_string()})))
        }
    }
}

/// Missing model credentials degrade the report but keep the service up;
/// plain issue operations work without them.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let model_provider = if state.model_configured {
        HealthCheck { status: "ready", detail: "model credentials configured".to_string() }
    } else {
        HealthCheck { status: "degraded", detail: "llm.api_key is not configured".to_string() }
    };

    let payload = HealthResponse {
        status: if model_provider.status == "ready" { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "issuepilot-server runtime initialized".to_string(),
        },
        model_provider,
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;
    use issuepilot_agent::model::{ChatRequest, ModelGateway};
    use issuepilot_agent::tracker::{
        AddLabelsParams, CreateIssueParams, IssueCreated, IssueSummary, IssueTracker,
        ListIssuesParams,
    };
    use issuepilot_agent::Engine;
    use issuepilot_core::errors::{EngineError, UpstreamService};
    use serde_json::json;

    use super::{health, run_agent, AgentRequest, AppState};

    struct FixedGateway {
        response: Result<String, EngineError>,
    }

    #[async_trait]
    impl ModelGateway for FixedGateway {
        async fn complete(&self, _request: ChatRequest) -> Result<String, EngineError> {
            self.response.clone()
        }
    }

    struct StubTracker;

    #[async_trait]
    impl IssueTracker for StubTracker {
        async fn list_issues(
            &self,
            _params: &ListIssuesParams,
        ) -> Result<Vec<IssueSummary>, EngineError> {
            Ok(vec![IssueSummary {
                number: 5,
                title: "flaky test".to_string(),
                state: "open".to_string(),
                labels: vec![],
                url: "https://example.test/5".to_string(),
            }])
        }

        async fn create_issue(
            &self,
            _params: &CreateIssueParams,
        ) -> Result<IssueCreated, EngineError> {
            Ok(IssueCreated { number: 6, url: "https://example.test/6".to_string() })
        }

        async fn add_labels(&self, params: &AddLabelsParams) -> Result<Vec<String>, EngineError> {
            Ok(params.labels.clone())
        }
    }

    fn state_with(response: Result<String, EngineError>) -> AppState {
        let engine = Engine::new(
            Arc::new(FixedGateway { response }),
            Arc::new(StubTracker),
            "gpt-4o-mini".to_string(),
            0.2,
        );
        AppState::new(engine, true)
    }

    fn tool_call_completion(name: &str, arguments: &str) -> String {
        json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": name, "arguments": arguments}
                    }]
                }
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn agent_route_returns_operation_payload_on_success() {
        let state = state_with(Ok(tool_call_completion(
            "list_issues",
            r#"{"owner": "octo", "repo": "shop"}"#,
        )));

        let (status, Json(payload)) =
            run_agent(State(state), Json(AgentRequest { input: "list issues".to_string() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload[0]["number"], 5);
        assert_eq!(payload[0]["title"], "flaky test");
    }

    #[tokio::test]
    async fn agent_route_maps_validation_failures_to_bad_request() {
        let state = state_with(Ok("unused".to_string()));

        let (status, Json(payload)) =
            run_agent(State(state), Json(AgentRequest { input: "  ".to_string() })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().unwrap_or_default().contains("invalid input"));
    }

    #[tokio::test]
    async fn agent_route_passes_upstream_status_through() {
        let state = state_with(Err(EngineError::Upstream {
            service: UpstreamService::ModelProvider,
            status: 429,
            body: "rate limited".to_string(),
        }));

        let (status, Json(payload)) =
            run_agent(State(state), Json(AgentRequest { input: "list issues".to_string() })).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(payload["error"].as_str().unwrap_or_default().contains("rate limited"));
    }

    #[tokio::test]
    async fn agent_route_returns_reply_shape_for_prose_answers() {
        let state = state_with(Ok(json!({
            "choices": [{"message": {"content": "name an owner and repository"}}]
        })
        .to_string()));

        let (status, Json(payload)) =
            run_agent(State(state), Json(AgentRequest { input: "help".to_string() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["reply"], "name an owner and repository");
    }

    #[tokio::test]
    async fn health_reports_ready_when_fully_configured() {
        let state = state_with(Ok("unused".to_string()));

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.model_provider.status, "ready");
    }

    #[tokio::test]
    async fn health_degrades_without_model_credentials() {
        let engine = Engine::new(
            Arc::new(FixedGateway { response: Ok("unused".to_string()) }),
            Arc::new(StubTracker),
            "gpt-4o-mini".to_string(),
            0.2,
        );
        let state = AppState::new(engine, false);

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
