//! Type-safe routing from a model-chosen operation to its implementing call.
//!
//! The operation name is resolved through a closed enum and an exhaustive
//! match; a name outside the registry is a contract violation
//! (`UnknownOperation`), distinct from ordinary argument validation, so that
//! callers can tell a hallucinated tool apart from bad input.

use std::sync::Arc;

use issuepilot_core::errors::EngineError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry;
use crate::tracker::{
    require_field, AddLabelsParams, CreateIssueParams, IssueCreated, IssueSummary, IssueTracker,
    ListIssuesParams,
};
use crate::triage::{TriageClassifier, TriageResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    ListIssues,
    CreateIssue,
    AddLabels,
    AutoTriageAndCreate,
}

impl OperationKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            registry::LIST_ISSUES => Some(Self::ListIssues),
            registry::CREATE_ISSUE => Some(Self::CreateIssue),
            registry::ADD_LABELS => Some(Self::AddLabels),
            registry::AUTO_TRIAGE_AND_CREATE => Some(Self::AutoTriageAndCreate),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ListIssues => registry::LIST_ISSUES,
            Self::CreateIssue => registry::CREATE_ISSUE,
            Self::AddLabels => registry::ADD_LABELS,
            Self::AutoTriageAndCreate => registry::AUTO_TRIAGE_AND_CREATE,
        }
    }
}

/// The model's selection: an operation name plus its raw argument payload.
#[derive(Clone, Debug)]
pub struct OperationChoice {
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TriageCreateParams {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TriagedIssue {
    #[serde(flatten)]
    pub issue: IssueCreated,
    pub triage: TriageResult,
}

/// Uniform result of a dispatched operation, serialized without a tag so the
/// caller sees the operation-specific shape directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    Issues(Vec<IssueSummary>),
    Created(IssueCreated),
    Labels(Vec<String>),
    Triaged(TriagedIssue),
}

pub struct Dispatcher {
    tracker: Arc<dyn IssueTracker>,
    classifier: TriageClassifier,
}

impl Dispatcher {
    pub fn new(tracker: Arc<dyn IssueTracker>, classifier: TriageClassifier) -> Self {
        Self { tracker, classifier }
    }

    pub async fn dispatch(&self, choice: &OperationChoice) -> Result<DispatchOutcome, EngineError> {
        let Some(kind) = OperationKind::from_name(&choice.name) else {
            return Err(EngineError::UnknownOperation(choice.name.clone()));
        };

        match kind {
            OperationKind::ListIssues => {
                let params: ListIssuesParams = parse_arguments(&choice.arguments)?;
                let issues = self.tracker.list_issues(&params).await?;
                Ok(DispatchOutcome::Issues(issues))
            }
            OperationKind::CreateIssue => {
                let params: CreateIssueParams = parse_arguments(&choice.arguments)?;
                let created = self.tracker.create_issue(&params).await?;
                Ok(DispatchOutcome::Created(created))
            }
            OperationKind::AddLabels => {
                let params: AddLabelsParams = parse_arguments(&choice.arguments)?;
                let labels = self.tracker.add_labels(&params).await?;
                Ok(DispatchOutcome::Labels(labels))
            }
            OperationKind::AutoTriageAndCreate => {
                let params: TriageCreateParams = parse_arguments(&choice.arguments)?;
                let triaged = self.triage_and_create(params).await?;
                Ok(DispatchOutcome::Triaged(triaged))
            }
        }
    }

    /// The one sanctioned two-step chain: classify first, then create with
    /// the judgment merged into title, body, and labels.
    async fn triage_and_create(
        &self,
        params: TriageCreateParams,
    ) -> Result<TriagedIssue, EngineError> {
        require_field(&params.owner, "owner")?;
        require_field(&params.repo, "repo")?;
        require_field(&params.title, "title")?;

        let triage = self.classifier.classify(&params.title, params.body.as_deref()).await?;
        let labels = merged_labels(&triage);

        let final_title = format!("[{}] {}", triage.priority, params.title);
        let final_body = compose_body(&triage, &labels, params.body.as_deref());

        let created = self
            .tracker
            .create_issue(&CreateIssueParams {
                owner: params.owner,
                repo: params.repo,
                title: final_title,
                body: Some(final_body),
                labels: Some(labels),
            })
            .await?;

        Ok(TriagedIssue { issue: created, triage })
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T, EngineError> {
    serde_json::from_value(arguments.clone())
        .map_err(|err| EngineError::validation(format!("invalid arguments: {err}")))
}

/// Suggested labels first, then the two provenance tags, deduplicated with
/// stable order.
pub(crate) fn merged_labels(triage: &TriageResult) -> Vec<String> {
    let provenance = ["ai-triaged".to_string(), triage.priority.label().to_string()];
    let mut labels: Vec<String> = Vec::new();
    for candidate in triage.suggested_labels.iter().cloned().chain(provenance) {
        if !labels.contains(&candidate) {
            labels.push(candidate);
        }
    }
    labels
}

fn compose_body(triage: &TriageResult, labels: &[String], original: Option<&str>) -> String {
    let original = match original {
        Some(text) if !text.is_empty() => text,
        _ => "_(no body)_",
    };

    format!(
        "**AI Summary**: {}\n\n**Priority**: {}\n**Suggested Labels**: {}\n\n---\n{}",
        triage.summary,
        triage.priority,
        labels.join(", "),
        original
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use issuepilot_core::errors::EngineError;
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::{
        compose_body, merged_labels, DispatchOutcome, Dispatcher, OperationChoice, OperationKind,
    };
    use crate::model::{ChatRequest, ModelGateway};
    use crate::tracker::{
        AddLabelsParams, CreateIssueParams, IssueCreated, IssueSummary, IssueTracker,
        ListIssuesParams,
    };
    use crate::triage::{Priority, TriageClassifier, TriageResult};

    #[derive(Default)]
    struct RecordingTracker {
        state: Mutex<RecordingState>,
    }

    #[derive(Default)]
    struct RecordingState {
        create_calls: Vec<CreateIssueParams>,
        list_calls: usize,
        label_calls: usize,
        labels: Vec<String>,
    }

    impl RecordingTracker {
        async fn create_calls(&self) -> Vec<CreateIssueParams> {
            self.state.lock().await.create_calls.clone()
        }
    }

    #[async_trait]
    impl IssueTracker for RecordingTracker {
        async fn list_issues(
            &self,
            _params: &ListIssuesParams,
        ) -> Result<Vec<IssueSummary>, EngineError> {
            self.state.lock().await.list_calls += 1;
            Ok(vec![])
        }

        async fn create_issue(
            &self,
            params: &CreateIssueParams,
        ) -> Result<IssueCreated, EngineError> {
            let mut state = self.state.lock().await;
            state.create_calls.push(params.clone());
            Ok(IssueCreated { number: 42, url: "https://example.test/42".to_string() })
        }

        // Mirrors the labels endpoint: additions accumulate and the full
        // updated list comes back.
        async fn add_labels(&self, params: &AddLabelsParams) -> Result<Vec<String>, EngineError> {
            let mut state = self.state.lock().await;
            state.label_calls += 1;
            for label in &params.labels {
                if !state.labels.contains(label) {
                    state.labels.push(label.clone());
                }
            }
            Ok(state.labels.clone())
        }
    }

    struct FixedGateway {
        content: String,
    }

    #[async_trait]
    impl ModelGateway for FixedGateway {
        async fn complete(&self, _request: ChatRequest) -> Result<String, EngineError> {
            Ok(json!({"choices": [{"message": {"content": self.content}}]}).to_string())
        }
    }

    fn dispatcher_with(
        tracker: Arc<RecordingTracker>,
        classification_content: &str,
    ) -> Dispatcher {
        let gateway = Arc::new(FixedGateway { content: classification_content.to_string() });
        let classifier = TriageClassifier::new(gateway, "gpt-4o-mini".to_string(), 0.2);
        Dispatcher::new(tracker, classifier)
    }

    fn triage(priority: Priority, suggested: &[&str]) -> TriageResult {
        TriageResult {
            summary: "summary".to_string(),
            priority,
            suggested_labels: suggested.iter().map(|label| label.to_string()).collect(),
        }
    }

    #[test]
    fn operation_kind_covers_the_registry_and_nothing_else() {
        assert_eq!(OperationKind::from_name("list_issues"), Some(OperationKind::ListIssues));
        assert_eq!(
            OperationKind::from_name("auto_triage_and_create"),
            Some(OperationKind::AutoTriageAndCreate)
        );
        assert_eq!(OperationKind::from_name("github_delete_repo"), None);
    }

    #[test]
    fn merged_labels_keep_order_and_deduplicate() {
        let merged = merged_labels(&triage(Priority::P1, &["frontend"]));
        assert_eq!(merged, vec!["frontend", "ai-triaged", "p1"]);

        let merged = merged_labels(&triage(Priority::P1, &["ai-triaged", "frontend"]));
        assert_eq!(merged, vec!["ai-triaged", "frontend", "p1"]);
    }

    #[test]
    fn body_uses_sentinel_when_original_is_empty() {
        let labels = vec!["bug".to_string()];
        let body = compose_body(&triage(Priority::P0, &["bug"]), &labels, None);
        assert!(body.contains("**AI Summary**: summary"));
        assert!(body.contains("**Priority**: P0"));
        assert!(body.ends_with("---\n_(no body)_"));

        let body = compose_body(&triage(Priority::P0, &["bug"]), &labels, Some("steps here"));
        assert!(body.ends_with("---\nsteps here"));
    }

    #[tokio::test]
    async fn labeling_twice_yields_the_union_of_both_sets() {
        let tracker = Arc::new(RecordingTracker::default());
        let dispatcher = dispatcher_with(tracker, "{}");

        let first = OperationChoice {
            name: "add_labels".to_string(),
            arguments: json!({"owner": "octo", "repo": "shop", "number": 7, "labels": ["bug"]}),
        };
        let outcome = dispatcher.dispatch(&first).await.expect("first labeling should succeed");
        assert_eq!(outcome, DispatchOutcome::Labels(vec!["bug".to_string()]));

        let second = OperationChoice {
            name: "add_labels".to_string(),
            arguments: json!({
                "owner": "octo",
                "repo": "shop",
                "number": 7,
                "labels": ["urgent", "backend"]
            }),
        };
        let outcome = dispatcher.dispatch(&second).await.expect("second labeling should succeed");
        assert_eq!(
            outcome,
            DispatchOutcome::Labels(vec![
                "bug".to_string(),
                "urgent".to_string(),
                "backend".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn unknown_operation_fails_regardless_of_argument_shape() {
        let tracker = Arc::new(RecordingTracker::default());
        let dispatcher = dispatcher_with(tracker, "{}");

        let choice = OperationChoice {
            name: "merge_pull_request".to_string(),
            arguments: json!({"anything": ["goes", 1, null]}),
        };

        let error = dispatcher.dispatch(&choice).await.expect_err("dispatch should fail");
        assert!(matches!(error, EngineError::UnknownOperation(ref name) if name == "merge_pull_request"));
    }

    #[tokio::test]
    async fn composite_merges_triage_into_the_creation_call() {
        let tracker = Arc::new(RecordingTracker::default());
        let dispatcher = dispatcher_with(
            tracker.clone(),
            r#"{"summary": "checkout 500s", "priority": "P1", "suggestedLabels": ["frontend"]}"#,
        );

        let choice = OperationChoice {
            name: "auto_triage_and_create".to_string(),
            arguments: json!({
                "owner": "octo",
                "repo": "shop",
                "title": "Checkout fails",
                "body": "500 on submit"
            }),
        };

        let outcome = dispatcher.dispatch(&choice).await.expect("dispatch should succeed");
        let DispatchOutcome::Triaged(triaged) = outcome else {
            panic!("expected a triaged creation outcome");
        };
        assert_eq!(triaged.issue.number, 42);
        assert_eq!(triaged.triage.priority, Priority::P1);

        let calls = tracker.create_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].title, "[P1] Checkout fails");
        assert_eq!(
            calls[0].labels.as_deref(),
            Some(&["frontend".to_string(), "ai-triaged".to_string(), "p1".to_string()][..])
        );
        let body = calls[0].body.as_deref().unwrap_or_default();
        assert!(body.contains("**AI Summary**: checkout 500s"));
        assert!(body.ends_with("---\n500 on submit"));
    }

    #[tokio::test]
    async fn composite_validates_title_before_classifying_or_creating() {
        let tracker = Arc::new(RecordingTracker::default());
        let dispatcher = dispatcher_with(tracker.clone(), "{}");

        let choice = OperationChoice {
            name: "auto_triage_and_create".to_string(),
            arguments: json!({"owner": "octo", "repo": "shop"}),
        };

        let error = dispatcher.dispatch(&choice).await.expect_err("dispatch should fail");
        assert!(matches!(error, EngineError::Validation(ref message) if message.contains("title")));
        assert!(tracker.create_calls().await.is_empty(), "tracker must not be called");
    }

    #[tokio::test]
    async fn malformed_argument_types_surface_as_validation_errors() {
        let tracker = Arc::new(RecordingTracker::default());
        let dispatcher = dispatcher_with(tracker, "{}");

        let choice = OperationChoice {
            name: "add_labels".to_string(),
            arguments: json!({"owner": "octo", "repo": "shop", "number": "seven", "labels": ["a"]}),
        };

        let error = dispatcher.dispatch(&choice).await.expect_err("dispatch should fail");
        assert!(matches!(error, EngineError::Validation(_)));
    }
}
