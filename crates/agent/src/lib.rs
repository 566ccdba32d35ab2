//! Tool-orchestration engine for natural-language GitHub issue operations.
//!
//! One free-text instruction becomes at most one validated, side-effecting
//! call against the GitHub issue API, optionally preceded by an AI
//! classification pass whose judgment is merged into the creation call.
//!
//! # Architecture
//!
//! The engine is a single constrained pass, never a loop:
//! 1. **Operation selection** (`engine`) - one chat-completion exchange that
//!    either picks an operation from the registry or answers in prose
//! 2. **Dispatch** (`dispatch`) - exhaustive routing of the chosen operation
//!    to the tracker client or the composite triage-and-create routine
//! 3. **Execution** (`tracker`, `triage`) - authenticated upstream calls
//!    normalized into typed results
//!
//! # Key types
//!
//! - `Engine` - main orchestrator (see `engine` module)
//! - `ModelGateway` / `IssueTracker` - pluggable seams for both upstreams
//! - `EngineError` - the four-kind failure taxonomy shared with callers
//!
//! # Safety principle
//!
//! The model only selects among registered operations; it never invents one.
//! A name outside the registry fails the invocation instead of silently
//! doing nothing.

pub mod dispatch;
pub mod engine;
pub mod model;
pub mod registry;
pub mod tracker;
pub mod triage;

pub use dispatch::{DispatchOutcome, Dispatcher, OperationChoice, OperationKind, TriagedIssue};
pub use engine::{Engine, ExecutionTrace, Outcome};
pub use model::{ModelGateway, OpenAiClient};
pub use registry::{OperationRegistry, OperationSpec};
pub use tracker::{GitHubClient, IssueCreated, IssueSummary, IssueTracker};
pub use triage::{Priority, TriageClassifier, TriageResult};
