//! Static catalogue of the operations the engine can perform.
//!
//! Each entry carries a name, a natural-language description consumed by the
//! model prompt, and a JSON-schema argument shape. Pure data; lookups never
//! fail here — an unknown name is the dispatcher's concern.

use serde_json::{json, Value};

pub const LIST_ISSUES: &str = "list_issues";
pub const CREATE_ISSUE: &str = "create_issue";
pub const ADD_LABELS: &str = "add_labels";
pub const AUTO_TRIAGE_AND_CREATE: &str = "auto_triage_and_create";

#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Debug)]
pub struct OperationRegistry {
    specs: Vec<OperationSpec>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            specs: vec![
                list_issues_spec(),
                create_issue_spec(),
                add_labels_spec(),
                auto_triage_and_create_spec(),
            ],
        }
    }

    pub fn all(&self) -> &[OperationSpec] {
        &self.specs
    }

    pub fn lookup(&self, name: &str) -> Option<&OperationSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }
}

fn list_issues_spec() -> OperationSpec {
    OperationSpec {
        name: LIST_ISSUES,
        description: "List and filter GitHub repository issues. Useful for browsing issues, \
                      finding bugs by label, or monitoring repository activity. Returns up to 20 \
                      recent issues with issue numbers, titles, current state, applied labels, \
                      and direct GitHub URLs.",
        parameters: json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "string",
                    "description": "GitHub username or organization name (e.g., 'microsoft')"
                },
                "repo": {
                    "type": "string",
                    "description": "Repository name (e.g., 'vscode')"
                },
                "state": {
                    "type": "string",
                    "enum": ["open", "closed", "all"],
                    "description": "Filter issues by state. Defaults to 'open' if not specified"
                },
                "labels": {
                    "type": "string",
                    "description": "Comma-separated list of labels to filter by (e.g., 'bug,urgent')"
                }
            },
            "required": ["owner", "repo"]
        }),
    }
}

fn create_issue_spec() -> OperationSpec {
    OperationSpec {
        name: CREATE_ISSUE,
        description: "Create a new GitHub issue. Suited to bug reports, feature requests, \
                      documentation tasks, or any trackable work item. Supports markdown body \
                      content and label categorization, and returns the created issue number \
                      plus its direct GitHub URL.",
        parameters: json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "string",
                    "description": "GitHub username or organization name"
                },
                "repo": {
                    "type": "string",
                    "description": "Repository name"
                },
                "title": {
                    "type": "string",
                    "description": "Issue title - should be descriptive and concise"
                },
                "body": {
                    "type": "string",
                    "description": "Issue body with detailed description, reproduction steps, etc."
                },
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Label names to apply to the issue (e.g., ['bug', 'urgent'])"
                }
            },
            "required": ["owner", "repo", "title"]
        }),
    }
}

fn add_labels_spec() -> OperationSpec {
    OperationSpec {
        name: ADD_LABELS,
        description: "Add categorization labels to an existing GitHub issue for triage, \
                      priority setting, or team assignment. Labels are additive - existing \
                      labels remain while new ones are applied. Returns the complete updated \
                      label list.",
        parameters: json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "string",
                    "description": "GitHub username or organization name"
                },
                "repo": {
                    "type": "string",
                    "description": "Repository name"
                },
                "number": {
                    "type": "number",
                    "description": "Issue number (the # number visible in the GitHub UI)"
                },
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Label names to add (e.g., ['needs-review', 'priority-high'])"
                }
            },
            "required": ["owner", "repo", "number", "labels"]
        }),
    }
}

fn auto_triage_and_create_spec() -> OperationSpec {
    OperationSpec {
        name: AUTO_TRIAGE_AND_CREATE,
        description: "Analyze, prioritize, and create a GitHub issue in one step. An AI pass \
                      evaluates the content, assigns a priority level (P0-P3), suggests labels, \
                      and writes an executive summary before the issue is created with enhanced \
                      formatting. Ideal for processing user feedback, bug reports, or feature \
                      requests.",
        parameters: json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "string",
                    "description": "GitHub username or organization name"
                },
                "repo": {
                    "type": "string",
                    "description": "Repository name"
                },
                "title": {
                    "type": "string",
                    "description": "Original issue title for AI analysis"
                },
                "body": {
                    "type": "string",
                    "description": "Issue description for the AI to analyze and enhance"
                }
            },
            "required": ["owner", "repo", "title"]
        }),
    }
}
