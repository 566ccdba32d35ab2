//! Authenticated client for the GitHub issue API.
//!
//! Three primitive operations — list, create, add labels — share one request
//! primitive: standard headers, read the full body as text, and only attempt
//! JSON parsing once the status is known to be 2xx. A non-2xx response
//! surfaces the unparsed body for diagnostics even when it is not JSON.

use std::time::Duration;

use async_trait::async_trait;
use issuepilot_core::config::GitHubConfig;
use issuepilot_core::errors::{EngineError, UpstreamService};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LIST_PAGE_SIZE: u32 = 20;

pub(crate) fn require_field(value: &str, field: &'static str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ListIssuesParams {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub state: Option<IssueState>,
    #[serde(default)]
    pub labels: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreateIssueParams {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AddLabelsParams {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub labels: Vec<String>,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCreated {
    pub number: u64,
    pub url: String,
}

/// The issue-tracker seam. `GitHubClient` is the production implementation;
/// tests script this trait directly.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_issues(&self, params: &ListIssuesParams)
        -> Result<Vec<IssueSummary>, EngineError>;
    async fn create_issue(&self, params: &CreateIssueParams) -> Result<IssueCreated, EngineError>;
    async fn add_labels(&self, params: &AddLabelsParams) -> Result<Vec<String>, EngineError>;
}

pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| EngineError::transport(UpstreamService::GitHub, err))?;
        Ok(Self { http, config })
    }

    fn issues_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/issues", self.config.base_url.trim_end_matches('/'))
    }

    fn prepare(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(self.config.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, EngineError> {
        let response = self
            .prepare(builder)
            .send()
            .await
            .map_err(|err| EngineError::transport(UpstreamService::GitHub, err))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| EngineError::transport(UpstreamService::GitHub, err))?;

        if !(200..300).contains(&status) {
            return Err(EngineError::Upstream { service: UpstreamService::GitHub, status, body });
        }

        serde_json::from_str(&body).map_err(|err| EngineError::Upstream {
            service: UpstreamService::GitHub,
            status,
            body: format!("unparseable response body: {err}"),
        })
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn list_issues(
        &self,
        params: &ListIssuesParams,
    ) -> Result<Vec<IssueSummary>, EngineError> {
        require_field(&params.owner, "owner")?;
        require_field(&params.repo, "repo")?;

        let query = list_query(params.state.unwrap_or_default(), params.labels.as_deref());
        let builder =
            self.http.get(self.issues_url(&params.owner, &params.repo)).query(&query);
        let items: Vec<RawIssue> = self.send_json(builder).await?;
        Ok(summarize_issues(items))
    }

    async fn create_issue(&self, params: &CreateIssueParams) -> Result<IssueCreated, EngineError> {
        require_field(&params.owner, "owner")?;
        require_field(&params.repo, "repo")?;
        require_field(&params.title, "title")?;

        let payload = CreateIssueBody {
            title: &params.title,
            body: params.body.as_deref(),
            labels: params.labels.as_deref(),
        };
        let builder =
            self.http.post(self.issues_url(&params.owner, &params.repo)).json(&payload);
        let created: RawCreated = self.send_json(builder).await?;
        Ok(IssueCreated { number: created.number, url: created.html_url })
    }

    async fn add_labels(&self, params: &AddLabelsParams) -> Result<Vec<String>, EngineError> {
        require_field(&params.owner, "owner")?;
        require_field(&params.repo, "repo")?;
        if params.number == 0 {
            return Err(EngineError::validation("number is required"));
        }
        if params.labels.is_empty() {
            return Err(EngineError::validation("labels must be a non-empty list"));
        }

        let url = format!(
            "{}/{}/labels",
            self.issues_url(&params.owner, &params.repo),
            params.number
        );
        let builder = self.http.post(url).json(&AddLabelsBody { labels: &params.labels });
        let applied: Vec<RawLabel> = self.send_json(builder).await?;
        Ok(label_names(applied))
    }
}

#[derive(Debug, Serialize)]
struct CreateIssueBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct AddLabelsBody<'a> {
    labels: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<RawLabel>,
    html_url: String,
    // The issues endpoint returns pull requests too; this marker identifies them.
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawCreated {
    number: u64,
    html_url: String,
}

fn list_query(state: IssueState, labels: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query =
        vec![("state", state.as_str().to_string()), ("per_page", LIST_PAGE_SIZE.to_string())];
    if let Some(labels) = labels {
        query.push(("labels", labels.to_string()));
    }
    query
}

fn label_names(labels: Vec<RawLabel>) -> Vec<String> {
    labels.into_iter().map(|label| label.name).collect()
}

fn summarize_issues(items: Vec<RawIssue>) -> Vec<IssueSummary> {
    items
        .into_iter()
        .filter(|item| item.pull_request.is_none())
        .map(|item| IssueSummary {
            number: item.number,
            title: item.title,
            state: item.state,
            labels: label_names(item.labels),
            url: item.html_url,
        })
        .collect()
}
