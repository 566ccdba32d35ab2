use thiserror::Error;

/// Remote service a failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamService {
    GitHub,
    ModelProvider,
}

impl std::fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitHub => write!(f, "github"),
            Self::ModelProvider => write!(f, "model provider"),
        }
    }
}

/// Failure taxonomy for one engine invocation.
///
/// Every variant is surfaced to the caller with its kind intact; nothing in
/// the engine collapses these into a generic failure. The only locally
/// recovered failure mode is the triage classifier's malformed-judgment
/// fallback, which never reaches this type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{service} returned {status}: {body}")]
    Upstream { service: UpstreamService, status: u16, body: String },
    #[error("missing configuration: {0}")]
    Configuration(String),
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Transport-level failures (connect errors, timeouts) carry no upstream
    /// status; they surface as 500-equivalent upstream errors.
    pub fn transport(service: UpstreamService, source: impl std::fmt::Display) -> Self {
        Self::Upstream { service, status: 500, body: format!("request failed: {source}") }
    }

    /// HTTP-equivalent status for the error envelope. Upstream failures keep
    /// the provider's own status.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UnknownOperation(_) => 400,
            Self::Upstream { status, .. } => *status,
            Self::Configuration(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, UpstreamService};

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(EngineError::validation("owner is required").status_code(), 400);
        assert_eq!(EngineError::UnknownOperation("close_issue".to_string()).status_code(), 400);
        assert_eq!(EngineError::configuration("llm.api_key is not set").status_code(), 500);

        let upstream = EngineError::Upstream {
            service: UpstreamService::GitHub,
            status: 422,
            body: "validation failed".to_string(),
        };
        assert_eq!(upstream.status_code(), 422);
    }

    #[test]
    fn transport_failures_default_to_500() {
        let error = EngineError::transport(UpstreamService::ModelProvider, "connection refused");
        assert_eq!(error.status_code(), 500);
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn upstream_errors_keep_raw_body_for_diagnostics() {
        let error = EngineError::Upstream {
            service: UpstreamService::GitHub,
            status: 404,
            body: "<html>Not Found</html>".to_string(),
        };
        assert!(error.to_string().contains("<html>Not Found</html>"));
    }
}
