//! Shared foundation for the issuepilot workspace: configuration loading and
//! the engine-wide error taxonomy.
//!
//! Nothing in this crate performs network I/O. Configuration is loaded once
//! at process start and passed explicitly into every component constructor;
//! there is no process-global settable state.

pub mod config;
pub mod errors;

pub use config::{AppConfig, ConfigError, ConfigOverrides, GitHubConfig, LlmConfig, LoadOptions};
pub use errors::{EngineError, UpstreamService};
