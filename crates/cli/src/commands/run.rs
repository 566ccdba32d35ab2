use issuepilot_agent::Engine;
use issuepilot_core::config::{AppConfig, LoadOptions};
use issuepilot_core::errors::EngineError;

use super::CommandResult;

pub fn run(text: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("failed to initialize async runtime: {error}"),
            }
        }
    };

    let outcome = runtime.block_on(async {
        let engine = Engine::from_config(&config)?;
        engine.run_instruction(text).await
    });

    match outcome {
        Ok(outcome) => {
            let rendered = serde_json::to_string_pretty(&outcome)
                .unwrap_or_else(|error| format!("outcome could not be encoded: {error}"));
            CommandResult { exit_code: 0, output: rendered }
        }
        Err(error) => CommandResult {
            exit_code: 1,
            output: format!("{}: {error}", error_class(&error)),
        },
    }
}

fn error_class(error: &EngineError) -> &'static str {
    match error {
        EngineError::Validation(_) => "validation",
        EngineError::Upstream { .. } => "upstream",
        EngineError::Configuration(_) => "configuration",
        EngineError::UnknownOperation(_) => "unknown_operation",
    }
}
