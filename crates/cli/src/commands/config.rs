use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use issuepilot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: Vec<(&str, &str, String)> = vec![
        ("github.token", "ISSUEPILOT_GITHUB_TOKEN", redact_token(config.github.token.expose_secret())),
        ("github.base_url", "ISSUEPILOT_GITHUB_BASE_URL", config.github.base_url.clone()),
        ("github.user_agent", "ISSUEPILOT_GITHUB_USER_AGENT", config.github.user_agent.clone()),
        (
            "github.timeout_secs",
            "ISSUEPILOT_GITHUB_TIMEOUT_SECS",
            config.github.timeout_secs.to_string(),
        ),
        (
            "llm.api_key",
            "ISSUEPILOT_LLM_API_KEY",
            if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
        ),
        ("llm.base_url", "ISSUEPILOT_LLM_BASE_URL", config.llm.base_url.clone()),
        ("llm.model", "ISSUEPILOT_LLM_MODEL", config.llm.model.clone()),
        ("llm.temperature", "ISSUEPILOT_LLM_TEMPERATURE", config.llm.temperature.to_string()),
        ("llm.timeout_secs", "ISSUEPILOT_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        (
            "server.bind_address",
            "ISSUEPILOT_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        ("server.port", "ISSUEPILOT_SERVER_PORT", config.server.port.to_string()),
        ("logging.level", "ISSUEPILOT_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "ISSUEPILOT_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, env_key, value) in entries {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {key} = {value} (source: {source})"));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("issuepilot.toml"), PathBuf::from("config/issuepilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('_').or_else(|| trimmed.split_once('-')) {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn token_redaction_keeps_only_the_prefix() {
        assert_eq!(redact_token("ghp_abcdef123"), "ghp-***");
        assert_eq!(redact_token("github_pat_xyz"), "github-***");
        assert_eq!(redact_token(""), "<empty>");
        assert_eq!(redact_token("rawtokennodashes"), "<redacted>");
    }

    #[test]
    fn path_lookup_walks_nested_tables() {
        let doc: toml::Value = "[github]\nbase_url = \"https://ghe.example.test\""
            .parse()
            .expect("fixture should parse");
        assert!(contains_path(&doc, "github.base_url"));
        assert!(!contains_path(&doc, "github.token"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}
