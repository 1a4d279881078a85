use std::env;
use std::fs;
use std::path::Path;

use carlot_core::config::{resolve_config_path, AppConfig, LoadOptions, GEMINI_API_KEY_ENV};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

/// (key path, primary env var) for every reported field.
const FIELDS: &[(&str, &str)] = &[
    ("database.url", "CARLOT_DATABASE_URL"),
    ("database.max_connections", "CARLOT_DATABASE_MAX_CONNECTIONS"),
    ("database.timeout_secs", "CARLOT_DATABASE_TIMEOUT_SECS"),
    ("llm.api_key", "CARLOT_LLM_API_KEY"),
    ("llm.base_url", "CARLOT_LLM_BASE_URL"),
    ("llm.model", "CARLOT_LLM_MODEL"),
    ("llm.timeout_secs", "CARLOT_LLM_TIMEOUT_SECS"),
    ("tools.command", "CARLOT_TOOLS_COMMAND"),
    ("tools.args", "CARLOT_TOOLS_ARGS"),
    ("logging.level", "CARLOT_LOGGING_LEVEL"),
    ("logging.format", "CARLOT_LOGGING_FORMAT"),
];

/// Env vars read as fallbacks when the primary one is unset.
fn fallback_env(key_path: &str) -> Option<&'static str> {
    match key_path {
        "llm.api_key" => Some(GEMINI_API_KEY_ENV),
        "logging.level" => Some("CARLOT_LOG_LEVEL"),
        "logging.format" => Some("CARLOT_LOG_FORMAT"),
        _ => None,
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key) in FIELDS {
        let source = field_source(
            key_path,
            &[Some(*env_key), fallback_env(key_path)],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &display_value(&config, key_path), source));
    }

    lines.join("\n")
}

fn display_value(config: &AppConfig, key_path: &str) -> String {
    match key_path {
        "database.url" => config.database.url.clone(),
        "database.max_connections" => config.database.max_connections.to_string(),
        "database.timeout_secs" => config.database.timeout_secs.to_string(),
        "llm.api_key" => redact_secret(config.llm.api_key.as_ref()),
        "llm.base_url" => config.llm.base_url.clone(),
        "llm.model" => config.llm.model.clone(),
        "llm.timeout_secs" => config.llm.timeout_secs.to_string(),
        "tools.command" => config.tools.command.clone(),
        "tools.args" => {
            if config.tools.args.is_empty() {
                "<none>".to_string()
            } else {
                config.tools.args.join(" ")
            }
        }
        "logging.level" => config.logging.level.clone(),
        "logging.format" => format!("{:?}", config.logging.format),
        _ => "<unknown>".to_string(),
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[Option<&str>],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys.iter().flatten() {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        Some(_) => "<empty>".to_string(),
        None => "<unset>".to_string(),
    }
}
