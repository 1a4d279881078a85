use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use carlot_cli::commands::{chat, config, doctor, migrate, seed};
use serde_json::Value;

const MEMORY_DB: &[(&str, &str)] =
    &[("CARLOT_DATABASE_URL", "sqlite::memory:"), ("CARLOT_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(MEMORY_DB, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_rejects_non_sqlite_database_url() {
    with_env(&[("CARLOT_DATABASE_URL", "postgres://localhost/carlot")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_demo_inventory_into_fresh_database() {
    with_env(MEMORY_DB, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("demo inventory ready:"));
        assert!(message.ends_with("0 already present"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let database = TempDatabase::new("seed-idempotent");
    let url = database.url();

    with_env(&[("CARLOT_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_message = parse_payload(&first.output)["message"].as_str().map(str::to_string);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_message = parse_payload(&second.output)["message"].as_str().map(str::to_string);

        assert_ne!(first_message, second_message);
        let second_message = second_message.unwrap_or_default();
        assert!(second_message.contains(": 0 vehicle(s) inserted"), "{second_message}");
    });
}

#[test]
fn chat_requires_llm_api_key() {
    with_env(MEMORY_DB, || {
        let result = chat::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "chat");
        assert_eq!(payload["error_class"], "config_validation");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("GEMINI_API_KEY"));
    });
}

#[test]
fn chat_reports_tool_server_spawn_failure() {
    with_env(
        &[
            ("CARLOT_DATABASE_URL", "sqlite::memory:"),
            ("GEMINI_API_KEY", "test-key"),
            ("CARLOT_TOOLS_COMMAND", "carlot-mcp-does-not-exist"),
            ("CARLOT_LOGGING_LEVEL", "error"),
        ],
        || {
            let result = chat::run();
            assert_eq!(result.exit_code, 7, "expected tool session failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "chat");
            assert_eq!(payload["error_class"], "tool_session");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("carlot-mcp-does-not-exist"));
        },
    );
}

#[test]
fn config_redacts_llm_key_and_attributes_sources() {
    with_env(&[("GEMINI_API_KEY", "AIza-very-secret"), ("CARLOT_LLM_MODEL", "gemini-1.5-pro")], || {
        let output = config::run();

        assert!(!output.contains("AIza-very-secret"));
        assert!(output.contains("- llm.api_key = <redacted> (source: env (GEMINI_API_KEY))"));
        assert!(output.contains("- llm.model = gemini-1.5-pro (source: env (CARLOT_LLM_MODEL))"));
        assert!(output.contains("- tools.command = carlot-mcp (source: default)"));
    });
}

#[test]
fn doctor_json_flags_unmigrated_inventory() {
    with_env(
        &[
            ("CARLOT_DATABASE_URL", "sqlite::memory:"),
            ("CARLOT_DATABASE_MAX_CONNECTIONS", "1"),
            ("CARLOT_LLM_API_KEY", "test-key"),
        ],
        || {
            let payload = parse_payload(&doctor::run(true));
            assert_eq!(payload["overall_status"], "fail");

            let statuses = check_statuses(&payload);
            assert_eq!(
                statuses,
                vec![
                    ("config_validation".to_string(), "pass".to_string()),
                    ("llm_key_readiness".to_string(), "pass".to_string()),
                    ("database_connectivity".to_string(), "pass".to_string()),
                    ("inventory_schema".to_string(), "fail".to_string()),
                ]
            );
        },
    );
}

#[test]
fn doctor_passes_after_seed() {
    let database = TempDatabase::new("doctor-ready");
    let url = database.url();

    with_env(&[("CARLOT_DATABASE_URL", url.as_str()), ("GEMINI_API_KEY", "test-key")], || {
        assert_eq!(seed::run().exit_code, 0);

        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "pass", "{payload}");
        assert_eq!(payload["summary"], "doctor: all readiness checks passed");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("CARLOT_LOGGING_LEVEL", "loud")], || {
        let payload = parse_payload(&doctor::run(true));
        let statuses = check_statuses(&payload);

        assert_eq!(statuses[0], ("config_validation".to_string(), "fail".to_string()));
        assert!(statuses[1..].iter().all(|(_, status)| status == "skipped"));
    });
}

fn check_statuses(payload: &Value) -> Vec<(String, String)> {
    payload["checks"]
        .as_array()
        .map(|checks| {
            checks
                .iter()
                .map(|check| {
                    (
                        check["name"].as_str().unwrap_or_default().to_string(),
                        check["status"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

struct TempDatabase {
    dir: PathBuf,
}

impl TempDatabase {
    fn new(label: &str) -> Self {
        let dir = env::temp_dir().join(format!("carlot-cli-{label}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("temp dir");
        Self { dir }
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.dir.join("carlot.db").display())
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "CARLOT_DATABASE_URL",
        "CARLOT_DATABASE_MAX_CONNECTIONS",
        "CARLOT_DATABASE_TIMEOUT_SECS",
        "CARLOT_LLM_API_KEY",
        "GEMINI_API_KEY",
        "CARLOT_LLM_BASE_URL",
        "CARLOT_LLM_MODEL",
        "CARLOT_LLM_TIMEOUT_SECS",
        "CARLOT_TOOLS_COMMAND",
        "CARLOT_TOOLS_ARGS",
        "CARLOT_LOGGING_LEVEL",
        "CARLOT_LOGGING_FORMAT",
        "CARLOT_LOG_LEVEL",
        "CARLOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
