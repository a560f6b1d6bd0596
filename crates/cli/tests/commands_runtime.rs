use std::env;
use std::sync::{Mutex, OnceLock};

use codbot_cli::commands::{config, migrate, replay};
use codbot_core::signature;
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};

const WEBHOOK_SECRET: &str = "whsec-cli-test";

const REQUIRED_ENV: [(&str, &str); 8] = [
    ("CODBOT_MESSAGING_API_KEY", "gs-key-test"),
    ("CODBOT_MESSAGING_SOURCE_NUMBER", "917834811114"),
    ("CODBOT_MESSAGING_APP_NAME", "ringshing"),
    ("CODBOT_MESSAGING_ORDER_TEMPLATE_ID", "tmpl-cod-1"),
    ("CODBOT_COMMERCE_STORE_DOMAIN", "ringshing.myshopify.com"),
    ("CODBOT_COMMERCE_ACCESS_TOKEN", "shpat_test_token"),
    ("CODBOT_COMMERCE_WEBHOOK_SECRET", WEBHOOK_SECRET),
    ("CODBOT_LLM_API_KEY", "gemini-test"),
];

fn valid_env<'a>(extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    REQUIRED_ENV.iter().copied().chain(extra.iter().copied()).collect()
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&valid_env(&[("CODBOT_DATABASE_URL", "sqlite::memory:")]), || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "applied 1 pending migration(s)");
        assert_eq!(payload["detail"]["applied_versions"], json!([1]));
        assert_eq!(payload["detail"]["newly_applied"], json!([1]));
        assert_eq!(payload["detail"]["conversation_table"], migrate::CONVERSATION_TABLE);
    });
}

#[test]
fn migrate_returns_config_failure_without_credentials() {
    with_env(&[("CODBOT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_creates_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("codbot.db").display());

    with_env(&valid_env(&[("CODBOT_DATABASE_URL", url.as_str())]), || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "{}", result.output);
    });

    assert!(dir.path().join("codbot.db").exists());
}

#[test]
fn migrate_rerun_reports_schema_already_current() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("codbot.db").display());

    let (first, second) = with_env(&valid_env(&[("CODBOT_DATABASE_URL", url.as_str())]), || {
        (migrate::run(), migrate::run())
    });

    assert_eq!(first.exit_code, 0, "{}", first.output);
    assert_eq!(second.exit_code, 0, "{}", second.output);
    let payload = parse_payload(&second.output);
    assert_eq!(payload["message"], "schema already up to date");
    assert_eq!(payload["detail"]["applied_versions"], json!([1]));
    assert_eq!(payload["detail"]["newly_applied"], json!([]));
    assert_eq!(payload["detail"]["database_url"], url.as_str());
}

#[test]
fn config_output_redacts_secrets_and_names_env_sources() {
    with_env(&valid_env(&[]), || {
        let output = config::run();

        assert!(output.starts_with("effective config"));
        assert!(output.contains(
            "- commerce.store_domain = ringshing.myshopify.com \
             (source: env (CODBOT_COMMERCE_STORE_DOMAIN))"
        ));
        assert!(output.contains("- commerce.access_token = shpat_***"));
        assert!(!output.contains("shpat_test_token"));
        assert!(!output.contains(WEBHOOK_SECRET));
        assert!(output.contains("- database.url = sqlite://codbot.db?mode=rwc (source: default)"));
    });
}

#[test]
fn replay_reports_config_failure_without_credentials() {
    with_env(&[], || {
        let result = replay::run(replay::ReplayArgs {
            target: Some("http://127.0.0.1:9/api/shopify-webhook".to_string()),
            phone: replay::DEFAULT_PHONE.to_string(),
            total: replay::DEFAULT_TOTAL.to_string(),
        });

        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn replay_posts_signed_order_to_target() {
    let server = MockServer::start();
    let body = serde_json::to_vec(&replay::synthetic_order("923001234567", "7500.00"))
        .expect("order json");
    let expected_signature = signature::sign(WEBHOOK_SECRET.as_bytes(), &body).expect("signature");
    let delivered = server.mock(|when, then| {
        when.method(POST)
            .path(replay::WEBHOOK_PATH)
            .header("content-type", "application/json")
            .header("x-shopify-topic", replay::ORDER_CREATED_TOPIC)
            .header("x-shopify-hmac-sha256", expected_signature.as_str())
            .body(String::from_utf8(body.clone()).expect("utf8 order"));
        then.status(200)
            .header("content-type", "text/plain")
            .body("Webhook processed successfully.");
    });

    let result = with_env(&valid_env(&[]), || {
        replay::run(replay::ReplayArgs {
            target: Some(server.url(replay::WEBHOOK_PATH)),
            phone: "923001234567".to_string(),
            total: "7500.00".to_string(),
        })
    });

    delivered.assert_calls(1);
    assert_eq!(result.exit_code, 0, "{}", result.output);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "replay");
    assert_eq!(payload["detail"]["status"], 200);
    assert_eq!(payload["detail"]["response"], "Webhook processed successfully.");
    assert_eq!(payload["detail"]["signature"], expected_signature.as_str());

    let order: Value = serde_json::from_slice(&body).expect("order json");
    assert_eq!(order["name"], "#TEST-9999");
    assert_eq!(order["customer"]["phone"], "923001234567");
}

#[test]
fn replay_reports_rejected_webhook() {
    let server = MockServer::start();
    let rejected = server.mock(|when, then| {
        when.method(POST).path(replay::WEBHOOK_PATH);
        then.status(401).body("Unauthorized");
    });

    let result = with_env(&valid_env(&[]), || {
        replay::run(replay::ReplayArgs {
            target: Some(server.url(replay::WEBHOOK_PATH)),
            phone: replay::DEFAULT_PHONE.to_string(),
            total: replay::DEFAULT_TOTAL.to_string(),
        })
    });

    rejected.assert_calls(1);
    assert_eq!(result.exit_code, 7);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "rejected");
    assert_eq!(payload["message"], "webhook returned 401: Unauthorized");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

fn with_env<T>(vars: &[(&str, &str)], test_fn: impl FnOnce() -> T) -> T {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|error| error.into_inner());

    let keys = [
        "CODBOT_DATABASE_URL",
        "CODBOT_DATABASE_MAX_CONNECTIONS",
        "CODBOT_DATABASE_TIMEOUT_SECS",
        "CODBOT_SERVER_BIND_ADDRESS",
        "CODBOT_SERVER_PORT",
        "CODBOT_MESSAGING_BASE_URL",
        "CODBOT_MESSAGING_API_KEY",
        "CODBOT_MESSAGING_SOURCE_NUMBER",
        "CODBOT_MESSAGING_APP_NAME",
        "CODBOT_MESSAGING_ORDER_TEMPLATE_ID",
        "CODBOT_COMMERCE_STORE_DOMAIN",
        "CODBOT_COMMERCE_ACCESS_TOKEN",
        "CODBOT_COMMERCE_WEBHOOK_SECRET",
        "CODBOT_LLM_API_KEY",
        "CODBOT_LLM_BASE_URL",
        "CODBOT_LLM_MODEL",
        "CODBOT_LOGGING_LEVEL",
        "CODBOT_LOGGING_FORMAT",
        "CODBOT_LOG_LEVEL",
        "CODBOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let outcome = test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
    outcome
}
