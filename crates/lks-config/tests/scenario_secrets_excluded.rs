//! Scenario: credentials stay out of config.
//!
//! # Invariants under test
//! - A literal token in any leaf is rejected with CONFIG_SECRET_DETECTED and
//!   the error never echoes the value.
//! - Env var names are accepted.
//! - Resolution reads the named env var, fails naming the var when unset,
//!   and redacts the secret in Debug output.

use lks_config::{load_layered_yaml_from_strings, resolve_credentials, SyncSettings};

#[test]
fn pasted_token_is_rejected_without_echo() {
    let yaml = r#"
credentials:
  - name: main
    env: LKS_TOKEN_MAIN
extra:
  token: "eyJhbGciOiJIUzI1NiJ9.payload.sig"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err().to_string();
    assert!(err.contains("CONFIG_SECRET_DETECTED"), "got: {err}");
    assert!(err.contains("/extra/token"));
    assert!(!err.contains("eyJhbGciOiJIUzI1NiJ9"));
}

#[test]
fn known_token_prefix_in_array_is_rejected() {
    let yaml = r#"
notes:
  - "ghp_abcdefghijklmnop"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err().to_string();
    assert!(err.contains("/notes/0"), "got: {err}");
}

#[test]
fn env_names_are_accepted() {
    let yaml = r#"
credentials:
  - name: main
    env: LKS_TOKEN_MAIN
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let settings = cfg.settings().unwrap();
    assert_eq!(settings.credentials[0].env, "LKS_TOKEN_MAIN");
}

#[test]
fn resolution_reads_env_and_redacts() {
    std::env::set_var("LKS_TEST_TOKEN_RESOLVE", "s3cret-value");
    let settings: SyncSettings = serde_json::from_value(serde_json::json!({
        "credentials": [ { "name": "main", "env": "LKS_TEST_TOKEN_RESOLVE" } ]
    }))
    .unwrap();

    let creds = resolve_credentials(&settings).unwrap();
    assert_eq!(creds.len(), 1);
    assert_eq!(creds[0].secret, "s3cret-value");

    let dbg = format!("{:?}", creds[0]);
    assert!(!dbg.contains("s3cret-value"));
    assert!(dbg.contains("REDACTED"));
}

#[test]
fn missing_env_var_names_the_variable() {
    std::env::remove_var("LKS_TEST_TOKEN_ABSENT");
    let settings: SyncSettings = serde_json::from_value(serde_json::json!({
        "credentials": [ { "name": "alt", "env": "LKS_TEST_TOKEN_ABSENT" } ]
    }))
    .unwrap();

    let err = resolve_credentials(&settings).unwrap_err().to_string();
    assert!(err.contains("CONFIG_CREDENTIAL_MISSING"));
    assert!(err.contains("LKS_TEST_TOKEN_ABSENT"));
}
