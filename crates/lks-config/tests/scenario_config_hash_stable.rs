//! Scenario: config hash stability.
//!
//! # Invariants under test
//! - The same layers always produce the same hash.
//! - Key order inside a document does not change the hash.
//! - Overlays that change a value change the hash.
//! - Loading from files and from strings agree.

use std::io::Write;

use lks_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE_YAML: &str = r#"
api:
  base_url: "https://api.example.test"
  timeout_secs: 5
sync:
  keyholder_page_size: 50
  history_page_size: 100
credentials:
  - name: main
    env: LKS_TOKEN_MAIN
"#;

const BASE_YAML_REORDERED: &str = r#"
sync:
  history_page_size: 100
  keyholder_page_size: 50
credentials:
  - env: LKS_TOKEN_MAIN
    name: main
api:
  timeout_secs: 5
  base_url: "https://api.example.test"
"#;

const OVERLAY_YAML: &str = r#"
sync:
  history_page_size: 25
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash_and_value() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let settings = merged.settings().unwrap();
    assert_eq!(settings.sync.history_page_size, 25);
    assert_eq!(settings.sync.keyholder_page_size, 50);
    assert_eq!(settings.api.base_url, "https://api.example.test");
}

#[test]
fn hash_is_sha256_hex() {
    let cfg = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(cfg.config_hash.len(), 64);
    assert!(cfg.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn files_and_strings_agree() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(OVERLAY_YAML.as_bytes()).unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();

    let from_files = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
