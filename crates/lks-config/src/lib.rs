//! Layered YAML configuration.
//!
//! Documents are merged in order (later layers override earlier ones),
//! converted to JSON, checked for secret-looking literals, and hashed. The
//! hash is logged at startup so two runs can be compared by config identity.
//!
//! Credentials never appear in config: a credential entry names the env var
//! that holds the secret. See [`secrets`].

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub mod error;
pub mod secrets;
pub mod settings;

pub use error::ConfigError;
pub use secrets::{resolve_credentials, ResolvedCredential};
pub use settings::{ApiSettings, CredentialRef, SyncSection, SyncSettings};

/// Prefixes of well-known token formats. A leaf string starting with one of
/// these is treated as a pasted secret.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "Bearer ",
];

/// Leaf keys whose value must be an env var name, never the secret itself.
const SECRET_KEYS: &[&str] = &["token", "secret", "password", "api_key"];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    pub fn settings(&self) -> Result<SyncSettings> {
        SyncSettings::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::with_capacity(paths.len());
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // an empty document parses as null; treat it as an empty layer
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Serialize with object keys sorted at every depth, so key order in the
/// source YAML does not affect the hash.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sorted(v)).context("canonical json serialize failed")
}

fn sorted(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let ordered: BTreeMap<&String, Value> =
                map.iter().map(|(k, vv)| (k, sorted(vv))).collect();
            Value::Object(
                ordered
                    .into_iter()
                    .map(|(k, vv)| (k.clone(), vv))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        let Some(s) = v.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        let key = ptr.rsplit('/').next().unwrap_or_default();
        if looks_like_secret(s) || (SECRET_KEYS.contains(&key) && !looks_like_env_name(s)) {
            return Err(ConfigError::SecretDetected { pointer: ptr }.into());
        }
    }
    Ok(())
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                let next = format!("{}/{}", prefix, k.replace('~', "~0").replace('/', "~1"));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// `LKS_TOKEN_MAIN` style: upper-case letters, digits and underscores.
fn looks_like_env_name(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty()
        && t.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_nested_keys_only() {
        let cfg = load_layered_yaml_from_strings(&[
            "api:\n  timeout_secs: 5\n  max_retries: 4\n",
            "api:\n  timeout_secs: 10\n",
        ])
        .unwrap();
        assert_eq!(cfg.config_json.pointer("/api/timeout_secs"), Some(&10.into()));
        assert_eq!(cfg.config_json.pointer("/api/max_retries"), Some(&4.into()));
    }

    #[test]
    fn env_name_check() {
        assert!(looks_like_env_name("LKS_TOKEN_MAIN"));
        assert!(!looks_like_env_name("abc123"));
        assert!(!looks_like_env_name(""));
    }
}
