//! Credential resolution.
//!
//! Config stores env var NAMES only. [`resolve_credentials`] is called once
//! at startup and the result is handed to the engine; nothing else in the
//! workspace reads credential env vars. Errors name the variable, never the
//! value, and `Debug` output is redacted.

use anyhow::Result;

use crate::error::ConfigError;
use crate::settings::SyncSettings;

#[derive(Clone)]
pub struct ResolvedCredential {
    pub name: String,
    pub env: String,
    pub secret: String,
}

impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("name", &self.name)
            .field("env", &self.env)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// Returns `None` when the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve every configured credential. The first missing variable fails
/// the whole call.
pub fn resolve_credentials(settings: &SyncSettings) -> Result<Vec<ResolvedCredential>> {
    settings
        .credentials
        .iter()
        .map(|c| {
            let secret = resolve_env(&c.env).ok_or_else(|| ConfigError::MissingCredential {
                name: c.name.clone(),
                env: c.env.clone(),
            })?;
            Ok(ResolvedCredential {
                name: c.name.clone(),
                env: c.env.clone(),
                secret,
            })
        })
        .collect()
}
