//! Typed view over the merged config JSON.
//!
//! Every field has a default, so an empty config is valid apart from the
//! credential list, which the CLI requires before a sync run.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.chaster.app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_rate_limit_wait_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 5,
            max_retries: 4,
            max_rate_limit_wait_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub keyholder_page_size: u32,
    pub history_page_size: u32,
    /// Mark snapshots not seen by a full refresh as inactive.
    pub sweep_stale_snapshots: bool,
    pub poll_interval_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            keyholder_page_size: 50,
            history_page_size: 100,
            sweep_stale_snapshots: true,
            poll_interval_secs: 60,
        }
    }
}

/// A named credential whose secret lives in env var `env`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialRef {
    pub name: String,
    pub env: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub api: ApiSettings,
    pub sync: SyncSection,
    pub credentials: Vec<CredentialRef>,
}

impl SyncSettings {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let settings: SyncSettings =
            serde_json::from_value(config_json.clone()).context("invalid sync settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(invalid("api.base_url", "must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be positive"));
        }
        if self.sync.keyholder_page_size == 0 {
            return Err(invalid("sync.keyholder_page_size", "must be positive"));
        }
        if self.sync.history_page_size == 0 {
            return Err(invalid("sync.history_page_size", "must be positive"));
        }

        let mut seen = BTreeSet::new();
        for c in &self.credentials {
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateCredential {
                    name: c.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> anyhow::Error {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
    .into()
}
