use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use lks_schemas::{Lock, LogEntry};

/// Short partition key derived from a credential secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialId(String);

impl CredentialId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub lock_id: String,
    pub credential_id: CredentialId,
    pub is_active: bool,
    /// Correlation token of the last stamped refresh that saw this lock.
    pub update_token: Option<Uuid>,
    pub lock: Lock,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(lock: Lock, credential_id: CredentialId, update_token: Option<Uuid>) -> Self {
        Self {
            lock_id: lock.id.clone(),
            credential_id,
            is_active: true,
            update_token,
            lock,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub lock_id: String,
    pub credential_id: CredentialId,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub log: LogEntry,
}

impl HistoryEntry {
    pub fn unprocessed(log: LogEntry, credential_id: CredentialId) -> Self {
        Self {
            id: log.id.clone(),
            lock_id: log.lock_id.clone(),
            credential_id,
            created_at: log.created_at,
            processed: false,
            log,
        }
    }
}

// ---------------------------------------------------------------------------
// Update records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateType {
    Archive,
    Unlock,
    UpdateFreeze,
    TrustKeyholder,
    UpdateMaxTimeLimit,
    AddRemoveTime,
    UpdateSettings,
    UpdateExtensions,
    UpdateTasks,
    ResolveTask,
    AssignTask,
    Pillory,
    SetTemporaryCombination,
    TemporarilyUnlock,
    UploadVerificationPicture,
    CreateVerificationRequest,
}

impl UpdateType {
    pub const ALL: [UpdateType; 16] = [
        UpdateType::Archive,
        UpdateType::Unlock,
        UpdateType::UpdateFreeze,
        UpdateType::TrustKeyholder,
        UpdateType::UpdateMaxTimeLimit,
        UpdateType::AddRemoveTime,
        UpdateType::UpdateSettings,
        UpdateType::UpdateExtensions,
        UpdateType::UpdateTasks,
        UpdateType::ResolveTask,
        UpdateType::AssignTask,
        UpdateType::Pillory,
        UpdateType::SetTemporaryCombination,
        UpdateType::TemporarilyUnlock,
        UpdateType::UploadVerificationPicture,
        UpdateType::CreateVerificationRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Archive => "ARCHIVE",
            UpdateType::Unlock => "UNLOCK",
            UpdateType::UpdateFreeze => "UPDATE_FREEZE",
            UpdateType::TrustKeyholder => "TRUST_KEYHOLDER",
            UpdateType::UpdateMaxTimeLimit => "UPDATE_MAX_TIME_LIMIT",
            UpdateType::AddRemoveTime => "ADD_REMOVE_TIME",
            UpdateType::UpdateSettings => "UPDATE_SETTINGS",
            UpdateType::UpdateExtensions => "UPDATE_EXTENSIONS",
            UpdateType::UpdateTasks => "UPDATE_TASKS",
            UpdateType::ResolveTask => "RESOLVE_TASK",
            UpdateType::AssignTask => "ASSIGN_TASK",
            UpdateType::Pillory => "PILLORY",
            UpdateType::SetTemporaryCombination => "SET_TEMPORARY_COMBINATION",
            UpdateType::TemporarilyUnlock => "TEMPORARILY_UNLOCK",
            UpdateType::UploadVerificationPicture => "UPLOAD_VERIFICATION_PICTURE",
            UpdateType::CreateVerificationRequest => "CREATE_VERIFICATION_REQUEST",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, ParseUpdateTypeError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseUpdateTypeError(s.to_string()))
    }
}

/// A stored update type string that names no known [`UpdateType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUpdateTypeError(pub String);

impl std::fmt::Display for ParseUpdateTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid update type: {}", self.0)
    }
}

impl std::error::Error for ParseUpdateTypeError {}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending outbound mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct LockUpdate {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub lock_id: String,
    pub credential_id: CredentialId,
    pub update_type: UpdateType,
    pub payload: Option<Value>,
}

impl LockUpdate {
    pub fn new(
        lock_id: impl Into<String>,
        credential_id: CredentialId,
        update_type: UpdateType,
        payload: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            lock_id: lock_id.into(),
            credential_id,
            update_type,
            payload,
        }
    }

    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let v = self
            .payload
            .clone()
            .ok_or_else(|| anyhow!("{} update {} has no payload", self.update_type, self.id))?;
        Ok(serde_json::from_value(v)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_type_parse_rejects_unknown() {
        for t in UpdateType::ALL {
            assert_eq!(UpdateType::parse(t.as_str()).unwrap(), t);
        }
        assert!(UpdateType::parse("RENAME_LOCK").is_err());
    }
}
