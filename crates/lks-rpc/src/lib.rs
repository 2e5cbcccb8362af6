//! Remote lock API contract.
//!
//! [`LockApi`] has one async call per remote operation. Every call yields an
//! [`ApiResult`] carrying the HTTP status and, on success, the decoded value.
//! An `Err` means the request never produced a status (transport failure
//! after retries); callers treat that as "try again next pass".
//!
//! [`HttpLockApi`] is the production transport. Test code uses the
//! deterministic `lks-rpc-paper` crate instead.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use lks_schemas::{
    DiceRollResult, EditExtensionsRequest, GuessTimerResult, HistoryPage, HistoryPageRequest,
    KeyholderLocksPage, KeyholderSearchRequest, Lock, LockListFilter, PilloryVoteInfo,
    ShareLinkResult, SpinWheelResult, TaskAction, TemporaryCombination, VerificationPictureEntry,
};

pub mod error;
pub mod http;
pub mod retry;

pub use error::ApiError;
pub use http::HttpLockApi;
pub use retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// API bearer secret. Cheap to clone; never printed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<REDACTED>)")
    }
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResult<T> {
    pub status: u16,
    pub value: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn ok(value: T) -> Self {
        Self {
            status: 200,
            value: Some(value),
        }
    }

    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            value: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_value(self) -> Option<T> {
        if self.is_success() {
            self.value
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait LockApi: Send + Sync {
    // -- Reads --------------------------------------------------------------

    async fn locks(&self, cred: &Credential, filter: LockListFilter)
        -> Result<ApiResult<Vec<Lock>>>;

    async fn search_keyholder_locks(
        &self,
        cred: &Credential,
        req: &KeyholderSearchRequest,
    ) -> Result<ApiResult<KeyholderLocksPage>>;

    async fn lock_history(
        &self,
        cred: &Credential,
        lock_id: &str,
        req: &HistoryPageRequest,
    ) -> Result<ApiResult<HistoryPage>>;

    // -- Lock mutations -----------------------------------------------------

    async fn archive_lock(&self, cred: &Credential, lock_id: &str) -> Result<ApiResult<()>>;

    async fn archive_keyholder_lock(&self, cred: &Credential, lock_id: &str)
        -> Result<ApiResult<()>>;

    async fn unlock_lock(&self, cred: &Credential, lock_id: &str) -> Result<ApiResult<()>>;

    async fn set_freeze(
        &self,
        cred: &Credential,
        lock_id: &str,
        is_frozen: bool,
    ) -> Result<ApiResult<()>>;

    async fn trust_keyholder(&self, cred: &Credential, lock_id: &str) -> Result<ApiResult<()>>;

    async fn set_max_limit_date(
        &self,
        cred: &Credential,
        lock_id: &str,
        max_limit_date: Option<DateTime<Utc>>,
        disable: bool,
    ) -> Result<ApiResult<()>>;

    /// Signed seconds.
    async fn update_time(
        &self,
        cred: &Credential,
        lock_id: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>>;

    async fn update_settings(
        &self,
        cred: &Credential,
        lock_id: &str,
        display_remaining_time: bool,
        hide_time_logs: bool,
    ) -> Result<ApiResult<()>>;

    async fn update_extensions(
        &self,
        cred: &Credential,
        lock_id: &str,
        req: &EditExtensionsRequest,
    ) -> Result<ApiResult<()>>;

    // -- Extension actions --------------------------------------------------

    async fn update_tasks(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        tasks: &[TaskAction],
    ) -> Result<ApiResult<()>>;

    async fn resolve_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        is_completed: bool,
    ) -> Result<ApiResult<()>>;

    async fn assign_random_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>>;

    async fn assign_vote_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>>;

    async fn assign_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        task: &TaskAction,
    ) -> Result<ApiResult<()>>;

    async fn pillory(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        reason: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>>;

    async fn set_temporary_combination(
        &self,
        cred: &Credential,
        lock_id: &str,
        combination_id: &str,
    ) -> Result<ApiResult<()>>;

    async fn keyholder_temporary_unlock(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>>;

    async fn wearer_temporary_unlock(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>>;

    async fn create_verification_request(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>>;

    async fn upload_verification_picture(
        &self,
        cred: &Credential,
        lock_id: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<ApiResult<()>>;

    // -- Immediate extension calls -----------------------------------------

    async fn roll_dice(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<DiceRollResult>>;

    async fn submit_timer_guess(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<GuessTimerResult>>;

    async fn spin_wheel(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<SpinWheelResult>>;

    async fn share_link(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<ShareLinkResult>>;

    async fn pillory_vote_info(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<Vec<PilloryVoteInfo>>>;

    async fn temporary_combination(
        &self,
        cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<TemporaryCombination>>;

    async fn verification_pictures(
        &self,
        cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<Vec<VerificationPictureEntry>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("super-secret-token");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret-token"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn into_value_drops_value_on_failure_status() {
        let r = ApiResult {
            status: 404,
            value: Some(1),
        };
        assert!(!r.is_success());
        assert_eq!(r.into_value(), None);
        assert_eq!(ApiResult::ok(7).into_value(), Some(7));
    }
}
