//! Lock and log builders.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use lks_schemas::{
    ExtensionMode, ExtensionParty, ExtensionSlug, Lock, LockRole, LockStatus, LockUser, LogEntry,
    LogType, SharedLockRef,
};

/// Fixed reference instant, matching the paper remote's initial clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn minutes(n: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(n)
}

/// Id given to an extension attached by [`LockBuilder::with_extension`].
pub fn extension_id(slug: ExtensionSlug) -> String {
    format!("ext-{}", slug.as_str())
}

pub struct LockBuilder {
    lock: Lock,
}

impl LockBuilder {
    fn new(id: &str, role: LockRole) -> Self {
        Self {
            lock: Lock {
                id: id.to_string(),
                status: LockStatus::Locked,
                role,
                title: format!("lock {id}"),
                start_date: t0() - Duration::days(1),
                end_date: Some(t0() + Duration::days(1)),
                max_limit_date: None,
                is_frozen: false,
                frozen_at: None,
                display_remaining_time: true,
                hide_time_logs: false,
                trusted: false,
                archived_at: None,
                keyholder_archived_at: None,
                unlocked_at: None,
                shared_lock: None,
                user: LockUser {
                    id: "wearer".to_string(),
                    username: "wearer".to_string(),
                    is_suspended_or_disabled: false,
                },
                keyholder: None,
                extensions: Vec::new(),
            },
        }
    }

    pub fn keyholder(id: &str) -> Self {
        Self::new(id, LockRole::Keyholder)
    }

    pub fn wearer(id: &str) -> Self {
        Self::new(id, LockRole::Wearer)
    }

    pub fn status(mut self, status: LockStatus) -> Self {
        self.lock.status = status;
        self
    }

    pub fn unlocked(self) -> Self {
        self.status(LockStatus::Unlocked)
    }

    pub fn frozen_at(mut self, at: DateTime<Utc>) -> Self {
        self.lock.is_frozen = true;
        self.lock.frozen_at = Some(at);
        self
    }

    pub fn end_date(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.lock.end_date = end;
        self
    }

    pub fn max_limit_date(mut self, limit: Option<DateTime<Utc>>) -> Self {
        self.lock.max_limit_date = limit;
        self
    }

    pub fn trusted(mut self) -> Self {
        self.lock.trusted = true;
        self
    }

    pub fn shared(mut self, shared_lock_id: &str) -> Self {
        self.lock.shared_lock = Some(SharedLockRef {
            id: shared_lock_id.to_string(),
            name: format!("shared {shared_lock_id}"),
        });
        self
    }

    pub fn suspended_user(mut self) -> Self {
        self.lock.user.is_suspended_or_disabled = true;
        self
    }

    pub fn archived_at(mut self, at: DateTime<Utc>) -> Self {
        match self.lock.role {
            LockRole::Keyholder => self.lock.keyholder_archived_at = Some(at),
            LockRole::Wearer => self.lock.archived_at = Some(at),
        }
        self
    }

    pub fn with_extension(self, slug: ExtensionSlug) -> Self {
        self.with_extension_config(slug, Value::Null)
    }

    pub fn with_extension_config(mut self, slug: ExtensionSlug, config: Value) -> Self {
        self.lock.extensions.push(ExtensionParty {
            id: extension_id(slug),
            slug: slug.as_str().to_string(),
            display_name: slug.as_str().to_string(),
            mode: ExtensionMode::NonCumulative,
            regularity: 3600,
            config,
            user_data: Value::Null,
        });
        self
    }

    pub fn build(self) -> Lock {
        self.lock
    }
}

/// Payload-less log `minute` minutes after [`t0`].
pub fn log(id: &str, lock_id: &str, log_type: LogType, minute: i64) -> LogEntry {
    log_with(id, lock_id, log_type, minute, Value::Null)
}

pub fn log_with(id: &str, lock_id: &str, log_type: LogType, minute: i64, payload: Value) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        lock_id: lock_id.to_string(),
        log_type: log_type.as_str().to_string(),
        created_at: minutes(minute),
        role: None,
        extension: None,
        title: String::new(),
        description: String::new(),
        user: None,
        payload,
    }
}
