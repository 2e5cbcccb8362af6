//! Deterministic in-memory "paper" remote.
//!
//! Design decisions (kept simple and deterministic):
//! - The clock is fixed (`set_now` to move it). No randomness.
//! - Every call is recorded as a [`PaperCall`] with a JSON detail so tests can
//!   assert exactly which remote operations ran and in what order.
//! - Mutations are applied to the stored lock where the effect is obvious
//!   (freeze, unlock, archive, trust, settings, time, max limit, extensions).
//! - Failures are injected per (operation, lock): either a status code or a
//!   transport error (`Err`) that mimics an exhausted retry budget.
//! - History is stored oldest first and served newest first, paged by
//!   `last_id` like the real endpoint.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use lks_rpc::{ApiResult, Credential, LockApi};
use lks_schemas::{
    DiceRollResult, EditExtensionsRequest, ExtensionParty, GuessTimerResult, HistoryPage,
    HistoryPageRequest, KeyholderLocksPage, KeyholderSearchRequest, Lock, LockListFilter,
    LockStatus, LogEntry, PilloryVoteInfo, ShareLinkResult, SpinWheelResult, TaskAction,
    TemporaryCombination, VerificationPictureEntry, WheelOfFortuneConfig, WheelSegmentKind,
    WheelSegmentModel,
};

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperCall {
    pub op: &'static str,
    pub lock_id: Option<String>,
    pub detail: Value,
}

struct PaperState {
    now: DateTime<Utc>,
    locks: BTreeMap<String, Lock>,
    keyholder_locks: Vec<Lock>,
    history: BTreeMap<String, Vec<LogEntry>>,
    calls: Vec<PaperCall>,
    status_overrides: HashMap<(&'static str, String), u16>,
    transport_failures: HashSet<(&'static str, String)>,
}

impl Default for PaperState {
    fn default() -> Self {
        Self {
            now: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            locks: BTreeMap::new(),
            keyholder_locks: Vec::new(),
            history: BTreeMap::new(),
            calls: Vec::new(),
            status_overrides: HashMap::new(),
            transport_failures: HashSet::new(),
        }
    }
}

#[derive(Default)]
pub struct PaperLockApi {
    state: Mutex<PaperState>,
}

impl PaperLockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, PaperState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("paper api mutex poisoned"))
    }

    // -- Seeding ------------------------------------------------------------

    pub fn set_now(&self, now: DateTime<Utc>) -> Result<()> {
        self.state()?.now = now;
        Ok(())
    }

    /// Visible through the "my locks" listing.
    pub fn insert_lock(&self, lock: Lock) -> Result<()> {
        self.state()?.locks.insert(lock.id.clone(), lock);
        Ok(())
    }

    /// Visible through the keyholder search (and mutable like any other lock).
    pub fn insert_keyholder_lock(&self, lock: Lock) -> Result<()> {
        let mut st = self.state()?;
        st.keyholder_locks.push(lock.clone());
        st.locks.insert(lock.id.clone(), lock);
        Ok(())
    }

    pub fn remove_lock(&self, lock_id: &str) -> Result<()> {
        let mut st = self.state()?;
        st.locks.remove(lock_id);
        st.keyholder_locks.retain(|l| l.id != lock_id);
        Ok(())
    }

    /// Append a log record. Records must be pushed oldest first.
    pub fn push_history(&self, entry: LogEntry) -> Result<()> {
        self.state()?
            .history
            .entry(entry.lock_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    // -- Fault injection ----------------------------------------------------

    pub fn fail_with_status(&self, op: &'static str, lock_id: &str, status: u16) -> Result<()> {
        self.state()?
            .status_overrides
            .insert((op, lock_id.to_string()), status);
        Ok(())
    }

    pub fn fail_transport(&self, op: &'static str, lock_id: &str) -> Result<()> {
        self.state()?
            .transport_failures
            .insert((op, lock_id.to_string()));
        Ok(())
    }

    pub fn clear_faults(&self) -> Result<()> {
        let mut st = self.state()?;
        st.status_overrides.clear();
        st.transport_failures.clear();
        Ok(())
    }

    // -- Inspection ---------------------------------------------------------

    pub fn calls(&self) -> Result<Vec<PaperCall>> {
        Ok(self.state()?.calls.clone())
    }

    pub fn calls_for(&self, op: &str) -> Result<Vec<PaperCall>> {
        Ok(self
            .state()?
            .calls
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect())
    }

    pub fn lock(&self, lock_id: &str) -> Result<Option<Lock>> {
        Ok(self.state()?.locks.get(lock_id).cloned())
    }

    pub fn clear_calls(&self) -> Result<()> {
        self.state()?.calls.clear();
        Ok(())
    }

    // -- Internals ----------------------------------------------------------

    /// Record the call and resolve injected faults. Returns the status to
    /// answer with when an override is set.
    fn begin(
        &self,
        st: &mut PaperState,
        op: &'static str,
        lock_id: Option<&str>,
        detail: Value,
    ) -> Result<Option<u16>> {
        st.calls.push(PaperCall {
            op,
            lock_id: lock_id.map(str::to_string),
            detail,
        });
        let key = lock_id.unwrap_or_default().to_string();
        if st.transport_failures.contains(&(op, key.clone())) {
            bail!("paper transport failure: {op} {key}");
        }
        Ok(st.status_overrides.get(&(op, key)).copied())
    }

    /// Apply `f` to a stored lock; 404 when it does not exist.
    fn mutate<F>(&self, op: &'static str, lock_id: &str, detail: Value, f: F) -> Result<ApiResult<()>>
    where
        F: FnOnce(&mut Lock, DateTime<Utc>),
    {
        let mut st = self.state()?;
        if let Some(status) = self.begin(&mut st, op, Some(lock_id), detail)? {
            return Ok(ApiResult::status_only(status));
        }
        let now = st.now;
        match st.locks.get_mut(lock_id) {
            Some(lock) => {
                f(lock, now);
                let updated = lock.clone();
                for kh in st.keyholder_locks.iter_mut().filter(|l| l.id == lock_id) {
                    *kh = updated.clone();
                }
                Ok(ApiResult::status_only(200))
            }
            None => Ok(ApiResult::status_only(404)),
        }
    }

    /// Record an action on an extension; 404 when the lock or extension is unknown.
    fn extension_action(
        &self,
        op: &'static str,
        lock_id: &str,
        extension_id: &str,
        detail: Value,
    ) -> Result<ApiResult<()>> {
        let mut st = self.state()?;
        if let Some(status) = self.begin(&mut st, op, Some(lock_id), detail)? {
            return Ok(ApiResult::status_only(status));
        }
        Ok(ApiResult::status_only(
            if has_extension(&st, lock_id, extension_id) {
                200
            } else {
                404
            },
        ))
    }

    fn extension_value<T, F>(
        &self,
        op: &'static str,
        lock_id: &str,
        extension_id: &str,
        f: F,
    ) -> Result<ApiResult<T>>
    where
        F: FnOnce(&PaperState) -> T,
    {
        let mut st = self.state()?;
        if let Some(status) =
            self.begin(&mut st, op, Some(lock_id), json!({ "extension_id": extension_id }))?
        {
            return Ok(ApiResult::status_only(status));
        }
        if !has_extension(&st, lock_id, extension_id) {
            return Ok(ApiResult::status_only(404));
        }
        Ok(ApiResult::ok(f(&st)))
    }
}

fn has_extension(st: &PaperState, lock_id: &str, extension_id: &str) -> bool {
    st.locks
        .get(lock_id)
        .map(|l| l.extensions.iter().any(|e| e.id == extension_id))
        .unwrap_or(false)
}

fn paper_extension_id(slug: &str) -> String {
    format!("paper-ext-{slug}")
}

#[async_trait::async_trait]
impl LockApi for PaperLockApi {
    async fn locks(
        &self,
        _cred: &Credential,
        filter: LockListFilter,
    ) -> Result<ApiResult<Vec<Lock>>> {
        let mut st = self.state()?;
        if let Some(status) =
            self.begin(&mut st, "locks", None, json!({ "filter": filter.as_str() }))?
        {
            return Ok(ApiResult::status_only(status));
        }
        let locks = st
            .locks
            .values()
            .filter(|l| !st.keyholder_locks.iter().any(|k| k.id == l.id))
            .filter(|l| match filter {
                LockListFilter::Active => l.archived_at.is_none(),
                LockListFilter::Archived => l.archived_at.is_some(),
                LockListFilter::All => true,
            })
            .cloned()
            .collect();
        Ok(ApiResult::ok(locks))
    }

    async fn search_keyholder_locks(
        &self,
        _cred: &Credential,
        req: &KeyholderSearchRequest,
    ) -> Result<ApiResult<KeyholderLocksPage>> {
        let mut st = self.state()?;
        if let Some(status) = self.begin(
            &mut st,
            "search_keyholder_locks",
            None,
            json!({ "page": req.page, "limit": req.limit }),
        )? {
            return Ok(ApiResult::status_only(status));
        }
        let matching: Vec<&Lock> = st
            .keyholder_locks
            .iter()
            .filter(|l| l.status == LockStatus::Locked)
            .collect();
        let limit = req.limit.max(1) as usize;
        let total = matching.len();
        let pages = total.div_ceil(limit);
        let locks = matching
            .into_iter()
            .skip(req.page as usize * limit)
            .take(limit)
            .cloned()
            .collect();
        Ok(ApiResult::ok(KeyholderLocksPage {
            locks,
            pages: pages as u32,
            total: total as u32,
        }))
    }

    async fn lock_history(
        &self,
        _cred: &Credential,
        lock_id: &str,
        req: &HistoryPageRequest,
    ) -> Result<ApiResult<HistoryPage>> {
        let mut st = self.state()?;
        if let Some(status) = self.begin(
            &mut st,
            "lock_history",
            Some(lock_id),
            json!({ "limit": req.limit, "last_id": req.last_id }),
        )? {
            return Ok(ApiResult::status_only(status));
        }
        let newest_first: Vec<&LogEntry> = st
            .history
            .get(lock_id)
            .map(|h| h.iter().rev().collect())
            .unwrap_or_default();

        let start = match &req.last_id {
            None => 0,
            Some(last) => match newest_first.iter().position(|e| &e.id == last) {
                Some(i) => i + 1,
                None => newest_first.len(),
            },
        };
        let limit = req.limit.max(1) as usize;
        let results: Vec<LogEntry> = newest_first
            .iter()
            .skip(start)
            .take(limit)
            .map(|e| (*e).clone())
            .collect();
        let has_more = start + results.len() < newest_first.len();
        Ok(ApiResult::ok(HistoryPage {
            count: results.len() as u32,
            results,
            has_more,
        }))
    }

    async fn archive_lock(&self, _cred: &Credential, lock_id: &str) -> Result<ApiResult<()>> {
        self.mutate("archive_lock", lock_id, json!({}), |l, now| {
            l.archived_at = Some(now)
        })
    }

    async fn archive_keyholder_lock(
        &self,
        _cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<()>> {
        self.mutate("archive_keyholder_lock", lock_id, json!({}), |l, now| {
            l.keyholder_archived_at = Some(now)
        })
    }

    async fn unlock_lock(&self, _cred: &Credential, lock_id: &str) -> Result<ApiResult<()>> {
        self.mutate("unlock_lock", lock_id, json!({}), |l, now| {
            l.status = LockStatus::Unlocked;
            l.unlocked_at = Some(now);
        })
    }

    async fn set_freeze(
        &self,
        _cred: &Credential,
        lock_id: &str,
        is_frozen: bool,
    ) -> Result<ApiResult<()>> {
        self.mutate(
            "set_freeze",
            lock_id,
            json!({ "is_frozen": is_frozen }),
            |l, now| {
                l.is_frozen = is_frozen;
                l.frozen_at = if is_frozen { Some(now) } else { None };
            },
        )
    }

    async fn trust_keyholder(&self, _cred: &Credential, lock_id: &str) -> Result<ApiResult<()>> {
        self.mutate("trust_keyholder", lock_id, json!({}), |l, _| {
            l.trusted = true
        })
    }

    async fn set_max_limit_date(
        &self,
        _cred: &Credential,
        lock_id: &str,
        max_limit_date: Option<DateTime<Utc>>,
        disable: bool,
    ) -> Result<ApiResult<()>> {
        self.mutate(
            "set_max_limit_date",
            lock_id,
            json!({ "max_limit_date": max_limit_date, "disable": disable }),
            |l, _| {
                l.max_limit_date = if disable { None } else { max_limit_date };
            },
        )
    }

    async fn update_time(
        &self,
        _cred: &Credential,
        lock_id: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>> {
        self.mutate(
            "update_time",
            lock_id,
            json!({ "duration": duration_secs }),
            |l, _| {
                l.end_date = l.end_date.map(|d| d + Duration::seconds(duration_secs));
            },
        )
    }

    async fn update_settings(
        &self,
        _cred: &Credential,
        lock_id: &str,
        display_remaining_time: bool,
        hide_time_logs: bool,
    ) -> Result<ApiResult<()>> {
        self.mutate(
            "update_settings",
            lock_id,
            json!({
                "display_remaining_time": display_remaining_time,
                "hide_time_logs": hide_time_logs,
            }),
            |l, _| {
                l.display_remaining_time = display_remaining_time;
                l.hide_time_logs = hide_time_logs;
            },
        )
    }

    async fn update_extensions(
        &self,
        _cred: &Credential,
        lock_id: &str,
        req: &EditExtensionsRequest,
    ) -> Result<ApiResult<()>> {
        let slugs: Vec<&str> = req.extensions.iter().map(|e| e.slug.as_str()).collect();
        self.mutate(
            "update_extensions",
            lock_id,
            json!({ "slugs": slugs }),
            |l, _| {
                let next = req
                    .extensions
                    .iter()
                    .map(|dto| {
                        let existing = l.extensions.iter().find(|e| e.slug == dto.slug);
                        ExtensionParty {
                            id: existing
                                .map(|e| e.id.clone())
                                .unwrap_or_else(|| paper_extension_id(&dto.slug)),
                            slug: dto.slug.clone(),
                            display_name: existing
                                .map(|e| e.display_name.clone())
                                .unwrap_or_default(),
                            mode: dto.mode,
                            regularity: dto.regularity,
                            config: dto.config.clone(),
                            user_data: existing.map(|e| e.user_data.clone()).unwrap_or_default(),
                        }
                    })
                    .collect();
                l.extensions = next;
            },
        )
    }

    async fn update_tasks(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        tasks: &[TaskAction],
    ) -> Result<ApiResult<()>> {
        self.extension_action(
            "update_tasks",
            lock_id,
            extension_id,
            json!({ "tasks": tasks }),
        )
    }

    async fn resolve_task(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        is_completed: bool,
    ) -> Result<ApiResult<()>> {
        self.extension_action(
            "resolve_task",
            lock_id,
            extension_id,
            json!({ "is_completed": is_completed }),
        )
    }

    async fn assign_random_task(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.extension_action("assign_random_task", lock_id, extension_id, json!({}))
    }

    async fn assign_vote_task(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>> {
        self.extension_action(
            "assign_vote_task",
            lock_id,
            extension_id,
            json!({ "duration": duration_secs }),
        )
    }

    async fn assign_task(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        task: &TaskAction,
    ) -> Result<ApiResult<()>> {
        self.extension_action(
            "assign_task",
            lock_id,
            extension_id,
            json!({ "task": task.task, "points": task.points }),
        )
    }

    async fn pillory(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        reason: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>> {
        self.extension_action(
            "pillory",
            lock_id,
            extension_id,
            json!({ "reason": reason, "duration": duration_secs }),
        )
    }

    async fn set_temporary_combination(
        &self,
        _cred: &Credential,
        lock_id: &str,
        combination_id: &str,
    ) -> Result<ApiResult<()>> {
        self.mutate(
            "set_temporary_combination",
            lock_id,
            json!({ "combination_id": combination_id }),
            |_, _| {},
        )
    }

    async fn keyholder_temporary_unlock(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.extension_action("keyholder_temporary_unlock", lock_id, extension_id, json!({}))
    }

    async fn wearer_temporary_unlock(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.extension_action("wearer_temporary_unlock", lock_id, extension_id, json!({}))
    }

    async fn create_verification_request(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.extension_action(
            "create_verification_request",
            lock_id,
            extension_id,
            json!({}),
        )
    }

    async fn upload_verification_picture(
        &self,
        _cred: &Credential,
        lock_id: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<ApiResult<()>> {
        self.mutate(
            "upload_verification_picture",
            lock_id,
            json!({ "bytes": data.len(), "content_type": content_type }),
            |_, _| {},
        )
    }

    async fn roll_dice(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<DiceRollResult>> {
        self.extension_value("roll_dice", lock_id, extension_id, |_| DiceRollResult {
            admin_dice: 3,
            player_dice: 4,
        })
    }

    async fn submit_timer_guess(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<GuessTimerResult>> {
        self.extension_value("submit_timer_guess", lock_id, extension_id, |_| {
            GuessTimerResult {
                can_be_unlocked: false,
            }
        })
    }

    async fn spin_wheel(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<SpinWheelResult>> {
        let lock_key = lock_id.to_string();
        let ext_key = extension_id.to_string();
        self.extension_value("spin_wheel", lock_id, extension_id, move |st| {
            // first configured segment, or a plain text segment
            let segment = st
                .locks
                .get(&lock_key)
                .and_then(|l| l.extensions.iter().find(|e| e.id == ext_key))
                .and_then(|e| e.config_as::<WheelOfFortuneConfig>())
                .and_then(|c| c.segments.into_iter().next())
                .unwrap_or(WheelSegmentModel {
                    kind: WheelSegmentKind::Text,
                    text: "paper".to_string(),
                    duration: 0,
                });
            SpinWheelResult { segment }
        })
    }

    async fn share_link(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<ShareLinkResult>> {
        let link = format!("https://paper.invalid/links/{lock_id}");
        self.extension_value("share_link", lock_id, extension_id, move |_| {
            ShareLinkResult { link }
        })
    }

    async fn pillory_vote_info(
        &self,
        _cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<Vec<PilloryVoteInfo>>> {
        self.extension_value("pillory_vote_info", lock_id, extension_id, |_| Vec::new())
    }

    async fn temporary_combination(
        &self,
        _cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<TemporaryCombination>> {
        let mut st = self.state()?;
        if let Some(status) = self.begin(&mut st, "temporary_combination", Some(lock_id), json!({}))? {
            return Ok(ApiResult::status_only(status));
        }
        if !st.locks.contains_key(lock_id) {
            return Ok(ApiResult::status_only(404));
        }
        Ok(ApiResult::ok(TemporaryCombination {
            id: format!("paper-combination-{lock_id}"),
            code: Some("0000".to_string()),
            image_full_url: None,
        }))
    }

    async fn verification_pictures(
        &self,
        _cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<Vec<VerificationPictureEntry>>> {
        let mut st = self.state()?;
        if let Some(status) = self.begin(&mut st, "verification_pictures", Some(lock_id), json!({}))? {
            return Ok(ApiResult::status_only(status));
        }
        Ok(ApiResult::ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock(id: &str) -> Lock {
        serde_json::from_value(json!({
            "_id": id,
            "status": "locked",
            "role": "keyholder",
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-02T00:00:00Z",
            "user": { "_id": "u1" },
            "extensions": [ { "_id": "e-dice", "slug": "dice" } ]
        }))
        .unwrap()
    }

    fn log(id: &str, minute: u32) -> LogEntry {
        serde_json::from_value(json!({
            "_id": id,
            "lock": "l1",
            "type": "lock_frozen",
            "createdAt": format!("2024-01-01T00:{minute:02}:00Z"),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn history_pages_newest_first_with_cursor() -> Result<()> {
        let api = PaperLockApi::new();
        for (i, id) in ["h1", "h2", "h3"].iter().enumerate() {
            api.push_history(log(id, i as u32))?;
        }
        let cred = Credential::new("t");

        let first = api
            .lock_history(&cred, "l1", &HistoryPageRequest { limit: 2, last_id: None })
            .await?
            .into_value()
            .unwrap();
        let ids: Vec<_> = first.results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["h3", "h2"]);
        assert!(first.has_more);

        let second = api
            .lock_history(
                &cred,
                "l1",
                &HistoryPageRequest {
                    limit: 2,
                    last_id: Some("h2".to_string()),
                },
            )
            .await?
            .into_value()
            .unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].id, "h1");
        assert!(!second.has_more);
        Ok(())
    }

    #[tokio::test]
    async fn mutations_apply_and_are_recorded() -> Result<()> {
        let api = PaperLockApi::new();
        api.insert_keyholder_lock(lock("l1"))?;
        let cred = Credential::new("t");

        assert!(api.set_freeze(&cred, "l1", true).await?.is_success());
        assert!(api.update_time(&cred, "l1", 3600).await?.is_success());

        let l = api.lock("l1")?.unwrap();
        assert!(l.is_frozen);
        assert_eq!(
            l.end_date.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap()
        );
        assert_eq!(api.calls_for("set_freeze")?.len(), 1);
        assert_eq!(api.calls_for("update_time")?[0].detail, json!({ "duration": 3600 }));

        assert_eq!(api.unlock_lock(&cred, "missing").await?.status, 404);
        Ok(())
    }

    #[tokio::test]
    async fn injected_faults_surface() -> Result<()> {
        let api = PaperLockApi::new();
        api.insert_keyholder_lock(lock("l1"))?;
        let cred = Credential::new("t");

        api.fail_with_status("trust_keyholder", "l1", 400)?;
        api.fail_transport("unlock_lock", "l1")?;

        assert_eq!(api.trust_keyholder(&cred, "l1").await?.status, 400);
        assert!(api.unlock_lock(&cred, "l1").await.is_err());
        assert!(api.lock("l1")?.unwrap().is_locked());

        api.clear_faults()?;
        assert!(api.unlock_lock(&cred, "l1").await?.is_success());
        Ok(())
    }

    #[tokio::test]
    async fn keyholder_search_reports_page_count() -> Result<()> {
        let api = PaperLockApi::new();
        for i in 0..5 {
            api.insert_keyholder_lock(lock(&format!("l{i}")))?;
        }
        let page = api
            .search_keyholder_locks(&Credential::new("t"), &KeyholderSearchRequest::locked(1, 2))
            .await?
            .into_value()
            .unwrap();
        assert_eq!(page.pages, 3);
        assert_eq!(page.total, 5);
        assert_eq!(page.locks.len(), 2);
        Ok(())
    }
}
