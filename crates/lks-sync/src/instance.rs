//! Per-lock working copy.
//!
//! A [`LockInstance`] is built fresh from a snapshot's [`Lock`] and never
//! persisted. Handler code mutates it; [`LockInstance::commit_updates`] diffs
//! it against the remote state it was built from and returns the ordered
//! [`UpdateIntent`]s the engine hands to the update queue.
//!
//! Role guards are silent: a wearer calling `unlock` or a keyholder calling
//! `trust_keyholder` changes nothing.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use lks_db::{CredentialId, Repository};
use lks_rpc::{ApiResult, Credential, LockApi};
use lks_schemas::{
    DiceRollResult, EditExtensionsRequest, ExtensionSlug, GuessTimerResult, Lock, LockRole,
    PilloryVoteInfo, SpinWheelResult, TaskAction, TemporaryCombination, VerificationPictureEntry,
};

use crate::extensions::{Extension, Extensions, Pillory};
use crate::updates::{
    AssignTaskPayload, CombinationPayload, FreezePayload, MaxTimeLimitPayload, PicturePayload,
    PilloryPayload, ResolveTaskPayload, SettingsPayload, TasksPayload, TimePayload, UpdateIntent,
};

/// What an instance needs for immediate (non-queued) remote calls.
#[derive(Clone)]
pub struct RemoteHandle {
    pub api: Arc<dyn LockApi>,
    pub repo: Arc<dyn Repository>,
    pub cred: Credential,
}

pub struct LockInstance {
    lock: Lock,
    credential_id: CredentialId,
    remote: Option<RemoteHandle>,

    is_locked: bool,
    is_archived: bool,
    is_frozen: bool,
    is_trusted: bool,
    display_remaining_time: bool,
    hide_time_logs: bool,
    max_limit_date: Option<DateTime<Utc>>,
    time_adjustment: Duration,

    pub extensions: Extensions,

    /// Queued actions, emitted first at commit in request order.
    actions: Vec<UpdateIntent>,
}

impl std::fmt::Debug for LockInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockInstance")
            .field("lock_id", &self.lock.id)
            .field("credential_id", &self.credential_id)
            .field("is_locked", &self.is_locked)
            .field("is_archived", &self.is_archived)
            .field("time_adjustment", &self.time_adjustment)
            .field("pending_actions", &self.actions.len())
            .finish()
    }
}

impl LockInstance {
    pub fn new(lock: Lock, credential_id: CredentialId) -> Self {
        let is_archived = match lock.role {
            LockRole::Keyholder => lock.keyholder_archived_at.is_some(),
            LockRole::Wearer => lock.archived_at.is_some(),
        };
        Self {
            is_locked: lock.is_locked(),
            is_archived,
            is_frozen: lock.is_frozen,
            is_trusted: lock.trusted,
            display_remaining_time: lock.display_remaining_time,
            hide_time_logs: lock.hide_time_logs,
            max_limit_date: lock.max_limit_date,
            time_adjustment: Duration::zero(),
            extensions: Extensions::from_lock(&lock),
            actions: Vec::new(),
            credential_id,
            remote: None,
            lock,
        }
    }

    pub fn with_remote(mut self, remote: RemoteHandle) -> Self {
        self.remote = Some(remote);
        self
    }

    // -----------------------------------------------------------------------
    // Read-only view
    // -----------------------------------------------------------------------

    /// Remote state the copy was built from.
    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    pub fn lock_id(&self) -> &str {
        &self.lock.id
    }

    pub fn credential_id(&self) -> &CredentialId {
        &self.credential_id
    }

    pub fn is_keyholder_lock(&self) -> bool {
        self.lock.is_keyholder()
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn is_archived(&self) -> bool {
        self.is_archived
    }

    pub fn is_trusted(&self) -> bool {
        self.is_trusted
    }

    pub fn has_time_limit(&self) -> bool {
        self.max_limit_date.is_some()
    }

    pub fn max_limit_date(&self) -> Option<DateTime<Utc>> {
        self.max_limit_date
    }

    /// Uncommitted signed time change.
    pub fn time_adjustment(&self) -> Duration {
        self.time_adjustment
    }

    /// Archive time for the caller's side of the lock.
    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        match self.lock.role {
            LockRole::Keyholder => self.lock.keyholder_archived_at,
            LockRole::Wearer => self.lock.archived_at,
        }
    }

    pub fn time_locked_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.lock.start_date
    }

    pub fn time_frozen_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.lock.frozen_at.map(|f| now - f)
    }

    /// Remaining time including the uncommitted adjustment, capped by the
    /// max-limit date and floored at zero. `None` while the end date is hidden.
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let end = self.lock.end_date?;
        let reference = match (self.lock.is_frozen, self.lock.frozen_at) {
            (true, Some(frozen_at)) => frozen_at,
            (true, None) => {
                warn!(lock_id = %self.lock.id, "instance/frozen-without-timestamp");
                now
            }
            (false, _) => now,
        };
        let mut remaining = whole_seconds(end - reference + self.time_adjustment);
        if let Some(limit) = self.max_limit_date {
            remaining = remaining.min(whole_seconds(limit - now));
        }
        Some(remaining.max(Duration::zero()))
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        self.time_remaining_at(Utc::now())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn unlock(&mut self) {
        if !self.guard(LockRole::Keyholder, "unlock") {
            return;
        }
        self.is_locked = false;
    }

    pub fn archive(&mut self) {
        if self.is_keyholder_lock() {
            self.is_locked = false;
        }
        self.is_archived = true;
    }

    pub fn add_time(&mut self, d: Duration) {
        self.time_adjustment = self.time_adjustment + d;
    }

    pub fn remove_time(&mut self, d: Duration) {
        if !self.guard(LockRole::Keyholder, "remove_time") {
            return;
        }
        self.time_adjustment = self.time_adjustment - d;
    }

    pub fn trust_keyholder(&mut self) {
        if !self.guard(LockRole::Wearer, "trust_keyholder") {
            return;
        }
        self.is_trusted = true;
    }

    pub fn increase_max_limit_date(&mut self, d: Duration) {
        if !self.guard(LockRole::Wearer, "increase_max_limit_date") {
            return;
        }
        match self.max_limit_date {
            Some(limit) => self.max_limit_date = Some(limit + d),
            None => debug!(lock_id = %self.lock.id, "instance/no-max-limit"),
        }
    }

    pub fn remove_max_limit_date(&mut self) {
        if !self.guard(LockRole::Wearer, "remove_max_limit_date") {
            return;
        }
        self.max_limit_date = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.is_frozen = frozen;
    }

    pub fn display_remaining_time(&self) -> bool {
        self.display_remaining_time
    }

    pub fn set_display_remaining_time(&mut self, v: bool) {
        self.display_remaining_time = v;
    }

    pub fn hide_time_logs(&self) -> bool {
        self.hide_time_logs
    }

    pub fn set_hide_time_logs(&mut self, v: bool) {
        self.hide_time_logs = v;
    }

    fn guard(&self, role: LockRole, op: &'static str) -> bool {
        if self.lock.role == role {
            return true;
        }
        debug!(lock_id = %self.lock.id, op, role = ?self.lock.role, "instance/wrong-role");
        false
    }

    // -----------------------------------------------------------------------
    // Queued extension actions
    // -----------------------------------------------------------------------

    /// Duration is clamped to 15 min ..= 24 h.
    pub fn send_to_pillory(&mut self, duration: Duration, reason: impl Into<String>) {
        self.actions.push(UpdateIntent::Pillory(PilloryPayload {
            reason: reason.into(),
            duration: Pillory::clamp_duration(duration).num_seconds(),
        }));
    }

    pub fn set_temporary_combination(&mut self, combination_id: impl Into<String>) {
        self.actions
            .push(UpdateIntent::SetTemporaryCombination(CombinationPayload {
                combination_id: combination_id.into(),
            }));
    }

    pub fn temporarily_unlock(&mut self) {
        self.actions.push(UpdateIntent::TemporarilyUnlock);
    }

    pub fn resolve_task(&mut self, is_completed: bool) {
        self.actions
            .push(UpdateIntent::ResolveTask(ResolveTaskPayload { is_completed }));
    }

    pub fn assign_task(&mut self, task: TaskAction) {
        self.actions.push(UpdateIntent::AssignTask(AssignTaskPayload::Task {
            task: task.task,
            points: task.points,
        }));
    }

    pub fn assign_random_task(&mut self) {
        self.actions
            .push(UpdateIntent::AssignTask(AssignTaskPayload::Random));
    }

    pub fn assign_vote_task(&mut self, duration: Duration) {
        self.actions.push(UpdateIntent::AssignTask(AssignTaskPayload::Vote {
            duration: duration.num_seconds(),
        }));
    }

    pub fn upload_verification_picture(&mut self, data: Vec<u8>, content_type: Option<String>) {
        self.actions
            .push(UpdateIntent::UploadVerificationPicture(PicturePayload {
                data,
                content_type,
            }));
    }

    pub fn create_verification_request(&mut self) {
        self.actions.push(UpdateIntent::CreateVerificationRequest);
    }

    // -----------------------------------------------------------------------
    // Immediate remote calls
    // -----------------------------------------------------------------------
    //
    // Each returns `Ok(None)` when the lock does not carry the extension.

    fn remote(&self) -> Result<&RemoteHandle> {
        self.remote
            .as_ref()
            .ok_or_else(|| anyhow!("lock {} instance has no remote handle", self.lock.id))
    }

    fn extension_id(&self, slug: ExtensionSlug) -> Option<String> {
        let id = self.lock.extension(slug.as_str()).map(|p| p.id.clone());
        if id.is_none() {
            debug!(lock_id = %self.lock.id, slug = slug.as_str(), "instance/no-extension");
        }
        id
    }

    pub async fn roll_dice(&self) -> Result<Option<ApiResult<DiceRollResult>>> {
        let Some(ext) = self.extension_id(ExtensionSlug::Dice) else {
            return Ok(None);
        };
        let r = self.remote()?;
        Ok(Some(r.api.roll_dice(&r.cred, &self.lock.id, &ext).await?))
    }

    pub async fn submit_timer_guess(&self) -> Result<Option<ApiResult<GuessTimerResult>>> {
        let Some(ext) = self.extension_id(ExtensionSlug::GuessTheTimer) else {
            return Ok(None);
        };
        let r = self.remote()?;
        Ok(Some(
            r.api.submit_timer_guess(&r.cred, &self.lock.id, &ext).await?,
        ))
    }

    pub async fn spin_wheel(&self) -> Result<Option<ApiResult<SpinWheelResult>>> {
        let Some(ext) = self.extension_id(ExtensionSlug::WheelOfFortune) else {
            return Ok(None);
        };
        let r = self.remote()?;
        Ok(Some(r.api.spin_wheel(&r.cred, &self.lock.id, &ext).await?))
    }

    pub async fn pillory_vote_info(&self) -> Result<Option<ApiResult<Vec<PilloryVoteInfo>>>> {
        let Some(ext) = self.extension_id(ExtensionSlug::Pillory) else {
            return Ok(None);
        };
        let r = self.remote()?;
        Ok(Some(
            r.api.pillory_vote_info(&r.cred, &self.lock.id, &ext).await?,
        ))
    }

    pub async fn temporary_combination(&self) -> Result<Option<ApiResult<TemporaryCombination>>> {
        if self.extension_id(ExtensionSlug::HygieneOpening).is_none() {
            return Ok(None);
        }
        let r = self.remote()?;
        Ok(Some(r.api.temporary_combination(&r.cred, &self.lock.id).await?))
    }

    pub async fn verification_pictures(
        &self,
    ) -> Result<Option<ApiResult<Vec<VerificationPictureEntry>>>> {
        if self.extension_id(ExtensionSlug::VerificationPicture).is_none() {
            return Ok(None);
        }
        let r = self.remote()?;
        Ok(Some(r.api.verification_pictures(&r.cred, &self.lock.id).await?))
    }

    /// Share link, served from the repository cache when present. A fetched
    /// link is cached for later passes.
    pub async fn share_link(&self) -> Result<Option<ApiResult<String>>> {
        let Some(ext) = self.extension_id(ExtensionSlug::ShareLink) else {
            return Ok(None);
        };
        let r = self.remote()?;
        if let Some(link) = r
            .repo
            .share_link(&self.lock.id)
            .await
            .context("share link cache read failed")?
        {
            return Ok(Some(ApiResult::ok(link)));
        }

        let res = r.api.share_link(&r.cred, &self.lock.id, &ext).await?;
        let status = res.status;
        match res.into_value() {
            Some(v) => {
                r.repo
                    .upsert_share_link(&self.lock.id, &v.link)
                    .await
                    .context("share link cache write failed")?;
                Ok(Some(ApiResult {
                    status,
                    value: Some(v.link),
                }))
            }
            None => Ok(Some(ApiResult::status_only(status))),
        }
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Diff the copy against the remote state and drain it into intents.
    ///
    /// Queued actions come first, then unlock, archive, the role-specific
    /// scalar diffs, the time delta, the extension edit and the task list.
    /// Modified flags and the time delta are reset afterwards.
    pub fn commit_updates(&mut self) -> Vec<UpdateIntent> {
        let mut out: Vec<UpdateIntent> = std::mem::take(&mut self.actions);
        self.diff_into(&mut out);
        self.time_adjustment = Duration::zero();
        self.extensions.clear_modified();
        out
    }

    fn diff_into(&self, out: &mut Vec<UpdateIntent>) {
        let keyholder = self.is_keyholder_lock();

        if self.lock.is_locked() && !self.is_locked {
            out.push(UpdateIntent::Unlock);
        }

        let remote_archived = self.archived_at().is_some();
        if remote_archived != self.is_archived && !(keyholder && self.is_locked) {
            out.push(UpdateIntent::Archive);
        }

        if !self.is_locked {
            return;
        }

        if keyholder {
            if self.is_frozen != self.lock.is_frozen {
                out.push(UpdateIntent::Freeze(FreezePayload {
                    is_frozen: self.is_frozen,
                }));
            }
            if self.display_remaining_time != self.lock.display_remaining_time
                || self.hide_time_logs != self.lock.hide_time_logs
            {
                out.push(UpdateIntent::Settings(SettingsPayload {
                    display_remaining_time: self.display_remaining_time,
                    hide_time_logs: self.hide_time_logs,
                }));
            }
        } else {
            if self.is_trusted != self.lock.trusted {
                out.push(UpdateIntent::TrustKeyholder);
            }
            if truncated(self.max_limit_date) != truncated(self.lock.max_limit_date) {
                out.push(UpdateIntent::MaxTimeLimit(MaxTimeLimitPayload {
                    new_max_limit_date: self.max_limit_date,
                }));
            }
        }

        let delta = self.time_adjustment.num_seconds();
        if delta != 0 {
            out.push(UpdateIntent::AddRemoveTime(TimePayload { duration: delta }));
        }

        if self.is_trusted && keyholder && self.extensions.any_modified() {
            out.push(UpdateIntent::Extensions(EditExtensionsRequest {
                extensions: self.extensions.enabled_configs(),
            }));
        }

        let tasks = &self.extensions.tasks;
        if tasks.is_enabled() && tasks.tasks_modified() {
            out.push(UpdateIntent::Tasks(TasksPayload {
                tasks: tasks.user_tasks().to_vec(),
            }));
        }
    }
}

fn whole_seconds(d: Duration) -> Duration {
    Duration::seconds(d.num_seconds())
}

fn truncated(t: Option<DateTime<Utc>>) -> Option<i64> {
    t.map(|t| t.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn lock(role: &str, extra: serde_json::Value) -> Lock {
        let mut v = json!({
            "_id": "l1",
            "status": "locked",
            "role": role,
            "startDate": "2024-05-01T00:00:00Z",
            "endDate": "2024-05-02T12:00:00Z",
            "user": { "_id": "u1" }
        });
        if let (Some(base), Some(more)) = (v.as_object_mut(), extra.as_object()) {
            for (k, val) in more {
                base.insert(k.clone(), val.clone());
            }
        }
        serde_json::from_value(v).unwrap()
    }

    fn instance(role: &str, extra: serde_json::Value) -> LockInstance {
        LockInstance::new(lock(role, extra), CredentialId::new("c1"))
    }

    #[test]
    fn wearer_cannot_unlock_or_remove_time() {
        let mut i = instance("wearer", json!({}));
        i.unlock();
        i.remove_time(Duration::hours(1));
        assert!(i.is_locked());
        assert_eq!(i.time_adjustment(), Duration::zero());
        assert!(i.commit_updates().is_empty());
    }

    #[test]
    fn keyholder_cannot_trust_or_touch_the_limit() {
        let mut i = instance("keyholder", json!({ "maxLimitDate": "2024-05-03T00:00:00Z" }));
        i.trust_keyholder();
        i.increase_max_limit_date(Duration::hours(1));
        i.remove_max_limit_date();
        assert!(!i.is_trusted());
        assert!(i.has_time_limit());
        assert!(i.commit_updates().is_empty());
    }

    #[test]
    fn freeze_toggle_commits_one_freeze_intent() {
        let mut i = instance("keyholder", json!({}));
        i.set_frozen(true);
        assert_eq!(
            i.commit_updates(),
            vec![UpdateIntent::Freeze(FreezePayload { is_frozen: true })]
        );
    }

    #[test]
    fn unlock_short_circuits_the_rest_of_the_diff() {
        let mut i = instance("keyholder", json!({}));
        i.add_time(Duration::hours(1));
        i.set_frozen(true);
        i.unlock();
        assert_eq!(i.commit_updates(), vec![UpdateIntent::Unlock]);
        // the delta is consumed either way
        assert_eq!(i.time_adjustment(), Duration::zero());
    }

    #[test]
    fn keyholder_archive_implies_unlock() {
        let mut i = instance("keyholder", json!({}));
        i.archive();
        assert_eq!(
            i.commit_updates(),
            vec![UpdateIntent::Unlock, UpdateIntent::Archive]
        );
    }

    #[test]
    fn wearer_archive_is_emitted_while_still_locked() {
        let mut i = instance("wearer", json!({}));
        i.archive();
        assert_eq!(i.commit_updates(), vec![UpdateIntent::Archive]);
    }

    #[test]
    fn wearer_scalar_diffs_and_time_delta() {
        let mut i = instance("wearer", json!({ "maxLimitDate": "2024-05-03T00:00:00Z" }));
        i.trust_keyholder();
        i.increase_max_limit_date(Duration::hours(2));
        i.add_time(Duration::milliseconds(90_500));
        let expected_limit = Utc.with_ymd_and_hms(2024, 5, 3, 2, 0, 0).unwrap();
        assert_eq!(
            i.commit_updates(),
            vec![
                UpdateIntent::TrustKeyholder,
                UpdateIntent::MaxTimeLimit(MaxTimeLimitPayload {
                    new_max_limit_date: Some(expected_limit)
                }),
                UpdateIntent::AddRemoveTime(TimePayload { duration: 90 }),
            ]
        );
    }

    #[test]
    fn sub_second_delta_emits_nothing() {
        let mut i = instance("keyholder", json!({}));
        i.add_time(Duration::milliseconds(400));
        assert!(i.commit_updates().is_empty());
    }

    #[test]
    fn queued_actions_come_first_in_request_order() {
        let mut i = instance("keyholder", json!({}));
        i.set_frozen(true);
        i.assign_random_task();
        i.send_to_pillory(Duration::minutes(1), "late");
        let intents = i.commit_updates();
        assert_eq!(
            intents,
            vec![
                UpdateIntent::AssignTask(AssignTaskPayload::Random),
                UpdateIntent::Pillory(PilloryPayload {
                    reason: "late".into(),
                    duration: 15 * 60
                }),
                UpdateIntent::Freeze(FreezePayload { is_frozen: true }),
            ]
        );
    }

    #[test]
    fn extension_edit_needs_trust_and_keyholder() {
        let ext = json!([{ "_id": "e1", "slug": "dice", "config": { "multiplier": 60 } }]);

        let mut untrusted = instance("keyholder", json!({ "extensions": ext.clone() }));
        untrusted.extensions.dice.set_multiplier(Duration::seconds(120));
        assert!(untrusted.commit_updates().is_empty());

        let mut trusted =
            instance("keyholder", json!({ "extensions": ext, "trusted": true }));
        trusted.extensions.dice.set_multiplier(Duration::seconds(120));
        let intents = trusted.commit_updates();
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            UpdateIntent::Extensions(req) => {
                assert_eq!(req.extensions.len(), 1);
                assert_eq!(req.extensions[0].config["multiplier"], 120);
            }
            other => panic!("unexpected intent: {other:?}"),
        }
        assert!(!trusted.extensions.any_modified());
    }

    #[test]
    fn task_list_edit_emits_full_list_when_enabled() {
        let mut i = instance(
            "keyholder",
            json!({ "extensions": [{ "_id": "t1", "slug": "tasks", "config": {} }] }),
        );
        i.extensions.tasks.tasks_mut().push(TaskAction {
            task: "stretch".into(),
            points: 3,
        });
        assert_eq!(
            i.commit_updates(),
            vec![UpdateIntent::Tasks(TasksPayload {
                tasks: vec![TaskAction {
                    task: "stretch".into(),
                    points: 3
                }]
            })]
        );
    }

    #[test]
    fn remaining_time_applies_adjustment_and_cap() {
        // end is 24 h after now
        let mut i = instance("wearer", json!({}));
        assert_eq!(i.time_remaining_at(now()), Some(Duration::hours(24)));

        i.add_time(Duration::hours(2));
        assert_eq!(i.time_remaining_at(now()), Some(Duration::hours(26)));

        let capped = instance("wearer", json!({ "maxLimitDate": "2024-05-01T18:00:00Z" }));
        assert_eq!(capped.time_remaining_at(now()), Some(Duration::hours(6)));
    }

    #[test]
    fn remaining_time_is_never_negative_and_hidden_end_is_none() {
        let past = instance("wearer", json!({ "endDate": "2024-04-30T00:00:00Z" }));
        assert_eq!(past.time_remaining_at(now()), Some(Duration::zero()));

        let hidden = instance("wearer", json!({ "endDate": null }));
        assert_eq!(hidden.time_remaining_at(now()), None);
    }

    #[test]
    fn frozen_lock_counts_from_the_freeze() {
        let i = instance(
            "wearer",
            json!({ "isFrozen": true, "frozenAt": "2024-05-01T06:00:00Z" }),
        );
        assert_eq!(i.time_remaining_at(now()), Some(Duration::hours(30)));
        assert_eq!(i.time_frozen_at(now()), Some(Duration::hours(6)));
        assert_eq!(i.time_locked_at(now()), Duration::hours(12));
    }

    #[test]
    fn frozen_lock_without_timestamp_counts_from_now() {
        let i = instance("wearer", json!({ "isFrozen": true }));
        assert_eq!(i.time_remaining_at(now()), Some(Duration::hours(24)));
        assert_eq!(i.time_frozen_at(now()), None);
    }
}
