//! Reconciliation engine.
//!
//! [`Processor`] is the only component that talks to both the remote API and
//! the repository. A pass runs in phases, each its own method:
//!
//! 1. snapshot refresh (my locks, keyholder search) and the stale sweep;
//! 2. history pull for every handled lock;
//! 3. replay of unprocessed history through the handlers, then commit;
//! 4. flush of pending update records to the remote.
//!
//! Phases for one credential must not overlap. Different credentials may run
//! concurrently against the same processor.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lks_db::{CredentialId, HistoryEntry, LockUpdate, Repository, Snapshot, UpdateType};
use lks_rpc::{Credential, LockApi};
use lks_schemas::{
    EditExtensionsRequest, ExtensionSlug, HistoryPageRequest, KeyholderSearchRequest, Lock,
    LockListFilter, LockRole,
};

use crate::events::LockEvent;
use crate::handler::{dispatch, HandlerKey, HandlerScope, LockHandler};
use crate::instance::{LockInstance, RemoteHandle};
use crate::queue::UpdateQueue;
use crate::registry::{key_of, HandlerRegistry};
use crate::report::{FlushReport, HistoryReport, RefreshReport, ReplayReport};
use crate::token::CredentialIds;
use crate::updates::{
    policy, AssignTaskPayload, CombinationPayload, FreezePayload, MaxTimeLimitPayload,
    PicturePayload, PilloryPayload, ResolveTaskPayload, SettingsPayload, TasksPayload,
    TimePayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorOptions {
    pub keyholder_page_size: u32,
    pub history_page_size: u32,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            keyholder_page_size: 50,
            history_page_size: 100,
        }
    }
}

/// Result of trying one update record against the remote.
enum Attempt {
    Sent(u16),
    /// Dropped without a call.
    Skipped,
    /// Kept for a later flush.
    Deferred,
}

pub struct Processor {
    api: Arc<dyn LockApi>,
    repo: Arc<dyn Repository>,
    registry: RwLock<HandlerRegistry>,
    ids: CredentialIds,
    options: ProcessorOptions,
}

impl Processor {
    pub fn new(api: Arc<dyn LockApi>, repo: Arc<dyn Repository>) -> Self {
        Self::with_options(api, repo, ProcessorOptions::default())
    }

    pub fn with_options(
        api: Arc<dyn LockApi>,
        repo: Arc<dyn Repository>,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            api,
            repo,
            registry: RwLock::new(HandlerRegistry::default()),
            ids: CredentialIds::default(),
            options,
        }
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    pub fn credential_id(&self, cred: &Credential) -> CredentialId {
        self.ids.get(cred)
    }

    fn read_registry(&self) -> Result<RwLockReadGuard<'_, HandlerRegistry>> {
        self.registry
            .read()
            .map_err(|_| anyhow!("handler registry lock poisoned"))
    }

    fn write_registry(&self) -> Result<RwLockWriteGuard<'_, HandlerRegistry>> {
        self.registry
            .write()
            .map_err(|_| anyhow!("handler registry lock poisoned"))
    }

    fn remote(&self, cred: &Credential) -> RemoteHandle {
        RemoteHandle {
            api: Arc::clone(&self.api),
            repo: Arc::clone(&self.repo),
            cred: cred.clone(),
        }
    }

    fn instance(&self, lock: Lock, cred: &Credential, cid: &CredentialId) -> LockInstance {
        LockInstance::new(lock, cid.clone()).with_remote(self.remote(cred))
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register_lock_handler(
        &self,
        lock_id: &str,
        cred: &Credential,
        handler: Arc<dyn LockHandler>,
    ) -> Result<()> {
        let cid = self.credential_id(cred);
        self.write_registry()?.register_exclusive(lock_id, &cid, handler);
        Ok(())
    }

    pub fn register_shared_lock_handler(
        &self,
        shared_lock_id: &str,
        cred: &Credential,
        handler: Arc<dyn LockHandler>,
    ) -> Result<()> {
        let cid = self.credential_id(cred);
        self.write_registry()?
            .register_shared(shared_lock_id, &cid, handler);
        Ok(())
    }

    pub fn unregister_lock_handler(&self, lock_id: &str, cred: &Credential) -> Result<bool> {
        let cid = self.credential_id(cred);
        Ok(self.write_registry()?.unregister_exclusive(lock_id, &cid).is_some())
    }

    pub fn unregister_shared_lock_handler(
        &self,
        shared_lock_id: &str,
        cred: &Credential,
    ) -> Result<bool> {
        let cid = self.credential_id(cred);
        Ok(self
            .write_registry()?
            .unregister_shared(shared_lock_id, &cid)
            .is_some())
    }

    fn resolve(&self, lock: &Lock, cid: &CredentialId) -> Result<Option<Arc<dyn LockHandler>>> {
        Ok(self.read_registry()?.resolve(lock, cid))
    }

    // -----------------------------------------------------------------------
    // Snapshot refresh
    // -----------------------------------------------------------------------

    /// Pull "my locks" and upsert their snapshots.
    pub async fn bulk_update_lock_snapshots(
        &self,
        cred: &Credential,
        update_token: Option<Uuid>,
    ) -> Result<RefreshReport> {
        let cid = self.credential_id(cred);
        let mut report = RefreshReport::default();

        let res = self
            .api
            .locks(cred, LockListFilter::Active)
            .await
            .context("list locks failed")?;
        let status = res.status;
        let Some(locks) = res.into_value() else {
            warn!(credential_id = %cid, status, "snapshots/locks-failed");
            return Ok(report);
        };
        report.pages = 1;

        self.upsert_snapshots(&locks, &cid, update_token, &mut report)
            .await?;
        info!(
            credential_id = %cid,
            upserted = report.upserted,
            skipped_inactive = report.skipped_inactive,
            "snapshots/locks"
        );
        Ok(report)
    }

    /// Page through the keyholder search and upsert every returned lock.
    pub async fn bulk_update_keyholder_snapshots(
        &self,
        cred: &Credential,
        update_token: Option<Uuid>,
    ) -> Result<RefreshReport> {
        let cid = self.credential_id(cred);
        let mut report = RefreshReport::default();
        let mut page = 0u32;

        loop {
            let req = KeyholderSearchRequest::locked(page, self.options.keyholder_page_size);
            let res = self
                .api
                .search_keyholder_locks(cred, &req)
                .await
                .with_context(|| format!("keyholder search page {page} failed"))?;
            let status = res.status;
            let Some(body) = res.into_value() else {
                warn!(credential_id = %cid, page, status, "snapshots/keyholder-page-failed");
                break;
            };
            report.pages += 1;
            page += 1;

            self.upsert_snapshots(&body.locks, &cid, update_token, &mut report)
                .await?;

            if page >= body.pages {
                break;
            }
        }

        info!(
            credential_id = %cid,
            pages = report.pages,
            upserted = report.upserted,
            skipped_inactive = report.skipped_inactive,
            "snapshots/keyholder"
        );
        Ok(report)
    }

    async fn upsert_snapshots(
        &self,
        locks: &[Lock],
        cid: &CredentialId,
        update_token: Option<Uuid>,
        report: &mut RefreshReport,
    ) -> Result<()> {
        let mut touched: Vec<HandlerKey> = Vec::new();

        for lock in locks {
            let existing = self
                .repo
                .snapshot(&lock.id, cid)
                .await
                .context("load snapshot failed")?;

            let snapshot = match existing {
                Some(s) if !s.is_active => {
                    debug!(lock_id = %lock.id, credential_id = %cid, "snapshots/skip-inactive");
                    report.skipped_inactive += 1;
                    continue;
                }
                Some(mut s) => {
                    s.lock = lock.clone();
                    s.update_token = update_token;
                    s.updated_at = Utc::now();
                    s
                }
                None => Snapshot::new(lock.clone(), cid.clone(), update_token),
            };
            self.repo
                .upsert_snapshot(&snapshot)
                .await
                .context("upsert snapshot failed")?;
            report.upserted += 1;

            if let Some(h) = self.resolve(lock, cid)? {
                let key = key_of(h.as_ref(), cid);
                if !touched.contains(&key) {
                    touched.push(key);
                }
            }
        }

        let mut reg = self.write_registry()?;
        for key in &touched {
            reg.invalidate(key);
        }
        Ok(())
    }

    /// Mark inactive every active snapshot the stamped refresh did not see.
    pub async fn deactivate_snapshots_without_update_token(
        &self,
        cred: &Credential,
        update_token: Uuid,
    ) -> Result<usize> {
        let cid = self.credential_id(cred);
        let snapshots = self
            .repo
            .active_snapshots(&cid, None)
            .await
            .context("load active snapshots failed")?;

        let mut n = 0;
        for s in snapshots {
            if s.update_token != Some(update_token) {
                self.repo.mark_snapshot_inactive(&s.lock_id, &cid).await?;
                debug!(lock_id = %s.lock_id, credential_id = %cid, "snapshots/swept");
                n += 1;
            }
        }
        if n > 0 {
            self.write_registry()?.invalidate_credential(&cid);
        }
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    /// Working copies of every active snapshot.
    pub async fn all_instances(&self, cred: &Credential) -> Result<Vec<LockInstance>> {
        let cid = self.credential_id(cred);
        let snapshots = self
            .repo
            .active_snapshots(&cid, None)
            .await
            .context("load active snapshots failed")?;
        Ok(snapshots
            .into_iter()
            .map(|s| self.instance(s.lock, cred, &cid))
            .collect())
    }

    /// Locks a handler governs, from the cache or rebuilt from snapshots.
    async fn governed_locks(&self, key: &HandlerKey) -> Result<Vec<Lock>> {
        let cached = self.read_registry()?.governed(key).map(<[Lock]>::to_vec);
        if let Some(locks) = cached {
            return Ok(locks);
        }

        let snapshots = self
            .repo
            .active_snapshots(&key.credential_id, None)
            .await
            .context("load active snapshots failed")?;

        let locks: Vec<Lock> = {
            let reg = self.read_registry()?;
            snapshots
                .into_iter()
                .filter(|s| {
                    reg.resolve(&s.lock, &key.credential_id)
                        .is_some_and(|h| key_of(h.as_ref(), &key.credential_id) == *key)
                })
                .map(|s| s.lock)
                .collect()
        };

        self.write_registry()?
            .set_governed(key.clone(), locks.clone());
        Ok(locks)
    }

    /// Working copies of the locks `handler` governs for this credential.
    pub async fn lock_handler_instances(
        &self,
        handler: &dyn LockHandler,
        cred: &Credential,
    ) -> Result<Vec<LockInstance>> {
        let cid = self.credential_id(cred);
        let key = key_of(handler, &cid);
        let locks = self.governed_locks(&key).await?;
        Ok(locks
            .into_iter()
            .map(|l| self.instance(l, cred, &cid))
            .collect())
    }

    async fn scope(&self, key: &HandlerKey) -> Result<HandlerScope> {
        Ok(HandlerScope {
            key: key.clone(),
            locks: self.governed_locks(key).await?,
        })
    }

    /// Commit a working copy and queue its intents.
    async fn commit_instance(&self, instance: &mut LockInstance) -> Result<usize> {
        let intents = instance.commit_updates();
        let n = intents.len();
        let queue = UpdateQueue::new(self.repo.as_ref());
        let lock_id = instance.lock_id().to_string();
        for intent in intents {
            queue
                .apply(&lock_id, instance.credential_id(), intent)
                .await?;
        }
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // History pull
    // -----------------------------------------------------------------------

    /// Pull new history for one lock. `Ok(false)` when a page failed or the
    /// lock has no snapshot; nothing is inserted in that case.
    pub async fn update_lock_history(&self, lock_id: &str, cred: &Credential) -> Result<bool> {
        let cid = self.credential_id(cred);
        let Some(snapshot) = self.repo.snapshot(lock_id, &cid).await? else {
            debug!(lock_id, credential_id = %cid, "history/no-snapshot");
            return Ok(false);
        };
        Ok(self.pull_history(&snapshot, cred, &cid).await?.is_some())
    }

    async fn pull_history(
        &self,
        snapshot: &Snapshot,
        cred: &Credential,
        cid: &CredentialId,
    ) -> Result<Option<usize>> {
        let lock_id = snapshot.lock_id.as_str();
        let known = self
            .repo
            .most_recent_history_id(lock_id, cid)
            .await
            .context("load most recent history id failed")?;

        let mut req = HistoryPageRequest {
            limit: self.options.history_page_size,
            last_id: None,
        };
        let mut collected: Vec<HistoryEntry> = Vec::new();

        loop {
            let res = self
                .api
                .lock_history(cred, lock_id, &req)
                .await
                .with_context(|| format!("history page for lock {lock_id} failed"))?;
            let status = res.status;
            let Some(page) = res.into_value() else {
                warn!(lock_id, credential_id = %cid, status, "history/page-failed");
                return Ok(None);
            };

            let found = known
                .as_deref()
                .and_then(|k| page.results.iter().position(|l| l.id == k));
            let stop = found.unwrap_or(page.results.len());
            collected.extend(
                page.results[..stop]
                    .iter()
                    .map(|l| HistoryEntry::unprocessed(l.clone(), cid.clone())),
            );

            if found.is_some() || !page.has_more {
                break;
            }
            match page.results.last() {
                Some(last) => req.last_id = Some(last.id.clone()),
                None => break,
            }
        }

        // pages arrive newest first; store oldest first so equal timestamps
        // replay in remote order
        collected.reverse();
        let inserted = self
            .repo
            .insert_history(&collected)
            .await
            .context("insert history failed")?;

        if !snapshot.lock.is_locked()
            && !self.repo.has_unprocessed_history(lock_id, cid).await?
        {
            self.repo.mark_snapshot_inactive(lock_id, cid).await?;
            debug!(lock_id, credential_id = %cid, "history/deactivated");
        }

        info!(lock_id, credential_id = %cid, inserted, "history/pull");
        Ok(Some(inserted))
    }

    /// Pull history for every active, handled lock. `shared_lock_ids`
    /// narrows the pull to locks in those shared groups.
    pub async fn bulk_update_lock_history(
        &self,
        cred: &Credential,
        shared_lock_ids: Option<&[String]>,
    ) -> Result<HistoryReport> {
        let cid = self.credential_id(cred);
        let snapshots = self
            .repo
            .active_snapshots(&cid, shared_lock_ids)
            .await
            .context("load active snapshots failed")?;

        let mut report = HistoryReport::default();
        for s in snapshots {
            if self.resolve(&s.lock, &cid)?.is_none() {
                continue;
            }
            report.locks_pulled += 1;
            match self.pull_history(&s, cred, &cid).await? {
                Some(n) => report.inserted += n,
                None => report.failed += 1,
            }
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Replay
    // -----------------------------------------------------------------------

    /// Deliver unprocessed history to the handlers, then commit every lock
    /// that saw at least one entry.
    ///
    /// Each entry is marked processed right after its callback returns, so a
    /// handler error aborts the pass without replaying earlier entries again.
    pub async fn process_lock_history(&self, cred: &Credential) -> Result<ReplayReport> {
        let cid = self.credential_id(cred);
        self.write_registry()?.invalidate_credential(&cid);

        let mut instances = self.all_instances(cred).await?;
        let mut history = self
            .repo
            .unprocessed_history(&cid)
            .await
            .context("load unprocessed history failed")?;
        history.sort_by_key(|e| e.created_at);

        let mut report = ReplayReport::default();
        let mut entered: Vec<(HandlerKey, Arc<dyn LockHandler>)> = Vec::new();
        let mut started: Vec<(usize, Arc<dyn LockHandler>)> = Vec::new();

        for entry in &history {
            let Some(idx) = instances.iter().position(|i| i.lock_id() == entry.lock_id) else {
                report.skipped_unhandled += 1;
                continue;
            };
            let Some(handler) = self.resolve(instances[idx].lock(), &cid)? else {
                report.skipped_unhandled += 1;
                continue;
            };

            let key = key_of(handler.as_ref(), &cid);
            if !entered.iter().any(|(k, _)| *k == key) {
                let scope = self.scope(&key).await?;
                handler.on_handler_enter(&scope).await?;
                entered.push((key, Arc::clone(&handler)));
            }
            if !started.iter().any(|(i, _)| *i == idx) {
                handler.on_processing_started(&mut instances[idx]).await?;
                started.push((idx, Arc::clone(&handler)));
            }

            match LockEvent::decode(&entry.log) {
                Some((meta, event)) => {
                    dispatch(handler.as_ref(), &mut instances[idx], &meta, &event).await?;
                    report.dispatched += 1;
                }
                None => report.ignored_types += 1,
            }

            self.repo
                .mark_history_processed(&entry.id, &cid)
                .await
                .context("mark history processed failed")?;
        }

        for (idx, handler) in &started {
            let instance = &mut instances[*idx];
            handler.on_processing_completed(instance).await?;
            self.commit_instance(instance).await?;
            report.instances_committed += 1;

            if !instance.lock().is_locked() {
                self.repo
                    .mark_snapshot_inactive(instance.lock_id(), &cid)
                    .await?;
            }
        }

        for (key, handler) in &entered {
            let scope = self.scope(key).await?;
            handler.on_handler_exit(&scope).await?;
        }

        info!(
            credential_id = %cid,
            dispatched = report.dispatched,
            ignored = report.ignored_types,
            skipped = report.skipped_unhandled,
            committed = report.instances_committed,
            "replay/done"
        );
        Ok(report)
    }

    /// Give every handler of this credential its working copies outside
    /// replay, then commit them.
    pub async fn update_lock_handlers(&self, cred: &Credential) -> Result<usize> {
        let cid = self.credential_id(cred);
        let handlers = self.read_registry()?.handlers(&cid);

        let mut committed = 0;
        for (key, handler) in handlers {
            let mut instances = self.lock_handler_instances(handler.as_ref(), cred).await?;
            handler
                .on_handler_update(&mut instances)
                .await
                .with_context(|| format!("handler {key} update failed"))?;
            for instance in &mut instances {
                self.commit_instance(instance).await?;
                committed += 1;
            }
        }
        Ok(committed)
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    /// Apply pending update records to the remote, oldest first.
    ///
    /// A record is deleted once the remote answers with any status, or when
    /// it is skipped. It stays pending when its extension is missing from the
    /// snapshot or the call fails without a status.
    pub async fn process_lock_updates(&self, cred: &Credential) -> Result<FlushReport> {
        let cid = self.credential_id(cred);
        let mut pending = self
            .repo
            .pending_updates(&cid)
            .await
            .context("load pending updates failed")?;
        pending.sort_by_key(|u| u.created_at);

        let mut report = FlushReport::default();
        let mut ignored: HashSet<String> = HashSet::new();

        for record in &pending {
            let Some(snapshot) = self.repo.snapshot(&record.lock_id, &cid).await? else {
                debug!(
                    lock_id = %record.lock_id,
                    update_type = %record.update_type,
                    "flush/orphan"
                );
                self.repo.delete_update(record.id).await?;
                report.skipped += 1;
                continue;
            };
            let lock = &snapshot.lock;

            let attempt = match self.attempt(cred, lock, record, &ignored).await {
                Ok(a) => a,
                Err(err) => {
                    warn!(
                        lock_id = %record.lock_id,
                        update_type = %record.update_type,
                        error = %err,
                        "flush/transport-failed"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            match attempt {
                Attempt::Deferred => {
                    report.deferred += 1;
                    continue;
                }
                Attempt::Skipped => report.skipped += 1,
                Attempt::Sent(status) if (200..300).contains(&status) => report.applied += 1,
                Attempt::Sent(status) => {
                    report.rejected += 1;
                    if policy(record.update_type).is_permanent(status) {
                        warn!(
                            lock_id = %record.lock_id,
                            update_type = %record.update_type,
                            status,
                            "flush/permanent-rejection"
                        );
                        ignored.insert(record.lock_id.clone());
                    } else {
                        debug!(
                            lock_id = %record.lock_id,
                            update_type = %record.update_type,
                            status,
                            "flush/rejected"
                        );
                    }
                }
            }
            self.repo.delete_update(record.id).await?;
        }

        info!(
            credential_id = %cid,
            applied = report.applied,
            rejected = report.rejected,
            skipped = report.skipped,
            deferred = report.deferred,
            failed = report.failed,
            "flush/done"
        );
        Ok(report)
    }

    /// `Err` only for transport failures.
    async fn attempt(
        &self,
        cred: &Credential,
        lock: &Lock,
        record: &LockUpdate,
        ignored: &HashSet<String>,
    ) -> Result<Attempt> {
        let api = self.api.as_ref();
        let id = lock.id.as_str();

        if record.update_type == UpdateType::Archive {
            let res = match lock.role {
                LockRole::Keyholder if lock.keyholder_archived_at.is_none() => {
                    api.archive_keyholder_lock(cred, id).await?
                }
                LockRole::Wearer if lock.archived_at.is_none() => api.archive_lock(cred, id).await?,
                _ => return Ok(Attempt::Skipped),
            };
            return Ok(Attempt::Sent(res.status));
        }

        if !lock.is_locked() {
            debug!(lock_id = id, update_type = %record.update_type, "flush/not-locked");
            return Ok(Attempt::Skipped);
        }

        let rules = policy(record.update_type);
        if !rules.bypasses_ignored && (lock.user.is_suspended_or_disabled || ignored.contains(id))
        {
            debug!(lock_id = id, update_type = %record.update_type, "flush/ignored");
            return Ok(Attempt::Skipped);
        }

        let ext = match rules.required_extension {
            Some(slug) => match lock.extension(slug.as_str()) {
                Some(p) => p.id.clone(),
                None => {
                    debug!(lock_id = id, slug = slug.as_str(), "flush/missing-extension");
                    return Ok(Attempt::Deferred);
                }
            },
            None => String::new(),
        };

        let res = match record.update_type {
            UpdateType::Archive => return Ok(Attempt::Skipped),
            UpdateType::Unlock => api.unlock_lock(cred, id).await?,
            UpdateType::UpdateFreeze => {
                let Some(p) = payload::<FreezePayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.set_freeze(cred, id, p.is_frozen).await?
            }
            UpdateType::TrustKeyholder => api.trust_keyholder(cred, id).await?,
            UpdateType::UpdateMaxTimeLimit => {
                let Some(p) = payload::<MaxTimeLimitPayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                match (p.new_max_limit_date, lock.max_limit_date) {
                    (Some(date), _) => api.set_max_limit_date(cred, id, Some(date), false).await?,
                    (None, Some(current)) => {
                        api.set_max_limit_date(cred, id, Some(current), true).await?
                    }
                    (None, None) => return Ok(Attempt::Skipped),
                }
            }
            UpdateType::AddRemoveTime => {
                let Some(p) = payload::<TimePayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.update_time(cred, id, p.duration).await?
            }
            UpdateType::UpdateSettings => {
                let Some(p) = payload::<SettingsPayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.update_settings(cred, id, p.display_remaining_time, p.hide_time_logs)
                    .await?
            }
            UpdateType::UpdateExtensions => {
                let Some(req) = payload::<EditExtensionsRequest>(record) else {
                    return Ok(Attempt::Skipped);
                };
                let res = api.update_extensions(cred, id, &req).await?;
                if !req.contains(ExtensionSlug::ShareLink) {
                    // the remote has answered; a cache failure must not keep the record
                    if let Err(err) = self.repo.delete_share_link(id).await {
                        warn!(lock_id = id, error = %err, "flush/share-link-clear-failed");
                    }
                }
                res
            }
            UpdateType::UpdateTasks => {
                let Some(p) = payload::<TasksPayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.update_tasks(cred, id, &ext, &p.tasks).await?
            }
            UpdateType::ResolveTask => {
                let Some(p) = payload::<ResolveTaskPayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.resolve_task(cred, id, &ext, p.is_completed).await?
            }
            UpdateType::AssignTask => match payload::<AssignTaskPayload>(record) {
                Some(AssignTaskPayload::Random) => api.assign_random_task(cred, id, &ext).await?,
                Some(AssignTaskPayload::Vote { duration }) => {
                    api.assign_vote_task(cred, id, &ext, duration).await?
                }
                Some(AssignTaskPayload::Task { task, points }) => {
                    let task = lks_schemas::TaskAction { task, points };
                    api.assign_task(cred, id, &ext, &task).await?
                }
                None => return Ok(Attempt::Skipped),
            },
            UpdateType::Pillory => {
                let Some(p) = payload::<PilloryPayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.pillory(cred, id, &ext, &p.reason, p.duration).await?
            }
            UpdateType::SetTemporaryCombination => {
                let Some(p) = payload::<CombinationPayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.set_temporary_combination(cred, id, &p.combination_id)
                    .await?
            }
            UpdateType::TemporarilyUnlock => match lock.role {
                LockRole::Keyholder => api.keyholder_temporary_unlock(cred, id, &ext).await?,
                LockRole::Wearer => api.wearer_temporary_unlock(cred, id, &ext).await?,
            },
            UpdateType::UploadVerificationPicture => {
                let Some(p) = payload::<PicturePayload>(record) else {
                    return Ok(Attempt::Skipped);
                };
                api.upload_verification_picture(cred, id, &p.data, p.content_type.as_deref())
                    .await?
            }
            UpdateType::CreateVerificationRequest => {
                api.create_verification_request(cred, id, &ext).await?
            }
        };
        Ok(Attempt::Sent(res.status))
    }
}

fn payload<T: DeserializeOwned>(record: &LockUpdate) -> Option<T> {
    match record.payload_as() {
        Ok(p) => Some(p),
        Err(err) => {
            warn!(
                update_id = %record.id,
                update_type = %record.update_type,
                error = %err,
                "flush/bad-payload"
            );
            None
        }
    }
}
