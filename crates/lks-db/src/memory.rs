//! Deterministic in-process [`Repository`].
//!
//! All state sits behind one mutex, so every operation is atomic. Insertion
//! order is tracked with a sequence number to break `created_at` ties, which
//! keeps ordering stable when several rows share a timestamp.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::repository::Repository;
use crate::rows::{CredentialId, HistoryEntry, LockUpdate, Snapshot, UpdateType};

#[derive(Default)]
struct State {
    seq: u64,
    snapshots: BTreeMap<(String, CredentialId), Snapshot>,
    history: BTreeMap<(CredentialId, String), (u64, HistoryEntry)>,
    updates: BTreeMap<Uuid, (u64, LockUpdate)>,
    share_links: HashMap<String, String>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn updates_for<'a>(
        &'a self,
        lock_id: &'a str,
        cred: &'a CredentialId,
    ) -> impl Iterator<Item = &'a (u64, LockUpdate)> + 'a {
        self.updates
            .values()
            .filter(move |(_, u)| u.lock_id == lock_id && &u.credential_id == cred)
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory repository mutex poisoned"))
    }

    /// Every pending update, oldest first. Inspection helper.
    pub fn all_updates(&self) -> Result<Vec<LockUpdate>> {
        let st = self.state()?;
        let mut rows: Vec<&(u64, LockUpdate)> = st.updates.values().collect();
        rows.sort_by_key(|(seq, u)| (u.created_at, *seq));
        Ok(rows.into_iter().map(|(_, u)| u.clone()).collect())
    }

    /// Every stored history entry, oldest first. Inspection helper.
    pub fn all_history(&self) -> Result<Vec<HistoryEntry>> {
        let st = self.state()?;
        let mut rows: Vec<&(u64, HistoryEntry)> = st.history.values().collect();
        rows.sort_by_key(|(seq, h)| (h.created_at, *seq));
        Ok(rows.into_iter().map(|(_, h)| h.clone()).collect())
    }
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    async fn snapshot(&self, lock_id: &str, cred: &CredentialId) -> Result<Option<Snapshot>> {
        let st = self.state()?;
        Ok(st.snapshots.get(&(lock_id.to_string(), cred.clone())).cloned())
    }

    async fn active_snapshots(
        &self,
        cred: &CredentialId,
        shared_lock_ids: Option<&[String]>,
    ) -> Result<Vec<Snapshot>> {
        let st = self.state()?;
        Ok(st
            .snapshots
            .values()
            .filter(|s| &s.credential_id == cred && s.is_active)
            .filter(|s| match shared_lock_ids {
                None => true,
                Some(ids) => s
                    .lock
                    .shared_lock_id()
                    .map(|id| ids.iter().any(|x| x == id))
                    .unwrap_or(false),
            })
            .cloned()
            .collect())
    }

    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let mut st = self.state()?;
        st.snapshots.insert(
            (snapshot.lock_id.clone(), snapshot.credential_id.clone()),
            snapshot.clone(),
        );
        Ok(())
    }

    async fn mark_snapshot_inactive(&self, lock_id: &str, cred: &CredentialId) -> Result<()> {
        let mut st = self.state()?;
        if let Some(s) = st.snapshots.get_mut(&(lock_id.to_string(), cred.clone())) {
            s.is_active = false;
        }
        Ok(())
    }

    async fn most_recent_history_id(
        &self,
        lock_id: &str,
        cred: &CredentialId,
    ) -> Result<Option<String>> {
        let st = self.state()?;
        Ok(st
            .history
            .values()
            .filter(|(_, h)| h.lock_id == lock_id && &h.credential_id == cred)
            .max_by_key(|(seq, h)| (h.created_at, *seq))
            .map(|(_, h)| h.id.clone()))
    }

    async fn unprocessed_history(&self, cred: &CredentialId) -> Result<Vec<HistoryEntry>> {
        let st = self.state()?;
        let mut rows: Vec<&(u64, HistoryEntry)> = st
            .history
            .values()
            .filter(|(_, h)| &h.credential_id == cred && !h.processed)
            .collect();
        rows.sort_by_key(|(seq, h)| (h.created_at, *seq));
        Ok(rows.into_iter().map(|(_, h)| h.clone()).collect())
    }

    async fn has_unprocessed_history(&self, lock_id: &str, cred: &CredentialId) -> Result<bool> {
        let st = self.state()?;
        Ok(st
            .history
            .values()
            .any(|(_, h)| h.lock_id == lock_id && &h.credential_id == cred && !h.processed))
    }

    async fn insert_history(&self, entries: &[HistoryEntry]) -> Result<usize> {
        let mut st = self.state()?;
        let mut inserted = 0;
        for e in entries {
            let key = (e.credential_id.clone(), e.id.clone());
            if st.history.contains_key(&key) {
                continue;
            }
            let seq = st.next_seq();
            st.history.insert(key, (seq, e.clone()));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn mark_history_processed(&self, id: &str, cred: &CredentialId) -> Result<()> {
        let mut st = self.state()?;
        if let Some((_, h)) = st.history.get_mut(&(cred.clone(), id.to_string())) {
            h.processed = true;
        }
        Ok(())
    }

    async fn update(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<Option<LockUpdate>> {
        let st = self.state()?;
        Ok(st
            .updates_for(lock_id, cred)
            .filter(|(_, u)| u.update_type == update_type)
            .max_by_key(|(seq, u)| (u.created_at, *seq))
            .map(|(_, u)| u.clone()))
    }

    async fn pending_updates(&self, cred: &CredentialId) -> Result<Vec<LockUpdate>> {
        let st = self.state()?;
        let mut rows: Vec<&(u64, LockUpdate)> = st
            .updates
            .values()
            .filter(|(_, u)| &u.credential_id == cred)
            .collect();
        rows.sort_by_key(|(seq, u)| (u.created_at, *seq));
        Ok(rows.into_iter().map(|(_, u)| u.clone()).collect())
    }

    async fn insert_update(&self, update: &LockUpdate) -> Result<()> {
        let mut st = self.state()?;
        if st.updates.contains_key(&update.id) {
            return Err(anyhow!("duplicate update id {}", update.id));
        }
        let seq = st.next_seq();
        st.updates.insert(update.id, (seq, update.clone()));
        Ok(())
    }

    async fn upsert_update(&self, update: &LockUpdate) -> Result<()> {
        let mut st = self.state()?;
        let seq = match st.updates.get(&update.id) {
            Some((seq, _)) => *seq,
            None => st.next_seq(),
        };
        st.updates.insert(update.id, (seq, update.clone()));
        Ok(())
    }

    async fn delete_update(&self, id: Uuid) -> Result<()> {
        let mut st = self.state()?;
        st.updates.remove(&id);
        Ok(())
    }

    async fn delete_updates_of_type(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<()> {
        let mut st = self.state()?;
        st.updates.retain(|_, (_, u)| {
            !(u.lock_id == lock_id && &u.credential_id == cred && u.update_type == update_type)
        });
        Ok(())
    }

    async fn delete_all_updates(&self, lock_id: &str, cred: &CredentialId) -> Result<()> {
        let mut st = self.state()?;
        st.updates
            .retain(|_, (_, u)| !(u.lock_id == lock_id && &u.credential_id == cred));
        Ok(())
    }

    async fn share_link(&self, lock_id: &str) -> Result<Option<String>> {
        let st = self.state()?;
        Ok(st.share_links.get(lock_id).cloned())
    }

    async fn upsert_share_link(&self, lock_id: &str, link: &str) -> Result<()> {
        let mut st = self.state()?;
        st.share_links.insert(lock_id.to_string(), link.to_string());
        Ok(())
    }

    async fn delete_share_link(&self, lock_id: &str) -> Result<()> {
        let mut st = self.state()?;
        st.share_links.remove(lock_id);
        Ok(())
    }
}
