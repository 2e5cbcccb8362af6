//! Handler registrations and the per-handler governed-lock cache.
//!
//! Exclusive registrations are keyed by `(lock id, credential id)`, shared
//! ones by `(shared-group id, credential id)`. A keyholder-role lock that
//! belongs to a shared group resolves only through the shared map.

use std::collections::BTreeMap;
use std::sync::Arc;

use lks_db::CredentialId;
use lks_schemas::Lock;

use crate::handler::{HandlerKey, LockHandler};

type RegKey = (String, CredentialId);

#[derive(Default)]
pub struct HandlerRegistry {
    exclusive: BTreeMap<RegKey, Arc<dyn LockHandler>>,
    shared: BTreeMap<RegKey, Arc<dyn LockHandler>>,
    governed: BTreeMap<HandlerKey, Vec<Lock>>,
}

pub fn key_of(handler: &dyn LockHandler, cred: &CredentialId) -> HandlerKey {
    HandlerKey::new(handler.name(), cred.clone())
}

impl HandlerRegistry {
    pub fn register_exclusive(
        &mut self,
        lock_id: &str,
        cred: &CredentialId,
        handler: Arc<dyn LockHandler>,
    ) {
        self.invalidate(&key_of(handler.as_ref(), cred));
        if let Some(old) = self
            .exclusive
            .insert((lock_id.to_string(), cred.clone()), handler)
        {
            self.invalidate(&key_of(old.as_ref(), cred));
        }
    }

    pub fn register_shared(
        &mut self,
        shared_lock_id: &str,
        cred: &CredentialId,
        handler: Arc<dyn LockHandler>,
    ) {
        self.invalidate(&key_of(handler.as_ref(), cred));
        if let Some(old) = self
            .shared
            .insert((shared_lock_id.to_string(), cred.clone()), handler)
        {
            self.invalidate(&key_of(old.as_ref(), cred));
        }
    }

    pub fn unregister_exclusive(
        &mut self,
        lock_id: &str,
        cred: &CredentialId,
    ) -> Option<Arc<dyn LockHandler>> {
        let old = self.exclusive.remove(&(lock_id.to_string(), cred.clone()))?;
        self.invalidate(&key_of(old.as_ref(), cred));
        Some(old)
    }

    pub fn unregister_shared(
        &mut self,
        shared_lock_id: &str,
        cred: &CredentialId,
    ) -> Option<Arc<dyn LockHandler>> {
        let old = self.shared.remove(&(shared_lock_id.to_string(), cred.clone()))?;
        self.invalidate(&key_of(old.as_ref(), cred));
        Some(old)
    }

    pub fn resolve(&self, lock: &Lock, cred: &CredentialId) -> Option<Arc<dyn LockHandler>> {
        match lock.shared_lock_id() {
            Some(shared_id) if lock.is_keyholder() => {
                self.shared.get(&(shared_id.to_string(), cred.clone())).cloned()
            }
            _ => self.exclusive.get(&(lock.id.clone(), cred.clone())).cloned(),
        }
    }

    /// Distinct handlers registered for a credential, shared ones first.
    pub fn handlers(&self, cred: &CredentialId) -> Vec<(HandlerKey, Arc<dyn LockHandler>)> {
        let mut out: Vec<(HandlerKey, Arc<dyn LockHandler>)> = Vec::new();
        for ((_, c), h) in self.shared.iter().chain(self.exclusive.iter()) {
            if c != cred {
                continue;
            }
            let key = key_of(h.as_ref(), c);
            if !out.iter().any(|(k, _)| *k == key) {
                out.push((key, Arc::clone(h)));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.exclusive.is_empty() && self.shared.is_empty()
    }

    // -- Governed-lock cache ------------------------------------------------

    pub fn governed(&self, key: &HandlerKey) -> Option<&[Lock]> {
        self.governed.get(key).map(Vec::as_slice)
    }

    pub fn set_governed(&mut self, key: HandlerKey, locks: Vec<Lock>) {
        self.governed.insert(key, locks);
    }

    pub fn invalidate(&mut self, key: &HandlerKey) {
        self.governed.remove(key);
    }

    pub fn invalidate_credential(&mut self, cred: &CredentialId) {
        self.governed.retain(|k, _| k.credential_id != *cred);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl LockHandler for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn lock(id: &str, role: &str, shared: Option<&str>) -> Lock {
        let mut v = json!({
            "_id": id,
            "status": "locked",
            "role": role,
            "startDate": "2024-01-01T00:00:00Z",
            "user": { "_id": "u1" }
        });
        if let Some(s) = shared {
            v["sharedLock"] = json!({ "_id": s });
        }
        serde_json::from_value(v).unwrap()
    }

    fn cred() -> CredentialId {
        CredentialId::new("c1")
    }

    #[test]
    fn shared_keyholder_locks_resolve_only_through_the_shared_map() {
        let mut reg = HandlerRegistry::default();
        reg.register_exclusive("l1", &cred(), Arc::new(Named("solo")));
        reg.register_shared("s1", &cred(), Arc::new(Named("group")));

        let kh = lock("l1", "keyholder", Some("s1"));
        assert_eq!(reg.resolve(&kh, &cred()).map(|h| h.name().to_string()), Some("group".into()));

        // wearer side ignores the shared reference
        let wearer = lock("l1", "wearer", Some("s1"));
        assert_eq!(
            reg.resolve(&wearer, &cred()).map(|h| h.name().to_string()),
            Some("solo".into())
        );

        let orphan = lock("l2", "keyholder", Some("s2"));
        assert!(reg.resolve(&orphan, &cred()).is_none());
        assert!(reg.resolve(&kh, &CredentialId::new("other")).is_none());
    }

    #[test]
    fn same_handler_twice_is_listed_once() {
        let mut reg = HandlerRegistry::default();
        let h: Arc<dyn LockHandler> = Arc::new(Named("bot"));
        reg.register_exclusive("l1", &cred(), Arc::clone(&h));
        reg.register_exclusive("l2", &cred(), Arc::clone(&h));
        assert_eq!(reg.handlers(&cred()).len(), 1);

        reg.unregister_exclusive("l1", &cred());
        assert_eq!(reg.handlers(&cred()).len(), 1);
        reg.unregister_exclusive("l2", &cred());
        assert!(reg.is_empty());
    }

    #[test]
    fn registration_invalidates_the_governed_cache() {
        let mut reg = HandlerRegistry::default();
        let key = HandlerKey::new("bot", cred());
        reg.set_governed(key.clone(), vec![lock("l1", "wearer", None)]);
        assert!(reg.governed(&key).is_some());

        reg.register_exclusive("l9", &cred(), Arc::new(Named("bot")));
        assert!(reg.governed(&key).is_none());
    }
}
