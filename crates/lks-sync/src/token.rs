//! Credential id derivation.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use lks_db::CredentialId;
use lks_rpc::Credential;

/// First 16 bytes of SHA-256(secret), hex encoded.
pub fn credential_id(cred: &Credential) -> CredentialId {
    let digest = Sha256::digest(cred.secret().as_bytes());
    CredentialId::new(hex::encode(&digest[..16]))
}

/// Per-process memo of secret -> id.
#[derive(Default)]
pub struct CredentialIds {
    cache: Mutex<HashMap<Credential, CredentialId>>,
}

impl CredentialIds {
    pub fn get(&self, cred: &Credential) -> CredentialId {
        // a poisoned cache only loses memoization
        match self.cache.lock() {
            Ok(mut cache) => cache
                .entry(cred.clone())
                .or_insert_with(|| credential_id(cred))
                .clone(),
            Err(_) => credential_id(cred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_32_hex_chars_and_stable() {
        let cred = Credential::new("abc");
        let id = credential_id(&cred);
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(id.as_str(), "ba7816bf8f01cfea414140de5dae2223");
        assert_eq!(CredentialIds::default().get(&cred), id);
    }

    #[test]
    fn different_secrets_differ() {
        assert_ne!(
            credential_id(&Credential::new("a")),
            credential_id(&Credential::new("b"))
        );
    }
}
