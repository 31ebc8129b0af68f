//! In-memory, role-tagged private key table for one session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use crate::crypto::PrivateKey;
use crate::error::{Error, Result};

/// The fixed set of authority roles a Steem account holds keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Owner,
    Active,
    Posting,
    Memo,
}

impl KeyRole {
    pub const ALL: [KeyRole; 4] = [KeyRole::Owner, KeyRole::Active, KeyRole::Posting, KeyRole::Memo];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Owner => "owner",
            KeyRole::Active => "active",
            KeyRole::Posting => "posting",
            KeyRole::Memo => "memo",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(KeyRole::Owner),
            "active" => Ok(KeyRole::Active),
            "posting" => Ok(KeyRole::Posting),
            "memo" => Ok(KeyRole::Memo),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// Holds at most one key per role. Safe to share between tasks.
#[derive(Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<KeyRole, PrivateKey>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a WIF key for `role`, replacing any key already held for it.
    ///
    /// The role is checked before the WIF is parsed.
    pub fn import(&self, role: &str, wif: &str) -> Result<()> {
        let role = KeyRole::from_str(role)?;
        self.import_role(role, wif)
    }

    pub fn import_role(&self, role: KeyRole, wif: &str) -> Result<()> {
        let key = PrivateKey::from_wif(wif)?;
        self.insert(role, key);
        Ok(())
    }

    pub fn insert(&self, role: KeyRole, key: PrivateKey) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(role, key);
    }

    pub fn get(&self, role: KeyRole) -> Result<PrivateKey> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.get(&role).cloned().ok_or(Error::KeyNotFound(role))
    }

    pub fn contains(&self, role: KeyRole) -> bool {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.contains_key(&role)
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        let mut roles: Vec<&KeyRole> = keys.keys().collect();
        roles.sort_by_key(|r| r.as_str());
        f.debug_struct("KeyStore").field("roles", &roles).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WIF_A: &str = "5JLw5dgQAx6rhZEgNN5C2ds1V47RweGshynFSWFbaMohsYsBvE8";
    const WIF_B: &str = "5JoQtsKQuH8hC9MyvfJAqo6qmKLm8ePYNucs7tPu2YxG12trzBt";

    #[test]
    fn test_import_and_get() {
        let store = KeyStore::new();
        store.import("posting", WIF_A).unwrap();

        let key = store.get(KeyRole::Posting).unwrap();
        assert_eq!(key.to_wif(), WIF_A);
        assert!(matches!(store.get(KeyRole::Active), Err(Error::KeyNotFound(KeyRole::Active))));
    }

    #[test]
    fn test_import_overwrites_role() {
        let store = KeyStore::new();
        store.import("active", WIF_A).unwrap();
        store.import("active", WIF_B).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(KeyRole::Active).unwrap().to_wif(), WIF_B);
    }

    #[test]
    fn test_unknown_role_fails_before_parsing() {
        let store = KeyStore::new();
        // An invalid WIF would produce InvalidKeyFormat; the role check must win.
        let err = store.import("admin", "not-a-wif").unwrap_err();
        assert!(matches!(err, Error::InvalidRole(ref r) if r == "admin"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_wif() {
        let store = KeyStore::new();
        assert!(matches!(store.import("memo", "invalid-key"), Err(Error::InvalidKeyFormat(_))));
        assert!(!store.contains(KeyRole::Memo));
    }

    #[test]
    fn test_role_parsing() {
        for role in KeyRole::ALL {
            assert_eq!(role.as_str().parse::<KeyRole>().unwrap(), role);
        }
        assert!("Owner".parse::<KeyRole>().is_err());
    }

    #[test]
    fn test_shared_across_threads() {
        let store = Arc::new(KeyStore::new());
        let handles: Vec<_> = ["owner", "active", "posting", "memo"]
            .into_iter()
            .map(|role| {
                let store = store.clone();
                std::thread::spawn(move || store.import(role, WIF_A).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_debug_lists_roles_only() {
        let store = KeyStore::new();
        store.import("posting", WIF_A).unwrap();
        let debug = format!("{:?}", store);
        assert!(debug.contains("Posting"));
        assert!(!debug.contains(WIF_A));
    }
}
