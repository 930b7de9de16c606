//! User accounts and the credential book.
//!
//! Names map to an optional sha-256 password hash. Two accounts always
//! exist: the superuser, which bypasses every permission check, and
//! the guest account the environment boots into. Plaintext passwords
//! never leave the call that hashes them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Name of the account that bypasses permission checks.
pub const SUPERUSER: &str = "root";

/// Name of the passwordless account the environment boots into.
pub const GUEST: &str = "guest";

/// Home directory assigned to an account at registration.
pub fn home_dir(user: &str) -> String {
    format!("/home/{user}")
}

/// Lowercase hex sha-256 of a plaintext password.
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Account-name policy: starts with a letter, then letters, digits,
/// `_` or `-`, at most 32 characters.
pub fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && name.len() <= 32
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// One account's stored credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credential {
    pub password_hash: Option<String>,
}

/// Every registered account. This is the persisted credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialBook {
    pub users: BTreeMap<String, Credential>,
}

impl Default for CredentialBook {
    fn default() -> Self {
        let mut users = BTreeMap::new();
        users.insert(SUPERUSER.to_string(), Credential::default());
        users.insert(GUEST.to_string(), Credential::default());
        CredentialBook { users }
    }
}

/// Accounts plus the identity every operation runs as.
pub struct UserManager {
    state: RwLock<Inner>,
}

struct Inner {
    book: CredentialBook,
    current: String,
}

impl Default for UserManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UserManager {
    /// Fresh manager: superuser and guest registered, guest active.
    pub fn new() -> UserManager {
        UserManager {
            state: RwLock::new(Inner {
                book: CredentialBook::default(),
                current: GUEST.to_string(),
            }),
        }
    }

    /// The user every submitted line currently runs as.
    pub fn current(&self) -> String {
        self.state.read().unwrap().current.clone()
    }

    pub(crate) fn set_current(&self, name: &str) {
        self.state.write().unwrap().current = name.to_string();
    }

    pub fn exists(&self, name: &str) -> bool {
        self.state.read().unwrap().book.users.contains_key(name)
    }

    /// All account names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.state.read().unwrap().book.users.keys().cloned().collect()
    }

    /// Add an account with no password. `false` when the name is taken.
    pub fn register(&self, name: &str) -> bool {
        let mut state = self.state.write().unwrap();
        if state.book.users.contains_key(name) {
            return false;
        }
        state.book.users.insert(name.to_string(), Credential::default());
        true
    }

    /// Drop an account. `false` when it was not registered.
    pub fn remove(&self, name: &str) -> bool {
        self.state.write().unwrap().book.users.remove(name).is_some()
    }

    pub fn has_password(&self, name: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .book
            .users
            .get(name)
            .is_some_and(|c| c.password_hash.is_some())
    }

    /// Check a plaintext password against the stored hash. Accounts
    /// without a password accept only the empty string.
    pub fn verify(&self, name: &str, password: &str) -> bool {
        let state = self.state.read().unwrap();
        match state.book.users.get(name) {
            Some(Credential {
                password_hash: Some(hash),
            }) => *hash == hash_password(password),
            Some(Credential { password_hash: None }) => password.is_empty(),
            None => false,
        }
    }

    /// Set or clear an account's password. `false` for unknown names.
    pub fn set_password(&self, name: &str, password: Option<&str>) -> bool {
        let mut state = self.state.write().unwrap();
        match state.book.users.get_mut(name) {
            Some(credential) => {
                credential.password_hash = password.map(hash_password);
                true
            }
            None => false,
        }
    }

    /// Clone of the book, for persisting.
    pub fn export(&self) -> CredentialBook {
        self.state.read().unwrap().book.clone()
    }

    /// Replace the book from a persisted record. The superuser and
    /// guest accounts are re-added if the record lost them; the
    /// current identity is untouched.
    pub fn import(&self, mut book: CredentialBook) {
        book.users.entry(SUPERUSER.to_string()).or_default();
        book.users.entry(GUEST.to_string()).or_default();
        self.state.write().unwrap().book = book;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        // Well-known digest of the empty string.
        assert_eq!(
            hash_password(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(hash_password("a"), hash_password("b"));
    }

    #[test]
    fn verify_distinguishes_passwordless_accounts() {
        let users = UserManager::new();
        assert!(users.verify(GUEST, ""));
        assert!(!users.verify(GUEST, "anything"));
        users.set_password(GUEST, Some("secret"));
        assert!(users.verify(GUEST, "secret"));
        assert!(!users.verify(GUEST, "wrong"));
        assert!(!users.verify("nobody", ""));
    }

    #[test]
    fn register_and_remove() {
        let users = UserManager::new();
        assert!(users.register("alice"));
        assert!(!users.register("alice"));
        assert_eq!(users.names(), vec!["alice", "guest", "root"]);
        assert!(users.remove("alice"));
        assert!(!users.remove("alice"));
    }

    #[test]
    fn import_restores_required_accounts() {
        let users = UserManager::new();
        users.import(CredentialBook {
            users: BTreeMap::new(),
        });
        assert!(users.exists(SUPERUSER));
        assert!(users.exists(GUEST));
    }

    #[test]
    fn name_policy() {
        assert!(valid_name("alice"));
        assert!(valid_name("a-b_c9"));
        assert!(!valid_name(""));
        assert!(!valid_name("9lives"));
        assert!(!valid_name("has space"));
        assert!(!valid_name(&"x".repeat(33)));
    }
}
