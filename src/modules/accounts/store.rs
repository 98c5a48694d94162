use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Account;

/// Column carrying a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    ConfirmationToken,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Email => write!(f, "email"),
            UniqueField::ConfirmationToken => write!(f, "confirmation token"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with the same {0} already exists")]
    Conflict(UniqueField),
    #[error("no account registered for {0}")]
    NotFound(String),
    #[error("account store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("account store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("account store lock poisoned")]
    Poisoned,
}

/// Persistence boundary for accounts.
///
/// `insert` is an atomic insert-if-absent: implementations must reject a
/// duplicate email or confirmation token with [`StoreError::Conflict`]
/// instead of relying on a prior lookup.
pub trait AccountStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    fn find_by_confirmation_token(&self, token: &str) -> Result<Option<Account>, StoreError>;

    fn insert(&self, account: Account) -> Result<(), StoreError>;

    /// Replace the stored record with the same email
    fn update(&self, account: &Account) -> Result<(), StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

/// Accounts keyed by email with a secondary index on confirmation tokens
#[derive(Serialize, Deserialize, Default, Clone)]
struct AccountTable {
    accounts: HashMap<String, Account>,
    #[serde(skip)]
    tokens: HashMap<String, String>, // token -> email
}

impl AccountTable {
    fn rebuild_token_index(&mut self) {
        self.tokens = self
            .accounts
            .values()
            .filter_map(|a| {
                a.confirmation_token
                    .as_ref()
                    .map(|t| (t.clone(), a.email.clone()))
            })
            .collect();
    }

    fn by_token(&self, token: &str) -> Option<&Account> {
        self.tokens
            .get(token)
            .and_then(|email| self.accounts.get(email))
    }

    fn insert(&mut self, account: Account) -> Result<(), StoreError> {
        // Check email first so a lost registration race reads as a duplicate
        if self.accounts.contains_key(&account.email) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }
        if let Some(token) = &account.confirmation_token {
            if self.tokens.contains_key(token) {
                return Err(StoreError::Conflict(UniqueField::ConfirmationToken));
            }
            self.tokens.insert(token.clone(), account.email.clone()); // Index before the move below
        }
        self.accounts.insert(account.email.clone(), account);
        Ok(())
    }

    fn update(&mut self, account: &Account) -> Result<(), StoreError> {
        let previous_token = match self.accounts.get(&account.email) {
            Some(existing) => existing.confirmation_token.clone(),
            None => return Err(StoreError::NotFound(account.email.clone())),
        };

        // A token may only move onto an account if nobody else holds it
        if let Some(token) = &account.confirmation_token {
            if matches!(self.tokens.get(token), Some(owner) if owner != &account.email) {
                return Err(StoreError::Conflict(UniqueField::ConfirmationToken));
            }
        }

        if let Some(old) = previous_token {
            self.tokens.remove(&old); // Cleared or replaced tokens stop resolving
        }
        if let Some(token) = &account.confirmation_token {
            self.tokens.insert(token.clone(), account.email.clone());
        }
        self.accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }
}

/// Account store backed by a JSON file, or held purely in memory.
///
/// Every mutation is applied to a copy of the table, written out, and only
/// then swapped in, so a failed write leaves the in-memory state untouched.
pub struct JsonAccountStore {
    path: Option<PathBuf>,
    table: Mutex<AccountTable>,
}

impl JsonAccountStore {
    /// Create a store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: Mutex::new(AccountTable::default()),
        }
    }

    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let mut table = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => AccountTable::default(),
            Ok(bytes) => serde_json::from_slice::<AccountTable>(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => AccountTable::default(),
            Err(e) => return Err(e.into()),
        };
        table.rebuild_token_index();

        info!(
            "Opened account store at {} ({} accounts)",
            path.display(),
            table.accounts.len()
        );

        Ok(Self {
            path: Some(path),
            table: Mutex::new(table),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, AccountTable>, StoreError> {
        self.table.lock().map_err(|_| StoreError::Poisoned)
    }

    fn mutate<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut AccountTable) -> Result<(), StoreError>,
    {
        let mut guard = self.lock()?; // Held across the write so mutations stay ordered
        let mut next = guard.clone();
        apply(&mut next)?;

        if let Some(path) = &self.path {
            persist(path, &next)?;
        }

        *guard = next; // Only swap in once the file is on disk
        Ok(())
    }
}

/// Write the table next to its final location and rename it into place
fn persist(path: &Path, table: &AccountTable) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(table)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    // Write to a sibling file and rename it over the old one
    let mut file = fs::File::create(&staging)?;
    file.write_all(&data)?;
    file.sync_all()?;
    fs::rename(&staging, path)?;

    debug!("Persisted {} accounts to {}", table.accounts.len(), path.display());
    Ok(())
}

impl AccountStore for JsonAccountStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.accounts.get(email).cloned())
    }

    fn find_by_confirmation_token(&self, token: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.by_token(token).cloned())
    }

    fn insert(&self, account: Account) -> Result<(), StoreError> {
        self.mutate(|table| table.insert(account))
    }

    fn update(&self, account: &Account) -> Result<(), StoreError> {
        self.mutate(|table| table.update(account))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.accounts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account(email: &str, token: &str) -> Account {
        Account::pending(
            email.to_string(),
            "Test".to_string(),
            "User".to_string(),
            None,
            token.to_string(),
        )
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = JsonAccountStore::in_memory();
        store.insert(account("a@x.com", "tok-a")).unwrap();

        let by_email = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(by_email.confirmation_token.as_deref(), Some("tok-a"));

        let by_token = store.find_by_confirmation_token("tok-a").unwrap().unwrap();
        assert_eq!(by_token.email, "a@x.com");

        assert!(store.find_by_email("b@x.com").unwrap().is_none());
        assert!(store.find_by_confirmation_token("zzz").unwrap().is_none());
    }

    #[test]
    fn test_email_lookup_is_case_sensitive() {
        let store = JsonAccountStore::in_memory();
        store.insert(account("a@x.com", "tok-a")).unwrap();

        assert!(store.find_by_email("A@X.COM").unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let store = JsonAccountStore::in_memory();
        store.insert(account("a@x.com", "tok-a")).unwrap();

        assert!(matches!(
            store.insert(account("a@x.com", "tok-b")),
            Err(StoreError::Conflict(UniqueField::Email))
        ));
        assert!(matches!(
            store.insert(account("b@x.com", "tok-a")),
            Err(StoreError::Conflict(UniqueField::ConfirmationToken))
        ));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_update_reindexes_tokens() {
        let store = JsonAccountStore::in_memory();
        store.insert(account("a@x.com", "tok-a")).unwrap();

        let mut stored = store.find_by_email("a@x.com").unwrap().unwrap();
        stored.activate("hash".to_string(), true);
        store.update(&stored).unwrap();

        assert!(store.find_by_confirmation_token("tok-a").unwrap().is_none());
        let reloaded = store.find_by_email("a@x.com").unwrap().unwrap();
        assert!(reloaded.enabled);
    }

    #[test]
    fn test_update_unknown_account() {
        let store = JsonAccountStore::in_memory();
        let result = store.update(&account("ghost@x.com", "tok"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("accounts.json");

        {
            let store = JsonAccountStore::open(&path).unwrap();
            store.insert(account("a@x.com", "tok-a")).unwrap();
        }

        let reopened = JsonAccountStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(reopened
            .find_by_confirmation_token("tok-a")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.json");
        fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            JsonAccountStore::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }
}
