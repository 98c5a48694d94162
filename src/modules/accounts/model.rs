use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activation state of an account, derived from the `enabled` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    PendingConfirmation,
    Active,
}

/// A registered user together with its credentials and activation state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    pub email: String, // Stored exactly as submitted, lookups are case-sensitive
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>, // Encoded PBKDF2 hash, never plaintext
    pub enabled: bool,
    pub confirmation_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a disabled account waiting for confirmation of `token`
    pub fn pending(
        email: String,
        first_name: String,
        last_name: String,
        password_hash: Option<String>,
        token: String,
    ) -> Self {
        Self {
            email,
            first_name,
            last_name,
            password_hash,
            enabled: false,
            confirmation_token: Some(token),
            created_at: Utc::now(),
            activated_at: None,
        }
    }

    pub fn status(&self) -> AccountStatus {
        if self.enabled {
            AccountStatus::Active
        } else {
            AccountStatus::PendingConfirmation
        }
    }

    /// Set the password and enable the account.
    ///
    /// The confirmation token is only dropped when `clear_token` is set; by
    /// default it stays on the record after activation.
    pub fn activate(&mut self, password_hash: String, clear_token: bool) {
        self.password_hash = Some(password_hash);
        self.enabled = true;
        self.activated_at = Some(Utc::now());

        if clear_token {
            self.confirmation_token = None;
        }
    }
}
