use std::sync::Arc;

use log::{debug, warn};

use super::errors::RegistrationError;
use super::validation::{validate, RegistrationForm};
use crate::modules::accounts::{Account, AccountStore, StoreError, UniqueField};
use crate::modules::auth::{
    looks_like_token, PasswordEncoder, StrengthChecker, TokenGenerator, UuidTokenGenerator,
};
use crate::modules::email::{registration_confirmation, Notifier};
use crate::modules::utils::logging::log_registration_event;
use crate::MIN_PASSWORD_SCORE;

/// Attempts at drawing a confirmation token the store has not seen yet
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Knobs of the workflow that come from configuration
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub sender: String,
    pub clear_token_on_activation: bool,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            sender: "noreply@domain.com".to_string(),
            clear_token_on_activation: false,
        }
    }
}

/// Successful registration; the token itself is only ever sent by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub email: String,
}

impl RegistrationReceipt {
    pub fn message(&self) -> String {
        format!("A confirmation e-mail has been sent to {}", self.email)
    }
}

/// Token to carry into the set-password form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub email: String,
}

impl Activation {
    pub fn message(&self) -> &'static str {
        "Your password has been set!"
    }
}

/// Registration and confirmation state transitions for accounts.
///
/// Every collaborator is handed in at construction; the service itself holds
/// no mutable state and can be shared across request handlers.
pub struct RegistrationService {
    store: Arc<dyn AccountStore>,
    notifier: Arc<dyn Notifier>,
    strength: Arc<dyn StrengthChecker>,
    tokens: Box<dyn TokenGenerator>,
    encoder: PasswordEncoder,
    settings: RegistrationSettings,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
        strength: Arc<dyn StrengthChecker>,
        encoder: PasswordEncoder,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            strength,
            tokens: Box::new(UuidTokenGenerator),
            encoder,
            settings,
        }
    }

    /// Replace the default UUID token source
    pub fn with_token_generator(mut self, tokens: impl TokenGenerator + 'static) -> Self {
        self.tokens = Box::new(tokens);
        self
    }

    pub fn encoder(&self) -> &PasswordEncoder {
        &self.encoder
    }

    /// Create a disabled account for `form` and email it a confirmation link
    /// rooted at `app_url` (scheme and host of the incoming request).
    pub fn begin_registration(
        &self,
        form: &RegistrationForm,
        app_url: &str,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        let errors = validate(form);
        let existing = self.store.find_by_email(&form.email)?;

        if !errors.is_empty() {
            log_registration_event("register", &form.email, false, Some("validation failed"));
            return Err(RegistrationError::ValidationFailed {
                errors,
                duplicate: existing.is_some(),
            });
        }

        if existing.is_some() {
            log_registration_event("register", &form.email, false, Some("already registered"));
            return Err(RegistrationError::DuplicateAccount {
                email: form.email.clone(),
            });
        }

        let password_hash = form.supplied_password().map(|p| self.encoder.encode(p));
        let token = self.insert_pending(form, password_hash)?;

        let email = registration_confirmation(&self.settings.sender, &form.email, app_url, &token);
        self.notifier.send(&email)?;

        log_registration_event("register", &form.email, true, Some("confirmation sent"));
        Ok(RegistrationReceipt {
            email: form.email.clone(),
        })
    }

    /// Insert the pending account, drawing a new token if the store reports a clash
    fn insert_pending(
        &self,
        form: &RegistrationForm,
        password_hash: Option<String>,
    ) -> Result<String, RegistrationError> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = self.tokens.generate();
            let account = Account::pending(
                form.email.clone(),
                form.first_name.trim().to_string(),
                form.last_name.trim().to_string(),
                password_hash.clone(),
                token.clone(),
            );

            match self.store.insert(account) {
                Ok(()) => return Ok(token),
                // Lost a race against a concurrent registration for the same address
                Err(StoreError::Conflict(UniqueField::Email)) => {
                    log_registration_event("register", &form.email, false, Some("insert conflict"));
                    return Err(RegistrationError::DuplicateAccount {
                        email: form.email.clone(),
                    });
                }
                Err(StoreError::Conflict(UniqueField::ConfirmationToken)) => {
                    warn!(
                        "Confirmation token collision (attempt {}/{})",
                        attempt, MAX_TOKEN_ATTEMPTS
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Conflict(UniqueField::ConfirmationToken).into())
    }

    /// Resolve the token from a confirmation link
    pub fn confirmation_prompt(&self, token: &str) -> Result<ConfirmationPrompt, RegistrationError> {
        let account = self.account_for_token(token)?;
        debug!("Confirmation link opened for account in state {:?}", account.status());

        Ok(ConfirmationPrompt {
            token: token.to_string(),
        })
    }

    /// Set the password for the account owning `token` and enable it.
    ///
    /// Strength is checked before the token is looked up; a weak password or an
    /// unknown token leaves every account untouched.
    pub fn complete_confirmation(
        &self,
        token: &str,
        password: &str,
    ) -> Result<Activation, RegistrationError> {
        let strength = self.strength.measure(password);
        if strength.score < MIN_PASSWORD_SCORE {
            debug!("Rejected password: {:?}", strength.feedback);
            return Err(RegistrationError::WeakPassword {
                score: strength.score,
                required: MIN_PASSWORD_SCORE,
            });
        }

        let mut account = self.account_for_token(token)?;
        debug!("Activating account in state {:?}", account.status());
        account.activate(
            self.encoder.encode(password),
            self.settings.clear_token_on_activation,
        );
        self.store.update(&account)?;

        log_registration_event("confirm", &account.email, true, Some("account enabled"));
        Ok(Activation {
            email: account.email,
        })
    }

    fn account_for_token(&self, token: &str) -> Result<Account, RegistrationError> {
        if !looks_like_token(token) {
            return Err(RegistrationError::InvalidToken);
        }

        self.store
            .find_by_confirmation_token(token)?
            .ok_or(RegistrationError::InvalidToken)
    }
}
