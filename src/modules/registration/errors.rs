use thiserror::Error;

use super::validation::ValidationErrors;
use crate::modules::accounts::StoreError;
use crate::modules::email::NotifyError;

pub const ALREADY_REGISTERED_MESSAGE: &str =
    "Oops!  There is already a user registered with the email provided.";
pub const INVALID_TOKEN_MESSAGE: &str = "Oops!  This is an invalid confirmation link.";
pub const WEAK_PASSWORD_MESSAGE: &str = "Your password is too weak.  Choose a stronger one.";
pub const VALIDATION_MESSAGE: &str = "Please correct the errors below.";

/// Failures of the registration workflow.
///
/// The first four are expected outcomes of user input and are shown back on
/// the form; `Store` and `Notify` are infrastructure failures.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("an account is already registered for {email}")]
    DuplicateAccount { email: String },
    #[error("registration form failed validation ({} errors)", .errors.len())]
    ValidationFailed {
        errors: ValidationErrors,
        // The email is also taken; surfaced alongside the field errors
        duplicate: bool,
    },
    #[error("unknown confirmation token")]
    InvalidToken,
    #[error("password scored {score}, at least {required} required")]
    WeakPassword { score: u8, required: u8 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl RegistrationError {
    /// Whether the error came from user input rather than infrastructure
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            RegistrationError::Store(_) | RegistrationError::Notify(_)
        )
    }

    /// Text shown to the user for this error
    pub fn user_message(&self) -> &'static str {
        match self {
            RegistrationError::DuplicateAccount { .. } => ALREADY_REGISTERED_MESSAGE,
            RegistrationError::ValidationFailed { .. } => VALIDATION_MESSAGE,
            RegistrationError::InvalidToken => INVALID_TOKEN_MESSAGE,
            RegistrationError::WeakPassword { .. } => WEAK_PASSWORD_MESSAGE,
            RegistrationError::Store(_) | RegistrationError::Notify(_) => {
                "Something went wrong on our side. Please try again later."
            }
        }
    }
}
