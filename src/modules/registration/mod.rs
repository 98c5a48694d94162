pub mod errors;
pub mod validation;
pub mod workflow;

pub use errors::RegistrationError;
pub use validation::{validate, FieldError, RegistrationForm, ValidationErrors};
pub use workflow::{
    Activation, ConfirmationPrompt, RegistrationReceipt, RegistrationService, RegistrationSettings,
};
