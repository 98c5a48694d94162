use serde::Deserialize;

use crate::modules::utils::io::is_valid_email;

/// Fields submitted by the registration form
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

impl RegistrationForm {
    /// The password, if the user typed one. Browsers submit empty inputs as "".
    pub fn supplied_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// A message attached to a single form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message recorded for `field`
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Check the form's own constraints. Whether the email is already taken is
/// decided by the workflow, not here.
pub fn validate(form: &RegistrationForm) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if form.email.is_empty() {
        errors.add("email", "Please enter your e-mail address.");
    } else if !is_valid_email(&form.email) {
        errors.add("email", "Please provide a valid e-mail address.");
    }

    if form.first_name.trim().is_empty() {
        errors.add("first_name", "Please provide your first name.");
    }
    if form.last_name.trim().is_empty() {
        errors.add("last_name", "Please provide your last name.");
    }

    if let Some(password) = form.supplied_password() {
        if password.trim().is_empty() {
            errors.add("password", "Password cannot be blank.");
        }
    }

    errors
}
