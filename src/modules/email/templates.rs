use super::notifier::OutgoingEmail;

pub const CONFIRMATION_SUBJECT: &str = "Registration Confirmation";

/// Link the user follows to confirm the address, e.g. `https://host/confirm?token=...`
pub fn confirmation_link(app_url: &str, token: &str) -> String {
    format!("{}/confirm?token={}", app_url.trim_end_matches('/'), token)
}

// Build the confirmation message sent right after registration
// Parameters:
// - from: Sender address configured for the application
// - to: The address that registered
// - app_url: Scheme and host the registration request came in on
// - token: The account's confirmation token
pub fn registration_confirmation(from: &str, to: &str, app_url: &str, token: &str) -> OutgoingEmail {
    let body = format!(
        "To confirm your e-mail address, please click the link below:\n{}",
        confirmation_link(app_url, token)
    );

    OutgoingEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject: CONFIRMATION_SUBJECT.to_string(),
        body,
    }
}
