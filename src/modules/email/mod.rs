pub mod notifier;
pub mod smtp;
mod templates;

pub use notifier::{LogNotifier, Notifier, NotifyError, Outbox, OutgoingEmail};
pub use smtp::{SmtpNotifier, SmtpSettings, TlsMode};
pub use templates::{confirmation_link, registration_confirmation, CONFIRMATION_SUBJECT};
