use std::sync::Mutex;

use log::info;
use thiserror::Error;

/// A plain-text message ready to be handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid {field} address {address:?}")]
    InvalidAddress {
        field: &'static str,
        address: String,
    },
    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("failed to send email: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("email rejected: {0}")]
    Rejected(String),
}

/// Outbound mail boundary. One call sends one message; retries are the
/// transport's business.
pub trait Notifier: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them (local development)
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        info!(
            "Outgoing email (not delivered)\nFrom: {}\nTo: {}\nSubject: {}\n\n{}",
            email.from, email.to, email.subject, email.body
        );
        Ok(())
    }
}

/// Keeps every message in memory; optionally rejects all sends
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<OutgoingEmail>>,
    reject_with: Option<String>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox whose every send fails with `reason`
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_with: Some(reason.into()),
        }
    }

    pub fn messages(&self) -> Vec<OutgoingEmail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for Outbox {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        if let Some(reason) = &self.reject_with {
            return Err(NotifyError::Rejected(reason.clone()));
        }

        let mut sent = match self.sent.lock() {
            Ok(sent) => sent,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push(email.clone());
        Ok(())
    }
}
