use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::notifier::{Notifier, NotifyError, OutgoingEmail};

/// How the connection to the SMTP server is secured
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS from the first byte (usually port 465)
    Wrapper,
    /// Plain connection upgraded with STARTTLS (usually port 587)
    #[default]
    Starttls,
    /// No encryption; only for local relays and mail catchers
    None,
}

/// SMTP server settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    // SMTP server hostname (e.g., smtp.gmail.com)
    pub host: String,
    pub port: u16,
    pub tls: TlsMode,
    // Username/password are optional; relays on localhost usually need none
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub pool_size: u32,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            tls: TlsMode::default(),
            username: None,
            password: None,
            timeout_secs: 10,
            pool_size: 4,
        }
    }
}

/// Delivers mail through an SMTP relay. The transport (and its connection
/// pool) is built once and shared by every send.
pub struct SmtpNotifier {
    mailer: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let builder = match settings.tls {
            TlsMode::Wrapper => SmtpTransport::relay(&settings.host)?,
            TlsMode::Starttls => SmtpTransport::starttls_relay(&settings.host)?,
            TlsMode::None => SmtpTransport::builder_dangerous(&settings.host),
        };

        let mut builder = builder
            .port(settings.port)
            .timeout(Some(Duration::from_secs(settings.timeout_secs)))
            .pool_config(PoolConfig::new().max_size(settings.pool_size.max(1)));

        if let Some(username) = &settings.username {
            let password = settings.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        info!(
            "SMTP relay configured: {}:{} ({:?})",
            settings.host, settings.port, settings.tls
        );

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

/// Build the lettre message for `email`
pub fn build_message(email: &OutgoingEmail) -> Result<Message, NotifyError> {
    let from = parse_mailbox("from", &email.from)?;
    let to = parse_mailbox("to", &email.to)?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())?;

    Ok(message)
}

fn parse_mailbox(field: &'static str, address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| NotifyError::InvalidAddress {
            field,
            address: address.to_string(),
        })
}

impl Notifier for SmtpNotifier {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        let message = build_message(email)?;
        let response = self.mailer.send(&message)?;
        debug!("SMTP relay answered {:?}", response.code());
        Ok(())
    }
}
