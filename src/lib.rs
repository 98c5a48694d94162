// First, declare the modules folder itself
mod modules;

use std::sync::Arc;

// Re-export everything from modules for easier access
pub use modules::{accounts, auth, config, email, registration, utils, web};

// Re-export commonly used types
pub use modules::accounts::{Account, AccountStore, JsonAccountStore};
pub use modules::config::AppConfig;
pub use modules::registration::{RegistrationError, RegistrationService};
pub use modules::web::AppState;

// Constants
pub const MIN_PASSWORD_SCORE: u8 = 3;

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;

/// Wire store, notifier, strength checker and workflow from `config`
pub fn build_state(config: &AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    use modules::auth::{PasswordEncoder, ZxcvbnStrengthChecker};
    use modules::config::MailTransport;
    use modules::email::{LogNotifier, Notifier, SmtpNotifier};
    use modules::registration::RegistrationSettings;

    let store: Arc<dyn AccountStore> = match &config.data_file {
        Some(path) => Arc::new(JsonAccountStore::open(path)?),
        None => {
            log::warn!("No data_file configured; accounts are kept in memory only");
            Arc::new(JsonAccountStore::in_memory())
        }
    };

    let notifier: Arc<dyn Notifier> = match config.mail.transport {
        MailTransport::Smtp => Arc::new(SmtpNotifier::new(&config.mail.smtp)?),
        MailTransport::Log => Arc::new(LogNotifier),
    };

    let service = RegistrationService::new(
        store,
        notifier,
        Arc::new(ZxcvbnStrengthChecker::new()),
        PasswordEncoder::new(config.hash_iterations),
        RegistrationSettings {
            sender: config.mail.from.clone(),
            clear_token_on_activation: config.clear_token_on_activation,
        },
    );

    Ok(AppState::new(
        service,
        config.public_scheme.clone(),
        config.link_host(),
    ))
}
