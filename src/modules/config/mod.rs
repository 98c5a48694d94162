pub mod cli;
pub mod settings;

pub use cli::{apply_matches, build_cli, log_level};
pub use settings::{AppConfig, ConfigError, MailConfig, MailTransport};
