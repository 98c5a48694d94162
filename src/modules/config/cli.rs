use std::path::PathBuf;
use std::str::FromStr;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use super::settings::{AppConfig, MailTransport};

/// Define the command-line interface
pub fn build_cli() -> Command {
    Command::new("account-registration")
        .about("Self-service account registration with e-mail confirmation")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a JSON configuration file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .help("Address to listen on, e.g. 127.0.0.1:8080")
                .value_name("ADDR"),
        )
        .arg(
            Arg::new("data-file")
                .long("data-file")
                .help("JSON file holding registered accounts")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-mail")
                .long("log-mail")
                .help("Write confirmation emails to the log instead of sending them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
}

/// Command-line flags take precedence over file and environment settings
pub fn apply_matches(config: &mut AppConfig, matches: &ArgMatches) {
    if let Some(bind) = matches.get_one::<String>("bind") {
        config.bind = bind.clone();
    }
    if let Some(data_file) = matches.get_one::<PathBuf>("data-file") {
        config.data_file = Some(data_file.clone());
    }
    if matches.get_flag("log-mail") {
        config.mail.transport = MailTransport::Log;
    }
}

/// Resolve the log level from the config value and the number of `-v` flags
pub fn log_level(config: &AppConfig, verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
