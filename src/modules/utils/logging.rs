use env_logger::{Builder, Env, Target, WriteStyle};
use log::{info, warn, LevelFilter};
use std::fs::OpenOptions;
use std::path::Path;

/// Initialize the logging system.
///
/// `RUST_LOG` wins over `default_level` when set. With a `log_file` the
/// output is appended there instead of stderr.
pub fn initialize_logging(
    default_level: LevelFilter,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level.as_str()));

    builder
        // Enable timestamps
        .format_timestamp_secs()
        // Enable module path in logs
        .format_module_path(true)
        .write_style(WriteStyle::Auto);

    if let Some(path) = log_file {
        // Create or append to log file
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;

    info!("Logging system initialized");
    Ok(())
}

/// Helper function to format sensitive data for logging
pub fn format_sensitive(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    format!(
        "{}***{}",
        chars[..2].iter().collect::<String>(),
        chars[chars.len() - 2..].iter().collect::<String>()
    )
}

/// Structured logging for registration lifecycle events
pub fn log_registration_event(event_type: &str, email: &str, success: bool, details: Option<&str>) {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Registration event: type={}, email={}, success=true, timestamp={}, details={:?}",
            event_type,
            format_sensitive(email),
            timestamp,
            details
        );
    } else {
        warn!(
            "Registration event: type={}, email={}, success=false, timestamp={}, details={:?}",
            event_type,
            format_sensitive(email),
            timestamp,
            details
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sensitive_data_formatting() {
        assert_eq!(format_sensitive("a@x.com"), "a@***om");
        assert_eq!(format_sensitive("key"), "***");
        assert_eq!(format_sensitive("user@example.com"), "us***om");
        assert_eq!(format_sensitive(""), "");
        assert_eq!(format_sensitive("jürgen@ex.de"), "jü***de");
    }

    #[test]
    fn test_logging_initialization() {
        let log_file = NamedTempFile::new().unwrap();

        let result = initialize_logging(LevelFilter::Info, Some(log_file.path()));

        // Another test may have installed a logger first
        assert!(
            result.is_ok()
                || result
                    .unwrap_err()
                    .to_string()
                    .contains("already initialized")
        );
    }
}
