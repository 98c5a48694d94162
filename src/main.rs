use std::path::PathBuf;

use log::{error, info};
use tokio::net::TcpListener;

use account_registration::config::{apply_matches, build_cli, log_level};
use account_registration::utils::initialize_logging;
use account_registration::{build_state, web, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = build_cli().get_matches();

    // File first, then environment, then command-line flags
    let mut config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    config.apply_env();
    apply_matches(&mut config, &matches);
    config.validate()?;

    initialize_logging(
        log_level(&config, matches.get_count("verbose")),
        config.log_file.as_deref(),
    )?;

    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to start: {}", e);
            return Err(e);
        }
    };

    let listener = TcpListener::bind(config.bind_addr()?).await?;
    web::serve(listener, web::router(state)).await?;

    info!("Server stopped");
    Ok(())
}
