pub mod io;
pub mod logging;

pub use io::{escape_html, is_valid_email};
pub use logging::{format_sensitive, initialize_logging, log_registration_event};
