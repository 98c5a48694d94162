pub mod password;
pub mod strength;
pub mod tokens;

// Re-export the main types
pub use password::PasswordEncoder;
pub use strength::{Strength, StrengthChecker, ZxcvbnStrengthChecker};
pub use tokens::{looks_like_token, TokenGenerator, UuidTokenGenerator};
