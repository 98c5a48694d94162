use uuid::Uuid;

/// Source of confirmation tokens
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs drawn from the operating system's CSPRNG.
///
/// Collisions are astronomically unlikely but not impossible; the account
/// store rejects a duplicate token and the caller draws a new one.
#[derive(Debug, Default, Clone)]
pub struct UuidTokenGenerator;

impl TokenGenerator for UuidTokenGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().hyphenated().to_string()
    }
}

/// Cheap shape check applied before touching the store
pub fn looks_like_token(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 128
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
