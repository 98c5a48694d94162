use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::AppState;

/// Cookie carrying the flash session id
pub const FLASH_COOKIE: &str = "registration_flash";

/// Unread messages older than this are dropped
const FLASH_TTL: Duration = Duration::from_secs(600);

/// One-shot messages handed from one request to the next.
///
/// A message is stored under the browser's session id and removed by the
/// first read, so only the request right after the redirect sees it.
#[derive(Debug, Default)]
pub struct FlashStore {
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `message` for the next request of `session`, replacing any unread one
    pub fn put(&self, session: &str, message: impl Into<String>) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = Instant::now();
        entries.retain(|_, (written, _)| now.duration_since(*written) < FLASH_TTL);
        entries.insert(session.to_string(), (now, message.into()));
    }

    /// Read and remove the pending message for `session`
    pub fn take(&self, session: &str) -> Option<String> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        entries
            .remove(session)
            .filter(|(written, _)| written.elapsed() < FLASH_TTL)
            .map(|(_, message)| message)
    }

}

/// Message the previous request left for this one, attached to every request
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<String>);

/// Router middleware: take the session's flash before any handler runs, so a
/// message is gone after the first request that follows it, whatever its route
pub async fn consume_flash(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let message =
        session_from_headers(request.headers()).and_then(|session| state.flash.take(&session));
    request.extensions_mut().insert(Flash(message)); // Flash(None) when nothing is pending
    next.run(request).await
}

/// Fresh random session id
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Session id from the request's `Cookie` headers, if one was set earlier
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// `Set-Cookie` value binding the browser to `session`
pub fn session_cookie(session: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, session)
}
