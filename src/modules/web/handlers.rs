use std::collections::HashMap;

use axum::extract::{Extension, Form, Query, State};
use axum::http::header::{HOST, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use log::error;
use serde::Deserialize;
use thiserror::Error;
use url::form_urlencoded;

use super::flash::{new_session_id, session_cookie, session_from_headers, Flash};
use super::views::{self, ConfirmView};
use super::AppState;
use crate::modules::registration::errors::{
    ALREADY_REGISTERED_MESSAGE, VALIDATION_MESSAGE, WEAK_PASSWORD_MESSAGE,
};
use crate::modules::registration::{RegistrationError, RegistrationForm, ValidationErrors};

/// Failures that end a request with the generic error page
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("request worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        let message = match &self {
            AppError::Registration(e) => e.user_message(),
            AppError::Worker(_) => "Something went wrong on our side. Please try again later.",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Html(views::error_page(message))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: Option<String>,
}

/// Scheme and host the request arrived on, used as the base of emailed links
pub fn app_url(state: &AppState, headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or(state.public_scheme.as_str());

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_plausible_host(h))
        .unwrap_or(state.fallback_host.as_str());

    format!("{}://{}", scheme, host)
}

/// Hostnames, IPv4/IPv6 literals and ports only; anything else would end up
/// verbatim in an outgoing email
fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

// GET /register
pub async fn show_registration() -> Html<String> {
    Html(views::register_page(
        &RegistrationForm::default(),
        None,
        None,
        &ValidationErrors::default(),
    ))
}

// POST /register
pub async fn submit_registration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegistrationForm>,
) -> Result<Html<String>, AppError> {
    let app_url = app_url(&state, &headers); // Links point back at the host the form came from
    let service = state.service.clone();
    let submitted = form.clone();

    // Hashing and SMTP are blocking calls
    let outcome =
        tokio::task::spawn_blocking(move || service.begin_registration(&submitted, &app_url))
            .await?;

    // The password is never echoed back into the form
    let form = RegistrationForm {
        password: None,
        ..form
    };

    let page = match outcome {
        Ok(receipt) => views::register_page(
            &RegistrationForm::default(),
            Some(receipt.message().as_str()),
            None,
            &ValidationErrors::default(),
        ),
        Err(e @ RegistrationError::DuplicateAccount { .. }) => views::register_page(
            &form,
            None,
            Some(e.user_message()),
            &ValidationErrors::default(),
        ),
        Err(RegistrationError::ValidationFailed { errors, duplicate }) => {
            let message = if duplicate {
                ALREADY_REGISTERED_MESSAGE
            } else {
                VALIDATION_MESSAGE
            };
            views::register_page(&form, None, Some(message), &errors)
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Html(page))
}

// GET /confirm?token=...
pub async fn show_confirmation(
    State(state): State<AppState>,
    Extension(Flash(flash)): Extension<Flash>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Html<String>, AppError> {
    let token = query.token.unwrap_or_default(); // Missing token reads as an invalid link
    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.confirmation_prompt(&token)).await?;

    let view = match outcome {
        Ok(prompt) => ConfirmView::Prompt {
            token: prompt.token,
            error: flash,
        },
        Err(e @ RegistrationError::InvalidToken) => {
            ConfirmView::InvalidToken(e.user_message().to_string())
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Html(views::confirm_page(&view)))
}

// POST /confirm
pub async fn submit_confirmation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let token = params.get("token").cloned().unwrap_or_default();
    let password = params.get("password").cloned().unwrap_or_default();

    let service = state.service.clone();
    let candidate = token.clone();
    let outcome =
        tokio::task::spawn_blocking(move || service.complete_confirmation(&candidate, &password))
            .await?;

    match outcome {
        Ok(activation) => Ok(Html(views::confirm_page(&ConfirmView::Success(
            activation.message().to_string(),
        )))
        .into_response()),
        Err(RegistrationError::WeakPassword { .. }) => {
            // Reuse the browser's session or start one for this redirect
            let session = session_from_headers(&headers).unwrap_or_else(new_session_id);
            state.flash.put(&session, WEAK_PASSWORD_MESSAGE);

            let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect(); // Form input
            let location = format!("/confirm?token={}", encoded);

            Ok((
                [(SET_COOKIE, session_cookie(&session))],
                Redirect::to(&location),
            )
                .into_response())
        }
        Err(e @ RegistrationError::InvalidToken) => Ok(Html(views::confirm_page(
            &ConfirmView::InvalidToken(e.user_message().to_string()),
        ))
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::accounts::{AccountStore, JsonAccountStore};
    use crate::modules::auth::{PasswordEncoder, ZxcvbnStrengthChecker};
    use crate::modules::email::{Notifier, Outbox};
    use crate::modules::registration::{RegistrationService, RegistrationSettings};
    use crate::modules::web::router;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION};
    use axum::http::Request;
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: Arc<JsonAccountStore>,
        outbox: Arc<Outbox>,
    }

    fn test_app_with(outbox: Outbox) -> TestApp {
        let store = Arc::new(JsonAccountStore::in_memory());
        let outbox = Arc::new(outbox);
        let notifier: Arc<dyn Notifier> = outbox.clone();
        let service = RegistrationService::new(
            store.clone(),
            notifier,
            Arc::new(ZxcvbnStrengthChecker::new()),
            PasswordEncoder::new(1_000),
            RegistrationSettings::default(),
        );
        let state = AppState::new(service, "http", "localhost:8080");

        TestApp {
            router: router(state),
            store,
            outbox,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(Outbox::new())
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(HOST, "example.com")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri).header(HOST, "example.com");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const REGISTRATION: &str = "email=a%40x.com&first_name=Ada&last_name=Lovelace&password=whatever";

    async fn register(app: &TestApp) -> String {
        let response = app
            .router
            .clone()
            .oneshot(post_form("/register", REGISTRATION))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        app.store
            .find_by_email("a@x.com")
            .unwrap()
            .unwrap()
            .confirmation_token
            .unwrap()
    }

    #[tokio::test]
    async fn test_registration_form() {
        let app = test_app();
        let response = app.router.oneshot(get("/register", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<form method=\"post\" action=\"/register\">"));
    }

    #[tokio::test]
    async fn test_register_and_duplicate() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(post_form("/register", REGISTRATION))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("A confirmation e-mail has been sent to a@x.com"));

        let token = app
            .store
            .find_by_email("a@x.com")
            .unwrap()
            .unwrap()
            .confirmation_token
            .unwrap();
        let sent = app.outbox.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .body
            .contains(&format!("http://example.com/confirm?token={}", token)));

        let response = app
            .router
            .clone()
            .oneshot(post_form("/register", REGISTRATION))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("There is already a user registered with the email provided."));
        assert!(html.contains("value=\"a@x.com\""));
        assert!(!html.contains("whatever"));

        assert_eq!(app.store.count().unwrap(), 1);
        assert_eq!(app.outbox.len(), 1);
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(post_form("/register", "email=broken&first_name=&last_name=L"))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("Please correct the errors below."));
        assert!(html.contains("Please provide a valid e-mail address."));
        assert!(html.contains("Please provide your first name."));
        assert!(app.outbox.is_empty());
        assert_eq!(app.store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_forwarded_scheme_in_link() {
        let app = test_app();
        let mut request = post_form("/register", REGISTRATION);
        request
            .headers_mut()
            .insert("x-forwarded-proto", "https".parse().unwrap());

        app.router.clone().oneshot(request).await.unwrap();

        assert!(app.outbox.messages()[0]
            .body
            .contains("https://example.com/confirm?token="));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let app = test_app();
        register(&app).await;
        let before = app.store.find_by_email("a@x.com").unwrap().unwrap();

        let response = app
            .router
            .clone()
            .oneshot(get("/confirm?token=zzz", None))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("This is an invalid confirmation link."));

        let response = app
            .router
            .clone()
            .oneshot(post_form("/confirm", "token=zzz&password=vK8%23qZ2%21mW9p"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("This is an invalid confirmation link."));

        let missing = app
            .router
            .clone()
            .oneshot(get("/confirm", None))
            .await
            .unwrap();
        assert!(body_text(missing).await.contains("invalid confirmation link"));

        assert_eq!(app.store.find_by_email("a@x.com").unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_weak_password_flash_is_shown_once() {
        let app = test_app();
        let token = register(&app).await;

        let response = app
            .router
            .clone()
            .oneshot(post_form(
                "/confirm",
                &format!("token={}&password=whatever", token),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            &format!("/confirm?token={}", token)
        );
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        assert!(!app.store.find_by_email("a@x.com").unwrap().unwrap().enabled);

        let uri = format!("/confirm?token={}", token);
        let first = app
            .router
            .clone()
            .oneshot(get(&uri, Some(&cookie)))
            .await
            .unwrap();
        let html = body_text(first).await;
        assert!(html.contains("Your password is too weak.  Choose a stronger one."));
        assert!(html.contains(&format!("value=\"{}\"", token)));

        let second = app
            .router
            .clone()
            .oneshot(get(&uri, Some(&cookie)))
            .await
            .unwrap();
        let html = body_text(second).await;
        assert!(!html.contains("too weak"));
        assert!(html.contains("<form method=\"post\" action=\"/confirm\">"));
    }

    #[tokio::test]
    async fn test_flash_is_dropped_by_an_intervening_request() {
        let app = test_app();
        let token = register(&app).await;

        let response = app
            .router
            .clone()
            .oneshot(post_form(
                "/confirm",
                &format!("token={}&password=whatever", token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        // Browser wanders off to the registration form instead of following the redirect
        let detour = app
            .router
            .clone()
            .oneshot(get("/register", Some(&cookie)))
            .await
            .unwrap();
        assert!(!body_text(detour).await.contains("too weak"));

        let later = app
            .router
            .clone()
            .oneshot(get(&format!("/confirm?token={}", token), Some(&cookie)))
            .await
            .unwrap();
        let html = body_text(later).await;
        assert!(!html.contains("too weak"));
        assert!(html.contains(&format!("value=\"{}\"", token)));
    }

    #[tokio::test]
    async fn test_confirmation_activates_account() {
        let app = test_app();
        let token = register(&app).await;

        let response = app
            .router
            .clone()
            .oneshot(post_form(
                "/confirm",
                &format!("token={}&password=vK8%23qZ2%21mW9p", token),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Your password has been set!"));

        let account = app.store.find_by_email("a@x.com").unwrap().unwrap();
        assert!(account.enabled);
        assert!(PasswordEncoder::new(1_000).verify("vK8#qZ2!mW9p", &account.password_hash.unwrap()));
    }

    #[tokio::test]
    async fn test_mail_failure_is_a_server_error() {
        let app = test_app_with(Outbox::rejecting("relay down"));

        let response = app
            .router
            .clone()
            .oneshot(post_form("/register", REGISTRATION))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_text(response).await.contains("relay down"));
    }

    #[test]
    fn test_app_url_falls_back_for_suspicious_hosts() {
        let service = RegistrationService::new(
            Arc::new(JsonAccountStore::in_memory()),
            Arc::new(Outbox::new()),
            Arc::new(ZxcvbnStrengthChecker::new()),
            PasswordEncoder::new(1_000),
            RegistrationSettings::default(),
        );
        let state = AppState::new(service, "https", "registration.example");

        let mut headers = HeaderMap::new();
        assert_eq!(app_url(&state, &headers), "https://registration.example");

        headers.insert(HOST, "evil.example/phish?".parse().unwrap());
        assert_eq!(app_url(&state, &headers), "https://registration.example");

        headers.insert(HOST, "localhost:3000".parse().unwrap());
        headers.insert("x-forwarded-proto", "gopher".parse().unwrap());
        assert_eq!(app_url(&state, &headers), "https://localhost:3000");
    }
}
