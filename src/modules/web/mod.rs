//! HTTP surface of the registration workflow.
//!
//! Routes:
//! - `GET  /register` registration form
//! - `POST /register` submit the form, send the confirmation email
//! - `GET  /confirm?token=` set-password form for a confirmation link
//! - `POST /confirm` set the password and enable the account

pub mod flash;
pub mod handlers;
pub mod views;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use log::info;
use tokio::net::TcpListener;

use crate::modules::registration::RegistrationService;
use flash::FlashStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RegistrationService>,
    pub flash: Arc<FlashStore>,
    pub public_scheme: String,
    // Used in links when the request carries no usable Host header
    pub fallback_host: String,
}

impl AppState {
    pub fn new(
        service: RegistrationService,
        public_scheme: impl Into<String>,
        fallback_host: impl Into<String>,
    ) -> Self {
        Self {
            service: Arc::new(service),
            flash: Arc::new(FlashStore::new()),
            public_scheme: public_scheme.into(),
            fallback_host: fallback_host.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/register",
            get(handlers::show_registration).post(handlers::submit_registration),
        )
        .route(
            "/confirm",
            get(handlers::show_confirmation).post(handlers::submit_confirmation),
        )
        // Every request consumes the pending flash, not just the redirect target
        .layer(middleware::from_fn_with_state(state.clone(), flash::consume_flash))
        .with_state(state)
}

/// Serve `router` until the process receives Ctrl-C
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
}
