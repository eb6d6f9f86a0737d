mod auth;
mod pages;
mod webhook;

use crate::components::{AuthorizationFlow, CredentialStore};
use crate::conversation::ConversationController;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const WEBHOOK_PATH: &str = "/api/webhook/whatsapp";

/// Shared state of all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ConversationController>,
    pub verify_token: String,
    pub oauth: Arc<dyn AuthorizationFlow>,
    pub credentials: Arc<dyn CredentialStore>,
}

/// Every route the service exposes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            WEBHOOK_PATH,
            get(webhook::verify_handler).post(webhook::receive_handler),
        )
        .route("/auth/google", get(auth::start_handler))
        .route("/auth/google/callback", get(auth::callback_handler))
        .route("/auth/success", get(pages::success_handler))
        .route("/auth/error", get(pages::error_handler))
        .route("/health", get(pages::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
