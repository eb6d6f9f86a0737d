use super::AppState;
use crate::components::whatsapp::{VerifyParams, WebhookPayload};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, error, info, warn};

/// Subscription handshake; echoes the challenge on success
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    match params.accept(&state.verify_token) {
        Some(challenge) => {
            info!("Webhook verified");
            (StatusCode::OK, challenge.to_string())
        }
        None => {
            warn!("Webhook verification rejected");
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
    }
}

/// Message delivery. Acknowledged once every message has been handled,
/// whatever the individual outcome was.
pub async fn receive_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Error processing webhook: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error");
        }
    };

    let events = payload.into_events();
    debug!("Webhook delivery with {} message(s)", events.len());

    for event in events {
        state.controller.handle(event).await;
    }

    (StatusCode::OK, "OK")
}
