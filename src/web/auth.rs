use super::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

pub const MISSING_PARAMETERS: &str = "Missing parameters";
pub const AUTHENTICATION_FAILED: &str = "Authentication failed";
pub const FAILED_TO_GET_TOKENS: &str = "Failed to get tokens";
pub const DATABASE_ERROR: &str = "Database error";

#[derive(Debug, Deserialize)]
pub struct StartParams {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    phone: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn error_redirect(message: &str) -> Response {
    Redirect::to(&format!(
        "/auth/error?message={}",
        urlencoding::encode(message)
    ))
    .into_response()
}

/// Sends the browser to the consent screen, carrying the phone number as state
pub async fn start_handler(
    State(state): State<AppState>,
    Query(params): Query<StartParams>,
) -> Response {
    let Some(phone) = non_empty(params.phone) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Phone number is required" })),
        )
            .into_response();
    };

    match state.oauth.authorization_url(&phone) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            error!("Error building authorization URL: {:?}", e);
            error_redirect(AUTHENTICATION_FAILED)
        }
    }
}

/// Exchanges the code and stores the credential under the phone number
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let code = non_empty(params.code);
    let phone = non_empty(params.state).or_else(|| non_empty(params.phone));

    let (Some(code), Some(phone)) = (code, phone) else {
        return error_redirect(MISSING_PARAMETERS);
    };

    let tokens = match state.oauth.exchange_code(&code).await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("OAuth callback error: {:?}", e);
            return error_redirect(AUTHENTICATION_FAILED);
        }
    };

    let Some(credential) = tokens.into_credential(Utc::now()) else {
        error!("Token response for {} lacked access or refresh token", phone);
        return error_redirect(FAILED_TO_GET_TOKENS);
    };

    if let Err(e) = state.credentials.upsert_credential(&phone, credential).await {
        error!("Error saving tokens for {}: {:?}", phone, e);
        return error_redirect(DATABASE_ERROR);
    }

    info!("Stored Google credential for {}", phone);
    Redirect::to(&format!(
        "/auth/success?phone={}",
        urlencoding::encode(&phone)
    ))
    .into_response()
}
