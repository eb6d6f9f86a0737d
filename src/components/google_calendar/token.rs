use super::models::{OAuthErrorBody, TokenResponse};
use crate::components::storage::Credential;
use crate::config::Config;
use crate::error::{google_auth_error, BotResult, Error};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Used when the provider omits `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Obtains a new access token for an expired credential
#[async_trait]
pub trait TokenRefresher: Send + Sync + 'static {
    /// Exchange a refresh token for a new credential. The original refresh token
    /// is carried over when the provider does not rotate it. Nothing is persisted.
    async fn refresh(&self, refresh_token: &str) -> BotResult<Credential>;
}

/// Browser based authorization-code handshake
#[async_trait]
pub trait AuthorizationFlow: Send + Sync + 'static {
    /// Consent URL carrying `state` through the provider
    fn authorization_url(&self, state: &str) -> BotResult<String>;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> BotResult<TokenResponse>;
}

impl TokenResponse {
    /// Credential from a code exchange; both tokens must be present
    pub fn into_credential(self, now: DateTime<Utc>) -> Option<Credential> {
        let expires_at = now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        match (self.access_token, self.refresh_token) {
            (Some(access_token), Some(refresh_token))
                if !access_token.is_empty() && !refresh_token.is_empty() =>
            {
                Some(Credential {
                    access_token,
                    refresh_token,
                    expires_at,
                })
            }
            _ => None,
        }
    }

    /// Credential from a refresh, keeping `previous_refresh_token` if none was issued
    pub fn into_refreshed(self, previous_refresh_token: &str, now: DateTime<Utc>) -> BotResult<Credential> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| google_auth_error("Token response missing 'access_token' field"))?;

        let credential = Credential {
            access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            expires_at: now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN)),
        };

        Ok(credential.retaining_refresh_token(previous_refresh_token))
    }
}

/// Map a failed refresh response to an error, separating revoked grants from
/// failures worth retrying later
pub fn classify_refresh_failure(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(err) if err.error == "invalid_grant" => Error::TokenRevoked(
            err.error_description
                .unwrap_or_else(|| "Token has been expired or revoked".to_string()),
        ),
        Ok(err) => google_auth_error(&format!(
            "Failed to refresh token: HTTP {} - {}",
            status, err.error
        )),
        Err(_) => google_auth_error(&format!(
            "Failed to refresh token: HTTP {} - {}",
            status, body
        )),
    }
}

/// Google OAuth client used for the consent flow and token refresh
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
        }
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> BotResult<reqwest::Response> {
        self.client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| google_auth_error(&format!("Token endpoint request failed: {}", e)))
    }
}

#[async_trait]
impl TokenRefresher for GoogleOAuthClient {
    async fn refresh(&self, refresh_token: &str) -> BotResult<Credential> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_form(&params).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            let err = classify_refresh_failure(status, &error_body);
            warn!("Token refresh failed: {}", err);
            return Err(err);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| google_auth_error(&format!("Failed to parse token response: {}", e)))?;

        info!("Access token refreshed");
        token.into_refreshed(refresh_token, Utc::now())
    }
}

#[async_trait]
impl AuthorizationFlow for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> BotResult<String> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| google_auth_error(&format!("Failed to build authorization URL: {}", e)))?;

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> BotResult<TokenResponse> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.post_token_form(&params).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(google_auth_error(&format!(
                "Failed to get token: HTTP {} - {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_auth_error(&format!("Failed to parse token response: {}", e)))
    }
}
