use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(flyerbot::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(flyerbot::config))]
    Config(String),

    #[error("WhatsApp API error: {0}")]
    #[diagnostic(code(flyerbot::whatsapp))]
    WhatsApp(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(flyerbot::google_calendar))]
    GoogleCalendar(String),

    #[error("Google authorization error: {0}")]
    #[diagnostic(code(flyerbot::google_auth))]
    GoogleAuth(String),

    #[error("Refresh token was revoked: {0}")]
    #[diagnostic(
        code(flyerbot::token_revoked),
        help("The user has to go through the authorization link again")
    )]
    TokenRevoked(String),

    #[error("Event extraction error: {0}")]
    #[diagnostic(code(flyerbot::extraction))]
    Extraction(String),

    #[error("Image processing error: {0}")]
    #[diagnostic(code(flyerbot::image))]
    Image(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(flyerbot::storage))]
    Storage(String),

    #[error(transparent)]
    #[diagnostic(code(flyerbot::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(flyerbot::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(flyerbot::other))]
    Other(String),
}

impl Error {
    /// Whether the failure can only be fixed by the user authorizing again
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Error::TokenRevoked(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Other(format!("HTTP request failed: {}", err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create WhatsApp errors
pub fn whatsapp_error(message: &str) -> Error {
    Error::WhatsApp(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create Google authorization errors
pub fn google_auth_error(message: &str) -> Error {
    Error::GoogleAuth(message.to_string())
}

/// Helper to create extraction errors
pub fn extraction_error(message: &str) -> Error {
    Error::Extraction(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}
