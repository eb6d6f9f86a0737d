use crate::error::{config_error, env_error, BotResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use tracing::warn;

/// Default Graph API base for the WhatsApp Cloud API
pub const DEFAULT_WHATSAPP_API_BASE: &str = "https://graph.facebook.com/v18.0";
/// Default Gemini model used for flyer extraction
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
/// Optional settings file with image tuning
pub const SETTINGS_PATH: &str = "config/settings.toml";

/// Image normalization settings applied before extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Longest allowed side in pixels
    pub max_image_dimension: u32,
    /// JPEG quality used when re-encoding
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_image_dimension: 1024,
            jpeg_quality: 80,
        }
    }
}

impl ImageSettings {
    /// Parse settings from TOML content, keeping defaults for missing keys
    pub fn from_toml_str(content: &str) -> BotResult<Self> {
        let settings: ImageSettings = toml::from_str(content)?;
        if settings.max_image_dimension == 0 {
            return Err(config_error("max_image_dimension must be positive"));
        }
        if settings.jpeg_quality == 0 || settings.jpeg_quality > 100 {
            return Err(config_error("jpeg_quality must be between 1 and 100"));
        }
        Ok(settings)
    }
}

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WhatsApp Cloud API access token
    pub whatsapp_access_token: String,
    /// WhatsApp business phone number ID used to send messages
    pub whatsapp_phone_number_id: String,
    /// Secret echoed by the webhook verification handshake
    pub whatsapp_verify_token: String,
    /// Graph API base URL
    pub whatsapp_api_base: String,
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// OAuth redirect URI registered with Google
    pub google_redirect_uri: String,
    /// Calendar that confirmed events are written to
    pub google_calendar_id: String,
    /// Gemini API key
    pub gemini_api_key: String,
    /// Gemini model name
    pub gemini_model: String,
    /// Public URL of this service, used for authorization links
    pub public_base_url: String,
    /// Redis connection URL
    pub redis_url: String,
    /// Address the web server binds to
    pub bind_address: String,
    /// Port the web server listens on
    pub port: u16,
    /// Timezone for displaying and creating events
    pub timezone: String,
    /// Locale for chat replies
    pub bot_locale: String,
    /// Image normalization settings
    pub image: ImageSettings,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;

        if let Ok(content) = fs::read_to_string(SETTINGS_PATH) {
            match ImageSettings::from_toml_str(&content) {
                Ok(image) => config.image = image,
                Err(e) => warn!("Ignoring {}: {}", SETTINGS_PATH, e),
            }
        }

        Ok(config)
    }

    /// Build configuration from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| env_error(key));
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = optional("PORT", "3000")
            .parse::<u16>()
            .map_err(|_| env_error("Invalid PORT format"))?;

        let config = Config {
            whatsapp_access_token: required("WHATSAPP_ACCESS_TOKEN")?,
            whatsapp_phone_number_id: required("WHATSAPP_PHONE_NUMBER_ID")?,
            whatsapp_verify_token: required("WHATSAPP_WEBHOOK_VERIFY_TOKEN")?,
            whatsapp_api_base: optional("WHATSAPP_API_BASE", DEFAULT_WHATSAPP_API_BASE),
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            google_redirect_uri: required("GOOGLE_REDIRECT_URI")?,
            google_calendar_id: optional("GOOGLE_CALENDAR_ID", "primary"),
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            public_base_url: required("PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            redis_url: optional("REDIS_URL", "redis://127.0.0.1:6379"),
            bind_address: optional("BIND_ADDRESS", "0.0.0.0"),
            port,
            timezone: optional("TIMEZONE", "UTC"),
            bot_locale: optional("BOT_LOCALE", "en"),
            image: ImageSettings::default(),
        };

        // Fail early on unknown timezones
        config.tz()?;

        Ok(config)
    }

    /// Parsed timezone
    pub fn tz(&self) -> BotResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| config_error(&format!("Invalid TIMEZONE '{}': {}", self.timezone, e)))
    }
}
