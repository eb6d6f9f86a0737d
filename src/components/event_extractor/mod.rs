mod image_processing;
pub mod parser;

pub use image_processing::normalize_image;
pub use parser::{parse_extraction_response, validate_event_details, InvalidEventDetails};

use crate::config::Config;
use crate::error::{extraction_error, BotResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use chrono_tz::Tz;
use parser::EventExtraction;
use rig::completion::message::{Image, ImageMediaType};
use rig::completion::{Chat, Message};
use rig::message::ContentFormat;
use rig::providers::gemini::Client as GeminiClient;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Event fields read from a flyer, not persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEventDetails {
    pub title: String,
    pub description: Option<String>,
    /// ISO 8601
    pub start_date: String,
    /// ISO 8601
    pub end_date: String,
    pub location: Option<String>,
    /// Always within 0..=1
    pub confidence: f64,
}

/// Turns a (normalized) image into event details
#[async_trait]
pub trait EventExtractor: Send + Sync + 'static {
    async fn extract(&self, image: &[u8]) -> BotResult<ExtractedEventDetails>;
}

const SYSTEM_PROMPT: &str = "You read photos of event flyers, posters and invitations and extract calendar event details from them. You answer with a single JSON object.";

const USER_PROMPT_TEMPLATE: &str = "Analyze this image and extract the event details:
- the event title or name
- the start and end date and time
- the location or venue
- a short description or any additional details

Answer with one JSON object matching this JSON schema:
{schema}

Use ISO 8601 for dates and times. Write times as printed on the flyer, without a UTC offset unless the flyer states one. If no end time is given, assume the event lasts 2 hours.
Set confidence between 0 and 1 depending on how clearly the details could be read.
Use null for anything you cannot find.";

/// Gemini vision model accessed through Rig
pub struct GeminiExtractor {
    client: GeminiClient,
    model: String,
    /// Zone of flyer times that carry no offset
    timezone: Tz,
}

impl GeminiExtractor {
    pub fn new(config: &Config) -> BotResult<Self> {
        info!("Using Gemini model: {}", config.gemini_model);
        Ok(Self {
            client: GeminiClient::new(&config.gemini_api_key),
            model: config.gemini_model.clone(),
            timezone: config.tz()?,
        })
    }

    fn user_prompt() -> BotResult<String> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(EventExtraction))?;
        Ok(USER_PROMPT_TEMPLATE.replace("{schema}", &schema))
    }
}

#[async_trait]
impl EventExtractor for GeminiExtractor {
    async fn extract(&self, image: &[u8]) -> BotResult<ExtractedEventDetails> {
        info!("Extracting event details from {} byte image", image.len());

        let image = Image {
            data: STANDARD.encode(image),
            media_type: Some(ImageMediaType::JPEG),
            format: Some(ContentFormat::Base64),
            detail: None,
        };

        let agent = self
            .client
            .agent(&self.model)
            .preamble(SYSTEM_PROMPT)
            .temperature(0.2)
            .build();

        let response = agent
            .chat(Self::user_prompt()?, vec![Message::from(image)])
            .await
            .map_err(|e| extraction_error(&format!("Gemini request failed: {}", e)))?;

        info!("Received response from Gemini");
        parse_extraction_response(&response, Utc::now(), self.timezone)
    }
}
