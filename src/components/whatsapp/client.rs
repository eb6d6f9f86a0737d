use crate::config::Config;
use crate::error::{whatsapp_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sends chat replies and downloads inbound media
#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    /// Send a plain text message
    async fn send_text(&self, to: &str, body: &str) -> BotResult<()>;

    /// Download the raw bytes of an inbound media attachment
    async fn fetch_media(&self, media_id: &str) -> BotResult<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: OutboundTextBody<'a>,
}

#[derive(Debug, Serialize)]
struct OutboundTextBody<'a> {
    body: &'a str,
}

impl<'a> OutboundText<'a> {
    fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: OutboundTextBody { body },
        }
    }
}

/// Media metadata returned by the Graph API
#[derive(Debug, Deserialize)]
struct MediaInfo {
    url: String,
}

/// WhatsApp Cloud API client
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    api_base: String,
    phone_number_id: String,
    access_token: String,
}

impl WhatsAppClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_base: config.whatsapp_api_base.trim_end_matches('/').to_string(),
            phone_number_id: config.whatsapp_phone_number_id.clone(),
            access_token: config.whatsapp_access_token.clone(),
        }
    }

    async fn get_checked(&self, url: &str, what: &str) -> BotResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| whatsapp_error(&format!("Failed to fetch {}: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(whatsapp_error(&format!(
                "Failed to fetch {}: HTTP {} - {}",
                what, status, error_body
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> BotResult<()> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&OutboundText::new(to, body))
            .send()
            .await
            .map_err(|e| whatsapp_error(&format!("Failed to send message: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(whatsapp_error(&format!(
                "Failed to send message: HTTP {} - {}",
                status, error_body
            )));
        }

        debug!("Sent message to {}", to);
        Ok(())
    }

    async fn fetch_media(&self, media_id: &str) -> BotResult<Vec<u8>> {
        let info_url = format!("{}/{}", self.api_base, media_id);
        let info: MediaInfo = self
            .get_checked(&info_url, "media info")
            .await?
            .json()
            .await
            .map_err(|e| whatsapp_error(&format!("Failed to parse media info: {}", e)))?;

        let bytes = self
            .get_checked(&info.url, "media")
            .await?
            .bytes()
            .await
            .map_err(|e| whatsapp_error(&format!("Failed to read media: {}", e)))?;

        info!("Downloaded media {} ({} bytes)", media_id, bytes.len());
        Ok(bytes.to_vec())
    }
}
