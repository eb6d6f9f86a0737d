use super::models::{CreatedEvent, EventInsertRequest};
use crate::components::storage::{Credential, PendingEvent};
use crate::config::Config;
use crate::error::{google_calendar_error, BotResult};
use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use tracing::info;
use url::Url;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Creates remote calendar entries
#[async_trait]
pub trait CalendarPublisher: Send + Sync + 'static {
    /// Create the event and return its remote identifier
    async fn create_event(&self, credential: &Credential, event: &PendingEvent) -> BotResult<String>;
}

/// Google Calendar `events.insert` client
#[derive(Clone)]
pub struct GoogleCalendarPublisher {
    client: Client,
    calendar_id: String,
    time_zone: Tz,
}

impl GoogleCalendarPublisher {
    pub fn new(config: &Config) -> BotResult<Self> {
        Ok(Self {
            client: Client::new(),
            calendar_id: config.google_calendar_id.clone(),
            time_zone: config.tz()?,
        })
    }

    fn events_url(&self) -> BotResult<Url> {
        let mut url = Url::parse(CALENDAR_API_BASE)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API base cannot hold a path"))?
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }
}

#[async_trait]
impl CalendarPublisher for GoogleCalendarPublisher {
    async fn create_event(&self, credential: &Credential, event: &PendingEvent) -> BotResult<String> {
        let body = EventInsertRequest::from_pending(event, self.time_zone);

        let response = self
            .client
            .post(self.events_url()?)
            .bearer_auth(&credential.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to create event: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to create event: HTTP {} - {}",
                status, error_body
            )));
        }

        let created: CreatedEvent = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse create response: {}", e)))?;

        info!("Created calendar event {} for pending event {}", created.id, event.id);
        Ok(created.id)
    }
}
