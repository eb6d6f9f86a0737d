use crate::components::storage::PendingEvent;
use crate::utils::time::{parse_timestamp, to_iso};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Token endpoint response for both code exchange and refresh
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: Option<i64>,
}

/// OAuth error body returned with non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// Start or end of a calendar event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    pub email: String,
}

/// Request body for `events.insert`
#[derive(Debug, Clone, Serialize)]
pub struct EventInsertRequest {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl EventInsertRequest {
    /// Build the request body from a pending event. Times without an offset
    /// are wall-clock times in `time_zone`.
    pub fn from_pending(event: &PendingEvent, time_zone: Tz) -> Self {
        let date_time = |value: &str| EventDateTime {
            // Unparseable values are passed through and left for the API to reject
            date_time: parse_timestamp(value, time_zone)
                .map(to_iso)
                .unwrap_or_else(|| value.to_string()),
            time_zone: time_zone.name().to_string(),
        };

        Self {
            summary: event.title.clone(),
            description: event.description.clone().filter(|d| !d.is_empty()),
            location: event.location.clone().filter(|l| !l.is_empty()),
            start: date_time(&event.start_date),
            end: date_time(&event.end_date),
            attendees: event
                .invitees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
        }
    }
}

/// The part of the created event we care about
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
}
