use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth credential pair for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// A credential expiring exactly now counts as expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Keep the last known refresh token when the new credential has none
    pub fn retaining_refresh_token(mut self, previous: &str) -> Self {
        if self.refresh_token.is_empty() {
            self.refresh_token = previous.to_string();
        }
        self
    }
}

/// A user that went through the authorization handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    /// Phone number the messaging provider identifies the user by
    pub channel_address: String,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to record a freshly extracted event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPendingEvent {
    pub user_id: String,
    pub channel_address: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub location: Option<String>,
    #[serde(default)]
    pub invitees: Vec<String>,
}

/// An extracted event waiting for confirmation, or one already published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEvent {
    pub id: String,
    pub user_id: String,
    pub channel_address: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub location: Option<String>,
    #[serde(default)]
    pub invitees: Vec<String>,
    /// Set once the event exists in the remote calendar
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingEvent {
    /// Create a record from extracted fields
    pub fn from_new(id: String, event: NewPendingEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: event.user_id,
            channel_address: event.channel_address,
            title: event.title,
            description: event.description,
            start_date: event.start_date,
            end_date: event.end_date,
            location: event.location,
            invitees: event.invitees,
            calendar_event_id: None,
            created_at,
        }
    }

    /// Pending means not yet published
    pub fn is_pending(&self) -> bool {
        self.calendar_event_id.is_none()
    }
}

/// Short form of an event identifier shown to users
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
