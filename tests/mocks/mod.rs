//! Hand-written collaborator doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use flyerbot::components::storage::{Credential, PendingEvent};
use flyerbot::components::{
    CalendarPublisher, EventExtractor, ExtractedEventDetails, InMemoryStore, Messenger,
    TokenRefresher,
};
use flyerbot::components::CredentialStore;
use flyerbot::config::ImageSettings;
use flyerbot::conversation::{Collaborators, ControllerSettings, ConversationController};
use flyerbot::error::{
    extraction_error, google_auth_error, google_calendar_error, whatsapp_error, BotResult, Error,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

pub const USER: &str = "358401234567";
pub const BASE_URL: &str = "https://bot.example";

/// Ordered record of collaborator calls across all mocks
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: &str) {
        self.0.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

/// Small PNG standing in for a downloaded flyer
pub fn flyer_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 48, image::Rgb([200, 40, 40]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

pub fn sample_details() -> ExtractedEventDetails {
    ExtractedEventDetails {
        title: "Summer Party".to_string(),
        description: Some("Bring snacks".to_string()),
        start_date: "2024-07-06T18:00:00Z".to_string(),
        end_date: "2024-07-06T20:00:00Z".to_string(),
        location: Some("Rooftop".to_string()),
        confidence: 0.9,
    }
}

pub fn valid_credential() -> Credential {
    Credential {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub fn expired_credential() -> Credential {
    Credential {
        access_token: "stale".to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at: Utc::now() - Duration::minutes(5),
    }
}

pub struct MockMessenger {
    log: CallLog,
    sent: Mutex<Vec<(String, String)>>,
    fail_fetch: bool,
}

impl MockMessenger {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Body of the only reply sent so far
    pub fn last_reply(&self) -> String {
        self.sent().last().map(|(_, body)| body.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_text(&self, to: &str, body: &str) -> BotResult<()> {
        self.log.push("send");
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }

    async fn fetch_media(&self, _media_id: &str) -> BotResult<Vec<u8>> {
        self.log.push("fetch_media");
        if self.fail_fetch {
            return Err(whatsapp_error("media not found"));
        }
        Ok(flyer_png())
    }
}

pub struct MockExtractor {
    log: CallLog,
    fail: bool,
    details: ExtractedEventDetails,
}

#[async_trait]
impl EventExtractor for MockExtractor {
    async fn extract(&self, image: &[u8]) -> BotResult<ExtractedEventDetails> {
        self.log.push("extract");
        // The controller hands over the normalized JPEG
        assert_eq!(&image[..2], &[0xFF, 0xD8]);
        if self.fail {
            return Err(extraction_error("No JSON found in response"));
        }
        Ok(self.details.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshBehavior {
    /// New access token, no rotated refresh token
    Succeed,
    Revoked,
    Fail,
}

pub struct MockRefresher {
    log: CallLog,
    behavior: RefreshBehavior,
}

#[async_trait]
impl TokenRefresher for MockRefresher {
    async fn refresh(&self, refresh_token: &str) -> BotResult<Credential> {
        self.log.push("refresh");
        match self.behavior {
            RefreshBehavior::Succeed => Ok(Credential {
                access_token: format!("fresh-for-{}", refresh_token),
                refresh_token: String::new(),
                expires_at: Utc::now() + Duration::hours(1),
            }),
            RefreshBehavior::Revoked => Err(Error::TokenRevoked("invalid_grant".to_string())),
            RefreshBehavior::Fail => Err(google_auth_error("connection reset")),
        }
    }
}

pub struct MockPublisher {
    log: CallLog,
    fail: Mutex<bool>,
    published: Mutex<Vec<(String, String)>>,
    /// Holds every publish until this many calls are in flight
    barrier: Option<Barrier>,
}

impl MockPublisher {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// (access token, pending event id) per successful call
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarPublisher for MockPublisher {
    async fn create_event(&self, credential: &Credential, event: &PendingEvent) -> BotResult<String> {
        self.log.push("publish");
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if *self.fail.lock().unwrap() {
            return Err(google_calendar_error("Failed to create event: HTTP 500"));
        }
        let mut published = self.published.lock().unwrap();
        published.push((credential.access_token.clone(), event.id.clone()));
        Ok(format!("gcal-{}", published.len()))
    }
}

/// Knobs for building a [`TestBot`]
#[derive(Debug, Clone)]
pub struct Setup {
    pub fail_fetch: bool,
    pub fail_extract: bool,
    pub refresh: RefreshBehavior,
    pub details: ExtractedEventDetails,
    pub timezone: chrono_tz::Tz,
    /// Concurrent publishes to wait for before any of them completes
    pub concurrent_publishes: Option<usize>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            fail_fetch: false,
            fail_extract: false,
            refresh: RefreshBehavior::Succeed,
            details: sample_details(),
            timezone: chrono_tz::Tz::UTC,
            concurrent_publishes: None,
        }
    }
}

/// Controller wired to mocks and an in-memory store
pub struct TestBot {
    pub controller: Arc<ConversationController>,
    pub store: Arc<InMemoryStore>,
    pub messenger: Arc<MockMessenger>,
    pub publisher: Arc<MockPublisher>,
    pub log: CallLog,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with(Setup::default())
    }

    pub fn with(setup: Setup) -> Self {
        let log = CallLog::default();
        let store = Arc::new(InMemoryStore::new());
        let messenger = Arc::new(MockMessenger {
            log: log.clone(),
            sent: Mutex::new(Vec::new()),
            fail_fetch: setup.fail_fetch,
        });
        let publisher = Arc::new(MockPublisher {
            log: log.clone(),
            fail: Mutex::new(false),
            published: Mutex::new(Vec::new()),
            barrier: setup.concurrent_publishes.map(Barrier::new),
        });

        let services = Collaborators {
            messenger: messenger.clone(),
            extractor: Arc::new(MockExtractor {
                log: log.clone(),
                fail: setup.fail_extract,
                details: setup.details,
            }),
            credentials: store.clone(),
            ledger: store.clone(),
            refresher: Arc::new(MockRefresher {
                log: log.clone(),
                behavior: setup.refresh,
            }),
            publisher: publisher.clone(),
        };
        let settings = ControllerSettings {
            public_base_url: BASE_URL.to_string(),
            image: ImageSettings::default(),
            timezone: setup.timezone,
        };

        Self {
            controller: Arc::new(ConversationController::new(services, settings)),
            store,
            messenger,
            publisher,
            log,
        }
    }

    pub async fn register(&self, credential: Credential) {
        self.store.upsert_credential(USER, credential).await.unwrap();
    }

    pub async fn pending_count(&self) -> usize {
        self.store
            .all_events()
            .await
            .iter()
            .filter(|e| e.is_pending())
            .count()
    }
}
