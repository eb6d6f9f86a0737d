// Export components
pub mod event_extractor;
pub mod google_calendar;
pub mod storage;
pub mod whatsapp;

pub use event_extractor::{EventExtractor, ExtractedEventDetails, GeminiExtractor};
pub use google_calendar::{
    AuthorizationFlow, CalendarPublisher, GoogleCalendarPublisher, GoogleOAuthClient,
    TokenRefresher,
};
pub use storage::{CredentialStore, EventLedger, InMemoryStore, RedisStore};
pub use whatsapp::{Messenger, WhatsAppClient};
