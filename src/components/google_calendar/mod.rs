pub mod models;
mod publisher;
pub mod token;

pub use publisher::{CalendarPublisher, GoogleCalendarPublisher};
pub use token::{AuthorizationFlow, GoogleOAuthClient, TokenRefresher};
