use crate::components::storage::models::short_id;
use crate::components::ExtractedEventDetails;
use crate::utils::time::{display_date, display_time};
use chrono_tz::Tz;
use rust_i18n::t;

/// Link that starts the Google authorization for an address
pub fn authorization_link(public_base_url: &str, channel_address: &str) -> String {
    format!(
        "{}/auth/google?phone={}",
        public_base_url,
        urlencoding::encode(channel_address)
    )
}

/// Confidence as a whole percentage
pub fn confidence_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Summary of an extracted event with the reply keywords
pub fn event_summary(details: &ExtractedEventDetails, event_id: &str, tz: Tz) -> String {
    let not_specified = t!("not_specified").to_string();
    let no_description = t!("no_description").to_string();

    t!(
        "image_summary",
        title = details.title,
        date = display_date(&details.start_date, tz),
        start_time = display_time(&details.start_date, tz),
        end_time = display_time(&details.end_date, tz),
        location = details.location.as_deref().unwrap_or(&not_specified),
        description = details.description.as_deref().unwrap_or(&no_description),
        confidence = confidence_percent(details.confidence),
        reference = short_id(event_id)
    )
    .to_string()
}

pub fn authorization_prompt(public_base_url: &str, channel_address: &str) -> String {
    t!(
        "authorization_prompt",
        link = authorization_link(public_base_url, channel_address)
    )
    .to_string()
}

pub fn authenticate_first(public_base_url: &str, channel_address: &str) -> String {
    t!(
        "authenticate_first",
        link = authorization_link(public_base_url, channel_address)
    )
    .to_string()
}

pub fn reauthenticate(public_base_url: &str, channel_address: &str) -> String {
    t!(
        "reauthenticate",
        link = authorization_link(public_base_url, channel_address)
    )
    .to_string()
}

pub fn event_created(calendar_event_id: &str) -> String {
    t!("event_created", id = calendar_event_id).to_string()
}

/// Replies without parameters
pub fn text(key: &str) -> String {
    t!(key).to_string()
}
