use super::ExtractedEventDetails;
use crate::error::{extraction_error, BotResult};
use crate::utils::time::{parse_timestamp, to_iso};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Title used when the model finds none
pub const UNTITLED_EVENT: &str = "Untitled Event";
/// Confidence assumed when the model reports none
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Duration assumed when the flyer has no end time
pub const DEFAULT_EVENT_HOURS: i64 = 2;

/// Shape the model is asked to return
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventExtraction {
    /// Event title or name
    pub title: Option<String>,
    /// Additional details about the event
    pub description: Option<String>,
    /// ISO 8601 start time
    pub start_date: Option<String>,
    /// ISO 8601 end time
    pub end_date: Option<String>,
    /// Venue or address
    pub location: Option<String>,
    /// How clearly the details could be read, 0 to 1
    pub confidence: Option<f64>,
}

/// Reasons a details record is not usable as a calendar event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidEventDetails {
    #[error("title is empty")]
    EmptyTitle,
    #[error("timestamp '{0}' could not be parsed")]
    UnparseableTimestamp(String),
    #[error("event does not end after it starts")]
    EndNotAfterStart,
}

/// Locate the first balanced `{...}` span, ignoring braces inside JSON strings
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a model response into event details, filling in defaults.
/// Times without an offset are read as wall-clock times in `tz`.
pub fn parse_extraction_response(
    text: &str,
    now: DateTime<Utc>,
    tz: Tz,
) -> BotResult<ExtractedEventDetails> {
    let Some(json) = find_json_object(text) else {
        error!("No JSON object in model response: {}", text);
        return Err(extraction_error("No valid JSON found in response"));
    };
    debug!("Extracted JSON span: {}", json);

    let raw: EventExtraction = serde_json::from_str(json)
        .map_err(|e| extraction_error(&format!("Failed to parse extracted JSON: {}", e)))?;

    let start_date = non_empty(raw.start_date).unwrap_or_else(|| to_iso(now));
    let end_date = non_empty(raw.end_date).unwrap_or_else(|| {
        let start = parse_timestamp(&start_date, tz).unwrap_or(now);
        to_iso(start + Duration::hours(DEFAULT_EVENT_HOURS))
    });

    let confidence = match raw.confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    };

    Ok(ExtractedEventDetails {
        title: non_empty(raw.title).unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        description: non_empty(raw.description),
        start_date,
        end_date,
        location: non_empty(raw.location),
        confidence,
    })
}

/// Check that a details record can become a calendar event
pub fn validate_event_details(
    details: &ExtractedEventDetails,
    tz: Tz,
) -> Result<(), InvalidEventDetails> {
    if details.title.trim().is_empty() {
        return Err(InvalidEventDetails::EmptyTitle);
    }

    let start = parse_timestamp(&details.start_date, tz)
        .ok_or_else(|| InvalidEventDetails::UnparseableTimestamp(details.start_date.clone()))?;
    let end = parse_timestamp(&details.end_date, tz)
        .ok_or_else(|| InvalidEventDetails::UnparseableTimestamp(details.end_date.clone()))?;

    if start >= end {
        return Err(InvalidEventDetails::EndNotAfterStart);
    }

    Ok(())
}
