use super::auth::{AUTHENTICATION_FAILED, DATABASE_ERROR, FAILED_TO_GET_TOKENS, MISSING_PARAMETERS};
use axum::extract::Query;
use axum::response::Html;
use rust_i18n::t;
use serde::Deserialize;

/// Messages the error page is willing to show
const KNOWN_ERRORS: [&str; 4] = [
    MISSING_PARAMETERS,
    AUTHENTICATION_FAILED,
    FAILED_TO_GET_TOKENS,
    DATABASE_ERROR,
];

#[derive(Debug, Deserialize)]
pub struct SuccessParams {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorParams {
    message: Option<String>,
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{body}</p>\n</body>\n</html>\n"
    ))
}

/// Keeps only characters a phone number can contain
fn sanitize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

pub async fn success_handler(Query(params): Query<SuccessParams>) -> Html<String> {
    let phone = sanitize_phone(params.phone.as_deref().unwrap_or_default());
    page(
        &t!("auth_success_title"),
        &t!("auth_success_body", phone = phone),
    )
}

pub async fn error_handler(Query(params): Query<ErrorParams>) -> Html<String> {
    let message = params
        .message
        .as_deref()
        .and_then(|m| KNOWN_ERRORS.iter().find(|known| **known == m))
        .map(|m| m.to_string())
        .unwrap_or_else(|| t!("auth_error_default").to_string());
    page(&t!("auth_error_title"), &message)
}

pub async fn health_handler() -> &'static str {
    "OK"
}
