#[macro_use]
extern crate rust_i18n;

pub mod components;
pub mod config;
pub mod conversation;
pub mod error;
pub mod shutdown;
pub mod startup;
pub mod utils;
pub mod web;

// Initialize i18n
i18n!("locales", fallback = "en");
