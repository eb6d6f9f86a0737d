mod client;
pub mod models;

pub use client::{Messenger, WhatsAppClient};
pub use models::{InboundEvent, InboundKind, VerifyParams, WebhookPayload};
