use serde::Deserialize;

/// `object` value of WhatsApp Business webhook deliveries
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";
/// Change field that carries inbound messages
pub const MESSAGES_FIELD: &str = "messages";

/// Query parameters of the webhook verification handshake
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl VerifyParams {
    /// Challenge to echo back when the subscription request is valid
    pub fn accept(&self, expected_token: &str) -> Option<&str> {
        let subscribed = self.mode.as_deref() == Some("subscribe");
        let token_matches = self.verify_token.as_deref() == Some(expected_token);
        if subscribed && token_matches {
            Some(self.challenge.as_deref().unwrap_or_default())
        } else {
            None
        }
    }
}

/// Webhook delivery body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

/// One message inside a change
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(flatten)]
    pub content: MessageContent,
}

/// Message content, tagged by the `type` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: TextBody },
    Image { image: MediaRef },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaRef {
    pub id: String,
}

/// A validated inbound chat event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Sender's channel address
    pub sender: String,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Image { media_id: String },
    Text { body: String },
}

impl WebhookPayload {
    /// Messages worth dispatching, in delivery order. Deliveries for other
    /// objects, non-message changes and unsupported message types yield nothing.
    pub fn into_events(self) -> Vec<InboundEvent> {
        if self.object != WHATSAPP_OBJECT {
            return Vec::new();
        }

        self.entry
            .into_iter()
            .flat_map(|entry| entry.changes)
            .filter(|change| change.field == MESSAGES_FIELD)
            .flat_map(|change| change.value.messages)
            .filter_map(|message| {
                let kind = match message.content {
                    MessageContent::Text { text } => InboundKind::Text { body: text.body },
                    MessageContent::Image { image } => InboundKind::Image { media_id: image.id },
                    MessageContent::Unsupported => return None,
                };
                Some(InboundEvent {
                    sender: message.from,
                    kind,
                })
            })
            .collect()
    }
}
