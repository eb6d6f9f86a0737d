mod commands;
pub mod replies;

pub use commands::Command;

use crate::components::event_extractor::{normalize_image, validate_event_details};
use crate::components::storage::{Credential, NewPendingEvent, UserRecord};
use crate::components::whatsapp::{InboundEvent, InboundKind};
use crate::components::{
    CalendarPublisher, CredentialStore, EventExtractor, EventLedger, Messenger, TokenRefresher,
};
use crate::config::{Config, ImageSettings};
use crate::error::BotResult;
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Services the controller talks to
#[derive(Clone)]
pub struct Collaborators {
    pub messenger: Arc<dyn Messenger>,
    pub extractor: Arc<dyn EventExtractor>,
    pub credentials: Arc<dyn CredentialStore>,
    pub ledger: Arc<dyn EventLedger>,
    pub refresher: Arc<dyn TokenRefresher>,
    pub publisher: Arc<dyn CalendarPublisher>,
}

/// Plain settings the controller needs
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub public_base_url: String,
    pub image: ImageSettings,
    pub timezone: Tz,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> BotResult<Self> {
        Ok(Self {
            public_base_url: config.public_base_url.clone(),
            image: config.image,
            timezone: config.tz()?,
        })
    }
}

/// Result of a confirmation attempt, mapped to exactly one reply
enum ConfirmOutcome {
    NoPending,
    NoUser,
    Created(String),
}

/// Drives one inbound chat event to completion
///
/// Every handled event produces at most one outbound reply and at most one
/// ledger write. Collaborator failures are logged and turned into chat replies,
/// they never escape [`ConversationController::handle`].
pub struct ConversationController {
    services: Collaborators,
    settings: ControllerSettings,
}

impl ConversationController {
    pub fn new(services: Collaborators, settings: ControllerSettings) -> Self {
        Self { services, settings }
    }

    pub async fn handle(&self, event: InboundEvent) {
        let InboundEvent { sender, kind } = event;

        let reply = match kind {
            InboundKind::Image { media_id } => self.handle_image(&sender, &media_id).await,
            InboundKind::Text { body } => self.handle_text(&sender, &body).await,
        };

        if let Err(e) = self.services.messenger.send_text(&sender, &reply).await {
            error!("Failed to send reply to {}: {:?}", sender, e);
        }
    }

    async fn handle_image(&self, sender: &str, media_id: &str) -> String {
        info!("Processing image {} from {}", media_id, sender);

        match self.process_image(sender, media_id).await {
            Ok(reply) => reply,
            Err(e) if e.requires_reauthentication() => {
                warn!("Refresh token of {} was revoked", sender);
                replies::reauthenticate(&self.settings.public_base_url, sender)
            }
            Err(e) => {
                error!("Error processing image from {}: {:?}", sender, e);
                replies::text("image_failed")
            }
        }
    }

    async fn process_image(&self, sender: &str, media_id: &str) -> BotResult<String> {
        let raw = self.services.messenger.fetch_media(media_id).await?;
        let image = normalize_image(&raw, &self.settings.image)?;
        let details = self.services.extractor.extract(&image).await?;

        // Only reported; the extracted event is stored either way
        if let Err(reason) = validate_event_details(&details, self.settings.timezone) {
            warn!("Extracted event for {} looks invalid: {}", sender, reason);
        }

        let Some(user) = self.services.credentials.find_user(sender).await? else {
            info!("No credential for {}, sending authorization link", sender);
            return Ok(replies::authorization_prompt(
                &self.settings.public_base_url,
                sender,
            ));
        };

        self.fresh_credential(&user).await?;

        let id = self
            .services
            .ledger
            .insert(NewPendingEvent {
                user_id: user.id.clone(),
                channel_address: sender.to_string(),
                title: details.title.clone(),
                description: details.description.clone(),
                start_date: details.start_date.clone(),
                end_date: details.end_date.clone(),
                location: details.location.clone(),
                invitees: Vec::new(),
            })
            .await?;
        info!("Stored pending event {} for {}", id, sender);

        Ok(replies::event_summary(&details, &id, self.settings.timezone))
    }

    async fn handle_text(&self, sender: &str, body: &str) -> String {
        let command = Command::parse(body);
        debug!("Text from {} parsed as {:?}", sender, command);

        match command {
            Command::Confirm => self.handle_confirm(sender).await,
            Command::Cancel => self.handle_cancel(sender).await,
            Command::Edit => replies::text("edit_instructions"),
            Command::PendingEdit(request) => {
                info!("Edit request from {} not applied: {}", sender, request);
                replies::text("edit_unsupported")
            }
            Command::Help => replies::text("help"),
        }
    }

    async fn handle_confirm(&self, sender: &str) -> String {
        match self.confirm(sender).await {
            Ok(ConfirmOutcome::NoPending) => replies::text("no_pending_event"),
            Ok(ConfirmOutcome::NoUser) => {
                replies::authenticate_first(&self.settings.public_base_url, sender)
            }
            Ok(ConfirmOutcome::Created(calendar_event_id)) => {
                replies::event_created(&calendar_event_id)
            }
            Err(e) if e.requires_reauthentication() => {
                warn!("Refresh token of {} was revoked", sender);
                replies::reauthenticate(&self.settings.public_base_url, sender)
            }
            Err(e) => {
                error!("Error confirming event for {}: {:?}", sender, e);
                replies::text("confirm_failed")
            }
        }
    }

    async fn confirm(&self, sender: &str) -> BotResult<ConfirmOutcome> {
        let Some(pending) = self.services.ledger.find_most_recent_pending(sender).await? else {
            return Ok(ConfirmOutcome::NoPending);
        };

        let Some(user) = self.services.credentials.find_user(sender).await? else {
            return Ok(ConfirmOutcome::NoUser);
        };

        let credential = self.fresh_credential(&user).await?;
        let calendar_event_id = self
            .services
            .publisher
            .create_event(&credential, &pending)
            .await?;

        self.services
            .ledger
            .mark_confirmed(&pending.id, &calendar_event_id)
            .await?;
        info!(
            "Confirmed event {} for {} as {}",
            pending.id, sender, calendar_event_id
        );

        Ok(ConfirmOutcome::Created(calendar_event_id))
    }

    async fn handle_cancel(&self, sender: &str) -> String {
        match self.services.ledger.delete_all_pending(sender).await {
            Ok(removed) => {
                info!("Cancelled {} pending event(s) for {}", removed, sender);
                replies::text("event_cancelled")
            }
            Err(e) => {
                error!("Error cancelling event for {}: {:?}", sender, e);
                replies::text("cancel_failed")
            }
        }
    }

    /// Current credential, refreshed and persisted first when expired
    async fn fresh_credential(&self, user: &UserRecord) -> BotResult<Credential> {
        if !user.credential.is_expired_at(Utc::now()) {
            return Ok(user.credential.clone());
        }

        info!("Refreshing expired access token for {}", user.channel_address);
        let refreshed = self
            .services
            .refresher
            .refresh(&user.credential.refresh_token)
            .await?
            .retaining_refresh_token(&user.credential.refresh_token);

        let stored = self
            .services
            .credentials
            .upsert_credential(&user.channel_address, refreshed)
            .await?;

        Ok(stored.credential)
    }
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

