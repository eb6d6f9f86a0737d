use super::models::{Credential, NewPendingEvent, PendingEvent, UserRecord};
use super::{CredentialStore, EventLedger};
use crate::error::{storage_error, BotResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of the stores (for testing and as a Redis fallback)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    /// Kept in insertion order, so the last matching entry is the newest
    events: RwLock<Vec<PendingEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored event, pending or not
    pub async fn all_events(&self) -> Vec<PendingEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user(&self, channel_address: &str) -> BotResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(channel_address).cloned())
    }

    async fn upsert_credential(
        &self,
        channel_address: &str,
        credential: Credential,
    ) -> BotResult<UserRecord> {
        let mut users = self.users.write().await;
        let record = match users.get(channel_address) {
            Some(existing) => UserRecord {
                credential: credential.retaining_refresh_token(&existing.credential.refresh_token),
                ..existing.clone()
            },
            None => UserRecord {
                id: Uuid::new_v4().to_string(),
                channel_address: channel_address.to_string(),
                credential,
                created_at: Utc::now(),
            },
        };
        users.insert(channel_address.to_string(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl EventLedger for InMemoryStore {
    async fn insert(&self, event: NewPendingEvent) -> BotResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut events = self.events.write().await;
        events.push(PendingEvent::from_new(id.clone(), event, Utc::now()));
        Ok(id)
    }

    async fn find_most_recent_pending(
        &self,
        channel_address: &str,
    ) -> BotResult<Option<PendingEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .rev()
            .find(|e| e.channel_address == channel_address && e.is_pending())
            .cloned())
    }

    async fn mark_confirmed(&self, id: &str, calendar_event_id: &str) -> BotResult<()> {
        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| storage_error(&format!("No event with id {}", id)))?;
        event.calendar_event_id = Some(calendar_event_id.to_string());
        Ok(())
    }

    async fn delete_all_pending(&self, channel_address: &str) -> BotResult<usize> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| !(e.channel_address == channel_address && e.is_pending()));
        Ok(before - events.len())
    }
}
