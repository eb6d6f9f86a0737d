use super::models::{Credential, NewPendingEvent, PendingEvent, UserRecord};
use super::{CredentialStore, EventLedger};
use crate::error::{storage_error, BotResult};
use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client as RedisClient};
use tracing::{debug, info};
use uuid::Uuid;

/// Redis keys
mod keys {
    pub const USER_PREFIX: &str = "flyerbot:user:";
    pub const EVENT_PREFIX: &str = "flyerbot:event:";
    /// Sorted set of pending event ids per address, scored by insertion sequence
    pub const PENDING_PREFIX: &str = "flyerbot:pending:";
    /// Counter that orders inserts, also within the same millisecond
    pub const PENDING_SEQUENCE: &str = "flyerbot:pending_seq";
}

fn user_key(channel_address: &str) -> String {
    format!("{}{}", keys::USER_PREFIX, channel_address)
}

fn event_key(id: &str) -> String {
    format!("{}{}", keys::EVENT_PREFIX, id)
}

fn pending_key(channel_address: &str) -> String {
    format!("{}{}", keys::PENDING_PREFIX, channel_address)
}

/// Redis backed credential store and event ledger
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Create a new Redis store; the connection is opened lazily per call
    pub fn new(redis_url: &str) -> BotResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { client })
    }

    /// Get a Redis connection from the client
    async fn get_connection(&self) -> BotResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))
    }

    /// Check that the server answers
    pub async fn ping(&self) -> BotResult<()> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn load_event(
        conn: &mut redis::aio::MultiplexedConnection,
        id: &str,
    ) -> BotResult<Option<PendingEvent>> {
        let data: Option<String> = conn.get(event_key(id)).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn find_user(&self, channel_address: &str) -> BotResult<Option<UserRecord>> {
        let mut conn = self.get_connection().await?;

        let data: Option<String> = conn.get(user_key(channel_address)).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert_credential(
        &self,
        channel_address: &str,
        credential: Credential,
    ) -> BotResult<UserRecord> {
        let existing = self.find_user(channel_address).await?;

        let record = match existing {
            Some(existing) => UserRecord {
                credential: credential.retaining_refresh_token(&existing.credential.refresh_token),
                ..existing
            },
            None => UserRecord {
                id: Uuid::new_v4().to_string(),
                channel_address: channel_address.to_string(),
                credential,
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_string(&record)?;
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(user_key(channel_address), json).await?;

        debug!("Stored credentials for {}", channel_address);
        Ok(record)
    }
}

#[async_trait]
impl EventLedger for RedisStore {
    async fn insert(&self, event: NewPendingEvent) -> BotResult<String> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let channel_address = event.channel_address.clone();
        let record = PendingEvent::from_new(id.clone(), event, created_at);
        let json = serde_json::to_string(&record)?;

        let mut conn = self.get_connection().await?;
        let sequence: i64 = conn.incr(keys::PENDING_SEQUENCE, 1).await?;
        let _: () = conn.set(event_key(&id), json).await?;
        let _: () = conn
            .zadd(pending_key(&channel_address), &id, sequence)
            .await?;

        info!("Stored pending event {} for {}", id, channel_address);
        Ok(id)
    }

    async fn find_most_recent_pending(
        &self,
        channel_address: &str,
    ) -> BotResult<Option<PendingEvent>> {
        let mut conn = self.get_connection().await?;

        let key = pending_key(channel_address);

        loop {
            let newest: Vec<String> = conn.zrevrange(&key, 0, 0).await?;
            let Some(id) = newest.into_iter().next() else {
                return Ok(None);
            };

            match Self::load_event(&mut conn, &id).await? {
                Some(event) if event.is_pending() => return Ok(Some(event)),
                _ => {
                    // Index entry without a pending record behind it, try the next one
                    debug!("Dropping stale pending index entry {}", id);
                    let _: () = conn.zrem(&key, &id).await?;
                }
            }
        }
    }

    async fn mark_confirmed(&self, id: &str, calendar_event_id: &str) -> BotResult<()> {
        let mut conn = self.get_connection().await?;

        let mut event = Self::load_event(&mut conn, id)
            .await?
            .ok_or_else(|| storage_error(&format!("No event with id {}", id)))?;
        event.calendar_event_id = Some(calendar_event_id.to_string());

        let json = serde_json::to_string(&event)?;
        let _: () = conn.set(event_key(id), json).await?;
        let _: () = conn.zrem(pending_key(&event.channel_address), id).await?;

        info!("Event {} confirmed as {}", id, calendar_event_id);
        Ok(())
    }

    async fn delete_all_pending(&self, channel_address: &str) -> BotResult<usize> {
        let mut conn = self.get_connection().await?;

        let key = pending_key(channel_address);
        let ids: Vec<String> = conn.zrange(&key, 0, -1).await?;

        for id in &ids {
            let _: () = conn.del(event_key(id)).await?;
        }
        let _: () = conn.del(&key).await?;

        info!("Deleted {} pending events for {}", ids.len(), channel_address);
        Ok(ids.len())
    }
}
