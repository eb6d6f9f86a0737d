mod memory;
pub mod models;
mod redis_store;

pub use memory::InMemoryStore;
pub use models::{Credential, NewPendingEvent, PendingEvent, UserRecord};
pub use redis_store::RedisStore;

use crate::error::BotResult;
use async_trait::async_trait;

/// Persisted per-user OAuth credentials
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Look up the user registered for a channel address
    async fn find_user(&self, channel_address: &str) -> BotResult<Option<UserRecord>>;

    /// Create the user or replace its credential. A credential without a refresh
    /// token keeps the previously stored one.
    async fn upsert_credential(
        &self,
        channel_address: &str,
        credential: Credential,
    ) -> BotResult<UserRecord>;
}

/// Extracted events awaiting confirmation
///
/// Only the most recently created pending row of a user is addressable. The
/// lookup and the later [`EventLedger::mark_confirmed`] are separate calls, so two
/// concurrent confirmations for the same user can both see the same row.
#[async_trait]
pub trait EventLedger: Send + Sync + 'static {
    /// Store a new pending event and return its identifier
    async fn insert(&self, event: NewPendingEvent) -> BotResult<String>;

    /// Newest event for the address that has no calendar event yet
    async fn find_most_recent_pending(&self, channel_address: &str)
        -> BotResult<Option<PendingEvent>>;

    /// Attach the remote calendar identifier, taking the event out of pending
    async fn mark_confirmed(&self, id: &str, calendar_event_id: &str) -> BotResult<()>;

    /// Delete every pending event of the address, returning how many were removed
    async fn delete_all_pending(&self, channel_address: &str) -> BotResult<usize>;
}
