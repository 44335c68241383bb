//! Ephemeral ticket cache.
//!
//! Never authoritative. A `get` returns `Ok(None)` on a miss; callers treat
//! an `Err` exactly like a miss. Seat flags use a shorter TTL than tickets.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Ticket;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryTicketCache;
pub use self::redis::RedisTicketCache;

pub const DEFAULT_TICKET_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SEAT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    #[error("cache payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Expiry for the two classes of cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Single tickets and per-user ticket lists.
    pub ticket_ttl: Duration,
    /// Per-seat availability flags.
    pub seat_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ticket_ttl: DEFAULT_TICKET_TTL,
            seat_ttl: DEFAULT_SEAT_TTL,
        }
    }
}

pub(crate) fn ticket_key(ticket_id: &str) -> String {
    format!("ticket:{ticket_id}")
}

pub(crate) fn user_tickets_key(user_id: &str) -> String {
    format!("user_tickets:{user_id}")
}

/// Escapes `%` and `:` so a component cannot forge a key separator.
fn key_part(raw: &str) -> std::borrow::Cow<'_, str> {
    if raw.contains([':', '%']) {
        raw.replace('%', "%25").replace(':', "%3A").into()
    } else {
        raw.into()
    }
}

pub(crate) fn seat_key(session_id: &str, seat_number: &str) -> String {
    format!("seat:{}:{}", key_part(session_id), key_part(seat_number))
}

#[async_trait]
pub trait TicketCache: Send + Sync {
    async fn cache_ticket(&self, ticket: &Ticket) -> Result<(), CacheError>;
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, CacheError>;
    async fn invalidate_ticket(&self, ticket_id: &str) -> Result<(), CacheError>;

    /// Lists are cached and invalidated whole.
    async fn cache_user_tickets(&self, user_id: &str, tickets: &[Ticket])
        -> Result<(), CacheError>;
    async fn get_user_tickets(&self, user_id: &str) -> Result<Option<Vec<Ticket>>, CacheError>;
    async fn invalidate_user_tickets(&self, user_id: &str) -> Result<(), CacheError>;

    async fn cache_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
        available: bool,
    ) -> Result<(), CacheError>;
    async fn get_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<Option<bool>, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
