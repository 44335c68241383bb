//! Redis-backed ticket cache.
//!
//! Entries are written with `SET EX`, so Redis expires them on its own:
//! - `ticket:{id}` → JSON ticket, ticket TTL
//! - `user_tickets:{user_id}` → JSON array, ticket TTL
//! - `seat:{session_id}:{seat}` → `1` / `0`, seat TTL, with `%` and `:` in
//!   either part percent-escaped

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{seat_key, ticket_key, user_tickets_key, CacheError, CacheSettings, TicketCache};
use crate::models::Ticket;

/// `SET EX` rejects a zero expiry.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[derive(Clone)]
pub struct RedisTicketCache {
    conn_manager: ConnectionManager,
    settings: CacheSettings,
}

impl RedisTicketCache {
    /// Opens a managed connection to `redis_url`.
    pub async fn new(redis_url: &str, settings: CacheSettings) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await?;

        Ok(Self {
            conn_manager,
            settings,
        })
    }

    async fn set_json<T>(&self, key: String, value: &T, ttl_secs: u64) -> Result<(), CacheError>
    where
        T: serde::Serialize + ?Sized + Sync,
    {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.conn_manager.clone();
        let _: () = conn.set_ex(key, payload, ttl_secs).await?;
        Ok(())
    }

    async fn get_json<T>(&self, key: String) -> Result<Option<T>, CacheError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut conn = self.conn_manager.clone();
        let payload: Option<String> = conn.get(key).await?;

        payload
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn delete(&self, key: String) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[async_trait]
impl TicketCache for RedisTicketCache {
    async fn cache_ticket(&self, ticket: &Ticket) -> Result<(), CacheError> {
        self.set_json(ticket_key(&ticket.id), ticket, expiry_secs(self.settings.ticket_ttl))
            .await
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, CacheError> {
        self.get_json(ticket_key(ticket_id)).await
    }

    async fn invalidate_ticket(&self, ticket_id: &str) -> Result<(), CacheError> {
        self.delete(ticket_key(ticket_id)).await
    }

    async fn cache_user_tickets(
        &self,
        user_id: &str,
        tickets: &[Ticket],
    ) -> Result<(), CacheError> {
        self.set_json(
            user_tickets_key(user_id),
            tickets,
            expiry_secs(self.settings.ticket_ttl),
        )
        .await
    }

    async fn get_user_tickets(&self, user_id: &str) -> Result<Option<Vec<Ticket>>, CacheError> {
        self.get_json(user_tickets_key(user_id)).await
    }

    async fn invalidate_user_tickets(&self, user_id: &str) -> Result<(), CacheError> {
        self.delete(user_tickets_key(user_id)).await
    }

    async fn cache_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
        available: bool,
    ) -> Result<(), CacheError> {
        let flag = if available { "1" } else { "0" };
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set_ex(
                seat_key(session_id, seat_number),
                flag,
                expiry_secs(self.settings.seat_ttl),
            )
            .await?;
        Ok(())
    }

    async fn get_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<Option<bool>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let flag: Option<String> = conn.get(seat_key(session_id, seat_number)).await?;
        Ok(flag.map(|flag| flag == "1"))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
