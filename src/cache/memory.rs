use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{seat_key, ticket_key, user_tickets_key, CacheError, CacheSettings, TicketCache};
use crate::models::Ticket;

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Reads a live entry, dropping it first if it has expired.
fn read_live<T: Clone>(map: &DashMap<String, Expiring<T>>, key: &str) -> Option<T> {
    let now = Instant::now();
    map.remove_if(key, |_, entry| !entry.is_live(now));
    map.get(key).map(|entry| entry.value.clone())
}

/// In-process cache with per-entry expiry.
///
/// Used when no Redis URL is configured and by the test suite.
#[derive(Debug, Default)]
pub struct MemoryTicketCache {
    settings: CacheSettings,
    tickets: DashMap<String, Expiring<Ticket>>,
    user_tickets: DashMap<String, Expiring<Vec<Ticket>>>,
    seats: DashMap<String, Expiring<bool>>,
}

impl MemoryTicketCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.tickets.len() + self.user_tickets.len() + self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.tickets.retain(|_, entry| entry.is_live(now));
        self.user_tickets.retain(|_, entry| entry.is_live(now));
        self.seats.retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl TicketCache for MemoryTicketCache {
    async fn cache_ticket(&self, ticket: &Ticket) -> Result<(), CacheError> {
        self.tickets.insert(
            ticket_key(&ticket.id),
            Expiring::new(ticket.clone(), self.settings.ticket_ttl),
        );
        Ok(())
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, CacheError> {
        Ok(read_live(&self.tickets, &ticket_key(ticket_id)))
    }

    async fn invalidate_ticket(&self, ticket_id: &str) -> Result<(), CacheError> {
        self.tickets.remove(&ticket_key(ticket_id));
        Ok(())
    }

    async fn cache_user_tickets(
        &self,
        user_id: &str,
        tickets: &[Ticket],
    ) -> Result<(), CacheError> {
        self.user_tickets.insert(
            user_tickets_key(user_id),
            Expiring::new(tickets.to_vec(), self.settings.ticket_ttl),
        );
        Ok(())
    }

    async fn get_user_tickets(&self, user_id: &str) -> Result<Option<Vec<Ticket>>, CacheError> {
        Ok(read_live(&self.user_tickets, &user_tickets_key(user_id)))
    }

    async fn invalidate_user_tickets(&self, user_id: &str) -> Result<(), CacheError> {
        self.user_tickets.remove(&user_tickets_key(user_id));
        Ok(())
    }

    async fn cache_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
        available: bool,
    ) -> Result<(), CacheError> {
        self.seats.insert(
            seat_key(session_id, seat_number),
            Expiring::new(available, self.settings.seat_ttl),
        );
        Ok(())
    }

    async fn get_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<Option<bool>, CacheError> {
        Ok(read_live(&self.seats, &seat_key(session_id, seat_number)))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn ticket(id: &str) -> Ticket {
        let mut ticket = Ticket::reserve("S1", "M1", "U1", "A1", Decimal::new(500, 2), Utc::now());
        ticket.id = id.to_string();
        ticket
    }

    fn short_lived() -> MemoryTicketCache {
        MemoryTicketCache::new(CacheSettings {
            ticket_ttl: Duration::from_millis(200),
            seat_ttl: Duration::from_millis(20),
        })
    }

    #[tokio::test]
    async fn test_miss_is_none_not_error() {
        let cache = MemoryTicketCache::default();

        assert!(cache.get_ticket("t1").await.unwrap().is_none());
        assert!(cache.get_user_tickets("u1").await.unwrap().is_none());
        assert!(cache.get_seat_availability("S1", "A1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ticket_round_trip_and_invalidate() {
        let cache = MemoryTicketCache::default();
        let stored = ticket("t1");
        cache.cache_ticket(&stored).await.unwrap();

        assert_eq!(cache.get_ticket("t1").await.unwrap(), Some(stored));

        cache.invalidate_ticket("t1").await.unwrap();
        assert!(cache.get_ticket("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_user_list_is_a_hit() {
        let cache = MemoryTicketCache::default();
        cache.cache_user_tickets("u1", &[]).await.unwrap();

        assert_eq!(cache.get_user_tickets("u1").await.unwrap(), Some(Vec::new()));

        cache.invalidate_user_tickets("u1").await.unwrap();
        assert!(cache.get_user_tickets("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seat_flag_expires_before_tickets() {
        let cache = short_lived();
        cache.cache_ticket(&ticket("t1")).await.unwrap();
        cache.cache_seat_availability("S1", "A1", false).await.unwrap();
        assert_eq!(cache.get_seat_availability("S1", "A1").await.unwrap(), Some(false));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get_seat_availability("S1", "A1").await.unwrap().is_none());
        assert!(cache.get_ticket("t1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_drops_expired_entries() {
        let cache = short_lived();
        cache.cache_seat_availability("S1", "A1", true).await.unwrap();
        cache.cache_seat_availability("S1", "A2", true).await.unwrap();
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.purge_expired();

        assert!(cache.is_empty());
    }
}
