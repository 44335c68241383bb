use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TicketStore};
use crate::models::{Ticket, TicketFilter, TicketUpdateData};

/// In-process ticket store.
///
/// All writes go through one lock, so the seat check and the insert are a
/// single atomic step. Tickets are kept in insertion order.
#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: RwLock<Vec<Ticket>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

fn seat_held(tickets: &[Ticket], session_id: &str, seat_number: &str) -> bool {
    tickets.iter().any(|t| {
        t.session_id == session_id && t.seat_number == seat_number && t.status.holds_seat()
    })
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn insert_one(&self, mut ticket: Ticket) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write().await;

        if ticket.status.holds_seat()
            && seat_held(&tickets, &ticket.session_id, &ticket.seat_number)
        {
            return Err(StoreError::SeatTaken);
        }

        ticket.id = Uuid::new_v4().to_string();
        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn find_one(&self, filter: &TicketFilter) -> Result<Ticket, StoreError> {
        self.tickets
            .read()
            .await
            .iter()
            .find(|t| filter.matches(t))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .tickets
            .read()
            .await
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn update_one(
        &self,
        filter: &TicketFilter,
        patch: &TicketUpdateData,
    ) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write().await;
        let index = tickets
            .iter()
            .position(|t| filter.matches(t))
            .ok_or(StoreError::NotFound)?;

        let mut updated = tickets[index].clone();
        patch.apply(&mut updated, Utc::now());

        // A patch that revives a seat must not collide with another live ticket.
        if updated.status.holds_seat()
            && !tickets[index].status.holds_seat()
            && seat_held(&tickets, &updated.session_id, &updated.seat_number)
        {
            return Err(StoreError::SeatTaken);
        }

        tickets[index] = updated.clone();
        Ok(updated)
    }

    async fn is_seat_available(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<bool, StoreError> {
        Ok(!seat_held(&self.tickets.read().await, session_id, seat_number))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketStatus;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn reservation(session: &str, seat: &str, user: &str) -> Ticket {
        Ticket::reserve(session, "M1", user, seat, Decimal::new(1000, 2), Utc::now())
    }

    #[tokio::test]
    async fn test_insert_assigns_an_id() {
        let store = MemoryTicketStore::new();
        let ticket = store.insert_one(reservation("S1", "A1", "U1")).await.unwrap();

        assert!(!ticket.id.is_empty());
        assert_eq!(store.find_one(&TicketFilter::by_id(&ticket.id)).await.unwrap(), ticket);
    }

    #[tokio::test]
    async fn test_second_live_ticket_for_a_seat_is_rejected() {
        let store = MemoryTicketStore::new();
        store.insert_one(reservation("S1", "A1", "U1")).await.unwrap();

        let err = store.insert_one(reservation("S1", "A1", "U2")).await.unwrap_err();
        assert!(matches!(err, StoreError::SeatTaken));

        // Same seat in another session is independent.
        store.insert_one(reservation("S2", "A1", "U2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_ticket_frees_the_seat() {
        let store = MemoryTicketStore::new();
        let ticket = store.insert_one(reservation("S1", "A1", "U1")).await.unwrap();
        assert!(!store.is_seat_available("S1", "A1").await.unwrap());

        store
            .update_one(&TicketFilter::by_id(&ticket.id), &TicketUpdateData::cancelled())
            .await
            .unwrap();

        assert!(store.is_seat_available("S1", "A1").await.unwrap());
        store.insert_one(reservation("S1", "A1", "U2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_without_match_is_not_found() {
        let store = MemoryTicketStore::new();
        let err = store
            .update_one(&TicketFilter::by_id("missing"), &TicketUpdateData::cancelled())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_conditional_update_only_hits_matching_status() {
        let store = MemoryTicketStore::new();
        let ticket = store.insert_one(reservation("S1", "A1", "U1")).await.unwrap();
        let reserved_only = TicketFilter::by_id(&ticket.id).with_status(TicketStatus::Reserved);

        store
            .update_one(&reserved_only, &TicketUpdateData::cancelled())
            .await
            .unwrap();
        let err = store
            .update_one(&reserved_only, &TicketUpdateData::cancelled())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_find_with_no_match_is_empty() {
        let store = MemoryTicketStore::new();
        store.insert_one(reservation("S1", "A1", "U1")).await.unwrap();

        assert!(store.find(&TicketFilter::by_user("U9")).await.unwrap().is_empty());
        assert_eq!(store.find(&TicketFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_for_one_seat_admit_exactly_one() {
        let store = Arc::new(MemoryTicketStore::new());

        let attempts = (0..16).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .insert_one(reservation("S1", "A1", &format!("U{i}")))
                    .await
            })
        });

        let mut admitted = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            if attempt.await.unwrap().is_ok() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(store.len().await, 1);
    }
}
