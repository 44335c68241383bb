//! Ticket lifecycle orchestration.
//!
//! [`ReservationService`] is the only component that talks to both the store
//! and the cache. The store is authoritative; the cache is read first, written
//! after every successful store mutation, and its failures are logged and
//! dropped. The service holds no state of its own between calls, so it is
//! cheap to clone into every request handler.
//!
//! Seat exclusivity is checked twice: a cached availability hint may reject a
//! reservation early, but only the store's insert decides. Two requests that
//! both see "available" race to the store and exactly one wins.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheError, TicketCache};
use crate::models::{Ticket, TicketFilter, TicketStatus, TicketUpdateData};
use crate::payment::PaymentService;
use crate::store::{StoreError, TicketStore};

mod error;

pub use error::TicketError;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Reachability of the backing services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store: bool,
    pub cache: bool,
}

impl HealthReport {
    /// Requests are served whenever the store answers; the cache is optional.
    pub fn is_serving(&self) -> bool {
        self.store
    }

    pub fn status(&self) -> &'static str {
        match (self.store, self.cache) {
            (true, true) => "ok",
            (true, false) => "degraded",
            (false, _) => "unavailable",
        }
    }
}

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn TicketStore>,
    cache: Arc<dyn TicketCache>,
    payments: Arc<dyn PaymentService>,
    currency: String,
}

fn require(field: &str, value: &str) -> Result<(), TicketError> {
    if value.trim().is_empty() {
        return Err(TicketError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Unwraps a cache read, logging a failure and reporting it as a miss.
fn cache_hint<T>(op: &str, key: &str, result: Result<Option<T>, CacheError>) -> Option<T> {
    result.unwrap_or_else(|err| {
        warn!(key, error = %err, "cache {op} failed, falling back to store");
        None
    })
}

/// Logs a failed cache write; the caller's outcome is unaffected.
fn cache_effect(op: &str, key: &str, result: Result<(), CacheError>) {
    if let Err(err) = result {
        warn!(key, error = %err, "cache {op} failed");
    }
}

impl ReservationService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        cache: Arc<dyn TicketCache>,
        payments: Arc<dyn PaymentService>,
    ) -> Self {
        Self {
            store,
            cache,
            payments,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Currency passed to the payment collaborator.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    #[instrument(skip(self))]
    pub async fn reserve_ticket(
        &self,
        session_id: &str,
        movie_id: &str,
        user_id: &str,
        seat_number: &str,
        price: Decimal,
    ) -> Result<Ticket, TicketError> {
        require("session_id", session_id)?;
        require("movie_id", movie_id)?;
        require("user_id", user_id)?;
        require("seat_number", seat_number)?;
        if price.is_sign_negative() {
            return Err(TicketError::invalid("price must not be negative"));
        }

        match self.cached_seat(session_id, seat_number).await {
            Some(false) => return Err(TicketError::SeatAlreadyTaken),
            Some(true) => {}
            None => {
                let available = self
                    .store
                    .is_seat_available(session_id, seat_number)
                    .await
                    .map_err(TicketError::store("check seat availability"))?;
                self.remember_seat(session_id, seat_number, available).await;
                if !available {
                    return Err(TicketError::SeatAlreadyTaken);
                }
            }
        }

        let ticket = Ticket::reserve(session_id, movie_id, user_id, seat_number, price, Utc::now());
        let created = match self.store.insert_one(ticket).await {
            Ok(created) => created,
            Err(StoreError::SeatTaken) => {
                debug!("seat claimed by a concurrent reservation");
                self.remember_seat(session_id, seat_number, false).await;
                return Err(TicketError::SeatAlreadyTaken);
            }
            Err(err) => return Err(TicketError::store("insert ticket")(err)),
        };

        self.remember_ticket(&created).await;
        self.remember_seat(session_id, seat_number, false).await;
        self.forget_user_tickets(user_id).await;

        info!(ticket_id = %created.id, "ticket reserved");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        ticket_id: &str,
        payment_method: &str,
    ) -> Result<Ticket, TicketError> {
        require("ticket_id", ticket_id)?;
        require("payment_method", payment_method)?;

        let ticket = self.load_ticket(ticket_id, "find ticket for payment").await?;
        if ticket.status != TicketStatus::Reserved {
            return Err(TicketError::TicketNotReserved);
        }

        let payment_id = self
            .payments
            .process_payment(ticket.price, &self.currency)
            .await?;
        let patch = TicketUpdateData::paid(payment_method, payment_id, Utc::now());
        let paid = self.transition(&ticket, &patch, "record payment").await?;

        self.remember_ticket(&paid).await;
        self.forget_user_tickets(&paid.user_id).await;

        info!(payment_id = ?paid.payment_id, "ticket paid");
        Ok(paid)
    }

    /// Cancels a reservation and frees its seat. Returns the cancelled ticket.
    #[instrument(skip(self))]
    pub async fn cancel_ticket(&self, ticket_id: &str) -> Result<Ticket, TicketError> {
        require("ticket_id", ticket_id)?;

        let ticket = self.load_ticket(ticket_id, "find ticket for cancellation").await?;
        if ticket.status != TicketStatus::Reserved {
            return Err(TicketError::TicketNotReserved);
        }

        let cancelled = self
            .transition(&ticket, &TicketUpdateData::cancelled(), "cancel ticket")
            .await?;

        self.forget_ticket(ticket_id).await;
        self.forget_user_tickets(&cancelled.user_id).await;
        self.remember_seat(&cancelled.session_id, &cancelled.seat_number, true)
            .await;

        info!("ticket cancelled");
        Ok(cancelled)
    }

    pub async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, TicketError> {
        require("ticket_id", ticket_id)?;

        if let Some(ticket) = self.cached_ticket(ticket_id).await {
            return Ok(ticket);
        }

        let ticket = self
            .store
            .find_one(&TicketFilter::by_id(ticket_id))
            .await
            .map_err(TicketError::store("find ticket"))?;
        self.remember_ticket(&ticket).await;
        Ok(ticket)
    }

    pub async fn get_user_tickets(&self, user_id: &str) -> Result<Vec<Ticket>, TicketError> {
        require("user_id", user_id)?;

        let key = crate::cache::user_tickets_key(user_id);
        if let Some(tickets) = cache_hint(
            "read user tickets",
            &key,
            self.cache.get_user_tickets(user_id).await,
        ) {
            return Ok(tickets);
        }

        let tickets = self
            .store
            .find(&TicketFilter::by_user(user_id))
            .await
            .map_err(TicketError::store("list user tickets"))?;
        cache_effect(
            "write user tickets",
            &key,
            self.cache.cache_user_tickets(user_id, &tickets).await,
        );
        Ok(tickets)
    }

    /// Every ticket in the store. Never cached.
    pub async fn get_all_tickets(&self) -> Result<Vec<Ticket>, TicketError> {
        self.store
            .find(&TicketFilter::default())
            .await
            .map_err(TicketError::store("list tickets"))
    }

    /// Every ticket for one movie. Never cached.
    pub async fn get_movie_tickets(&self, movie_id: &str) -> Result<Vec<Ticket>, TicketError> {
        require("movie_id", movie_id)?;

        self.store
            .find(&TicketFilter::by_movie(movie_id))
            .await
            .map_err(TicketError::store("list movie tickets"))
    }

    /// Advisory availability; only `reserve_ticket` is authoritative.
    pub async fn check_seat_availability(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<bool, TicketError> {
        require("session_id", session_id)?;
        require("seat_number", seat_number)?;

        if let Some(available) = self.cached_seat(session_id, seat_number).await {
            return Ok(available);
        }

        let available = self
            .store
            .is_seat_available(session_id, seat_number)
            .await
            .map_err(TicketError::store("check seat availability"))?;
        self.remember_seat(session_id, seat_number, available).await;
        Ok(available)
    }

    pub async fn health(&self) -> HealthReport {
        let store = match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "ticket store unreachable");
                false
            }
        };
        let cache = match self.cache.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "ticket cache unreachable");
                false
            }
        };
        HealthReport { store, cache }
    }

    /// Cache first, then store. Does not repopulate the cache.
    async fn load_ticket(&self, ticket_id: &str, op: &'static str) -> Result<Ticket, TicketError> {
        if let Some(ticket) = self.cached_ticket(ticket_id).await {
            return Ok(ticket);
        }
        self.store
            .find_one(&TicketFilter::by_id(ticket_id))
            .await
            .map_err(TicketError::store(op))
    }

    /// Applies `patch` only while the ticket is still `Reserved` in the store.
    async fn transition(
        &self,
        ticket: &Ticket,
        patch: &TicketUpdateData,
        op: &'static str,
    ) -> Result<Ticket, TicketError> {
        let guarded = TicketFilter::by_id(&ticket.id).with_status(TicketStatus::Reserved);

        match self.store.update_one(&guarded, patch).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::NotFound) => {
                // Gone, or moved out of Reserved by another request. The
                // copy we acted on is stale either way.
                self.forget_ticket(&ticket.id).await;
                match self.store.find_one(&TicketFilter::by_id(&ticket.id)).await {
                    Ok(_) => Err(TicketError::TicketNotReserved),
                    Err(err) => Err(TicketError::store(op)(err)),
                }
            }
            Err(err) => Err(TicketError::store(op)(err)),
        }
    }

    async fn cached_ticket(&self, ticket_id: &str) -> Option<Ticket> {
        cache_hint(
            "read ticket",
            &crate::cache::ticket_key(ticket_id),
            self.cache.get_ticket(ticket_id).await,
        )
    }

    async fn cached_seat(&self, session_id: &str, seat_number: &str) -> Option<bool> {
        cache_hint(
            "read seat availability",
            &crate::cache::seat_key(session_id, seat_number),
            self.cache.get_seat_availability(session_id, seat_number).await,
        )
    }

    async fn remember_ticket(&self, ticket: &Ticket) {
        cache_effect(
            "write ticket",
            &crate::cache::ticket_key(&ticket.id),
            self.cache.cache_ticket(ticket).await,
        );
    }

    async fn remember_seat(&self, session_id: &str, seat_number: &str, available: bool) {
        cache_effect(
            "write seat availability",
            &crate::cache::seat_key(session_id, seat_number),
            self.cache
                .cache_seat_availability(session_id, seat_number, available)
                .await,
        );
    }

    async fn forget_ticket(&self, ticket_id: &str) {
        cache_effect(
            "invalidate ticket",
            &crate::cache::ticket_key(ticket_id),
            self.cache.invalidate_ticket(ticket_id).await,
        );
    }

    async fn forget_user_tickets(&self, user_id: &str) {
        cache_effect(
            "invalidate user tickets",
            &crate::cache::user_tickets_key(user_id),
            self.cache.invalidate_user_tickets(user_id).await,
        );
    }
}
