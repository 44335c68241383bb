#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use ticket_service::cache::{CacheError, CacheSettings, MemoryTicketCache, TicketCache};
use ticket_service::models::Ticket;
use ticket_service::payment::{MockPaymentService, PaymentError, PaymentService};
use ticket_service::reservation::ReservationService;
use ticket_service::store::MemoryTicketStore;

pub struct Harness {
    pub service: ReservationService,
    pub store: Arc<MemoryTicketStore>,
    pub cache: Arc<MemoryTicketCache>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryTicketStore::new());
    let cache = Arc::new(MemoryTicketCache::new(CacheSettings::default()));
    let service = ReservationService::new(
        store.clone(),
        cache.clone(),
        Arc::new(MockPaymentService::new()),
    );
    Harness {
        service,
        store,
        cache,
    }
}

/// A second service over the same store with a cold cache.
pub fn cold_service(store: Arc<MemoryTicketStore>) -> ReservationService {
    ReservationService::new(
        store,
        Arc::new(MemoryTicketCache::default()),
        Arc::new(MockPaymentService::new()),
    )
}

pub fn price() -> Decimal {
    Decimal::new(1250, 2)
}

pub async fn reserve(service: &ReservationService, session: &str, seat: &str, user: &str) -> Ticket {
    service
        .reserve_ticket(session, "M1", user, seat, price())
        .await
        .expect("reservation should succeed")
}

fn outage() -> CacheError {
    CacheError::Backend(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "cache unreachable",
    )))
}

/// Every call fails, as if the cache backend were down.
pub struct BrokenCache;

#[async_trait]
impl TicketCache for BrokenCache {
    async fn cache_ticket(&self, _: &Ticket) -> Result<(), CacheError> {
        Err(outage())
    }
    async fn get_ticket(&self, _: &str) -> Result<Option<Ticket>, CacheError> {
        Err(outage())
    }
    async fn invalidate_ticket(&self, _: &str) -> Result<(), CacheError> {
        Err(outage())
    }
    async fn cache_user_tickets(&self, _: &str, _: &[Ticket]) -> Result<(), CacheError> {
        Err(outage())
    }
    async fn get_user_tickets(&self, _: &str) -> Result<Option<Vec<Ticket>>, CacheError> {
        Err(outage())
    }
    async fn invalidate_user_tickets(&self, _: &str) -> Result<(), CacheError> {
        Err(outage())
    }
    async fn cache_seat_availability(&self, _: &str, _: &str, _: bool) -> Result<(), CacheError> {
        Err(outage())
    }
    async fn get_seat_availability(&self, _: &str, _: &str) -> Result<Option<bool>, CacheError> {
        Err(outage())
    }
    async fn ping(&self) -> Result<(), CacheError> {
        Err(outage())
    }
}

pub struct DecliningPayments;

#[async_trait]
impl PaymentService for DecliningPayments {
    async fn process_payment(&self, _: Decimal, _: &str) -> Result<String, PaymentError> {
        Err(PaymentError::Declined("insufficient funds".to_string()))
    }
}
