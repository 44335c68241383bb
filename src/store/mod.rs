//! Durable ticket storage.
//!
//! The store is the single source of truth. Every implementation must enforce
//! seat exclusivity on its own: at most one `Reserved` or `Paid` ticket per
//! `(session_id, seat_number)`, even under concurrent inserts.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Ticket, TicketFilter, TicketUpdateData};

pub mod memory;
pub mod postgres;
pub mod record;

pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ticket not found")]
    NotFound,

    #[error("seat is held by another live ticket")]
    SeatTaken,

    #[error("invalid {field} identifier '{value}'")]
    InvalidId { field: &'static str, value: String },

    #[error("corrupt ticket record: {0}")]
    CorruptRecord(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Persists a new ticket and returns it with its assigned id.
    ///
    /// Fails with [`StoreError::SeatTaken`] if the seat is already held.
    async fn insert_one(&self, ticket: Ticket) -> Result<Ticket, StoreError>;

    async fn find_one(&self, filter: &TicketFilter) -> Result<Ticket, StoreError>;

    /// Returns every match; no match is an empty vector, not an error.
    async fn find(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;

    /// Patches the first matching ticket and returns its new state.
    async fn update_one(
        &self,
        filter: &TicketFilter,
        patch: &TicketUpdateData,
    ) -> Result<Ticket, StoreError>;

    async fn is_seat_available(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
