use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::record::{parse_id, push_filter, push_patch, TicketRecord, COLUMNS};
use super::{StoreError, TicketStore};
use crate::models::{Ticket, TicketFilter, TicketUpdateData};

/// Postgres-backed ticket store.
///
/// Seat exclusivity is enforced by the partial unique index
/// `tickets_live_seat_idx` on `(session_id, seat_number)` over live statuses,
/// so concurrent inserts for one seat cannot both commit.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool and applies the embedded migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;

        tracing::info!("ticket store migrations applied");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert_one(&self, ticket: Ticket) -> Result<Ticket, StoreError> {
        let session_id = parse_id("session_id", &ticket.session_id)?;
        let movie_id = parse_id("movie_id", &ticket.movie_id)?;
        let user_id = parse_id("user_id", &ticket.user_id)?;

        let query = format!(
            "INSERT INTO tickets (session_id, movie_id, user_id, seat_number, price, status, \
             purchase_time, payment_method, payment_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );

        let record: TicketRecord = sqlx::query_as(&query)
            .bind(session_id)
            .bind(movie_id)
            .bind(user_id)
            .bind(&ticket.seat_number)
            .bind(ticket.price)
            .bind(ticket.status.as_str())
            .bind(ticket.purchase_time)
            .bind(&ticket.payment_method)
            .bind(&ticket.payment_id)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::SeatTaken,
                other => StoreError::Database(other),
            })?;

        record.try_into()
    }

    async fn find_one(&self, filter: &TicketFilter) -> Result<Ticket, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM tickets WHERE TRUE"
        ));
        push_filter(&mut builder, filter)?;
        builder.push(" ORDER BY created_at LIMIT 1");

        builder
            .build_query_as::<TicketRecord>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn find(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM tickets WHERE TRUE"
        ));
        push_filter(&mut builder, filter)?;
        builder.push(" ORDER BY created_at");

        builder
            .build_query_as::<TicketRecord>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Ticket::try_from)
            .collect()
    }

    async fn update_one(
        &self,
        filter: &TicketFilter,
        patch: &TicketUpdateData,
    ) -> Result<Ticket, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tickets");
        push_patch(&mut builder, patch, Utc::now());
        builder.push(" WHERE id = (SELECT id FROM tickets WHERE TRUE");
        push_filter(&mut builder, filter)?;
        builder.push(format!(
            " ORDER BY created_at LIMIT 1 FOR UPDATE) RETURNING {COLUMNS}"
        ));

        builder
            .build_query_as::<TicketRecord>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn is_seat_available(
        &self,
        session_id: &str,
        seat_number: &str,
    ) -> Result<bool, StoreError> {
        let session_id = parse_id("session_id", session_id)?;

        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM tickets
                WHERE session_id = $1 AND seat_number = $2 AND status IN ('RESERVED', 'PAID')
             )",
        )
        .bind(session_id)
        .bind(seat_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(!taken)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
