//! Mapping between domain tickets and rows of the `tickets` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::StoreError;
use crate::models::{Ticket, TicketFilter, TicketUpdateData};

pub(crate) const COLUMNS: &str = "id, session_id, movie_id, user_id, seat_number, price, status, \
     purchase_time, payment_method, payment_id, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct TicketRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub seat_number: String,
    pub price: Decimal,
    pub status: String,
    pub purchase_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRecord> for Ticket {
    type Error = StoreError;

    fn try_from(record: TicketRecord) -> Result<Self, Self::Error> {
        let status = record
            .status
            .parse()
            .map_err(|e| StoreError::CorruptRecord(format!("ticket {}: {e}", record.id)))?;

        Ok(Ticket {
            id: record.id.to_string(),
            session_id: record.session_id.to_string(),
            movie_id: record.movie_id.to_string(),
            user_id: record.user_id.to_string(),
            seat_number: record.seat_number,
            price: record.price,
            status,
            purchase_time: record.purchase_time,
            payment_method: record.payment_method,
            payment_id: record.payment_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

pub(crate) fn parse_id(field: &'static str, value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|_| StoreError::InvalidId {
        field,
        value: value.to_string(),
    })
}

/// Appends ` AND ...` clauses for every present filter field.
///
/// The builder must already hold a `WHERE` clause.
pub(crate) fn push_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &TicketFilter,
) -> Result<(), StoreError> {
    if let Some(id) = &filter.id {
        builder.push(" AND id = ").push_bind(parse_id("id", id)?);
    }
    if let Some(ids) = &filter.ids {
        let ids = ids
            .iter()
            .map(|id| parse_id("id", id))
            .collect::<Result<Vec<_>, _>>()?;
        builder.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(session_id) = &filter.session_id {
        builder
            .push(" AND session_id = ")
            .push_bind(parse_id("session_id", session_id)?);
    }
    if let Some(movie_id) = &filter.movie_id {
        builder
            .push(" AND movie_id = ")
            .push_bind(parse_id("movie_id", movie_id)?);
    }
    if let Some(user_id) = &filter.user_id {
        builder
            .push(" AND user_id = ")
            .push_bind(parse_id("user_id", user_id)?);
    }
    if let Some(seat_number) = &filter.seat_number {
        builder.push(" AND seat_number = ").push_bind(seat_number.clone());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(method) = &filter.payment_method {
        builder.push(" AND payment_method = ").push_bind(method.clone());
    }
    Ok(())
}

/// Appends the `SET` list for a patch. `updated_at` is always written.
pub(crate) fn push_patch(
    builder: &mut QueryBuilder<'_, Postgres>,
    patch: &TicketUpdateData,
    now: DateTime<Utc>,
) {
    builder.push(" SET updated_at = ").push_bind(now);
    if let Some(status) = patch.status {
        builder.push(", status = ").push_bind(status.as_str());
    }
    if let Some(method) = &patch.payment_method {
        builder.push(", payment_method = ").push_bind(method.clone());
    }
    if let Some(payment_id) = &patch.payment_id {
        builder.push(", payment_id = ").push_bind(payment_id.clone());
    }
    if let Some(purchase_time) = patch.purchase_time {
        builder.push(", purchase_time = ").push_bind(purchase_time);
    }
    if let Some(price) = patch.price {
        builder.push(", price = ").push_bind(price);
    }
}
