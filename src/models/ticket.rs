use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a ticket.
///
/// `Reserved` is the only non-terminal state; `Paid` and `Cancelled` are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Reserved,
    Paid,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Reserved => "RESERVED",
            TicketStatus::Paid => "PAID",
            TicketStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether a ticket in this state still occupies its seat.
    pub fn holds_seat(&self) -> bool {
        matches!(self, TicketStatus::Reserved | TicketStatus::Paid)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TicketStatus::Reserved)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ticket status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(TicketStatus::Reserved),
            "PAID" => Ok(TicketStatus::Paid),
            "CANCELLED" => Ok(TicketStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A reservation of one seat in one movie session.
///
/// `id` is empty until the store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub session_id: String,
    pub movie_id: String,
    pub user_id: String,
    pub seat_number: String,
    pub price: Decimal,
    pub status: TicketStatus,
    pub purchase_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Builds a fresh, not yet persisted reservation.
    pub fn reserve(
        session_id: impl Into<String>,
        movie_id: impl Into<String>,
        user_id: impl Into<String>,
        seat_number: impl Into<String>,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            session_id: session_id.into(),
            movie_id: movie_id.into(),
            user_id: user_id.into(),
            seat_number: seat_number.into(),
            price,
            status: TicketStatus::Reserved,
            purchase_time: None,
            payment_method: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sparse, conjunctive query over tickets. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub id: Option<String>,
    pub ids: Option<Vec<String>>,
    pub session_id: Option<String>,
    pub movie_id: Option<String>,
    pub user_id: Option<String>,
    pub seat_number: Option<String>,
    pub status: Option<TicketStatus>,
    pub payment_method: Option<String>,
}

impl TicketFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn by_movie(movie_id: impl Into<String>) -> Self {
        Self {
            movie_id: Some(movie_id.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |value| value == actual)
        }

        field(&self.id, &ticket.id)
            && self
                .ids
                .as_ref()
                .map_or(true, |ids| ids.iter().any(|id| *id == ticket.id))
            && field(&self.session_id, &ticket.session_id)
            && field(&self.movie_id, &ticket.movie_id)
            && field(&self.user_id, &ticket.user_id)
            && field(&self.seat_number, &ticket.seat_number)
            && self.status.map_or(true, |status| status == ticket.status)
            && self.payment_method.as_ref().map_or(true, |method| {
                ticket.payment_method.as_deref() == Some(method.as_str())
            })
    }
}

/// Sparse patch. Only present fields are written; `updated_at` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdateData {
    pub status: Option<TicketStatus>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub purchase_time: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
}

impl TicketUpdateData {
    pub fn paid(
        payment_method: impl Into<String>,
        payment_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: Some(TicketStatus::Paid),
            payment_method: Some(payment_method.into()),
            payment_id: Some(payment_id.into()),
            purchase_time: Some(now),
            price: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: Some(TicketStatus::Cancelled),
            ..Self::default()
        }
    }

    pub fn apply(&self, ticket: &mut Ticket, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(method) = &self.payment_method {
            ticket.payment_method = Some(method.clone());
        }
        if let Some(payment_id) = &self.payment_id {
            ticket.payment_id = Some(payment_id.clone());
        }
        if let Some(purchase_time) = self.purchase_time {
            ticket.purchase_time = Some(purchase_time);
        }
        if let Some(price) = self.price {
            ticket.price = price;
        }
        ticket.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Ticket {
        let mut ticket = Ticket::reserve("S1", "M1", "U1", "A1", Decimal::new(1250, 2), Utc::now());
        ticket.id = "t-1".to_string();
        ticket
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [TicketStatus::Reserved, TicketStatus::Paid, TicketStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<TicketStatus>(), Ok(status));
        }
        assert!("EXPIRED".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_in_upper_case() {
        let json = serde_json::to_string(&TicketStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }

    #[test]
    fn test_only_reserved_is_non_terminal() {
        assert!(!TicketStatus::Reserved.is_terminal());
        assert!(TicketStatus::Paid.is_terminal());
        assert!(TicketStatus::Cancelled.is_terminal());
        assert!(TicketStatus::Paid.holds_seat());
        assert!(!TicketStatus::Cancelled.holds_seat());
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(TicketFilter::default().matches(&sample()));
    }

    #[test]
    fn test_filter_fields_are_conjunctive() {
        let ticket = sample();
        let filter = TicketFilter {
            session_id: Some("S1".into()),
            seat_number: Some("A1".into()),
            ..TicketFilter::default()
        };
        assert!(filter.matches(&ticket));

        let filter = TicketFilter {
            session_id: Some("S1".into()),
            seat_number: Some("B2".into()),
            ..TicketFilter::default()
        };
        assert!(!filter.matches(&ticket));
    }

    #[test]
    fn test_empty_id_set_matches_nothing() {
        let filter = TicketFilter {
            ids: Some(Vec::new()),
            ..TicketFilter::default()
        };
        assert!(!filter.matches(&sample()));

        let filter = TicketFilter {
            ids: Some(vec!["other".into(), "t-1".into()]),
            ..TicketFilter::default()
        };
        assert!(filter.matches(&sample()));
    }

    #[test]
    fn test_payment_method_filter_ignores_unpaid_tickets() {
        let filter = TicketFilter {
            payment_method: Some("card".into()),
            ..TicketFilter::default()
        };
        assert!(!filter.matches(&sample()));
    }

    #[test]
    fn test_patch_writes_only_present_fields() {
        let mut ticket = sample();
        let later = ticket.updated_at + Duration::seconds(5);

        TicketUpdateData::cancelled().apply(&mut ticket, later);

        assert_eq!(ticket.status, TicketStatus::Cancelled);
        assert_eq!(ticket.price, Decimal::new(1250, 2));
        assert!(ticket.payment_id.is_none());
        assert_eq!(ticket.updated_at, later);
    }

    #[test]
    fn test_paid_patch_sets_payment_fields() {
        let mut ticket = sample();
        let now = Utc::now();

        TicketUpdateData::paid("card", "pay-1", now).apply(&mut ticket, now);

        assert_eq!(ticket.status, TicketStatus::Paid);
        assert_eq!(ticket.payment_method.as_deref(), Some("card"));
        assert_eq!(ticket.payment_id.as_deref(), Some("pay-1"));
        assert_eq!(ticket.purchase_time, Some(now));
    }
}
