use thiserror::Error;

use crate::payment::PaymentError;
use crate::store::StoreError;

/// Caller-visible failures of the ticket lifecycle operations.
///
/// Cache failures never appear here; they are logged and treated as misses.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket not found")]
    NotFound,

    /// Raised both by the cached availability hint and by the store's own
    /// insert check; callers cannot tell which one fired.
    #[error("seat already taken")]
    SeatAlreadyTaken,

    #[error("ticket is not in the reserved state")]
    TicketNotReserved,

    #[error("invalid ticket data: {0}")]
    InvalidTicketData(String),

    #[error("payment processing failed: {0}")]
    Payment(#[from] PaymentError),

    #[error("ticket store failed to {op}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },
}

impl TicketError {
    /// Maps a store failure, tagging infrastructure errors with `op`.
    pub(crate) fn store(op: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |err| match err {
            StoreError::NotFound => TicketError::NotFound,
            StoreError::SeatTaken => TicketError::SeatAlreadyTaken,
            source => TicketError::Store { op, source },
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TicketError::InvalidTicketData(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_and_seat_taken_keep_their_meaning() {
        assert!(matches!(
            TicketError::store("find ticket")(StoreError::NotFound),
            TicketError::NotFound
        ));
        assert!(matches!(
            TicketError::store("insert ticket")(StoreError::SeatTaken),
            TicketError::SeatAlreadyTaken
        ));
    }

    #[test]
    fn test_infrastructure_errors_carry_the_operation() {
        let err = TicketError::store("insert ticket")(StoreError::CorruptRecord("bad".into()));

        assert_eq!(err.to_string(), "ticket store failed to insert ticket");
        assert!(matches!(err, TicketError::Store { op: "insert ticket", .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
