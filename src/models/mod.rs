pub mod ticket;

pub use ticket::{Ticket, TicketFilter, TicketStatus, TicketUpdateData, UnknownStatus};
