//! Connection management for the portal host
//!
//! Split into the lifecycle state machine ([`manager`]), the ticket
//! authentication step ([`ticket`]) and the outbound frame handle
//! ([`handler`]).

mod handler;
mod manager;
mod ticket;

pub use handler::FrameSender;
pub use manager::{Connection, ConnectionEvent, ConnectionState};
pub use ticket::fetch_ticket;
