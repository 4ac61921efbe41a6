//! portal-client: Client-side session layer for portal hosts
//!
//! Connects to a portal-enabled application over an authenticated
//! WebSocket, mirrors one of its portal components as a registry of typed
//! items, and keeps the mirror synchronized through value, state and
//! reload events. Renderers sit on top of [`session::Portal`] and are out
//! of scope here.

pub mod config;
pub mod connection;
pub mod items;
pub mod registry;
pub mod session;

// Re-export main types at crate root
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionEvent, ConnectionState, FrameSender};
pub use items::{Alignment, ButtonEvent, ItemKind, PortalItem};
pub use registry::ItemRegistry;
pub use session::{DialogHandler, DialogRequest, ItemEvent, Portal, SessionState};
