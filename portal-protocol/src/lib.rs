//! portal-protocol: Wire schema for the portal control protocol
//!
//! This crate defines the message and argument types exchanged with a
//! portal host over a WebSocket connection, and the codec that validates
//! and decodes raw JSON frames into them.

pub mod codec;
pub mod defs;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{decode_frame, encode_frame, CodecError, Frame};
pub use messages::{header_message, item_update_message, ApiArgument, ApiMessage, HeaderInfo, ItemUpdateInfo};
pub use types::{ApiValue, ArgumentType, EventType};
