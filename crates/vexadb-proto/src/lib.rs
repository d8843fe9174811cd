//! Wire messages for VexaDB
//!
//! One set of message structs backs both protocol surfaces: the binary RPC
//! encodes them with prost, the HTTP surface with serde_json. JSON follows
//! the usual protobuf conventions: 64-bit integers as strings, bytes as
//! base64, float specials as strings, unknown fields ignored.

pub mod json;
mod messages;
pub mod method;

pub use messages::*;
