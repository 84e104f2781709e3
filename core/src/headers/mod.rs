//! headers/mod.rs
//! R-GOOSE wire layout: registry, field codec and dissector.
//!
//! Notes:
//! - Fixed 38-byte header followed by the GOOSE PDU and the signature fields.
//! - Big-endian across all multi-byte integers.
//! - `SpduLength` counts from offset 10, so `message size = SpduLength + 10`.

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::*;
pub use decode::*;
