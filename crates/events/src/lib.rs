//! Stored webhook events and their on-disk/on-the-wire codec.

pub mod codec;
pub mod payload;
pub mod record;

pub use codec::{DecodeError, EncodeError, decode, decode_lossy, encode};
pub use payload::Payload;
pub use record::EventRecord;
