//! `hooklog-core` — foundation building blocks shared by every hooklog crate.
//!
//! This crate contains **pure** primitives (no storage or transport concerns):
//! identifiers, the injectable time and id sources, and the core error model.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, IdGenerator, ManualClock, SequentialIds, SystemClock, UuidV7Ids};
pub use error::{CoreError, CoreResult};
pub use id::EventId;
