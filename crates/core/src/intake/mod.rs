//! Slot-filling intake: which slots exist, which are required, what to ask next,
//! and how a raw answer becomes a stored slot value.

pub mod engine;
pub mod schema;

pub use engine::{SlotFillEngine, SlotStatus};
pub use schema::SlotSchema;
