pub mod errors;
pub mod registry;
pub mod types;

pub use errors::BoardError;
pub use registry::{BoxEntry, BoxRegistry, PatchOutcome};
pub use types::{AlertLevel, BoardBox, HistoryEntry};
