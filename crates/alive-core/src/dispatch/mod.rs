//! Event dispatch.
//!
//! [`BoardEngine`] routes decoded envelopes and fired timers to the registry
//! and the watchdogs and returns the resulting [`BoardUpdate`]s.

pub mod engine;
pub mod updates;

pub use engine::{BoardEngine, DispatchStats, ViewScope};
pub use updates::BoardUpdate;
