//! alive-core: Client-side reconciliation engine for a live status board
//!
//! The board server pushes box events over a one-way stream. This library
//! merges those events with locally scheduled timers into one consistent
//! visual state per box, and tracks whether the stream itself is alive.
//!
//! # Main Entry Points
//!
//! - [`dispatch`] - The [`BoardEngine`] that applies envelopes and timers
//! - [`board`] - Box registry and box state
//! - [`watchdog`] - Staleness, expiry and connection liveness timers
//! - [`clock`] - Timer service with real and virtual clocks
//! - [`protocol`] - Envelope decoding and SSE framing
//! - [`view`] - Display adapters
//! - [`stream`] - Real-time runner over an SSE stream
//! - [`config`] - Configuration management

pub mod board;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod escape;
pub mod events;
pub mod logging;
pub mod protocol;
pub mod stream;
pub mod view;
pub mod watchdog;

// Re-export commonly used types at crate root for convenience
pub use board::{AlertLevel, BoardBox, BoardError, BoxRegistry};
pub use clock::{Clock, Fired, ManualClock, TimerHandle, TimerSlot, TokioClock};
pub use config::AliveConfig;
pub use dispatch::{BoardEngine, BoardUpdate, DispatchStats, ViewScope};
pub use errors::{AliveError, AliveResult, ConfigError};
pub use protocol::{BoxPatch, BoxPayload, Envelope, ProtocolError, decode_envelope};
pub use stream::{StreamEnd, StreamSummary, run_stream};
pub use view::{BoardView, JsonLinesView, RecordingView};
pub use watchdog::{Banner, ResyncReason};

// Re-export logging initialization
pub use logging::init_logging;
