pub mod duration;
pub mod envelope;
pub mod errors;
pub mod sse;

pub use duration::{format_duration, parse_duration};
pub use envelope::{BoxPatch, BoxPayload, Envelope, decode_envelope};
pub use errors::ProtocolError;
pub use sse::{SseFrame, read_frame};
