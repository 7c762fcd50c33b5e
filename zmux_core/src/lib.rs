//! Session multiplexing and chunked data movement for a stateful codec
//! engine: a bounded per-context session cache with reference counting, a
//! retry policy for transient hardware unavailability, and a transfer loop
//! that relays arbitrarily large buffers through a fixed scratch pair.

pub mod config;
pub mod engine;
pub mod error;
mod retry;
pub mod session;
pub mod transfer;

pub use config::{Algorithm, DataFormat, PollingMode, SessionConfig, SessionKey};
pub use engine::{ChunkResult, CodecEngine, EngineHandle, LocalityHint, ScratchBuffer, Status};
pub use error::ZmuxError;
pub use session::{SessionCache, SessionHandle, MAX_SESSIONS};
pub use transfer::{Direction, TransferResult};
