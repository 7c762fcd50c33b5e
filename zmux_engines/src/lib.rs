//! Bundled software implementation of the `zmux_core` codec engine.
//!
//! Stands in for the hardware accelerator: every compress call emits one
//! self-delimiting frame, every decompress call decodes whole frames only
//! and reports stream boundaries through the engine status codes, which is
//! what the cache's chunked transfer loop is built around.

mod deflate_codec;
mod lz4_codec;
mod software;
mod zstd_codec;

pub use software::SoftwareEngine;

/// Why a frame could not be decoded at the current offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameError {
    /// The input ends before the frame does; more bytes may complete it.
    Truncated,
    /// The bytes at this offset are not a valid frame.
    Corrupt,
}
