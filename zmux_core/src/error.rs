use std::fmt;

use thiserror::Error;

use crate::engine::Status;

/// Failure taxonomy surfaced to the host runtime.
///
/// Configuration and capacity problems are caught before any engine call and
/// create no partial state. `Engine` carries the translated status of a fatal
/// engine answer; transient and stream-boundary statuses never reach this
/// type (the retry policy absorbs them).
#[derive(Debug, Error)]
pub enum ZmuxError {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("session limit exceeded: all {0} slots in this context are in use")]
    SessionLimitExceeded(usize),

    #[error("session is not initialized or was already torn down")]
    InvalidSession,

    #[error("scratch allocation of {0} bytes failed and no software backup is configured")]
    ScratchAlloc(usize),

    #[error("engine {op} failed: {status}")]
    Engine { op: &'static str, status: Status },
}

impl Status {
    /// Stable human-readable category for an engine status code.
    ///
    /// Total: codes this layer has never heard of map to a generic category
    /// rather than panicking.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "ok",
            1 => "device already initialized",
            2 => "request forced to software path",
            -1 => "invalid parameters",
            -2 => "engine failure",
            -3 => "destination buffer too small",
            -4 => "input stream boundary or corrupt data",
            -5 => "engine timeout",
            -100 => "integrity check failed",
            11 => "no hardware available",
            12 => "no memory driver",
            13 => "no hardware instance attachable",
            14 => "pinned memory exhausted",
            15 => "destination pinned memory exhausted",
            16 => "unsupported data format",
            100 => "session not set up",
            -101 => "no hardware and no software fallback",
            -102 => "no memory driver and no software fallback",
            -103 => "no hardware instance attachable, no software fallback",
            -104 => "pinned memory exhausted, no software fallback",
            -105 => "software fallback unavailable",
            -116 => "unsupported data format, no software fallback",
            -117 => "post-processing failed",
            -118 => "metadata overflow",
            -119 => "argument out of range",
            -200 => "operation not supported",
            _ => "unknown engine error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_translate_without_panicking() {
        assert_eq!(Status(-9999).name(), "unknown engine error");
        assert_eq!(Status(i32::MIN).name(), "unknown engine error");
    }

    #[test]
    fn known_codes_have_stable_names() {
        assert_eq!(Status::OK.name(), "ok");
        assert_eq!(
            Status::NOSW_NO_INST_ATTACH.name(),
            "no hardware instance attachable, no software fallback"
        );
    }

    #[test]
    fn engine_error_formats_through_translator() {
        let err = ZmuxError::Engine { op: "compress", status: Status::FAIL };
        assert_eq!(err.to_string(), "engine compress failed: engine failure (code -2)");
    }
}
