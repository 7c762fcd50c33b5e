use serde::{Deserialize, Serialize};

use crate::error::ZmuxError;

/// Coarsening granularity of `scratch_buffer_size` inside a [`SessionKey`]:
/// the low 10 bits (1 KiB) are discarded when the key is packed. Two configs
/// that differ only below this granularity map to the same session.
pub const KEY_SIZE_SHIFT: u32 = 10;

/// Largest encodable scratch buffer: 12 bits of KiB units (4095 KiB).
pub const MAX_SCRATCH_SIZE: usize = 0xFFF << KEY_SIZE_SHIFT;

/// Default scratch buffer size: 64 KiB, the device's nominal buffer size.
pub const DEFAULT_SCRATCH_SIZE: usize = 64 * 1024;

/// Default compression level, aligned with the deflate default.
pub const DEFAULT_LEVEL: u32 = 6;

// ── Configuration enums ────────────────────────────────────────────────────

/// The compression algorithm bound to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// DEFLATE, in one of the [`DataFormat`] containers.
    Deflate,
    /// LZ4 block framing.
    Lz4,
    /// Zstandard framing.
    Zstd,
}

/// How the engine waits for the accelerator to answer a request.
///
/// `Busy` spins and favors latency; `Periodical` yields between polls and
/// favors throughput on saturated CPUs. The software engine ignores this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollingMode {
    Busy,
    Periodical,
}

/// The container format produced around each compressed frame.
///
/// `Raw` is the algorithm's native framing and the only legal choice for
/// LZ4 and Zstandard. The remaining formats are DEFLATE containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// Algorithm-native framing (bare deflate stream for DEFLATE).
    Raw,
    /// Bare deflate stream prefixed with a 4-byte LE raw-length header.
    FourByte,
    /// Standard gzip member.
    Gzip,
    /// Gzip member with an extended ("QZ") FEXTRA subfield carrying the
    /// frame's raw length.
    GzipExt,
}

// ── SessionConfig ──────────────────────────────────────────────────────────

/// The full configuration tuple a session is created from.
///
/// Immutable once a session exists: the cache keys live sessions by the
/// packed [`SessionKey`] of this struct and never reconfigures them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub algorithm: Algorithm,
    /// Compression level. Legal range depends on the algorithm; see
    /// [`SessionConfig::validate`].
    pub level: u32,
    /// Fall back to software execution when hardware is unavailable. When
    /// false, scratch allocation failure is a hard error.
    pub sw_backup: bool,
    pub polling_mode: PollingMode,
    pub data_format: DataFormat,
    /// Capacity of the accelerator-visible scratch relay, in bytes. Zero
    /// disables scratch buffers; every call then goes directly to the
    /// engine over the caller's full ranges.
    pub scratch_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Deflate,
            level: DEFAULT_LEVEL,
            sw_backup: true,
            polling_mode: PollingMode::Busy,
            data_format: DataFormat::GzipExt,
            scratch_buffer_size: DEFAULT_SCRATCH_SIZE,
        }
    }
}

impl SessionConfig {
    /// Check every field against its legal range, before any engine call.
    ///
    /// Rules:
    /// - level: 1–9 for DEFLATE, 1–12 for LZ4, 1–15 for Zstandard (the key
    ///   retains 4 bits of level, which caps every range at 15);
    /// - scratch_buffer_size: at most [`MAX_SCRATCH_SIZE`];
    /// - data_format: non-DEFLATE algorithms accept only [`DataFormat::Raw`].
    pub fn validate(&self) -> Result<(), ZmuxError> {
        let max_level = match self.algorithm {
            Algorithm::Deflate => 9,
            Algorithm::Lz4 => 12,
            Algorithm::Zstd => 15,
        };
        if self.level < 1 || self.level > max_level {
            return Err(ZmuxError::InvalidConfig(format!(
                "level {} out of range 1..={} for {:?}",
                self.level, max_level, self.algorithm
            )));
        }
        if self.scratch_buffer_size > MAX_SCRATCH_SIZE {
            return Err(ZmuxError::InvalidConfig(format!(
                "scratch buffer size {} exceeds maximum {}",
                self.scratch_buffer_size, MAX_SCRATCH_SIZE
            )));
        }
        if self.algorithm != Algorithm::Deflate && self.data_format != DataFormat::Raw {
            return Err(ZmuxError::InvalidConfig(format!(
                "{:?} format is a DEFLATE container, not valid for {:?}",
                self.data_format, self.algorithm
            )));
        }
        Ok(())
    }
}

// ── SessionKey ─────────────────────────────────────────────────────────────

/// A session configuration packed into non-overlapping bit ranges of a u32.
///
/// Layout, LSB first:
/// ```text
///   bits  0..4   algorithm
///   bits  4..8   level
///   bit   8      sw_backup
///   bits  9..13  polling_mode
///   bits 13..17  data_format
///   bits 17..29  scratch_buffer_size in KiB (low 10 bits discarded)
/// ```
/// The size coarsening is deliberate: configs differing only below 1 KiB
/// resolve to the same live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub u32);

const ALG_SHIFT: u32 = 0;
const LEVEL_SHIFT: u32 = 4;
const SW_SHIFT: u32 = 8;
const POLL_SHIFT: u32 = 9;
const FMT_SHIFT: u32 = 13;
const SIZE_SHIFT: u32 = 17;

impl Algorithm {
    fn bits(self) -> u32 {
        match self {
            Algorithm::Deflate => 0,
            Algorithm::Lz4 => 1,
            Algorithm::Zstd => 2,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Algorithm::Deflate),
            1 => Some(Algorithm::Lz4),
            2 => Some(Algorithm::Zstd),
            _ => None,
        }
    }
}

impl PollingMode {
    fn bits(self) -> u32 {
        match self {
            PollingMode::Busy => 0,
            PollingMode::Periodical => 1,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(PollingMode::Busy),
            1 => Some(PollingMode::Periodical),
            _ => None,
        }
    }
}

impl DataFormat {
    fn bits(self) -> u32 {
        match self {
            DataFormat::Raw => 0,
            DataFormat::FourByte => 1,
            DataFormat::Gzip => 2,
            DataFormat::GzipExt => 3,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(DataFormat::Raw),
            1 => Some(DataFormat::FourByte),
            2 => Some(DataFormat::Gzip),
            3 => Some(DataFormat::GzipExt),
            _ => None,
        }
    }
}

/// Pack a validated config into its [`SessionKey`].
///
/// Total over the legal field ranges; out-of-range fields are rejected here,
/// before any engine call.
pub fn encode(config: &SessionConfig) -> Result<SessionKey, ZmuxError> {
    config.validate()?;
    let size_kb = (config.scratch_buffer_size >> KEY_SIZE_SHIFT) as u32;
    Ok(SessionKey(
        config.algorithm.bits() << ALG_SHIFT
            | config.level << LEVEL_SHIFT
            | (config.sw_backup as u32) << SW_SHIFT
            | config.polling_mode.bits() << POLL_SHIFT
            | config.data_format.bits() << FMT_SHIFT
            | size_kb << SIZE_SHIFT,
    ))
}

/// Unpack a key back into a config.
///
/// Exact inverse of [`encode`] for every field except `scratch_buffer_size`,
/// which comes back truncated to the KiB granularity the key retains.
pub fn decode(key: SessionKey) -> Result<SessionConfig, ZmuxError> {
    let bits = key.0;
    let algorithm = Algorithm::from_bits(bits >> ALG_SHIFT & 0xF)
        .ok_or_else(|| ZmuxError::InvalidConfig(format!("key {bits:#x}: bad algorithm bits")))?;
    let polling_mode = PollingMode::from_bits(bits >> POLL_SHIFT & 0xF)
        .ok_or_else(|| ZmuxError::InvalidConfig(format!("key {bits:#x}: bad polling bits")))?;
    let data_format = DataFormat::from_bits(bits >> FMT_SHIFT & 0xF)
        .ok_or_else(|| ZmuxError::InvalidConfig(format!("key {bits:#x}: bad format bits")))?;
    Ok(SessionConfig {
        algorithm,
        level: bits >> LEVEL_SHIFT & 0xF,
        sw_backup: bits >> SW_SHIFT & 0x1 != 0,
        polling_mode,
        data_format,
        scratch_buffer_size: ((bits >> SIZE_SHIFT & 0xFFF) as usize) << KEY_SIZE_SHIFT,
    })
}
