use std::collections::HashMap;

use log::{debug, trace};

use zmux_core::{
    Algorithm, ChunkResult, CodecEngine, DataFormat, EngineHandle, LocalityHint, ScratchBuffer,
    SessionConfig, Status,
};

use crate::{deflate_codec, lz4_codec, zstd_codec, FrameError};

/// The per-session state the kernels need; everything else in the config
/// (polling mode, scratch sizing, backup policy) is the caller's concern.
struct EngineSession {
    algorithm: Algorithm,
    level: u32,
    data_format: DataFormat,
}

/// A pure-software codec engine.
///
/// Each compress call emits exactly one self-delimiting frame for the
/// offered chunk. Decompression decodes whole frames only: a chunk that
/// ends mid-frame comes back `BUF_ERROR` with the counts of the frames
/// that did fit, and a malformed frame comes back `DATA_ERROR`, so the
/// chunked transfer loop can resume or stop on real byte counts.
pub struct SoftwareEngine {
    device_up: bool,
    next_handle: u64,
    sessions: HashMap<u64, EngineSession>,
}

impl SoftwareEngine {
    pub fn new() -> Self {
        Self { device_up: false, next_handle: 0, sessions: HashMap::new() }
    }
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecEngine for SoftwareEngine {
    fn device_init(&mut self, sw_backup: bool) -> Status {
        if self.device_up {
            return Status::DUPLICATE;
        }
        self.device_up = true;
        debug!("software engine up (sw_backup={sw_backup})");
        Status::OK
    }

    fn session_setup(&mut self, config: &SessionConfig) -> Result<EngineHandle, Status> {
        if !self.device_up {
            return Err(Status::FAIL);
        }
        if config.algorithm == Algorithm::Zstd {
            zstd_codec::ensure_backend();
        }
        self.next_handle += 1;
        self.sessions.insert(
            self.next_handle,
            EngineSession {
                algorithm: config.algorithm,
                level: config.level,
                data_format: config.data_format,
            },
        );
        trace!(
            "session {} opened: {:?} level {} format {:?}",
            self.next_handle, config.algorithm, config.level, config.data_format
        );
        Ok(EngineHandle(self.next_handle))
    }

    fn compress(
        &mut self,
        handle: EngineHandle,
        src: &[u8],
        dst: &mut [u8],
        _last: bool,
    ) -> ChunkResult {
        let Some(session) = self.sessions.get(&handle.0) else {
            return ChunkResult::failed(Status::NONE);
        };
        let frame = match session.algorithm {
            Algorithm::Deflate => {
                deflate_codec::encode(src, session.level, session.data_format)
            }
            Algorithm::Lz4 => Ok(lz4_codec::encode(src)),
            Algorithm::Zstd => zstd_codec::encode(src, session.level),
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                debug!("compress kernel failed: {err}");
                return ChunkResult::failed(Status::FAIL);
            }
        };
        if frame.len() > dst.len() {
            return ChunkResult::failed(Status::BUF_ERROR);
        }
        dst[..frame.len()].copy_from_slice(&frame);
        ChunkResult { status: Status::OK, consumed: src.len(), produced: frame.len() }
    }

    fn decompress(&mut self, handle: EngineHandle, src: &[u8], dst: &mut [u8]) -> ChunkResult {
        let Some(session) = self.sessions.get(&handle.0) else {
            return ChunkResult::failed(Status::NONE);
        };
        let mut consumed = 0;
        let mut produced = 0;
        while consumed < src.len() {
            let frame = match session.algorithm {
                Algorithm::Deflate => {
                    deflate_codec::decode_frame(&src[consumed..], session.data_format)
                }
                Algorithm::Lz4 => lz4_codec::decode_frame(&src[consumed..]),
                Algorithm::Zstd => zstd_codec::decode_frame(&src[consumed..]),
            };
            match frame {
                Ok((used, data)) => {
                    if used == 0 || produced + data.len() > dst.len() {
                        return ChunkResult { status: Status::BUF_ERROR, consumed, produced };
                    }
                    dst[produced..produced + data.len()].copy_from_slice(&data);
                    consumed += used;
                    produced += data.len();
                }
                Err(FrameError::Truncated) => {
                    return ChunkResult { status: Status::BUF_ERROR, consumed, produced };
                }
                Err(FrameError::Corrupt) => {
                    return ChunkResult { status: Status::DATA_ERROR, consumed, produced };
                }
            }
        }
        ChunkResult { status: Status::OK, consumed, produced }
    }

    fn max_compressed_length(&self, handle: EngineHandle, input_len: usize) -> usize {
        let algorithm = self
            .sessions
            .get(&handle.0)
            .map(|s| s.algorithm)
            .unwrap_or(Algorithm::Deflate);
        match algorithm {
            // zlib's deflateBound plus gzip header/trailer headroom, which
            // also covers the leaner raw and four-byte containers.
            Algorithm::Deflate => {
                input_len + (input_len >> 12) + (input_len >> 14) + (input_len >> 25) + 13 + 32
            }
            Algorithm::Lz4 => lz4_codec::frame_bound(input_len),
            Algorithm::Zstd => zstd_codec::frame_bound(input_len),
        }
    }

    fn alloc_scratch(&mut self, size: usize, _hint: LocalityHint) -> Option<ScratchBuffer> {
        if size == 0 {
            return None;
        }
        Some(ScratchBuffer::new(size))
    }

    fn free_scratch(&mut self, buf: ScratchBuffer) {
        drop(buf);
    }

    fn session_teardown(&mut self, handle: EngineHandle) -> Status {
        if self.sessions.remove(&handle.0).is_some() {
            trace!("session {} closed", handle.0);
            Status::OK
        } else {
            Status::NONE
        }
    }

    fn device_close(&mut self) {
        self.sessions.clear();
        self.device_up = false;
        debug!("software engine down");
    }
}
