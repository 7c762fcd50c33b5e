use std::io;
use std::sync::Once;

use crate::FrameError;

static BACKEND_INIT: Once = Once::new();

/// Process-wide, one-shot backend warm-up. Every session setup calls this;
/// only the first does any work.
pub(crate) fn ensure_backend() {
    BACKEND_INIT.call_once(|| {
        log::debug!(
            "zstd backend ready (compression levels 1..={})",
            zstd::zstd_safe::max_c_level()
        );
    });
}

/// Zstd frames use the same 4-byte LE outer length header as LZ4, wrapped
/// around a single zstd frame. The frame carries a content checksum so
/// payload corruption surfaces on decode instead of producing wrong bytes.
pub(crate) fn encode(src: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut compressor = zstd::bulk::Compressor::new(level as i32)?;
    compressor.include_checksum(true)?;
    let frame = compressor.compress(src)?;
    let mut out = Vec::with_capacity(4 + frame.len());
    out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
    out.extend_from_slice(&frame);
    Ok(out)
}

pub(crate) fn decode_frame(src: &[u8]) -> Result<(usize, Vec<u8>), FrameError> {
    if src.len() < 4 {
        return Err(FrameError::Truncated);
    }
    let frame_len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
    let Some(frame) = src.get(4..4 + frame_len) else {
        return Err(FrameError::Truncated);
    };
    let out = zstd::decode_all(frame).map_err(|_| FrameError::Corrupt)?;
    Ok((4 + frame_len, out))
}

/// Worst case for one frame: the library's bound plus the outer header.
pub(crate) fn frame_bound(input_len: usize) -> usize {
    zstd::zstd_safe::compress_bound(input_len) + 4
}
