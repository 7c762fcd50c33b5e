use lz4_flex::block::get_maximum_output_size;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::FrameError;

/// LZ4 frames are a 4-byte LE block length followed by a size-prepended
/// block. The outer header makes the frame self-delimiting so decode can
/// step through concatenated frames without guessing.
pub(crate) fn encode(src: &[u8]) -> Vec<u8> {
    let block = compress_prepend_size(src);
    let mut out = Vec::with_capacity(4 + block.len());
    out.extend_from_slice(&(block.len() as u32).to_le_bytes());
    out.extend_from_slice(&block);
    out
}

pub(crate) fn decode_frame(src: &[u8]) -> Result<(usize, Vec<u8>), FrameError> {
    if src.len() < 4 {
        return Err(FrameError::Truncated);
    }
    let block_len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
    let Some(block) = src.get(4..4 + block_len) else {
        return Err(FrameError::Truncated);
    };
    let out = decompress_size_prepended(block).map_err(|_| FrameError::Corrupt)?;
    Ok((4 + block_len, out))
}

/// Worst case for one frame: block bound plus the two length headers.
pub(crate) fn frame_bound(input_len: usize) -> usize {
    get_maximum_output_size(input_len) + 8
}
