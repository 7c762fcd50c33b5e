use log::{trace, warn};

use crate::engine::CodecEngine;
use crate::error::ZmuxError;
use crate::retry;
use crate::session::Session;

/// Which bounded transform a transfer performs. Selected once per call;
/// every chunk of the transfer runs the same kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Decompress,
}

impl Direction {
    pub(crate) fn op_name(self) -> &'static str {
        match self {
            Direction::Compress => "compress",
            Direction::Decompress => "decompress",
        }
    }
}

/// Totals reported back to the host runtime after a transfer: how far the
/// source cursor advanced and how many bytes landed in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferResult {
    pub consumed: usize,
    pub produced: usize,
}

/// Move `src` into `dst` through the session's fixed scratch pair.
///
/// Sessions without scratch buffers get a single direct engine call over the
/// full ranges. Otherwise the loop feeds the engine bounded chunks: the raw
/// side of each chunk is capped by the raw relay's capacity, the packed side
/// by the packed relay's. The relay roles follow the direction: compression
/// reads from the raw relay and writes the packed one, decompression the
/// reverse, so the input side of a decompression always has room for a whole
/// frame produced by a matching compressor.
///
/// The loop stops when the source is exhausted, the destination is full, or
/// an attempt consumes nothing (progress stall; the partial totals are still
/// valid and returned).
pub(crate) fn transfer(
    engine: &mut dyn CodecEngine,
    session: &mut Session,
    direction: Direction,
    src: &[u8],
    dst: &mut [u8],
    retry_budget: u32,
) -> Result<TransferResult, ZmuxError> {
    let handle = session.engine_handle;

    let (Some(raw_relay), Some(packed_relay)) =
        (&mut session.scratch_src, &mut session.scratch_dst)
    else {
        // No scratch relay configured: one direct call over the full ranges.
        let (consumed, produced) = retry::call_with_retry(direction, retry_budget, || {
            match direction {
                Direction::Compress => engine.compress(handle, src, dst, true),
                Direction::Decompress => engine.decompress(handle, src, dst),
            }
        })?;
        return Ok(TransferResult { consumed, produced });
    };

    let (in_relay, out_relay) = match direction {
        Direction::Compress => (raw_relay, packed_relay),
        Direction::Decompress => (packed_relay, raw_relay),
    };

    let mut consumed_total = 0usize;
    let mut produced_total = 0usize;

    while consumed_total < src.len() && produced_total < dst.len() {
        let chunk_in = (src.len() - consumed_total).min(in_relay.capacity());
        let chunk_out = (dst.len() - produced_total).min(out_relay.capacity());

        in_relay.as_mut_slice()[..chunk_in]
            .copy_from_slice(&src[consumed_total..consumed_total + chunk_in]);

        // Final chunk of the caller's stream: it does not fill the relay.
        let last = chunk_in < in_relay.capacity();

        let (consumed, produced) = retry::call_with_retry(direction, retry_budget, || {
            let chunk_src = &in_relay.as_slice()[..chunk_in];
            let chunk_dst = &mut out_relay.as_mut_slice()[..chunk_out];
            match direction {
                Direction::Compress => engine.compress(handle, chunk_src, chunk_dst, last),
                Direction::Decompress => engine.decompress(handle, chunk_src, chunk_dst),
            }
        })?;

        dst[produced_total..produced_total + produced]
            .copy_from_slice(&out_relay.as_slice()[..produced]);
        consumed_total += consumed;
        produced_total += produced;

        trace!(
            "{} chunk: {consumed} in, {produced} out ({consumed_total}/{} total)",
            direction.op_name(),
            src.len()
        );

        if consumed == 0 {
            warn!(
                "{} stalled after {consumed_total} of {} bytes, stopping",
                direction.op_name(),
                src.len()
            );
            break;
        }
    }

    Ok(TransferResult { consumed: consumed_total, produced: produced_total })
}
