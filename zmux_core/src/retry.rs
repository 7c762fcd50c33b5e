use log::debug;

use crate::engine::{ChunkResult, Status};
use crate::error::ZmuxError;
use crate::transfer::Direction;

/// Run one bounded engine call, retrying on the single transient status.
///
/// Each retry re-runs the identical call: the closure must rebuild the
/// attempt from the original, unmodified ranges, because an accelerator
/// attempt is all-or-nothing and a failed one leaves no usable counts.
/// A budget of 0 means the first attempt is the only attempt.
///
/// For decompression, `BUF_ERROR` and `DATA_ERROR` are stream-boundary
/// conditions, not failures: the (possibly partial) counts go back to the
/// caller so it can resume with the remaining input. They never re-arm the
/// retry loop. Everything else non-OK is fatal once the budget is spent.
pub(crate) fn call_with_retry<F>(
    direction: Direction,
    retry_budget: u32,
    mut attempt: F,
) -> Result<(usize, usize), ZmuxError>
where
    F: FnMut() -> ChunkResult,
{
    let mut result = attempt();
    let mut budget = retry_budget;
    while result.status == Status::NOSW_NO_INST_ATTACH && budget > 0 {
        debug!(
            "{} hit transient {}, retrying ({budget} attempts left)",
            direction.op_name(),
            result.status
        );
        budget -= 1;
        result = attempt();
    }
    match result.status {
        Status::OK => Ok((result.consumed, result.produced)),
        Status::BUF_ERROR | Status::DATA_ERROR if direction == Direction::Decompress => {
            Ok((result.consumed, result.produced))
        }
        status => Err(ZmuxError::Engine { op: direction.op_name(), status }),
    }
}
