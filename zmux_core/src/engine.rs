use crate::config::SessionConfig;

/// Raw status code returned by a codec engine call.
///
/// Kept as a transparent integer rather than a closed enum so codes from
/// newer engine revisions survive the trip through [`Status::name`] instead
/// of failing to parse. The constant set mirrors the accelerator library's
/// documented code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const OK: Status = Status(0);
    /// Device already initialized; treated as success by callers.
    pub const DUPLICATE: Status = Status(1);
    /// Request was served by the software path instead of hardware.
    pub const FORCE_SW: Status = Status(2);
    pub const PARAMS: Status = Status(-1);
    pub const FAIL: Status = Status(-2);
    /// Destination too small, or input ends on a frame boundary. Non-fatal
    /// for decompression: the partial counts are the result.
    pub const BUF_ERROR: Status = Status(-3);
    /// Input does not continue a valid stream at the current offset.
    /// Non-fatal for decompression, same as `BUF_ERROR`.
    pub const DATA_ERROR: Status = Status(-4);
    pub const TIMEOUT: Status = Status(-5);
    pub const INTEG: Status = Status(-100);
    pub const NO_HW: Status = Status(11);
    pub const NO_MDRV: Status = Status(12);
    pub const NO_INST_ATTACH: Status = Status(13);
    pub const LOW_MEM: Status = Status(14);
    pub const LOW_DEST_MEM: Status = Status(15);
    pub const UNSUPPORTED_FMT: Status = Status(16);
    /// Session exists but was never set up.
    pub const NONE: Status = Status(100);
    pub const NOSW_NO_HW: Status = Status(-101);
    pub const NOSW_NO_MDRV: Status = Status(-102);
    /// The single transient code: no hardware instance could be attached and
    /// no software fallback was configured. The retry policy keys on this.
    pub const NOSW_NO_INST_ATTACH: Status = Status(-103);
    pub const NOSW_LOW_MEM: Status = Status(-104);
    pub const NO_SW_AVAIL: Status = Status(-105);
    pub const NOSW_UNSUPPORTED_FMT: Status = Status(-116);
    pub const POST_PROCESS_ERROR: Status = Status(-117);
    pub const METADATA_OVERFLOW: Status = Status(-118);
    pub const OUT_OF_RANGE: Status = Status(-119);
    pub const NOT_SUPPORTED: Status = Status(-200);

    #[inline]
    pub fn is_ok(self) -> bool {
        self == Status::OK
    }
}

/// Opaque identifier for a session inside the engine. Issued by
/// [`CodecEngine::session_setup`], dead after [`CodecEngine::session_teardown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(pub u64);

/// Placement preference for scratch memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalityHint {
    /// Accelerator-visible (pinned) memory near the device.
    Pinned,
    /// Ordinary pageable host memory.
    Pageable,
}

/// A fixed-capacity accelerator-visible memory region.
///
/// Allocated once at session creation, freed exactly once at teardown,
/// never resized in between.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: Box<[u8]>,
}

impl ScratchBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0u8; capacity].into_boxed_slice() }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

/// Outcome of one bounded compress/decompress call: the status plus how many
/// bytes the engine actually read and wrote. The counts are meaningful even
/// for the non-fatal decompression statuses.
#[derive(Debug, Clone, Copy)]
pub struct ChunkResult {
    pub status: Status,
    pub consumed: usize,
    pub produced: usize,
}

impl ChunkResult {
    pub fn failed(status: Status) -> Self {
        Self { status, consumed: 0, produced: 0 }
    }
}

/// The boundary to the compression library and its accelerator device.
///
/// Every call is bounded: `compress`/`decompress` operate on exactly the
/// slices given, all-or-nothing per attempt on the source side for
/// compression, whole frames only for decompression. Chunking of larger
/// ranges is the transfer engine's job, not the engine's.
pub trait CodecEngine {
    /// Initialize the device. Idempotent: a [`Status::DUPLICATE`] answer
    /// from a prior session in the same context is success.
    fn device_init(&mut self, sw_backup: bool) -> Status;

    /// Configure one session for the given algorithm parameters.
    fn session_setup(&mut self, config: &SessionConfig) -> Result<EngineHandle, Status>;

    /// Compress `src` into `dst` as one frame. `last` tells the engine this
    /// is the final chunk of the caller's stream so it can finalize its
    /// internal state.
    fn compress(&mut self, handle: EngineHandle, src: &[u8], dst: &mut [u8], last: bool)
        -> ChunkResult;

    /// Decompress as many whole frames from `src` into `dst` as fit.
    fn decompress(&mut self, handle: EngineHandle, src: &[u8], dst: &mut [u8]) -> ChunkResult;

    /// Worst-case compressed size of `input_len` bytes through this session.
    fn max_compressed_length(&self, handle: EngineHandle, input_len: usize) -> usize;

    /// Allocate a scratch region, or `None` when that memory class is
    /// exhausted.
    fn alloc_scratch(&mut self, size: usize, hint: LocalityHint) -> Option<ScratchBuffer>;

    /// Return a scratch region to the engine's allocator.
    fn free_scratch(&mut self, buf: ScratchBuffer);

    /// Tear down one session. The handle is dead afterwards.
    fn session_teardown(&mut self, handle: EngineHandle) -> Status;

    /// Release the device. Called once, when the owning cache goes away.
    fn device_close(&mut self);
}
