use log::{debug, warn};

use crate::config::{self, SessionConfig, SessionKey};
use crate::engine::{CodecEngine, LocalityHint, ScratchBuffer, Status};
use crate::error::ZmuxError;
use crate::transfer::{self, Direction, TransferResult};

/// Capacity of one execution context's session cache. Filling it is a hard
/// failure, not an eviction: evicting would change session identity under a
/// caller with operations in flight.
pub const MAX_SESSIONS: usize = 32;

/// One live, configured engine session and its scratch relay pair.
pub(crate) struct Session {
    pub(crate) key: SessionKey,
    pub(crate) reference_count: u32,
    pub(crate) engine_handle: crate::engine::EngineHandle,
    /// Raw-side relay, sized to the configured scratch capacity.
    pub(crate) scratch_src: Option<ScratchBuffer>,
    /// Packed-side relay, sized to the worst-case compressed chunk.
    pub(crate) scratch_dst: Option<ScratchBuffer>,
}

/// Generation-checked ticket for one checkout of a cached session.
///
/// Stale handles (the slot was cleared and possibly reused since) are
/// rejected with [`ZmuxError::InvalidSession`] on use and ignored by
/// [`SessionCache::teardown`]; they can never reach freed engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    slot: usize,
    generation: u32,
}

/// Bounded, execution-context-local registry of live engine sessions.
///
/// One instance per worker; never shared, so no locking anywhere on the
/// lookup/refcount/scratch path. At most one live session exists per
/// distinct [`SessionKey`]. [`setup`](Self::setup) is a checkout: it either
/// revives the matching session or creates one, and every successful call
/// must be paired with one [`teardown`](Self::teardown). The engine session
/// is torn down exactly once, when the last checkout is returned.
pub struct SessionCache {
    engine: Box<dyn CodecEngine>,
    slots: [Option<Session>; MAX_SESSIONS],
    generations: [u32; MAX_SESSIONS],
    /// Bitmap of occupied slots; bit i mirrors `slots[i].is_some()`.
    used: u32,
    live: usize,
}

impl SessionCache {
    pub fn new(engine: Box<dyn CodecEngine>) -> Self {
        Self {
            engine,
            slots: std::array::from_fn(|_| None),
            generations: [0; MAX_SESSIONS],
            used: 0,
            live: 0,
        }
    }

    /// Number of live sessions in this context.
    pub fn live_sessions(&self) -> usize {
        self.live
    }

    /// Resolve or create the session for `config` and check it out.
    ///
    /// Lookup is a linear scan keyed on the packed config: the cache is
    /// small and a context uses a handful of distinct configurations. On a
    /// miss, the device is (idempotently) initialized, the engine session
    /// set up, and the scratch pair allocated. Any setup failure releases
    /// the slot before the error propagates, so a failed create never eats
    /// cache capacity.
    pub fn setup(&mut self, session_config: &SessionConfig) -> Result<SessionHandle, ZmuxError> {
        let key = config::encode(session_config)?;

        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if let Some(session) = entry {
                if session.key == key {
                    session.reference_count += 1;
                    debug!(
                        "session {:#x} reused (refcount {})",
                        key.0, session.reference_count
                    );
                    return Ok(SessionHandle { slot, generation: self.generations[slot] });
                }
            }
        }

        if self.live == MAX_SESSIONS {
            return Err(ZmuxError::SessionLimitExceeded(MAX_SESSIONS));
        }
        let slot = (!self.used).trailing_zeros() as usize;

        let init = self.engine.device_init(session_config.sw_backup);
        if !init.is_ok() && init != Status::DUPLICATE {
            return Err(ZmuxError::Engine { op: "device init", status: init });
        }

        let engine_handle = self
            .engine
            .session_setup(session_config)
            .map_err(|status| ZmuxError::Engine { op: "session setup", status })?;

        let (scratch_src, scratch_dst) = match self.alloc_scratch_pair(session_config, engine_handle)
        {
            Ok(pair) => pair,
            Err(err) => {
                // Hardware-only mode: undo the engine session before failing.
                let status = self.engine.session_teardown(engine_handle);
                if !status.is_ok() {
                    warn!("session teardown on failed setup: {status}");
                }
                return Err(err);
            }
        };

        self.used |= 1 << slot;
        self.live += 1;
        // First checkout; stored refcount already includes this caller.
        self.slots[slot] = Some(Session {
            key,
            reference_count: 1,
            engine_handle,
            scratch_src,
            scratch_dst,
        });
        debug!("session {:#x} created in slot {slot} ({} live)", key.0, self.live);
        Ok(SessionHandle { slot, generation: self.generations[slot] })
    }

    /// Allocate the raw/packed relay pair, or decide to run scratch-less.
    ///
    /// Allocation failure is fatal in hardware-only mode; with software
    /// backup the session simply falls back to direct engine calls.
    fn alloc_scratch_pair(
        &mut self,
        session_config: &SessionConfig,
        engine_handle: crate::engine::EngineHandle,
    ) -> Result<(Option<ScratchBuffer>, Option<ScratchBuffer>), ZmuxError> {
        let raw_size = session_config.scratch_buffer_size;
        if raw_size == 0 {
            return Ok((None, None));
        }
        let packed_size = self.engine.max_compressed_length(engine_handle, raw_size);

        let raw = self.engine.alloc_scratch(raw_size, LocalityHint::Pinned);
        let packed = match &raw {
            Some(_) => self.engine.alloc_scratch(packed_size, LocalityHint::Pinned),
            None => None,
        };
        match (raw, packed) {
            (Some(raw), Some(packed)) => Ok((Some(raw), Some(packed))),
            (raw, packed) => {
                if let Some(buf) = raw {
                    self.engine.free_scratch(buf);
                }
                if let Some(buf) = packed {
                    self.engine.free_scratch(buf);
                }
                if !session_config.sw_backup {
                    return Err(ZmuxError::ScratchAlloc(raw_size));
                }
                warn!("scratch allocation of {raw_size} bytes failed, using direct engine calls");
                Ok((None, None))
            }
        }
    }

    /// Return one checkout of the session.
    ///
    /// Decrements the reference count; the slot (engine session and both
    /// scratch buffers) is only released when the count reaches zero.
    /// Tearing down an unknown or stale handle is a successful no-op.
    pub fn teardown(&mut self, handle: SessionHandle) -> Result<(), ZmuxError> {
        if handle.slot >= MAX_SESSIONS || self.generations[handle.slot] != handle.generation {
            return Ok(());
        }
        let Some(session) = self.slots[handle.slot].as_mut() else {
            return Ok(());
        };
        session.reference_count -= 1;
        if session.reference_count > 0 {
            debug!(
                "session {:#x} released (refcount {})",
                session.key.0, session.reference_count
            );
            return Ok(());
        }
        let session = self.slots[handle.slot]
            .take()
            .ok_or(ZmuxError::InvalidSession)?;
        self.release_slot(handle.slot, session)
    }

    /// Clear a slot: free both scratch buffers (order-independent, each
    /// guarded by presence), tear down the engine session, retire the
    /// generation. The slot is reclaimed even when the engine teardown
    /// reports a failure; that failure is still surfaced.
    fn release_slot(&mut self, slot: usize, session: Session) -> Result<(), ZmuxError> {
        if let Some(buf) = session.scratch_src {
            self.engine.free_scratch(buf);
        }
        if let Some(buf) = session.scratch_dst {
            self.engine.free_scratch(buf);
        }
        let status = self.engine.session_teardown(session.engine_handle);
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.used &= !(1 << slot);
        self.live -= 1;
        debug!("session {:#x} torn down ({} live)", session.key.0, self.live);
        if !status.is_ok() {
            return Err(ZmuxError::Engine { op: "session teardown", status });
        }
        Ok(())
    }

    /// Compress `src` into `dst` through the session's scratch relay,
    /// retrying transient engine errors up to `retry_budget` times per chunk.
    pub fn compress(
        &mut self,
        handle: SessionHandle,
        src: &[u8],
        dst: &mut [u8],
        retry_budget: u32,
    ) -> Result<TransferResult, ZmuxError> {
        self.run(handle, Direction::Compress, src, dst, retry_budget)
    }

    /// Decompress `src` into `dst`. A result whose `consumed` is short of
    /// `src.len()` is not an error: the input hit a stream boundary (or the
    /// destination filled up) and the caller resumes with the remainder.
    pub fn decompress(
        &mut self,
        handle: SessionHandle,
        src: &[u8],
        dst: &mut [u8],
        retry_budget: u32,
    ) -> Result<TransferResult, ZmuxError> {
        self.run(handle, Direction::Decompress, src, dst, retry_budget)
    }

    fn run(
        &mut self,
        handle: SessionHandle,
        direction: Direction,
        src: &[u8],
        dst: &mut [u8],
        retry_budget: u32,
    ) -> Result<TransferResult, ZmuxError> {
        let Self { engine, slots, generations, .. } = self;
        if handle.slot >= MAX_SESSIONS || generations[handle.slot] != handle.generation {
            return Err(ZmuxError::InvalidSession);
        }
        let session = slots[handle.slot].as_mut().ok_or(ZmuxError::InvalidSession)?;
        transfer::transfer(engine.as_mut(), session, direction, src, dst, retry_budget)
    }

    /// Worst-case compressed size of `input_len` bytes through this session,
    /// accounting for the per-chunk framing a scratch-relayed transfer adds.
    pub fn max_compressed_size(
        &self,
        handle: SessionHandle,
        input_len: usize,
    ) -> Result<usize, ZmuxError> {
        if handle.slot >= MAX_SESSIONS || self.generations[handle.slot] != handle.generation {
            return Err(ZmuxError::InvalidSession);
        }
        let session = self.slots[handle.slot].as_ref().ok_or(ZmuxError::InvalidSession)?;
        let chunk = session.scratch_src.as_ref().map_or(0, ScratchBuffer::capacity);
        if chunk == 0 || input_len <= chunk {
            return Ok(self.engine.max_compressed_length(session.engine_handle, input_len));
        }
        // Chunked transfers emit one frame per chunk; bound each separately.
        let full_chunks = input_len / chunk;
        let remainder = input_len % chunk;
        let mut bound = full_chunks * self.engine.max_compressed_length(session.engine_handle, chunk);
        if remainder > 0 {
            bound += self.engine.max_compressed_length(session.engine_handle, remainder);
        }
        Ok(bound)
    }
}

impl Drop for SessionCache {
    /// Tear down whatever is still live and close the device. Sessions with
    /// outstanding checkouts at this point are a caller-side leak; they are
    /// reclaimed anyway, with a warning.
    fn drop(&mut self) {
        for slot in 0..MAX_SESSIONS {
            if let Some(session) = self.slots[slot].take() {
                if session.reference_count > 0 {
                    warn!(
                        "session {:#x} dropped with {} outstanding checkouts",
                        session.key.0, session.reference_count
                    );
                }
                if let Err(err) = self.release_slot(slot, session) {
                    warn!("teardown during cache drop: {err}");
                }
            }
        }
        self.engine.device_close();
    }
}
