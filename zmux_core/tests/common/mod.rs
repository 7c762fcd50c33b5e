#![allow(dead_code)]

//! Scriptable stand-in for the codec engine.
//!
//! "Compression" is a byte-for-byte copy, which keeps chunk accounting
//! trivially checkable. The shared [`MockState`] handle lets a test inject
//! failure scripts and read call counters after the engine has been boxed
//! into a cache.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use zmux_core::{
    ChunkResult, CodecEngine, EngineHandle, LocalityHint, ScratchBuffer, SessionConfig, Status,
};

#[derive(Default)]
pub struct Counters {
    pub device_inits: usize,
    pub setups: usize,
    pub teardowns: usize,
    pub compress_calls: usize,
    pub decompress_calls: usize,
    pub scratch_allocs: usize,
    pub scratch_frees: usize,
    pub device_closes: usize,
}

#[derive(Default)]
pub struct MockState {
    pub counters: RefCell<Counters>,
    /// Statuses consumed by upcoming transform calls, front first. A non-OK
    /// entry makes that call fail with zero counts.
    pub script: RefCell<VecDeque<Status>>,
    /// When set, session_setup fails with this status.
    pub setup_status: Cell<Option<Status>>,
    /// When true, alloc_scratch returns None.
    pub deny_scratch: Cell<bool>,
    /// When true, transform calls succeed but report zero bytes consumed.
    pub zero_progress: Cell<bool>,
    /// The `last` flag of every compress call, in order.
    pub last_flags: RefCell<Vec<bool>>,
}

impl MockState {
    pub fn push_failures(&self, status: Status, count: usize) {
        let mut script = self.script.borrow_mut();
        for _ in 0..count {
            script.push_back(status);
        }
    }
}

pub struct MockEngine {
    state: Rc<MockState>,
    device_up: bool,
    next_handle: u64,
    live: HashSet<u64>,
}

impl MockEngine {
    pub fn new() -> (Self, Rc<MockState>) {
        let state = Rc::new(MockState::default());
        let engine = Self {
            state: Rc::clone(&state),
            device_up: false,
            next_handle: 0,
            live: HashSet::new(),
        };
        (engine, state)
    }

    fn scripted_failure(&self) -> Option<Status> {
        let status = self.state.script.borrow_mut().pop_front()?;
        (status != Status::OK).then_some(status)
    }

    fn transform(&mut self, handle: EngineHandle, src: &[u8], dst: &mut [u8]) -> ChunkResult {
        if !self.live.contains(&handle.0) {
            return ChunkResult::failed(Status::NONE);
        }
        if let Some(status) = self.scripted_failure() {
            return ChunkResult::failed(status);
        }
        if self.state.zero_progress.get() {
            return ChunkResult { status: Status::OK, consumed: 0, produced: 0 };
        }
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        ChunkResult { status: Status::OK, consumed: n, produced: n }
    }
}

impl CodecEngine for MockEngine {
    fn device_init(&mut self, _sw_backup: bool) -> Status {
        self.state.counters.borrow_mut().device_inits += 1;
        if self.device_up {
            return Status::DUPLICATE;
        }
        self.device_up = true;
        Status::OK
    }

    fn session_setup(&mut self, _config: &SessionConfig) -> Result<EngineHandle, Status> {
        self.state.counters.borrow_mut().setups += 1;
        if let Some(status) = self.state.setup_status.get() {
            return Err(status);
        }
        self.next_handle += 1;
        self.live.insert(self.next_handle);
        Ok(EngineHandle(self.next_handle))
    }

    fn compress(
        &mut self,
        handle: EngineHandle,
        src: &[u8],
        dst: &mut [u8],
        last: bool,
    ) -> ChunkResult {
        self.state.counters.borrow_mut().compress_calls += 1;
        self.state.last_flags.borrow_mut().push(last);
        self.transform(handle, src, dst)
    }

    fn decompress(&mut self, handle: EngineHandle, src: &[u8], dst: &mut [u8]) -> ChunkResult {
        self.state.counters.borrow_mut().decompress_calls += 1;
        self.transform(handle, src, dst)
    }

    fn max_compressed_length(&self, _handle: EngineHandle, input_len: usize) -> usize {
        input_len + 16
    }

    fn alloc_scratch(&mut self, size: usize, _hint: LocalityHint) -> Option<ScratchBuffer> {
        if self.state.deny_scratch.get() {
            return None;
        }
        self.state.counters.borrow_mut().scratch_allocs += 1;
        Some(ScratchBuffer::new(size))
    }

    fn free_scratch(&mut self, buf: ScratchBuffer) {
        self.state.counters.borrow_mut().scratch_frees += 1;
        drop(buf);
    }

    fn session_teardown(&mut self, handle: EngineHandle) -> Status {
        self.state.counters.borrow_mut().teardowns += 1;
        if self.live.remove(&handle.0) {
            Status::OK
        } else {
            Status::NONE
        }
    }

    fn device_close(&mut self) {
        self.state.counters.borrow_mut().device_closes += 1;
        self.device_up = false;
    }
}
