//! Chunked transfer behavior against the mock engine: retry budgets, chunk
//! accounting, the final-chunk flag, boundary statuses, and the
//! progress-stall guard.

mod common;

use common::MockEngine;
use zmux_core::{SessionCache, SessionConfig, SessionHandle, Status, ZmuxError};

/// Direct-call session: no scratch relay, one engine call per transfer.
fn direct_config() -> SessionConfig {
    SessionConfig { scratch_buffer_size: 0, ..SessionConfig::default() }
}

/// Chunked session with a deliberately tiny 1 KiB relay.
fn chunked_config() -> SessionConfig {
    SessionConfig { scratch_buffer_size: 1024, ..SessionConfig::default() }
}

fn checkout(cache: &mut SessionCache, config: &SessionConfig) -> SessionHandle {
    cache.setup(config).unwrap()
}

#[test]
fn retry_budget_covers_transient_failures() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &direct_config());

    state.push_failures(Status::NOSW_NO_INST_ATTACH, 3);
    let mut out = vec![0u8; 128];
    let result = cache.compress(handle, b"payload", &mut out, 3).unwrap();
    assert_eq!(result.consumed, 7);
    assert_eq!(state.counters.borrow().compress_calls, 4, "1 attempt + 3 retries");
}

#[test]
fn exhausted_retry_budget_surfaces_the_transient_code() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &direct_config());

    state.push_failures(Status::NOSW_NO_INST_ATTACH, 3);
    let mut out = vec![0u8; 128];
    let err = cache.compress(handle, b"payload", &mut out, 2).unwrap_err();
    assert!(matches!(
        err,
        ZmuxError::Engine { status: Status::NOSW_NO_INST_ATTACH, .. }
    ));
}

#[test]
fn zero_budget_means_a_single_attempt() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &direct_config());

    state.push_failures(Status::NOSW_NO_INST_ATTACH, 1);
    let mut out = vec![0u8; 128];
    assert!(cache.compress(handle, b"payload", &mut out, 0).is_err());
    assert_eq!(state.counters.borrow().compress_calls, 1);
}

#[test]
fn chunk_accounting_sums_to_the_source_length() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let config = chunked_config();
    let handle = checkout(&mut cache, &config);

    // 37 full chunks plus one trailing byte.
    let src = vec![0xA5u8; 37 * 1024 + 1];
    let bound = cache.max_compressed_size(handle, src.len()).unwrap();
    let mut dst = vec![0u8; bound];

    let result = cache.compress(handle, &src, &mut dst, 0).unwrap();
    assert_eq!(result.consumed, src.len());
    assert_eq!(result.produced, src.len(), "mock engine is a passthrough");
    assert_eq!(state.counters.borrow().compress_calls, 38);
}

#[test]
fn decompress_cursor_advances_by_actual_consumed_counts() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &chunked_config());

    // The mock consumes min(chunk_in, chunk_out) per call, which is smaller
    // than the packed relay; the loop must advance by what was actually
    // consumed, not by the chunk it offered.
    let src = vec![0x5Au8; 5 * 1024];
    let mut dst = vec![0u8; src.len()];
    let result = cache.decompress(handle, &src, &mut dst, 0).unwrap();
    assert_eq!(result.consumed, src.len());
    assert_eq!(result.produced, src.len());
    assert_eq!(state.counters.borrow().decompress_calls, 5);
}

#[test]
fn final_chunk_flag_marks_only_a_partial_trailing_chunk() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &chunked_config());

    let src = vec![1u8; 2 * 1024 + 512];
    let mut dst = vec![0u8; cache.max_compressed_size(handle, src.len()).unwrap()];
    cache.compress(handle, &src, &mut dst, 0).unwrap();
    assert_eq!(*state.last_flags.borrow(), vec![false, false, true]);

    // An exact multiple of the relay never yields a partial chunk.
    state.last_flags.borrow_mut().clear();
    let src = vec![1u8; 2 * 1024];
    cache.compress(handle, &src, &mut dst, 0).unwrap();
    assert_eq!(*state.last_flags.borrow(), vec![false, false]);
}

#[test]
fn direct_path_sets_the_final_flag() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &direct_config());

    let mut out = vec![0u8; 128];
    cache.compress(handle, b"one shot", &mut out, 0).unwrap();
    assert_eq!(*state.last_flags.borrow(), vec![true]);
}

#[test]
fn zero_progress_terminates_the_loop() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &chunked_config());

    state.zero_progress.set(true);
    let src = vec![9u8; 4 * 1024];
    let mut dst = vec![0u8; 8 * 1024];
    let result = cache.compress(handle, &src, &mut dst, 0).unwrap();
    assert_eq!(result.consumed, 0);
    assert_eq!(result.produced, 0);
    assert_eq!(
        state.counters.borrow().compress_calls,
        1,
        "a stalled transfer must stop, not spin"
    );
}

#[test]
fn decompression_boundary_statuses_yield_partial_results() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &direct_config());

    let mut out = vec![0u8; 128];

    // Buffer/data boundary conditions come back as (possibly empty) partial
    // results, never as errors and never retried.
    state.push_failures(Status::BUF_ERROR, 1);
    let result = cache.decompress(handle, b"frame tail", &mut out, 5).unwrap();
    assert_eq!((result.consumed, result.produced), (0, 0));

    state.push_failures(Status::DATA_ERROR, 1);
    let result = cache.decompress(handle, b"frame tail", &mut out, 5).unwrap();
    assert_eq!((result.consumed, result.produced), (0, 0));

    // The same statuses are fatal for compression.
    state.push_failures(Status::BUF_ERROR, 1);
    assert!(cache.compress(handle, b"frame tail", &mut out, 5).is_err());
}

#[test]
fn empty_source_transfers_nothing() {
    let (engine, state) = MockEngine::new();
    let mut cache = SessionCache::new(Box::new(engine));
    let handle = checkout(&mut cache, &chunked_config());

    let mut dst = vec![0u8; 64];
    let result = cache.compress(handle, &[], &mut dst, 0).unwrap();
    assert_eq!((result.consumed, result.produced), (0, 0));
    assert_eq!(state.counters.borrow().compress_calls, 0);
}
