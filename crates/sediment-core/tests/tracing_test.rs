//! Tests for tracing initialization.

use std::sync::Mutex;

use sediment_core::tracing::init_tracing;

/// Serializes tests that touch SEDIMENT_LOG.
static TRACING_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn init_with_per_subsystem_filter() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    std::env::set_var("SEDIMENT_LOG", "runner=debug,content=info,storage=warn");
    init_tracing();
    std::env::remove_var("SEDIMENT_LOG");
}

#[test]
fn init_is_idempotent() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    init_tracing();
    init_tracing();
    init_tracing();
}

#[test]
fn invalid_filter_falls_back() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    std::env::set_var("SEDIMENT_LOG", "this is not a filter ===");
    init_tracing();
    std::env::remove_var("SEDIMENT_LOG");
}
