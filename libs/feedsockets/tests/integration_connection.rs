//! Integration tests for channel connection state and counters
//!
//! These tests verify state transitions and concurrent counter updates.

mod common;

use feedsockets::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
use std::sync::Arc;
use std::thread;

#[test]
fn test_connection_state_full_lifecycle() {
    verbose_println!("Testing full connection lifecycle...");

    let state = AtomicConnectionState::new(ConnectionState::Disconnected);
    assert!(state.is_disconnected());

    state.set(ConnectionState::Connecting);
    assert!(state.is_connecting());
    verbose_println!("  State: Connecting");

    state.set(ConnectionState::Connected);
    assert!(state.is_connected());
    verbose_println!("  State: Connected");

    state.set(ConnectionState::Reconnecting);
    assert!(state.is_connecting());
    assert!(!state.is_connected());

    state.set(ConnectionState::ShuttingDown);
    assert!(state.is_shutting_down());

    state.set(ConnectionState::Disconnected);
    assert!(state.is_disconnected());
    verbose_println!("  State: Disconnected (complete)");
}

#[test]
fn test_concurrent_state_and_metrics_access() {
    verbose_println!("Testing concurrent state access...");

    let state = Arc::new(AtomicConnectionState::default());
    let metrics = Arc::new(AtomicMetrics::new());
    let mut handles = vec![];

    for _ in 0..5 {
        let state = Arc::clone(&state);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                let _ = state.get();
                let _ = state.is_connected();
            }
        }));
    }

    for _ in 0..3 {
        let state = Arc::clone(&state);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                state.set(ConnectionState::Connected);
                state.set(ConnectionState::Reconnecting);
            }
        }));
    }

    for _ in 0..5 {
        let metrics = Arc::clone(&metrics);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                metrics.increment_received();
                metrics.increment_decode_errors();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(metrics.messages_received(), 5000);
    assert_eq!(metrics.decode_errors(), 5000);
    verbose_println!("  Concurrent access completed successfully");
}

#[test]
fn test_metrics_snapshot() {
    let metrics = AtomicMetrics::new();
    metrics.increment_received();
    metrics.increment_received();
    metrics.increment_initial_dumps();
    metrics.increment_stale_dumps();
    metrics.increment_reconnects();

    assert_eq!(
        metrics.snapshot(),
        Metrics {
            messages_received: 2,
            decode_errors: 0,
            initial_dumps: 1,
            stale_dumps_discarded: 1,
            reconnect_count: 1,
        }
    );
}
