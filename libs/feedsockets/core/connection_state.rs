//! Lock-free connection state and counters shared between a channel and its pump tasks

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Connection state of a feed channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Reconnecting = 3,
    ShuttingDown = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::ShuttingDown,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Atomic wrapper around `ConnectionState`
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    /// True while connecting or reconnecting
    #[inline]
    pub fn is_connecting(&self) -> bool {
        matches!(
            self.get(),
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    #[inline]
    pub fn is_disconnected(&self) -> bool {
        self.get() == ConnectionState::Disconnected
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.get() == ConnectionState::ShuttingDown
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

/// Channel metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metrics {
    pub messages_received: u64,
    pub decode_errors: u64,
    pub initial_dumps: u64,
    pub stale_dumps_discarded: u64,
    pub reconnect_count: u64,
}

/// Atomic channel counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_received: AtomicU64,
    decode_errors: AtomicU64,
    initial_dumps: AtomicU64,
    stale_dumps_discarded: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_initial_dumps(&self) {
        self.initial_dumps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_stale_dumps(&self) {
        self.stale_dumps_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    pub fn initial_dumps(&self) -> u64 {
        self.initial_dumps.load(Ordering::Relaxed)
    }

    pub fn stale_dumps_discarded(&self) -> u64 {
        self.stale_dumps_discarded.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Metrics {
        Metrics {
            messages_received: self.messages_received(),
            decode_errors: self.decode_errors(),
            initial_dumps: self.initial_dumps(),
            stale_dumps_discarded: self.stale_dumps_discarded(),
            reconnect_count: self.reconnect_count(),
        }
    }
}
