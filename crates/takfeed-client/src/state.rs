use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Connection state of the transmit side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection open
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Connected and sending
    Connected,
    /// Re-establishing after a failed write
    Reconnecting,
    /// Gave up after exhausting reconnect attempts
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Reconnecting => write!(f, "Reconnecting"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Send-side counters
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    bytes_sent: AtomicU64,
    events_sent: AtomicU64,
    errors: AtomicU64,
    reconnects: AtomicU32,
    connected_at: RwLock<Option<SystemTime>>,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event written in full
    pub fn record_sent(&self, bytes: usize) {
        self.bytes_sent
            .fetch_add(u64::try_from(bytes).unwrap_or(u64::MAX), Ordering::Relaxed);
        self.events_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_connected(&self) {
        *self.connected_at.write() = Some(SystemTime::now());
    }

    pub fn mark_disconnected(&self) {
        *self.connected_at.write() = None;
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// How long the current connection has been up
    pub fn connection_duration(&self) -> Option<Duration> {
        self.connected_at.read().and_then(|t| t.elapsed().ok())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_sent: self.bytes_sent(),
            events_sent: self.events_sent(),
            errors: self.errors(),
            reconnects: self.reconnects(),
        }
    }
}

/// Counters at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_sent: u64,
    pub events_sent: u64,
    pub errors: u64,
    pub reconnects: u32,
}

/// Shared connection state and metrics, cloned into the connector and worker
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    inner: Arc<StatusInner>,
}

#[derive(Debug)]
struct StatusInner {
    state: RwLock<ConnectionState>,
    metrics: ConnectionMetrics,
    error_message: RwLock<Option<String>>,
}

impl Default for StatusInner {
    fn default() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            metrics: ConnectionMetrics::new(),
            error_message: RwLock::new(None),
        }
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.inner.state.write() = state;
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.inner.metrics
    }

    pub fn set_connected(&self) {
        self.set_state(ConnectionState::Connected);
        self.inner.metrics.mark_connected();
        *self.inner.error_message.write() = None;
    }

    pub fn set_disconnected(&self) {
        self.set_state(ConnectionState::Disconnected);
        self.inner.metrics.mark_disconnected();
    }

    /// Record a fatal error and move to `Failed`
    pub fn set_error(&self, error: String) {
        *self.inner.error_message.write() = Some(error);
        self.inner.metrics.mark_disconnected();
        self.set_state(ConnectionState::Failed);
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.error_message.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), ConnectionState::Failed)
    }
}
