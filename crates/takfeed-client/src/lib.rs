//! # takfeed-client
//!
//! Delivery side of takfeed: takes serialized events off the transmission
//! queue and writes them to a TAK server.
//!
//! - **TCP** and **TLS** (client certificate, rustls) stream sinks
//! - **UDP** datagram sink, including multicast groups
//! - **stdout** sink for dry runs
//!
//! The [`TxWorker`] connects lazily, reconnects with exponential backoff and
//! retries the event that failed, so queue order is preserved across outages.
//!
//! ## Example
//!
//! ```rust,no_run
//! use takfeed_client::{ClientConfig, ConnectionStatus, TakConnector, TxWorker};
//! use takfeed_core::Endpoint;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new(Endpoint::parse("tcp://127.0.0.1:8087")?);
//!     let status = ConnectionStatus::new();
//!     let connector = TakConnector::new(config.clone(), status.clone())?;
//!
//!     let (queue, receiver) = takfeed_gen::tx_queue(1000);
//!     let worker = TxWorker::new(connector, config.reconnect, status);
//!     let handle = tokio::spawn(worker.run(receiver, CancellationToken::new()));
//!
//!     // Producers push into `queue`...
//!     drop(queue);
//!     handle.await??;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod sink;
pub mod state;
pub mod tls;
pub mod worker;

// Re-export commonly used types
pub use client::{calculate_backoff, connect_with_retry, ClientConfig, ReconnectConfig};
pub use sink::{
    Connector, LineSink, StdoutConnector, StdoutSink, StreamSink, TakConnector, TakSink, UdpSink,
};
pub use state::{ConnectionMetrics, ConnectionState, ConnectionStatus, MetricsSnapshot};
pub use worker::{TxWorker, WorkerStop, WorkerSummary};
