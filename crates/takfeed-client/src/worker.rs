//! Transmit worker: drains the queue into a sink, reconnecting as needed

use crate::client::{calculate_backoff, connect_with_retry, ReconnectConfig};
use crate::sink::{Connector, TakSink};
use crate::state::{ConnectionState, ConnectionStatus};
use anyhow::{Context, Result};
use takfeed_gen::{QueuedEvent, TxReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why the worker returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStop {
    /// Every producer finished and the queue is empty
    Drained,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub sent: u64,
    pub outcome: WorkerStop,
}

/// Consumer side of the transmission queue.
///
/// Events leave in queue order. A failed write drops the connection, and the
/// same event is retried on a fresh one, so nothing is skipped while the
/// server is unreachable.
pub struct TxWorker {
    connector: Box<dyn Connector>,
    reconnect: ReconnectConfig,
    status: ConnectionStatus,
}

impl TxWorker {
    pub fn new(
        connector: impl Connector + 'static,
        reconnect: ReconnectConfig,
        status: ConnectionStatus,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            reconnect,
            status,
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Run until the queue closes or `cancel` fires.
    ///
    /// Returns an error only when reconnecting is exhausted or disabled.
    pub async fn run(
        self,
        mut receiver: TxReceiver,
        cancel: CancellationToken,
    ) -> Result<WorkerSummary> {
        info!("Transmit worker started");

        let mut sink: Option<Box<dyn TakSink>> = None;
        let mut sent = 0u64;

        let outcome = loop {
            let unit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break WorkerStop::Cancelled,
                unit = receiver.recv() => match unit {
                    Some(unit) => unit,
                    None => break WorkerStop::Drained,
                },
            };

            match self.deliver(&unit, &mut sink, &cancel).await {
                Ok(true) => sent += 1,
                Ok(false) => break WorkerStop::Cancelled,
                Err(e) => {
                    self.status.set_error(format!("{e:#}"));
                    error!(uid = %unit.uid, error = %e, "Giving up on transmission");
                    return Err(e);
                }
            }
        };

        if let Some(mut open) = sink.take() {
            if let Err(e) = open.close().await {
                debug!(error = %e, "Error closing sink");
            }
        }
        self.status.set_disconnected();

        info!(sent, outcome = ?outcome, "Transmit worker stopped");
        Ok(WorkerSummary { sent, outcome })
    }

    /// Write one unit, reconnecting until it goes out.
    ///
    /// `Ok(false)` means cancellation interrupted the attempt.
    async fn deliver(
        &self,
        unit: &QueuedEvent,
        sink: &mut Option<Box<dyn TakSink>>,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let mut failures = 0u32;

        loop {
            if sink.is_none() {
                let attempt = connect_with_retry(|| self.connector.connect(), &self.reconnect);
                let connected = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(false),
                    connected = attempt => connected,
                };
                *sink = Some(connected.context("Failed to connect to TAK server")?);
            }
            let Some(target) = sink.as_mut() else {
                continue;
            };

            // A started write runs to completion; write_timeout bounds it.
            let written = target.send(&unit.data).await;

            match written {
                Ok(()) => {
                    debug!(
                        uid = %unit.uid,
                        bytes = unit.len(),
                        sink = %target.describe(),
                        "Event sent"
                    );
                    return Ok(true);
                }
                Err(e) => {
                    failures += 1;
                    self.status.metrics().record_error();
                    *sink = None;

                    if !self.reconnect.enabled {
                        return Err(e.context(format!("Failed to send event {}", unit.uid)));
                    }

                    let backoff = calculate_backoff(failures - 1, &self.reconnect);
                    warn!(
                        uid = %unit.uid,
                        attempt = failures,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Send failed, reconnecting"
                    );

                    self.status.set_state(ConnectionState::Reconnecting);
                    self.status.metrics().record_reconnect();

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(false),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}
