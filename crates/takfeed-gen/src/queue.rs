//! Transmission queue between producers and the transmit worker
//!
//! A bounded FIFO of serialized events. Producers block when it is full; the
//! worker drains it in order. Each unit is serialized before it is sent, so a
//! receiver only ever sees complete events.

use bytes::Bytes;
use takfeed_cot::{to_bytes, Event};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Capacity used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("transmission queue closed: the consumer has stopped")]
    Closed,
}

/// One serialized event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub uid: String,
    pub data: Bytes,
}

impl QueuedEvent {
    pub fn from_event(event: &Event) -> Self {
        Self {
            uid: event.uid.clone(),
            data: to_bytes(event),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Create a queue holding up to `capacity` events (at least one)
pub fn tx_queue(capacity: usize) -> (TxQueue, TxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (TxQueue { tx }, TxReceiver { rx })
}

/// Producer side of the transmission queue
#[derive(Debug, Clone)]
pub struct TxQueue {
    tx: mpsc::Sender<QueuedEvent>,
}

impl TxQueue {
    /// Serialize `event` and wait for room in the queue
    pub async fn enqueue(&self, event: &Event) -> Result<(), QueueError> {
        self.send(QueuedEvent::from_event(event)).await
    }

    /// Wait for room and push an already serialized unit
    pub async fn send(&self, unit: QueuedEvent) -> Result<(), QueueError> {
        let uid = unit.uid.clone();
        let bytes = unit.len();
        self.tx.send(unit).await.map_err(|_| QueueError::Closed)?;
        debug!(uid = %uid, bytes, "Event enqueued");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer side of the transmission queue
#[derive(Debug)]
pub struct TxReceiver {
    rx: mpsc::Receiver<QueuedEvent>,
}

impl TxReceiver {
    /// Next event, or `None` once every producer handle is dropped and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<QueuedEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<QueuedEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new events; queued ones can still be received
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn into_stream(self) -> ReceiverStream<QueuedEvent> {
        ReceiverStream::new(self.rx)
    }
}
