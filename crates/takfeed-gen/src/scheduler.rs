//! Generation scheduler
//!
//! Drives a producer and pushes what it produces onto the transmission queue.
//! Batch runs convert a finite sequence once; continuous runs produce one
//! event per interval until cancelled. Cancellation is checked before every
//! iteration, during the interval wait and while blocked on a full queue.

use crate::drone::DroneSimulator;
use crate::queue::{QueueError, TxQueue};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use takfeed_cot::{validate_event, Event};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Something that produces one event per call
pub trait Producer: Send {
    fn produce(&mut self) -> Event;
}

impl Producer for DroneSimulator {
    fn produce(&mut self) -> Event {
        self.tick()
    }
}

impl<F> Producer for F
where
    F: FnMut() -> Event + Send,
{
    fn produce(&mut self) -> Event {
        self()
    }
}

/// Where a scheduler is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Generating,
    Enqueuing,
    Waiting,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Generating => write!(f, "generating"),
            SchedulerState::Enqueuing => write!(f, "enqueuing"),
            SchedulerState::Waiting => write!(f, "waiting"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Live view of a scheduler, shareable with other tasks
#[derive(Debug, Default)]
pub struct SchedulerStatus {
    state: RwLock<SchedulerState>,
    produced: AtomicU64,
    enqueued: AtomicU64,
}

impl SchedulerStatus {
    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Events produced over the scheduler's lifetime
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    /// Events accepted by the queue over the scheduler's lifetime
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.write() = state;
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Input sequence or event budget used up
    Exhausted,
    Cancelled,
}

/// Counts for one finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub produced: u64,
    pub enqueued: u64,
    pub outcome: StopReason,
}

/// Runs producers against one transmission queue
pub struct Scheduler {
    name: String,
    queue: TxQueue,
    cancel: CancellationToken,
    status: Arc<SchedulerStatus>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>, queue: TxQueue, cancel: CancellationToken) -> Self {
        Self {
            name: name.into(),
            queue,
            cancel,
            status: Arc::new(SchedulerStatus::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Arc<SchedulerStatus> {
        Arc::clone(&self.status)
    }

    /// Convert and enqueue every item once, then stop.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the consumer goes away; items after
    /// the failing one are not converted.
    pub async fn run_batch<I, T, F>(
        &self,
        items: I,
        mut convert: F,
    ) -> Result<RunSummary, QueueError>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Event,
    {
        info!(scheduler = %self.name, "Batch run started");
        let mut run = RunCounts::default();

        for item in items {
            if self.cancel.is_cancelled() {
                return Ok(self.finish(run, StopReason::Cancelled));
            }

            self.status.set_state(SchedulerState::Generating);
            let event = convert(item);
            self.record_produced(&mut run, &event);

            if !self.push(&mut run, &event).await? {
                return Ok(self.finish(run, StopReason::Cancelled));
            }
        }

        Ok(self.finish(run, StopReason::Exhausted))
    }

    /// Produce one event per `period` until cancelled.
    ///
    /// The first event is produced immediately. A tick delayed by a full
    /// queue pushes the following ticks back rather than bursting.
    pub async fn run_continuous<P>(
        &self,
        producer: &mut P,
        period: Duration,
    ) -> Result<RunSummary, QueueError>
    where
        P: Producer + ?Sized,
    {
        self.continuous(producer, period, None).await
    }

    /// Like [`Scheduler::run_continuous`], stopping after `count` events
    pub async fn run_limited<P>(
        &self,
        producer: &mut P,
        period: Duration,
        count: u64,
    ) -> Result<RunSummary, QueueError>
    where
        P: Producer + ?Sized,
    {
        self.continuous(producer, period, Some(count)).await
    }

    async fn continuous<P>(
        &self,
        producer: &mut P,
        period: Duration,
        limit: Option<u64>,
    ) -> Result<RunSummary, QueueError>
    where
        P: Producer + ?Sized,
    {
        let period = if period.is_zero() {
            warn!(scheduler = %self.name, "Zero interval, using 1s");
            Duration::from_secs(1)
        } else {
            period
        };

        info!(
            scheduler = %self.name,
            interval_ms = period.as_millis() as u64,
            limit = ?limit,
            "Continuous run started"
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut run = RunCounts::default();

        loop {
            if limit.is_some_and(|n| run.produced >= n) {
                return Ok(self.finish(run, StopReason::Exhausted));
            }

            self.status.set_state(SchedulerState::Waiting);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Ok(self.finish(run, StopReason::Cancelled));
                }
                _ = ticker.tick() => {}
            }

            self.status.set_state(SchedulerState::Generating);
            let event = producer.produce();
            self.record_produced(&mut run, &event);

            if !self.push(&mut run, &event).await? {
                return Ok(self.finish(run, StopReason::Cancelled));
            }
        }
    }

    fn record_produced(&self, run: &mut RunCounts, event: &Event) {
        run.produced += 1;
        self.status.produced.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = validate_event(event) {
            warn!(
                scheduler = %self.name,
                uid = %event.uid,
                error = %e,
                "Produced event failed validation"
            );
        }
    }

    /// Enqueue one event. Returns `Ok(false)` if cancelled while waiting for
    /// room; the event is then not in the queue.
    async fn push(&self, run: &mut RunCounts, event: &Event) -> Result<bool, QueueError> {
        self.status.set_state(SchedulerState::Enqueuing);

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(false),
            sent = self.queue.enqueue(event) => sent,
        };

        if let Err(e) = sent {
            error!(scheduler = %self.name, uid = %event.uid, error = %e, "Failed to enqueue event");
            self.status.set_state(SchedulerState::Stopped);
            return Err(e);
        }

        run.enqueued += 1;
        self.status.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn finish(&self, run: RunCounts, outcome: StopReason) -> RunSummary {
        self.status.set_state(SchedulerState::Stopped);
        info!(
            scheduler = %self.name,
            produced = run.produced,
            enqueued = run.enqueued,
            outcome = ?outcome,
            "Scheduler stopped"
        );

        RunSummary {
            produced: run.produced,
            enqueued: run.enqueued,
            outcome,
        }
    }
}

#[derive(Debug, Default)]
struct RunCounts {
    produced: u64,
    enqueued: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tx_queue;
    use chrono::{TimeZone, Utc};

    fn numbered(n: u32) -> Event {
        Event::builder(format!("ev-{}", n), "a-u-G")
            .build(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_batch_runs_to_exhaustion() {
        let (tx, mut rx) = tx_queue(16);
        let scheduler = Scheduler::new("batch", tx, CancellationToken::new());
        let status = scheduler.status();
        assert_eq!(status.state(), SchedulerState::Idle);

        let summary = scheduler.run_batch(1..=3, numbered).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                produced: 3,
                enqueued: 3,
                outcome: StopReason::Exhausted
            }
        );
        assert_eq!(status.state(), SchedulerState::Stopped);
        assert_eq!(status.enqueued(), 3);

        for n in 1..=3 {
            assert_eq!(rx.recv().await.unwrap().uid, format!("ev-{}", n));
        }
    }

    #[tokio::test]
    async fn test_batch_propagates_closed_queue() {
        let (tx, rx) = tx_queue(16);
        drop(rx);
        let scheduler = Scheduler::new("batch", tx, CancellationToken::new());

        let result = scheduler.run_batch(1..=3, numbered).await;
        assert_eq!(result, Err(QueueError::Closed));
        assert_eq!(scheduler.status().produced(), 1);
        assert_eq!(scheduler.status().state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_batch_observes_cancellation() {
        let (tx, _rx) = tx_queue(16);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scheduler = Scheduler::new("batch", tx, cancel);

        let summary = scheduler.run_batch(1..=3, numbered).await.unwrap();
        assert_eq!(summary.outcome, StopReason::Cancelled);
        assert_eq!(summary.produced, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_ticks_at_interval() {
        let (tx, mut rx) = tx_queue(16);
        let scheduler = Scheduler::new("drone", tx, CancellationToken::new());

        let start = tokio::time::Instant::now();
        let mut n = 0;
        let mut producer = move || {
            n += 1;
            numbered(n)
        };

        let summary = scheduler
            .run_limited(&mut producer, Duration::from_secs(2), 3)
            .await
            .unwrap();

        assert_eq!(summary.outcome, StopReason::Exhausted);
        assert_eq!(summary.enqueued, 3);
        // Ticks at 0s, 2s and 4s
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(rx.recv().await.unwrap().uid, "ev-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_stops_on_cancel() {
        let (tx, mut rx) = tx_queue(16);
        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new("drone", tx, cancel.clone());
        let status = scheduler.status();

        let handle = tokio::spawn(async move {
            let mut n = 0;
            let mut producer = move || {
                n += 1;
                numbered(n)
            };
            scheduler
                .run_continuous(&mut producer, Duration::from_secs(1))
                .await
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(status.state(), SchedulerState::Waiting);
        cancel.cancel();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.outcome, StopReason::Cancelled);
        assert_eq!(summary.enqueued, 3);
        assert_eq!(status.state(), SchedulerState::Stopped);

        let mut received = 0;
        while rx.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_blocked_on_full_queue() {
        let (tx, _rx) = tx_queue(1);
        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new("drone", tx, cancel.clone());
        let status = scheduler.status();

        let handle = tokio::spawn(async move {
            let mut n = 0;
            let mut producer = move || {
                n += 1;
                numbered(n)
            };
            scheduler
                .run_continuous(&mut producer, Duration::from_millis(100))
                .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.state(), SchedulerState::Enqueuing);
        cancel.cancel();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.outcome, StopReason::Cancelled);
        assert_eq!(summary.produced, 2);
        assert_eq!(summary.enqueued, 1);
    }
}
