//! Background marker publication.
//!
//! Every marker goes through one bounded queue drained by a single worker
//! thread that fans it out to the configured sinks. Callers never block: the
//! marker is stamped on the caller's thread and, if the queue is full, dropped
//! with a counted warning.

use crate::error::{MarkerError, Result};
use crate::sink::MarkerSink;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use oddball_core::Marker;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

pub const DEFAULT_CAPACITY: usize = 1024;
const FEED_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct WorkerMetrics {
    published: AtomicU64,
    sink_failures: AtomicU64,
    dropped: AtomicU64,
}

impl WorkerMetrics {
    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub sink_failures: u64,
    pub dropped: u64,
}

enum WorkerCmd {
    Publish(Marker),
    Flush(Sender<()>),
    Shutdown,
}

/// Cloneable, non-blocking handle for submitting markers.
#[derive(Clone)]
pub struct MarkerSender {
    tx: Sender<WorkerCmd>,
    metrics: Arc<WorkerMetrics>,
}

impl MarkerSender {
    /// Stamps `message` now and queues it. Returns the stamped marker.
    pub fn send(&self, message: impl Into<String>) -> Result<Marker> {
        let marker = Marker::now(message);
        self.send_marker(marker.clone())?;
        Ok(marker)
    }

    pub fn send_marker(&self, marker: Marker) -> Result<()> {
        let message = marker.message.clone();
        match self.tx.try_send(WorkerCmd::Publish(marker)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Marker queue full, dropped {message:?}");
                Err(MarkerError::QueueFull(message))
            }
            Err(TrySendError::Disconnected(_)) => Err(MarkerError::Disconnected),
        }
    }
}

pub struct MarkerWorker {
    sender: MarkerSender,
    feed: Receiver<Marker>,
    worker_thread: Option<thread::JoinHandle<()>>,
}

impl MarkerWorker {
    pub fn start(sinks: Vec<Box<dyn MarkerSink>>) -> Result<Self> {
        Self::with_capacity(sinks, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(sinks: Vec<Box<dyn MarkerSink>>, capacity: usize) -> Result<Self> {
        let (tx, rx) = bounded(capacity.max(1));
        let (feed_tx, feed_rx) = bounded(FEED_CAPACITY);
        let metrics = Arc::new(WorkerMetrics::default());

        let worker_metrics = Arc::clone(&metrics);
        let worker_feed = feed_rx.clone();
        let worker_thread = thread::Builder::new()
            .name("marker-worker".into())
            .spawn(move || Self::run(sinks, rx, feed_tx, worker_feed, worker_metrics))?;

        Ok(Self {
            sender: MarkerSender { tx, metrics },
            feed: feed_rx,
            worker_thread: Some(worker_thread),
        })
    }

    pub fn sender(&self) -> MarkerSender {
        self.sender.clone()
    }

    /// Markers published since the last call, oldest first. Only the most
    /// recent ones are kept if nobody drains the feed.
    pub fn drain_feed(&self) -> Vec<Marker> {
        self.feed.try_iter().collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.sender.metrics.snapshot()
    }

    /// Blocks until everything queued before this call reached the sinks.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender
            .tx
            .send(WorkerCmd::Flush(ack_tx))
            .map_err(|_| MarkerError::Disconnected)?;
        ack_rx.recv().map_err(|_| MarkerError::Disconnected)
    }

    /// Publishes what is still queued, flushes the sinks and joins the worker.
    pub fn shutdown(mut self) -> MetricsSnapshot {
        self.stop_thread();
        self.metrics()
    }

    fn stop_thread(&mut self) {
        if let Some(handle) = self.worker_thread.take() {
            let _ = self.sender.tx.send(WorkerCmd::Shutdown);
            if handle.join().is_err() {
                log::error!("marker worker panicked");
            }
        }
    }

    fn run(
        mut sinks: Vec<Box<dyn MarkerSink>>,
        rx: Receiver<WorkerCmd>,
        feed_tx: Sender<Marker>,
        feed_rx: Receiver<Marker>,
        metrics: Arc<WorkerMetrics>,
    ) {
        while let Ok(cmd) = rx.recv() {
            match cmd {
                WorkerCmd::Publish(marker) => {
                    for sink in sinks.iter_mut() {
                        if let Err(e) = sink.publish(&marker) {
                            metrics.sink_failures.fetch_add(1, Ordering::Relaxed);
                            log::error!("{} sink failed on {:?}: {e}", sink.name(), marker.message);
                        }
                    }
                    metrics.published.fetch_add(1, Ordering::Relaxed);
                    Self::echo(&feed_tx, &feed_rx, marker);
                }
                WorkerCmd::Flush(ack) => {
                    Self::flush_all(&mut sinks, &metrics);
                    let _ = ack.send(());
                }
                WorkerCmd::Shutdown => break,
            }
        }
        Self::flush_all(&mut sinks, &metrics);
        log::debug!("marker worker stopped");
    }

    /// Drops the oldest feed entry when the feed is full.
    fn echo(feed_tx: &Sender<Marker>, feed_rx: &Receiver<Marker>, marker: Marker) {
        if let Err(TrySendError::Full(marker)) = feed_tx.try_send(marker) {
            let _ = feed_rx.try_recv();
            let _ = feed_tx.try_send(marker);
        }
    }

    fn flush_all(sinks: &mut [Box<dyn MarkerSink>], metrics: &WorkerMetrics) {
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.flush() {
                metrics.sink_failures.fetch_add(1, Ordering::Relaxed);
                log::error!("{} sink flush failed: {e}", sink.name());
            }
        }
    }
}

impl Drop for MarkerWorker {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
