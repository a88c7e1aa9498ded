//! Keyed request batching.
//!
//! Callers add individual keys and await their own results; the batcher
//! coalesces queued keys and hands them to one processor call per flush.
//! A flush happens when the queue reaches `max_batch_size` (immediately,
//! with exactly that many entries) or when `flush_delay` elapses after the
//! first queued entry, whichever comes first.
//!
//! Flush scheduling is an explicit state machine: the queue is either
//! `Idle` or `Scheduled` with a live timer task. Draining bumps a
//! generation counter under the queue lock, and a timer that wakes up
//! after its generation has passed must leave the queue alone. That keeps
//! size-triggered and timer-triggered flushes from racing each other.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;
use crate::Result;

/// Processor invoked once per flush with the drained keys. Returns a map
/// from key to result; keys the processor omits fail individually.
pub type BatchProcessor<V> =
    Box<dyn Fn(Vec<String>) -> BoxFuture<'static, Result<HashMap<String, V>>> + Send + Sync>;

/// Batcher configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Queue size that triggers an immediate flush.
    pub max_batch_size: usize,
    /// How long the first queued entry may wait before a flush.
    pub flush_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            flush_delay: Duration::from_millis(50),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }
}

struct PendingRequest<V> {
    key: String,
    tx: oneshot::Sender<Result<V>>,
}

enum FlushState {
    Idle,
    Scheduled(JoinHandle<()>),
}

struct BatchQueue<V> {
    pending: VecDeque<PendingRequest<V>>,
    flush: FlushState,
    /// Bumped on every drain; armed timers compare against it to detect
    /// that their batch was already taken.
    generation: u64,
}

struct BatcherInner<V> {
    config: BatchConfig,
    processor: BatchProcessor<V>,
    queue: Mutex<BatchQueue<V>>,
}

/// Coalesces keyed lookups into batched processor calls.
///
/// Duplicate keys are not de-duplicated: each [`RequestBatcher::add`] call
/// holds its own queue slot and resolves independently, even within one
/// flush. Dropping the batcher does not cancel armed flushes; queued
/// entries still complete.
pub struct RequestBatcher<V> {
    inner: Arc<BatcherInner<V>>,
}

impl<V> Clone for RequestBatcher<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for RequestBatcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBatcher")
            .field("config", &self.inner.config)
            .field("pending", &self.pending())
            .finish()
    }
}

impl<V> RequestBatcher<V> {
    /// Entries queued and not yet drained into a flush.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().unwrap().pending.len()
    }
}

impl<V: Clone + Send + 'static> RequestBatcher<V> {
    pub fn new<F>(config: BatchConfig, processor: F) -> Self
    where
        F: Fn(Vec<String>) -> BoxFuture<'static, Result<HashMap<String, V>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            inner: Arc::new(BatcherInner {
                config,
                processor: Box::new(processor),
                queue: Mutex::new(BatchQueue {
                    pending: VecDeque::new(),
                    flush: FlushState::Idle,
                    generation: 0,
                }),
            }),
        }
    }

    /// Queue `key` and wait for its result from a future flush.
    pub async fn add(&self, key: impl Into<String>) -> Result<V> {
        let receiver = self.enqueue(key.into());
        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(Error::BatchDropped),
        }
    }

    fn enqueue(&self, key: String) -> oneshot::Receiver<Result<V>> {
        let (tx, rx) = oneshot::channel();
        let mut queue = self.inner.queue.lock().unwrap();
        queue.pending.push_back(PendingRequest { key, tx });

        if queue.pending.len() >= self.inner.config.max_batch_size {
            let batch = Self::drain_ready(&mut queue, self.inner.config.max_batch_size);
            drop(queue);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                Self::run_flush(inner, batch).await;
            });
        } else if matches!(queue.flush, FlushState::Idle) {
            let armed_generation = queue.generation;
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(inner.config.flush_delay).await;
                let batch = {
                    let mut queue = inner.queue.lock().unwrap();
                    if queue.generation != armed_generation {
                        // A size-triggered flush already took this batch.
                        return;
                    }
                    queue.flush = FlushState::Idle;
                    Self::drain_ready(&mut queue, inner.config.max_batch_size)
                };
                Self::run_flush(inner, batch).await;
            });
            queue.flush = FlushState::Scheduled(handle);
        }
        rx
    }

    /// Take an exact prefix off the queue and disarm any scheduled timer.
    /// Callers hold the queue lock.
    fn drain_ready(queue: &mut BatchQueue<V>, max: usize) -> Vec<PendingRequest<V>> {
        queue.generation = queue.generation.wrapping_add(1);
        if let FlushState::Scheduled(handle) = std::mem::replace(&mut queue.flush, FlushState::Idle)
        {
            handle.abort();
        }
        let count = queue.pending.len().min(max);
        queue.pending.drain(..count).collect()
    }

    async fn run_flush(inner: Arc<BatcherInner<V>>, batch: Vec<PendingRequest<V>>) {
        if batch.is_empty() {
            return;
        }
        let keys: Vec<String> = batch.iter().map(|entry| entry.key.clone()).collect();
        debug!(batch_size = batch.len(), "flushing request batch");

        match (inner.processor)(keys).await {
            Ok(results) => {
                for entry in batch {
                    let outcome = match results.get(&entry.key) {
                        Some(value) => Ok(value.clone()),
                        None => Err(Error::BatchKeyMissing {
                            key: entry.key.clone(),
                        }),
                    };
                    // A dropped receiver is fine; the caller gave up.
                    let _ = entry.tx.send(outcome);
                }
            }
            Err(err) => {
                warn!(error = %err, "batch processor failed, rejecting all entries");
                for entry in batch {
                    let _ = entry.tx.send(Err(err.to_shared()));
                }
            }
        }
    }
}
