//! C4 — Bounded Worker Pool.
//!
//! Fixed pool of workers draining a bounded queue. `submit` never blocks: a
//! full queue is rejected immediately, not queued, mirroring the "token
//! bucket on Hub admission" policy used elsewhere in the fabric. Used by the
//! Room Lifecycle Coordinator as the post-commit outbox for notify calls so
//! locks are released before the HTTP round-trip begins.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    QueueFull,
    ShutDown,
}

#[derive(Default)]
pub struct WorkerPoolCounters {
    pub total: AtomicU64,
    pub success: AtomicU64,
    pub failed: AtomicU64,
    pub queue_depth: AtomicUsize,
}

pub struct WorkerPool {
    sender: mpsc::Sender<Task>,
    cancel: CancellationToken,
    capacity: usize,
    counters: Arc<WorkerPoolCounters>,
    task_timeout: Duration,
    shutting_down: Arc<std::sync::atomic::AtomicBool>,
}

impl WorkerPool {
    /// Spawns `workers` consumer tasks draining a queue bounded at
    /// `queue_capacity`. `task_timeout` is the per-task deadline (default
    /// 30s per the notify contract).
    pub fn new(workers: usize, queue_capacity: usize, task_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Task>(queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let cancel = CancellationToken::new();
        let counters = Arc::new(WorkerPoolCounters::default());
        let shutting_down = Arc::new(std::sync::atomic::AtomicBool::new(false));

        for _ in 0..workers.max(1) {
            let rx = rx.clone();
            let cancel = cancel.clone();
            let counters = counters.clone();
            tokio::spawn(async move {
                loop {
                    let task = {
                        let mut guard = rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            task = guard.recv() => task,
                        }
                    };
                    let Some(task) = task else { break };
                    counters.queue_depth.fetch_sub(1, Ordering::SeqCst);
                    match tokio::time::timeout(task_timeout, task).await {
                        Ok(()) => {
                            counters.success.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(_) => {
                            counters.failed.fetch_add(1, Ordering::SeqCst);
                            tracing::warn!("worker pool task abandoned after timeout");
                        }
                    }
                }
            });
        }

        Self {
            sender: tx,
            cancel,
            capacity: queue_capacity,
            counters,
            task_timeout,
            shutting_down,
        }
    }

    /// Non-blocking submit. Returns immediately with the admission outcome.
    pub fn submit<F>(&self, fut: F) -> SubmitOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutting_down.load(Ordering::SeqCst) {
            return SubmitOutcome::ShutDown;
        }
        self.counters.total.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(Box::pin(fut)) {
            Ok(()) => {
                self.counters.queue_depth.fetch_add(1, Ordering::SeqCst);
                SubmitOutcome::Accepted
            }
            Err(mpsc::error::TrySendError::Full(_)) => SubmitOutcome::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SubmitOutcome::ShutDown,
        }
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn counters(&self) -> &WorkerPoolCounters {
        &self.counters
    }

    /// Closes admission, then waits up to `grace` for in-flight workers to
    /// drain before cancelling them outright.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let drained = tokio::time::timeout(grace, async {
            while self.counters.queue_depth.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!("worker pool shutdown grace period elapsed with work still queued");
        }
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn accepted_tasks_run() {
        let pool = WorkerPool::new(2, 8, Duration::from_secs(1));
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..5 {
            let counter = counter.clone();
            let outcome = pool.submit(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(outcome, SubmitOutcome::Accepted);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn full_queue_is_rejected_not_queued() {
        let pool = WorkerPool::new(0, 1, Duration::from_secs(1));
        // No workers drain it, so the first submit fills the queue...
        let outcome1 = pool.submit(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        assert_eq!(outcome1, SubmitOutcome::Accepted);
        let outcome2 = pool.submit(async {});
        assert_eq!(outcome2, SubmitOutcome::QueueFull);
    }

    #[tokio::test]
    async fn abandoned_task_is_counted_as_failed() {
        let pool = WorkerPool::new(1, 4, Duration::from_millis(10));
        pool.submit(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.counters().failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_submissions() {
        let pool = WorkerPool::new(1, 4, Duration::from_secs(1));
        pool.shutdown(Duration::from_millis(10)).await;
        let outcome = pool.submit(async {});
        assert_eq!(outcome, SubmitOutcome::ShutDown);
    }
}
