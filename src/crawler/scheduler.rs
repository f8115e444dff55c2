//! Bounded task queue
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - A per-task completion signal (the semaphore permit) released exactly once
//! - A one-shot drain signal fired when nothing is queued or in flight

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};

/// Work executed for every pushed task
///
/// The queue is passed in so the handler can push follow-up tasks.
#[async_trait]
pub trait TaskHandler<T>: Send + Sync {
    async fn handle(&self, task: T, queue: &TaskQueue<T>);
}

struct Inner<T> {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    handler: Arc<dyn TaskHandler<T>>,

    /// Tasks queued or running, plus outstanding holds
    in_flight: AtomicUsize,
    running: AtomicUsize,
    peak_running: AtomicUsize,

    drained: watch::Sender<bool>,
    fired: AtomicBool,
}

/// Runs up to `max_concurrent` tasks at once
///
/// A pushed task waits for a free slot. Its permit is held for the whole
/// handler execution and dropped when the handler returns or panics, which
/// is the task's completion signal.
pub struct TaskQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> TaskQueue<T> {
    pub fn new(max_concurrent: usize, handler: Arc<dyn TaskHandler<T>>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (drained, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
                handler,
                in_flight: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                peak_running: AtomicUsize::new(0),
                drained,
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Queues a task; it starts as soon as a slot frees up
    pub fn push(&self, task: T) {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let queue = self.clone();

        tokio::spawn(async move {
            match queue.inner.semaphore.clone().acquire_owned().await {
                Ok(_permit) => {
                    let now = queue.inner.running.fetch_add(1, Ordering::SeqCst) + 1;
                    queue.inner.peak_running.fetch_max(now, Ordering::SeqCst);

                    let handler = queue.inner.handler.clone();
                    let outcome = AssertUnwindSafe(handler.handle(task, &queue))
                        .catch_unwind()
                        .await;
                    if outcome.is_err() {
                        tracing::error!("Task handler panicked; releasing its slot");
                    }

                    queue.inner.running.fetch_sub(1, Ordering::SeqCst);
                }
                Err(_) => tracing::error!("Task queue semaphore closed; dropping task"),
            }

            queue.complete_one();
        });
    }

    /// Keeps the queue from draining while work is still being submitted
    pub fn hold(&self) -> QueueHold<T> {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        QueueHold {
            queue: self.clone(),
        }
    }

    fn complete_one(&self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.fire_drain();
        }
    }

    /// Fires the drain signal unless it already fired
    pub fn fire_drain(&self) {
        if !self.inner.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!("Task queue drained");
            self.inner.drained.send_replace(true);
        }
    }

    /// Returns true if nothing is queued or in flight right now
    pub fn idle(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Returns true once the drain signal has fired
    pub fn has_drained(&self) -> bool {
        *self.inner.drained.borrow()
    }

    /// Waits for the drain signal
    pub async fn drained(&self) {
        let mut rx = self.inner.drained.subscribe();
        // The sender lives in `self`, so this only returns once drained
        let _ = rx.wait_for(|drained| *drained).await;
    }

    /// Number of handlers executing right now
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Highest number of handlers that ever executed at once
    pub fn peak_running(&self) -> usize {
        self.inner.peak_running.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }
}

/// Counts as one in-flight task until dropped
pub struct QueueHold<T: Send + 'static> {
    queue: TaskQueue<T>,
}

impl<T: Send + 'static> Drop for QueueHold<T> {
    fn drop(&mut self) {
        self.queue.complete_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Sleeps, records the task, and pushes `n - 1` until zero
    struct Countdown {
        seen: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl TaskHandler<u32> for Countdown {
        async fn handle(&self, task: u32, queue: &TaskQueue<u32>) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.seen.lock().unwrap().push(task);
            if task > 0 {
                queue.push(task - 1);
            }
        }
    }

    struct Sleeper;

    #[async_trait]
    impl TaskHandler<u32> for Sleeper {
        async fn handle(&self, _task: u32, _queue: &TaskQueue<u32>) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    struct Panicker;

    #[async_trait]
    impl TaskHandler<u32> for Panicker {
        async fn handle(&self, task: u32, _queue: &TaskQueue<u32>) {
            if task % 2 == 0 {
                panic!("task {} blew up", task);
            }
        }
    }

    #[tokio::test]
    async fn test_follow_up_tasks_run_before_drain() {
        let handler = Arc::new(Countdown {
            seen: Mutex::new(Vec::new()),
        });
        let queue = TaskQueue::new(2, handler.clone());

        queue.push(3);
        queue.drained().await;

        assert!(queue.idle());
        assert_eq!(*handler.seen.lock().unwrap(), vec![3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let queue = TaskQueue::new(3, Arc::new(Sleeper));

        for i in 0..12 {
            queue.push(i);
        }
        queue.drained().await;

        assert_eq!(queue.peak_running(), 3);
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn test_hold_delays_drain() {
        let queue = TaskQueue::new(1, Arc::new(Sleeper));

        let hold = queue.hold();
        queue.push(1);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!queue.has_drained());
        assert!(!queue.idle());

        drop(hold);
        queue.drained().await;
        assert!(queue.has_drained());
    }

    #[tokio::test]
    async fn test_panicking_task_releases_slot() {
        let queue = TaskQueue::new(1, Arc::new(Panicker));

        for i in 0..4 {
            queue.push(i);
        }

        tokio::time::timeout(Duration::from_secs(5), queue.drained())
            .await
            .expect("queue should drain even when tasks panic");
        assert!(queue.idle());
    }

    #[tokio::test]
    async fn test_drain_fires_once() {
        let queue = TaskQueue::new(1, Arc::new(Sleeper));
        assert!(queue.idle());

        queue.fire_drain();
        queue.fire_drain();
        queue.drained().await;
        assert!(queue.has_drained());
    }
}
