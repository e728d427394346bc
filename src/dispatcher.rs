//! Fixed-size worker pool with a bounded task queue.
//!
//! The producer blocks in [`TaskDispatcher::submit`] while the queue is full,
//! which bounds the number of records held in memory. [`TaskDispatcher::join`]
//! closes the queue and waits for every worker, so once it returns every
//! submitted task has run to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Sender, bounded};
use log::debug;

use crate::error::{KnnTruthError, Result};

/// Counters describing dispatcher activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Tasks accepted by `submit`.
    pub tasks_submitted: u64,

    /// Tasks whose handler returned.
    pub tasks_completed: u64,
}

/// Worker pool applying one handler to every submitted task.
///
/// Tasks are moved into the queue and dropped by the worker that ran them.
pub struct TaskDispatcher<T: Send + 'static> {
    sender: Option<Sender<T>>,
    workers: Vec<thread::JoinHandle<()>>,
    submitted: AtomicU64,
    completed: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl<T: Send + 'static> TaskDispatcher<T> {
    /// Start `worker_threads` workers sharing a queue of `queue_capacity` slots.
    pub fn new<F>(worker_threads: usize, queue_capacity: usize, handler: F) -> Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        if worker_threads == 0 {
            return Err(KnnTruthError::config("worker_threads must be at least 1"));
        }
        if queue_capacity == 0 {
            return Err(KnnTruthError::config("queue_capacity must be at least 1"));
        }

        let (sender, receiver) = bounded::<T>(queue_capacity);
        let handler = Arc::new(handler);
        let completed = Arc::new(AtomicU64::new(0));

        let mut workers = Vec::with_capacity(worker_threads);
        for worker_id in 0..worker_threads {
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);
            let completed = Arc::clone(&completed);

            let handle = thread::Builder::new()
                .name(format!("truth-worker-{worker_id}"))
                .spawn(move || {
                    // Ends once the queue is closed and drained
                    for task in receiver.iter() {
                        handler(task);
                        completed.fetch_add(1, Ordering::Release);
                    }
                    debug!("worker {worker_id} finished");
                })?;
            workers.push(handle);
        }

        Ok(TaskDispatcher {
            sender: Some(sender),
            workers,
            submitted: AtomicU64::new(0),
            completed,
            queue_capacity,
        })
    }

    /// Enqueue a task, blocking while the queue is full.
    pub fn submit(&self, task: T) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| KnnTruthError::internal("dispatcher already closed"))?;

        sender
            .send(task)
            .map_err(|_| KnnTruthError::internal("all workers have exited"))?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of tasks waiting in the queue.
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map(|s| s.len()).unwrap_or(0)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            tasks_submitted: self.submitted.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Acquire),
        }
    }

    /// Close the queue and wait until every submitted task has finished.
    pub fn join(mut self) -> Result<DispatcherStats> {
        self.shutdown()?;
        Ok(self.stats())
    }

    fn shutdown(&mut self) -> Result<()> {
        // Dropping the only sender closes the channel
        self.sender.take();

        let mut panicked = 0;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                panicked += 1;
            }
        }

        if panicked > 0 {
            return Err(KnnTruthError::thread_join(format!(
                "{panicked} worker thread(s) panicked"
            )));
        }
        Ok(())
    }
}

impl<T: Send + 'static> Drop for TaskDispatcher<T> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_join_waits_for_every_task() {
        let sum = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&sum);
        let dispatcher = TaskDispatcher::new(4, 8, move |value: u64| {
            thread::sleep(Duration::from_micros(50));
            sink.fetch_add(value, Ordering::SeqCst);
        })
        .unwrap();

        for value in 1..=200u64 {
            dispatcher.submit(value).unwrap();
        }
        let stats = dispatcher.join().unwrap();

        assert_eq!(sum.load(Ordering::SeqCst), 200 * 201 / 2);
        assert_eq!(stats.tasks_submitted, 200);
        assert_eq!(stats.tasks_completed, 200);
    }

    #[test]
    fn test_queue_depth_is_bounded() {
        let gate = Arc::new(Mutex::new(()));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let guard = gate.lock();

        let worker_gate = Arc::clone(&gate);
        let dispatcher = Arc::new(
            TaskDispatcher::new(1, 2, move |_: usize| {
                let _held = worker_gate.lock();
            })
            .unwrap(),
        );

        let producer = {
            let dispatcher = Arc::clone(&dispatcher);
            let max_seen = Arc::clone(&max_seen);
            thread::spawn(move || {
                for i in 0..10 {
                    dispatcher.submit(i).unwrap();
                    max_seen.fetch_max(dispatcher.pending(), Ordering::SeqCst);
                }
            })
        };

        thread::sleep(Duration::from_millis(50));
        // One task is blocked in the worker, two fill the queue, the producer waits
        assert!(dispatcher.stats().tasks_submitted <= 3);
        drop(guard);

        producer.join().unwrap();
        let dispatcher = Arc::try_unwrap(dispatcher).ok().unwrap();
        let stats = dispatcher.join().unwrap();

        assert_eq!(stats.tasks_completed, 10);
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let dispatcher = TaskDispatcher::new(1, 4, |value: u32| {
            if value == 3 {
                panic!("boom");
            }
        })
        .unwrap();

        for value in 0..3 {
            dispatcher.submit(value).unwrap();
        }
        let _ = dispatcher.submit(3);

        assert!(matches!(
            dispatcher.join(),
            Err(KnnTruthError::ThreadJoinError(_))
        ));
    }

    #[test]
    fn test_pool_shape() {
        let dispatcher = TaskDispatcher::new(3, 5, |_: u8| {}).unwrap();
        assert_eq!(dispatcher.worker_count(), 3);
        assert_eq!(dispatcher.queue_capacity(), 5);
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(dispatcher.join().unwrap(), DispatcherStats::default());
    }

    #[test]
    fn test_rejects_empty_pool() {
        assert!(TaskDispatcher::new(0, 4, |_: u8| {}).is_err());
        assert!(TaskDispatcher::new(2, 0, |_: u8| {}).is_err());
    }
}
