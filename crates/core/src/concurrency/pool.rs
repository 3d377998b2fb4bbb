//! Fixed-size worker pool.
//!
//! A set of long-lived threads consume boxed tasks from one FIFO channel. Each
//! worker exits when it dequeues its [`Message::Shutdown`] sentinel; dropping the
//! pool sends one sentinel per worker and joins every thread.
//!
//! Two submission styles are offered:
//!
//! - [`WorkerPool::schedule`] for `'static` fire-and-forget tasks.
//! - [`WorkerPool::scope`] for fork-join work that borrows caller data. Every
//!   task spawned on the [`Scope`] has finished before `scope` returns.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use super::CompletionLatch;
use crate::error::{IndexError, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

pub struct WorkerPool {
    sender: Sender<Message>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` worker threads.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(IndexError::InvalidConfig(
                "worker pool size must be at least 1".into(),
            ));
        }

        let (sender, receiver) = unbounded::<Message>();
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("retrieval-worker-{id}"))
                .spawn(move || worker_loop(id, receiver))?;
            workers.push(handle);
        }
        tracing::debug!(workers = size, "worker pool started");

        Ok(Self { sender, workers })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task and return immediately.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(task));
    }

    /// Run `f` with a [`Scope`] on which borrowing tasks can be spawned, then
    /// block until all of them have completed.
    ///
    /// If any task panicked, the first panic message is returned as
    /// [`IndexError::TaskFailed`]. A panic in `f` itself is resumed after the
    /// outstanding tasks have drained.
    pub fn scope<'pool, 'scope, F, R>(&'pool self, f: F) -> Result<R>
    where
        F: FnOnce(&Scope<'pool, 'scope>) -> R,
    {
        let scope = Scope {
            pool: self,
            latch: Arc::new(CompletionLatch::new(0)),
            failure: Arc::new(Mutex::new(None)),
            _marker: PhantomData,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));
        scope.join();

        match outcome {
            Err(payload) => panic::resume_unwind(payload),
            Ok(value) => match scope.failure.lock().take() {
                Some(message) => Err(IndexError::TaskFailed(message)),
                None => Ok(value),
            },
        }
    }

    fn submit(&self, task: Task) {
        // Workers only leave on their sentinel, which is sent from Drop, so the
        // channel is connected for the pool's whole lifetime.
        if let Err(err) = self.sender.send(Message::Run(task)) {
            tracing::error!("worker queue disconnected; running task inline");
            if let Message::Run(task) = err.into_inner() {
                task();
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for _ in 0..self.workers.len() {
            let _ = self.sender.send(Message::Shutdown);
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread exited abnormally");
            }
        }
        tracing::debug!("worker pool stopped");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("queued", &self.sender.len())
            .finish()
    }
}

fn worker_loop(id: usize, receiver: Receiver<Message>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(task) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    tracing::warn!(
                        worker = id,
                        panic = %panic_message(payload.as_ref()),
                        "scheduled task panicked"
                    );
                }
            }
            Message::Shutdown => break,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Handle for spawning tasks that may borrow data living for `'scope`.
pub struct Scope<'pool, 'scope> {
    pool: &'pool WorkerPool,
    latch: Arc<CompletionLatch>,
    failure: Arc<Mutex<Option<String>>>,
    _marker: PhantomData<std::cell::Cell<&'scope mut ()>>,
}

impl<'pool, 'scope> Scope<'pool, 'scope> {
    /// Spawn a task on the pool. It is guaranteed to finish before the
    /// enclosing [`WorkerPool::scope`] call returns.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        self.latch.add(1);
        let latch = Arc::clone(&self.latch);
        let failure = Arc::clone(&self.failure);

        let job: Box<dyn FnOnce() + Send + 'scope> = Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let mut slot = failure.lock();
                if slot.is_none() {
                    *slot = Some(panic_message(payload.as_ref()));
                }
            }
            latch.count_down();
        });

        // SAFETY: the scope blocks on `latch` (in `WorkerPool::scope` and in
        // `Drop`) until this job has run, so nothing it borrows for `'scope`
        // is released while the job is still queued or running.
        let job: Task = unsafe {
            std::mem::transmute::<Box<dyn FnOnce() + Send + 'scope>, Task>(job)
        };
        self.pool.submit(job);
    }

    fn join(&self) {
        self.latch.wait();
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_workers_rejected() {
        let err = WorkerPool::new(0).unwrap_err();
        assert!(matches!(err, IndexError::InvalidConfig(_)));
    }

    #[test]
    fn test_schedule_runs_every_task() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let latch = Arc::new(CompletionLatch::new(100));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            let latch = Arc::clone(&latch);
            pool.schedule(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                latch.count_down();
            });
        }
        latch.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_scope_writes_disjoint_slices() {
        let pool = WorkerPool::new(3).unwrap();
        let mut buffer = vec![0usize; 1000];
        pool.scope(|s| {
            for (i, chunk) in buffer.chunks_mut(64).enumerate() {
                s.spawn(move || {
                    for slot in chunk.iter_mut() {
                        *slot = i;
                    }
                });
            }
        })
        .unwrap();
        for (pos, v) in buffer.iter().enumerate() {
            assert_eq!(*v, pos / 64);
        }
    }

    #[test]
    fn test_scope_borrows_caller_data() {
        let pool = WorkerPool::new(2).unwrap();
        let data: Vec<u32> = (1..=10).collect();
        let total = AtomicUsize::new(0);
        pool.scope(|s| {
            for v in &data {
                let total = &total;
                s.spawn(move || {
                    total.fetch_add(*v as usize, Ordering::SeqCst);
                });
            }
        })
        .unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 55);
    }

    #[test]
    fn test_task_panic_fails_scope_and_worker_survives() {
        let pool = WorkerPool::new(1).unwrap();
        let err = pool
            .scope(|s| {
                s.spawn(|| panic!("bucket exploded"));
                s.spawn(|| {});
            })
            .unwrap_err();
        match err {
            IndexError::TaskFailed(msg) => assert!(msg.contains("bucket exploded")),
            other => panic!("unexpected error {other:?}"),
        }

        // The single worker must still be alive.
        let value = pool.scope(|s| {
            s.spawn(|| {});
            7
        });
        assert_eq!(value.unwrap(), 7);
    }

    #[test]
    fn test_empty_scope() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.scope(|_| "done").unwrap(), "done");
    }

    #[test]
    fn test_drop_joins_workers() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(4).unwrap();
            assert_eq!(pool.size(), 4);
            for _ in 0..32 {
                let counter = Arc::clone(&counter);
                pool.schedule(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        // Sentinels queue behind the tasks, so every task ran before shutdown.
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn test_concurrent_scopes_share_pool() {
        let pool = Arc::new(WorkerPool::new(4).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut out = vec![0usize; 8];
                    pool.scope(|s| {
                        for (i, slot) in out.iter_mut().enumerate() {
                            s.spawn(move || *slot = t * 100 + i);
                        }
                    })
                    .unwrap();
                    out
                })
            })
            .collect();
        for (t, h) in handles.into_iter().enumerate() {
            let out = h.join().unwrap();
            assert_eq!(out, (0..8).map(|i| t * 100 + i).collect::<Vec<_>>());
        }
    }
}
