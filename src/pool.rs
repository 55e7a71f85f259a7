//! Reusable request handlers for the filesystem transport.
//!
//! Each [`RequestObject`] is backed by its own worker task and a job
//! channel. Idle objects wait on the pool's stack and are handed out again
//! instead of spawning a worker per request, so the number of workers
//! settles at the peak number of requests in flight and never shrinks
//! until the pool shuts down. The stack is owned by one coordinator task
//! that serves allocation and release from a single `select!` loop.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

pub type RequestId = u64;

/// Work run on a request object's worker.
pub type Job = Box<dyn FnOnce(RequestId) + Send>;

/// Hook run by a worker after every job, before it rejoins the pool.
pub type AfterJob = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("request pool is shut down")]
    Closed,

    #[error("worker for request object {0} has stopped")]
    WorkerGone(RequestId),
}

/// A handle to an idle worker. Dispatching a job hands the object back to
/// the worker, which returns it to the pool when the job is done.
#[derive(Debug)]
pub struct RequestObject {
    id: RequestId,
    jobs: mpsc::UnboundedSender<Job>,
}

impl RequestObject {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Run `job` on this object's worker.
    pub fn dispatch(self, job: impl FnOnce(RequestId) + Send + 'static) -> Result<(), PoolError> {
        let id = self.id;
        self.jobs
            .send(Box::new(job))
            .map_err(|_| PoolError::WorkerGone(id))
    }
}

/// Worker and idle counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub idle: usize,
}

#[derive(Clone, Debug)]
pub struct RequestPool {
    alloc_tx: mpsc::Sender<oneshot::Sender<RequestObject>>,
    release_tx: mpsc::UnboundedSender<RequestObject>,
    stats_tx: mpsc::Sender<oneshot::Sender<PoolStats>>,
}

impl RequestPool {
    /// Start the pool coordinator. Workers and coordinator stop when
    /// `shutdown` becomes true or its sender is dropped.
    pub fn spawn(after_job: Option<AfterJob>, shutdown: watch::Receiver<bool>) -> (Self, JoinHandle<()>) {
        let (alloc_tx, alloc_rx) = mpsc::channel(16);
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = mpsc::channel(4);
        let coordinator = PoolCoordinator {
            idle: Vec::new(),
            workers: 0,
            next_id: 1,
            release_tx: release_tx.clone(),
            after_job,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(coordinator.run(alloc_rx, release_rx, stats_rx, shutdown));
        (
            Self {
                alloc_tx,
                release_tx,
                stats_tx,
            },
            task,
        )
    }

    /// Get an idle object, creating a worker if none is idle.
    pub async fn allocate(&self) -> Result<RequestObject, PoolError> {
        let (tx, rx) = oneshot::channel();
        self.alloc_tx.send(tx).await.map_err(|_| PoolError::Closed)?;
        rx.await.map_err(|_| PoolError::Closed)
    }

    /// Return an object that was allocated but not dispatched.
    pub fn release(&self, obj: RequestObject) {
        if self.release_tx.send(obj).is_err() {
            log::debug!("request pool closed; object dropped on release");
        }
    }

    pub async fn stats(&self) -> Result<PoolStats, PoolError> {
        let (tx, rx) = oneshot::channel();
        self.stats_tx.send(tx).await.map_err(|_| PoolError::Closed)?;
        rx.await.map_err(|_| PoolError::Closed)
    }
}

struct PoolCoordinator {
    idle: Vec<RequestObject>,
    workers: usize,
    next_id: RequestId,
    release_tx: mpsc::UnboundedSender<RequestObject>,
    after_job: Option<AfterJob>,
    shutdown: watch::Receiver<bool>,
}

impl PoolCoordinator {
    async fn run(
        mut self,
        mut alloc_rx: mpsc::Receiver<oneshot::Sender<RequestObject>>,
        mut release_rx: mpsc::UnboundedReceiver<RequestObject>,
        mut stats_rx: mpsc::Receiver<oneshot::Sender<PoolStats>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            // Returns are taken before new allocations so idle objects are reused.
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(obj) = release_rx.recv() => {
                    self.idle.push(obj);
                }
                Some(reply) = alloc_rx.recv() => {
                    let obj = match self.idle.pop() {
                        Some(obj) => obj,
                        None => self.spawn_worker(),
                    };
                    // Requester went away; keep the object.
                    if let Err(obj) = reply.send(obj) {
                        self.idle.push(obj);
                    }
                }
                Some(reply) = stats_rx.recv() => {
                    let _ = reply.send(PoolStats {
                        workers: self.workers,
                        idle: self.idle.len(),
                    });
                }
                else => break,
            }
        }
        log::info!("request pool stopped with {} workers", self.workers);
    }

    fn spawn_worker(&mut self) -> RequestObject {
        let id = self.next_id;
        self.next_id += 1;
        self.workers += 1;
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            id,
            jobs_tx: jobs_tx.clone(),
            release_tx: self.release_tx.clone(),
            after_job: self.after_job.clone(),
        };
        tokio::spawn(worker.run(jobs_rx, self.shutdown.clone()));
        crate::debug_log!("POOL", "spawned worker {} ({} total)", id, self.workers);
        RequestObject { id, jobs: jobs_tx }
    }
}

struct Worker {
    id: RequestId,
    jobs_tx: mpsc::UnboundedSender<Job>,
    release_tx: mpsc::UnboundedSender<RequestObject>,
    after_job: Option<AfterJob>,
}

impl Worker {
    async fn run(self, mut jobs: mpsc::UnboundedReceiver<Job>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(job) = jobs.recv() => {
                    job(self.id);
                    if let Some(hook) = &self.after_job {
                        hook();
                    }
                    let obj = RequestObject {
                        id: self.id,
                        jobs: self.jobs_tx.clone(),
                    };
                    if self.release_tx.send(obj).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_reuse_keeps_high_water_mark() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (pool, _task) = RequestPool::spawn(None, shutdown_rx);

        let a = pool.allocate().await.unwrap();
        let b = pool.allocate().await.unwrap();
        let c = pool.allocate().await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.stats().await.unwrap(), PoolStats { workers: 3, idle: 0 });

        let reused = c.id();
        pool.release(a);
        pool.release(b);
        pool.release(c);
        assert_eq!(pool.stats().await.unwrap(), PoolStats { workers: 3, idle: 3 });

        let again = pool.allocate().await.unwrap();
        assert_eq!(again.id(), reused);
        assert_eq!(pool.stats().await.unwrap(), PoolStats { workers: 3, idle: 2 });
    }

    #[tokio::test]
    async fn test_dispatch_runs_job_then_hook_then_returns() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let hooks = Arc::new(AtomicUsize::new(0));
        let hook: AfterJob = {
            let hooks = Arc::clone(&hooks);
            Arc::new(move || {
                hooks.fetch_add(1, Ordering::SeqCst);
            })
        };
        let (pool, _task) = RequestPool::spawn(Some(hook), shutdown_rx);

        let obj = pool.allocate().await.unwrap();
        let id = obj.id();
        let (tx, rx) = oneshot::channel();
        obj.dispatch(move |rid| {
            let _ = tx.send(rid);
        })
        .unwrap();
        assert_eq!(rx.await.unwrap(), id);

        // the object comes back to the pool after the hook ran
        let mut stats = pool.stats().await.unwrap();
        for _ in 0..100 {
            if stats.idle == 1 {
                break;
            }
            tokio::task::yield_now().await;
            stats = pool.stats().await.unwrap();
        }
        assert_eq!(stats, PoolStats { workers: 1, idle: 1 });
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_pool() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (pool, task) = RequestPool::spawn(None, shutdown_rx);
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert!(matches!(pool.allocate().await, Err(PoolError::Closed)));
    }
}
