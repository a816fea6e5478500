// mldata-core/src/pool.rs

//! Bounded worker pools.
//!
//! A [`WorkerPool`] caps how many of its tasks run at once. Tasks are
//! spawned onto the ambient tokio runtime immediately and wait for a permit
//! before doing any work, so callers never block on submission and only
//! synchronise when they await the returned handle.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// A named, fixed-parallelism scheduling resource.
///
/// Clones share the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    workers: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a pool running at most `workers` tasks concurrently.
    pub fn new(name: &'static str, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            name,
            workers,
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of tasks currently holding a permit.
    pub fn busy(&self) -> usize {
        self.workers - self.permits.available_permits()
    }

    /// Submits a task. Must be called from within a tokio runtime.
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            task.await
        })
    }
}

/// The two pools the element pipeline schedules on.
#[derive(Debug, Clone)]
pub struct Pools {
    /// Index resolution, page and metadata requests.
    pub keys: WorkerPool,
    /// Content-bundle requests.
    pub content: WorkerPool,
}

impl Pools {
    pub fn new(key_workers: usize, content_workers: usize) -> Self {
        Self {
            keys: WorkerPool::new("keys", key_workers),
            content: WorkerPool::new("content", content_workers),
        }
    }
}
