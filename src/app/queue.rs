use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Fire-and-forget background jobs with bounded concurrency.
///
/// `spawn` never waits; jobs queue on the semaphore. `wait_idle` resolves once
/// every job submitted so far has finished.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl TaskQueue {
    pub fn new(max_concurrency: usize) -> Self {
        let permits = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            tracker: TaskTracker::new(),
        }
    }

    pub fn spawn<F>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        self.tracker.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                tracing::warn!(task = name, "task queue closed; dropping job");
                return;
            };
            fut.await;
        });
    }

    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
