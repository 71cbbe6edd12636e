//! Registry of in-flight import executions.

use std::collections::HashMap;

use portage_core::types::DbId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Tracks one cancellation token per actively executing job.
///
/// The status-machine guard (`validated -> running` is atomic) already
/// prevents two executions of the same job; this registry exists so the
/// cancel endpoint and graceful shutdown can reach the running tasks.
#[derive(Default)]
pub struct ExecutionManager {
    active: Mutex<HashMap<DbId, CancellationToken>>,
}

impl ExecutionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new execution and return its cancellation token.
    pub async fn begin(&self, job_id: DbId) -> CancellationToken {
        let token = CancellationToken::new();
        self.active.lock().await.insert(job_id, token.clone());
        token
    }

    /// Remove a finished execution from the registry.
    pub async fn finish(&self, job_id: DbId) {
        self.active.lock().await.remove(&job_id);
    }

    /// Request cooperative cancellation of a running job.
    ///
    /// Returns `false` when no execution is registered for the job.
    pub async fn cancel(&self, job_id: DbId) -> bool {
        match self.active.lock().await.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of currently registered executions.
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Cancel every registered execution (graceful shutdown).
    pub async fn cancel_all(&self) {
        for token in self.active.lock().await.values() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_registers_and_finish_removes() {
        let manager = ExecutionManager::new();
        let _token = manager.begin(1).await;
        assert_eq!(manager.active_count().await, 1);
        manager.finish(1).await;
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn cancel_fires_the_registered_token() {
        let manager = ExecutionManager::new();
        let token = manager.begin(7).await;
        assert!(manager.cancel(7).await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_unknown_job_is_false() {
        let manager = ExecutionManager::new();
        assert!(!manager.cancel(99).await);
    }

    #[tokio::test]
    async fn cancel_all_fires_every_token() {
        let manager = ExecutionManager::new();
        let a = manager.begin(1).await;
        let b = manager.begin(2).await;
        manager.cancel_all().await;
        assert!(a.is_cancelled() && b.is_cancelled());
    }
}
