//! Per-instance locks
//!
//! Transition attempts on one instance run one at a time; attempts on
//! different instances never wait on each other.

use formflow_types::WorkflowInstanceId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created mutex per workflow instance
#[derive(Debug, Default)]
pub struct InstanceLocks {
    locks: Mutex<HashMap<WorkflowInstanceId, Arc<Mutex<()>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Access is released when the
    /// returned guard is dropped.
    pub async fn acquire(&self, id: &WorkflowInstanceId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forget the lock for `id` once nobody holds or waits on it. Call
    /// after the guard from [`InstanceLocks::acquire`] has been dropped.
    pub async fn release(&self, id: &WorkflowInstanceId) -> bool {
        let mut locks = self.locks.lock().await;
        match locks.get(id) {
            Some(lock) if Arc::strong_count(lock) == 1 => locks.remove(id).is_some(),
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
