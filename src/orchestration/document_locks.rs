//! # Document Lock Registry
//!
//! Serializes mutation and aggregation per document inside one process. Each
//! document id maps to its own async mutex; documents never contend with each
//! other and there is no global lock.
//!
//! An entry lives only while someone holds or waits on it: the last guard to
//! drop removes it, so the map tracks active documents rather than every
//! document ever touched.
//!
//! Cross-process safety comes from the store's `lock_version` check, not from
//! this registry.
//!
//! ```rust
//! use docflow_core::orchestration::DocumentLockRegistry;
//! use uuid::Uuid;
//!
//! # tokio_test::block_on(async {
//! let registry = DocumentLockRegistry::new();
//! let document_id = Uuid::new_v4();
//! {
//!     let _guard = registry.acquire(document_id).await;
//!     assert_eq!(registry.len(), 1);
//! }
//! assert!(registry.is_empty());
//! # });
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct DocumentLockRegistry {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Exclusive access to one document; releases the registry entry on drop
#[derive(Debug)]
pub struct DocumentLockGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    registry: &'a DocumentLockRegistry,
    document_id: Uuid,
}

impl Drop for DocumentLockGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so our own Arc no longer counts
        drop(self.guard.take());
        self.registry.release(self.document_id);
    }
}

impl DocumentLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a document
    ///
    /// The guard can be held across `.await` points. Never acquire a second
    /// document lock while holding one.
    pub async fn acquire(&self, document_id: Uuid) -> DocumentLockGuard<'_> {
        // Clone the Arc out so the shard lock is released before awaiting
        let lock = self
            .locks
            .entry(document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        DocumentLockGuard {
            guard: Some(lock.lock_owned().await),
            registry: self,
            document_id,
        }
    }

    /// Number of documents currently locked or awaited
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn release(&self, document_id: Uuid) {
        // Waiters hold a clone, so a contended entry survives. The shard lock
        // orders this against a concurrent `entry()` in acquire.
        self.locks
            .remove_if(&document_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_document_is_serialized() {
        let registry = Arc::new(DocumentLockRegistry::new());
        let document_id = Uuid::new_v4();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire(document_id).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_different_documents_do_not_block() {
        let registry = DocumentLockRegistry::new();
        let _first = registry.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            registry.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(second.is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_outlives_holder_while_someone_waits() {
        let registry = Arc::new(DocumentLockRegistry::new());
        let document_id = Uuid::new_v4();
        let held = registry.acquire(document_id).await;

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire(document_id).await;
                registry.len()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(held);

        // The waiter took over the same entry instead of racing a fresh one
        assert_eq!(waiter.await.unwrap(), 1);
        assert!(registry.is_empty());
    }
}
