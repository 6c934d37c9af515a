//! Shared work queue

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// FIFO of pending task configs, shared between the demand source and the
/// scheduler's requeue path. Clones share the same underlying queue.
#[derive(Debug)]
pub struct WorkQueue<C> {
    items: Arc<Mutex<VecDeque<C>>>,
}

impl<C> Clone for WorkQueue<C> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<C> Default for WorkQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> WorkQueue<C> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = C>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.into_iter().collect())),
        }
    }

    /// Append an item, making it visible to the next pull
    pub async fn push(&self, item: C) {
        self.items.lock().await.push_back(item);
    }

    /// Remove up to `n` items from the front, or `None` if the queue is empty.
    /// The emptiness check and the removal happen under one lock.
    pub async fn take(&self, n: usize) -> Option<Vec<C>> {
        let mut items = self.items.lock().await;
        if items.is_empty() {
            return None;
        }
        let count = n.min(items.len());
        Some(items.drain(..count).collect())
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_drains_in_order() {
        let queue = WorkQueue::from_items(vec![1, 2, 3]);

        assert_eq!(queue.take(2).await, Some(vec![1, 2]));
        assert_eq!(queue.take(2).await, Some(vec![3]));
        assert_eq!(queue.take(2).await, None);
    }

    #[tokio::test]
    async fn test_clones_share_items() {
        let queue = WorkQueue::new();
        let requeue = queue.clone();

        requeue.push("b").await;
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.take(5).await, Some(vec!["b"]));
        assert!(requeue.is_empty().await);
    }
}
