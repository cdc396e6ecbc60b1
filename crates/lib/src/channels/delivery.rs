//! Reply delivery record: last `messages.send` response code per sender.
//!
//! Process-wide and never evicted. A send whose response code equals the code already
//! recorded for the same sender is treated as a repeat and is not recorded.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory map from_id -> last response code. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct ReplyDeliveryRecord {
    inner: Arc<RwLock<HashMap<i64, i64>>>,
}

impl ReplyDeliveryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded response code for a sender.
    pub async fn get(&self, from_id: i64) -> Option<i64> {
        self.inner.read().await.get(&from_id).copied()
    }

    /// Record `code` for `from_id` unless it equals the code already recorded.
    /// Returns false (and leaves the record untouched) on a repeat. Check and insert happen under one lock.
    pub async fn record_if_new(&self, from_id: i64, code: i64) -> bool {
        let mut g = self.inner.write().await;
        if g.get(&from_id) == Some(&code) {
            return false;
        }
        g.insert(from_id, code);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_rejects_repeat_code() {
        let record = ReplyDeliveryRecord::new();
        assert_eq!(record.get(0).await, None);
        assert!(record.record_if_new(0, 100).await);
        assert_eq!(record.get(0).await, Some(100));
        assert!(!record.record_if_new(0, 100).await);
        assert!(record.record_if_new(0, 101).await);
        assert_eq!(record.get(0).await, Some(101));
    }

    #[tokio::test]
    async fn senders_are_independent() {
        let record = ReplyDeliveryRecord::new();
        assert!(record.record_if_new(1, 100).await);
        assert!(record.record_if_new(2, 100).await);
        assert_eq!(record.get(1).await, Some(100));
        assert_eq!(record.get(2).await, Some(100));
    }

    #[tokio::test]
    async fn concurrent_same_code_records_once() {
        let record = ReplyDeliveryRecord::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let r = record.clone();
            handles.push(tokio::spawn(async move { r.record_if_new(5, 42).await }));
        }
        let mut accepted = 0;
        for h in handles {
            if h.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(record.get(5).await, Some(42));
    }
}
