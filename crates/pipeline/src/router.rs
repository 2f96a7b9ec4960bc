//! Hash partitioning of keyed events across worker channels.
//!
//! Events with the same key always land on the same partition, and one
//! bounded channel per partition keeps them in arrival order. That gives
//! per-key ordering and single-writer state without locks.

use anyhow::{anyhow, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::mpsc;

/// Partition index for `key` among `partitions` workers.
#[must_use]
pub fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Sends keyed events to a fixed set of partition channels.
pub struct Router<T> {
    senders: Vec<mpsc::Sender<T>>,
}

impl<T> Router<T> {
    /// Builds a router over one sender per partition.
    ///
    /// # Panics
    ///
    /// Panics if `senders` is empty.
    #[must_use]
    pub fn new(senders: Vec<mpsc::Sender<T>>) -> Self {
        assert!(!senders.is_empty(), "router needs at least one partition");
        Self { senders }
    }

    #[must_use]
    pub fn partitions(&self) -> usize {
        self.senders.len()
    }

    #[must_use]
    pub fn partition_of(&self, key: &str) -> usize {
        partition_for(key, self.senders.len())
    }

    /// Sends to one partition, waiting when its channel is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition's worker has hung up.
    pub async fn send_to(&self, partition: usize, message: T) -> Result<()> {
        self.senders[partition]
            .send(message)
            .await
            .map_err(|_| anyhow!("partition {partition} closed"))
    }

    /// Sends `message` to the partition that owns `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition's worker has hung up.
    pub async fn route(&self, key: &str, message: T) -> Result<()> {
        self.send_to(self.partition_of(key), message).await
    }
}

impl<T> Clone for Router<T> {
    fn clone(&self) -> Self {
        Self {
            senders: self.senders.clone(),
        }
    }
}
