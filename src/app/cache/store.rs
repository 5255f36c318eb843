use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc::Sender, oneshot, watch};

use crate::log::Log;

mod core;
pub mod data;
pub mod message;
#[cfg(test)]
mod tests;

use message::Message;

pub use data::{
    EntrySnapshot, FetchGate, Freshness, MutationKind, MutationOp, OptimisticOutcome,
    PendingMutation, Resource, StoreData,
};

use super::{QueryKey, SyncError};

/// The Cache Store actor: the single owner of all cache entries.
///
/// Every entry transition (subscription, fetch gating, remote results,
/// optimistic writes, rollbacks) goes through this actor's operations and
/// nothing else, so the per-entry invariants (one pending mutation at a
/// time, stale poll results never clobbering optimistic writes) are checked
/// atomically with each transition.
///
/// The mock variant runs the same state machine behind a mutex instead of a
/// channel, giving tests the identical semantics without a spawned task.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum Store {
    /// A real store actor processing transitions through a message channel
    Actual(Sender<Message>),
    /// The same state machine behind a mutex, for testing
    Mock(Arc<Mutex<StoreData>>),
}

impl Store {
    /// Creates a new store and spawns its actor.
    pub fn spawn(log: Log) -> Self {
        let (store, _) = core::Core::new(log).spawn();
        store
    }

    /// Creates an empty mock store for testing.
    pub fn mock() -> Self {
        Self::Mock(Arc::new(Mutex::new(StoreData::new())))
    }

    /// Registers interest in a key, creating an Empty entry on first
    /// subscription.
    ///
    /// # Returns
    /// The current entry snapshot, a change-notification channel, and the
    /// subscriber id to pass back on unsubscription.
    pub async fn subscribe(
        &self,
        key: QueryKey,
    ) -> (EntrySnapshot, watch::Receiver<EntrySnapshot>, u64) {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::Subscribe { key, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.subscribe(key),
        }
    }

    /// Removes interest in a key.
    ///
    /// # Returns
    /// The remaining subscriber count and whether the entry was evicted.
    pub async fn unsubscribe(&self, key: QueryKey, id: u64) -> (usize, bool) {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::Unsubscribe { key, id, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.unsubscribe(key, id),
        }
    }

    /// Reads an entry snapshot without side effects.
    pub async fn get_snapshot(&self, key: QueryKey) -> Option<EntrySnapshot> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::GetSnapshot { key, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.get_snapshot(key),
        }
    }

    /// Gates a background fetch for a key. See [`FetchGate`].
    pub async fn begin_fetch(&self, key: QueryKey) -> FetchGate {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::BeginFetch { key, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.begin_fetch(key),
        }
    }

    /// Applies a server-observed value to an entry.
    ///
    /// The value is discarded when a pending mutation was applied after
    /// `observed_at`. Returns whether the value was applied.
    pub async fn apply_remote_result(
        &self,
        key: QueryKey,
        data: Resource,
        observed_at: DateTime<Utc>,
    ) -> bool {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::ApplyRemoteResult {
                        key,
                        data,
                        observed_at,
                        tx,
                    })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(state) => state.lock().await.apply_remote_result(key, data, observed_at),
        }
    }

    /// Applies an optimistic transform to an entry.
    ///
    /// Subscribers are notified before this resolves, so the caller's view
    /// already reflects the change. Fails with [`SyncError::Busy`] when a
    /// mutation is already pending on the entry.
    pub async fn apply_optimistic(
        &self,
        key: QueryKey,
        op: MutationOp,
    ) -> Result<OptimisticOutcome, SyncError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::ApplyOptimistic { key, op, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.apply_optimistic(key, &op, Utc::now()),
        }
    }

    /// Rolls an entry back to the snapshot taken before its pending
    /// mutation. Returns whether there was anything to roll back.
    pub async fn rollback(&self, key: QueryKey) -> bool {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::Rollback { key, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.rollback(key),
        }
    }

    /// Clears the pending mutation keeping the optimistic data, marking the
    /// entry Stale for the next poll.
    pub async fn settle_pending(&self, key: QueryKey) {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::SettlePending { key, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.settle_pending(key),
        }
    }

    /// Marks an entry Stale after a failed background fetch.
    pub async fn fetch_failed(&self, key: QueryKey) {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::FetchFailed { key, tx })
                    .await
                    .context("Sending message to Store actor")
                    .expect("Store actor died");
                rx.await
                    .context("Awaiting response from Store actor")
                    .expect("Store actor died")
            }
            Self::Mock(data) => data.lock().await.fetch_failed(key),
        }
    }
}
