//! Client-side cache synchronization layer for the Forum Hub application.
//!
//! This module keeps the local view of the remote store in sync:
//! - **Store actor**: owns every cache entry and is the only place entry
//!   state can change; each entry tracks data, freshness, the pending
//!   optimistic mutation and the time of the last server-confirmed value
//! - **Poller actor**: one timer task per subscribed key, refreshing the
//!   entry in the background; a key with a pending mutation is not polled
//! - **Mutation executor**: applies user actions optimistically through the
//!   store, performs the remote write, and reconciles or rolls back once
//!   the write settles
//! - **[`CacheSync`]**: pairs store and poller so that subscribing starts
//!   polling and the last unsubscribe cancels it
//!
//! The invariants this layer guarantees:
//! - at most one mutation is pending per entry; a second attempt is
//!   rejected with [`SyncError::Busy`] without touching state
//! - a poll result observed before a pending mutation was applied never
//!   overwrites the optimistic value
//! - a rolled-back entry is bit-for-bit the snapshot taken right before
//!   the optimistic write
//! - a temporary placeholder id is never merged into server-confirmed state

use thiserror::Error;
use tokio::sync::watch;

pub mod key;
pub mod mutation;
pub mod poller;
pub mod store;

pub use key::QueryKey;
pub use mutation::MutationExecutor;
pub use poller::Poller;
pub use store::{
    EntrySnapshot, FetchGate, Freshness, MutationKind, MutationOp, OptimisticOutcome,
    PendingMutation, Resource, Store,
};

use crate::api::forum::{ApiError, ForumApi};

/// Errors surfaced by the synchronization layer.
///
/// `Busy` is reported without mutating any state; the API variants are
/// reported after the optimistic write has been rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A mutation is already pending on the target entry
    #[error("another change to {0} is still being submitted")]
    Busy(QueryKey),
    /// The remote write or read failed
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Fetches the resource a query key refers to through the Forum API.
///
/// This is the single dispatch point used by both the poller and the
/// mutation executor's forced refreshes.
pub(crate) async fn fetch_resource(api: &ForumApi, key: QueryKey) -> Result<Resource, ApiError> {
    match key {
        QueryKey::PostFeed => api.get_posts().await.map(Resource::Posts),
        QueryKey::Post(id) => api.get_post(id).await.map(Resource::Post),
        QueryKey::Comments(post_id) => api.get_comments(post_id).await.map(Resource::Comments),
    }
}

/// A live subscription to one cache entry.
///
/// Holds the snapshot taken at subscription time and a watch channel that
/// yields a new snapshot whenever the entry's data, freshness or pending
/// mutation changes. Dropping the subscription does not unsubscribe; pass it
/// back to [`CacheSync::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    /// The subscribed key
    pub key: QueryKey,
    /// Subscriber id used for unsubscription
    id: u64,
    /// Entry snapshot taken at subscription time
    pub snapshot: EntrySnapshot,
    /// Change notifications carrying the latest snapshot
    pub updates: watch::Receiver<EntrySnapshot>,
}

impl Subscription {
    /// Waits until the entry carries data and returns it.
    ///
    /// Fails early when the entry goes stale while still empty (the initial
    /// fetch failed) instead of waiting out the full timeout.
    pub async fn first_data(&mut self, timeout: std::time::Duration) -> anyhow::Result<Resource> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = self.updates.borrow().clone();
            if let Some(data) = snapshot.data {
                return Ok(data);
            }
            if snapshot.freshness == Freshness::Stale {
                anyhow::bail!("could not load {}: the fetch from the remote store failed", self.key);
            }

            tokio::time::timeout_at(deadline, self.updates.changed())
                .await
                .map_err(|_| anyhow::anyhow!("timed out loading {}", self.key))?
                .map_err(|_| anyhow::anyhow!("subscription to {} was closed", self.key))?;
        }
    }
}

/// Pairs the store with the poller so subscription lifecycles and polling
/// lifecycles cannot drift apart: subscribing starts the key's timer, and
/// the unsubscribe that drops the last subscriber cancels it.
#[derive(Debug, Clone)]
pub struct CacheSync {
    store: Store,
    poller: Poller,
}

impl CacheSync {
    /// Creates a facade over the given store and poller.
    pub fn new(store: Store, poller: Poller) -> Self {
        Self { store, poller }
    }

    /// Registers interest in a key and starts background polling for it.
    ///
    /// The poller's first tick fires immediately, so an Empty entry gets its
    /// initial fetch without waiting a full interval.
    pub async fn subscribe(&self, key: QueryKey) -> Subscription {
        let (snapshot, updates, id) = self.store.subscribe(key).await;
        self.poller.start(key).await;
        Subscription {
            key,
            id,
            snapshot,
            updates,
        }
    }

    /// Removes interest in a key. The key's poll timer is cancelled when
    /// this was the last subscriber.
    pub async fn unsubscribe(&self, subscription: Subscription) {
        let (remaining, _evicted) = self
            .store
            .unsubscribe(subscription.key, subscription.id)
            .await;
        if remaining == 0 {
            self.poller.stop(subscription.key).await;
        }
    }

    /// The underlying store, for direct snapshot reads.
    pub fn store(&self) -> &Store {
        &self.store
    }
}
