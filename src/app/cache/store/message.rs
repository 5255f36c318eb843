use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};

use crate::app::cache::{QueryKey, SyncError};

use super::data::{EntrySnapshot, FetchGate, MutationOp, OptimisticOutcome, Resource};

/// Messages for the Store actor.
///
/// These are the only legal transitions of a cache entry; each one is
/// processed atomically by the actor loop.
#[derive(Debug)]
pub enum Message {
    /// Register a subscriber, creating an Empty entry on first subscription
    Subscribe {
        key: QueryKey,
        tx: oneshot::Sender<(EntrySnapshot, watch::Receiver<EntrySnapshot>, u64)>,
    },
    /// Remove a subscriber; returns the remaining count and whether the
    /// entry was evicted
    Unsubscribe {
        key: QueryKey,
        id: u64,
        tx: oneshot::Sender<(usize, bool)>,
    },
    /// Read an entry snapshot without side effects
    GetSnapshot {
        key: QueryKey,
        tx: oneshot::Sender<Option<EntrySnapshot>>,
    },
    /// Gate a background fetch for a key
    BeginFetch {
        key: QueryKey,
        tx: oneshot::Sender<FetchGate>,
    },
    /// Apply a server-observed value; returns whether it was applied
    ApplyRemoteResult {
        key: QueryKey,
        data: Resource,
        observed_at: DateTime<Utc>,
        tx: oneshot::Sender<bool>,
    },
    /// Apply an optimistic transform
    ApplyOptimistic {
        key: QueryKey,
        op: MutationOp,
        tx: oneshot::Sender<Result<OptimisticOutcome, SyncError>>,
    },
    /// Roll an entry back to its pre-mutation snapshot
    Rollback {
        key: QueryKey,
        tx: oneshot::Sender<bool>,
    },
    /// Clear the pending mutation keeping the optimistic data
    SettlePending {
        key: QueryKey,
        tx: oneshot::Sender<()>,
    },
    /// Mark an entry Stale after a failed background fetch
    FetchFailed {
        key: QueryKey,
        tx: oneshot::Sender<()>,
    },
}
