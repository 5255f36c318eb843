use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::api::forum::{Comment, Post};
use crate::app::cache::{QueryKey, SyncError};

/// Last known value of a cache entry: a single record or an ordered
/// collection.
///
/// Collections preserve their defined ordering: the posts feed is newest
/// first, comment threads are oldest first.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// A single post record
    Post(Post),
    /// The posts feed, newest first
    Posts(Vec<Post>),
    /// A comment thread, oldest first
    Comments(Vec<Comment>),
}

impl Resource {
    /// The contained post, when this is a single-post resource.
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(post) => Some(post),
            _ => None,
        }
    }

    /// The contained feed, when this is a posts-feed resource.
    pub fn as_posts(&self) -> Option<&[Post]> {
        match self {
            Self::Posts(posts) => Some(posts),
            _ => None,
        }
    }

    /// The contained thread, when this is a comments resource.
    pub fn as_comments(&self) -> Option<&[Comment]> {
        match self {
            Self::Comments(comments) => Some(comments),
            _ => None,
        }
    }
}

/// Freshness state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Freshness {
    /// Created but never fetched
    #[default]
    Empty,
    /// A fetch is in flight
    Fetching,
    /// Data matches the last known server state
    Fresh,
    /// Data is present but suspect: a fetch failed or a rollback happened
    Stale,
}

/// Kind of user mutation, recorded in the pending descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Like,
    Unlike,
    CreateComment,
    CreatePost,
}

/// Declarative optimistic transform, applied by the store itself.
///
/// Expressing the transform as data keeps the full state transition inside
/// one actor message, so the busy-check, the snapshot and the rewrite are
/// atomic with respect to every other store operation.
#[derive(Debug, Clone)]
pub enum MutationOp {
    /// Increment the like counter and add the acting user to liked-by
    Like { user_id: i64 },
    /// Decrement the like counter (clamped at zero) and remove the acting
    /// user from liked-by
    Unlike { user_id: i64 },
    /// Append a placeholder comment to the thread
    AppendComment { comment: Comment },
    /// Prepend a placeholder post to the feed
    PrependPost { post: Post },
}

impl MutationOp {
    /// The descriptor kind this transform records.
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Like { .. } => MutationKind::Like,
            Self::Unlike { .. } => MutationKind::Unlike,
            Self::AppendComment { .. } => MutationKind::CreateComment,
            Self::PrependPost { .. } => MutationKind::CreatePost,
        }
    }

    /// Applies the transform to the current data.
    ///
    /// Returns `None` when the transform would not change anything: liking
    /// an already-liked post, unliking a not-liked post, or a transform that
    /// does not match the resource shape.
    pub fn apply(&self, data: &Resource) -> Option<Resource> {
        match (self, data) {
            (Self::Like { user_id }, Resource::Post(post)) => {
                if post.liked_by.contains(user_id) {
                    return None;
                }
                let mut post = post.clone();
                post.likes += 1;
                post.liked_by.push(*user_id);
                Some(Resource::Post(post))
            }
            (Self::Unlike { user_id }, Resource::Post(post)) => {
                if !post.liked_by.contains(user_id) {
                    return None;
                }
                let mut post = post.clone();
                post.likes = (post.likes - 1).max(0);
                post.liked_by.retain(|id| id != user_id);
                Some(Resource::Post(post))
            }
            (Self::AppendComment { comment }, Resource::Comments(comments)) => {
                let mut comments = comments.clone();
                comments.push(comment.clone());
                Some(Resource::Comments(comments))
            }
            (Self::PrependPost { post }, Resource::Posts(posts)) => {
                let mut posts = posts.clone();
                posts.insert(0, post.clone());
                Some(Resource::Posts(posts))
            }
            _ => None,
        }
    }
}

/// Summary of the in-flight mutation, exposed in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMutation {
    /// What kind of change is in flight
    pub kind: MutationKind,
    /// When the optimistic value was written
    pub applied_at: DateTime<Utc>,
}

/// Full descriptor of the in-flight mutation held by an entry.
#[derive(Debug, Clone)]
struct MutationDescriptor {
    /// What kind of change is in flight
    kind: MutationKind,
    /// The entry data right before the optimistic write, for rollback
    snapshot_before: Resource,
    /// When the optimistic value was written
    applied_at: DateTime<Utc>,
}

/// Read-only view of a cache entry handed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    /// The entry's key
    pub key: QueryKey,
    /// Last known value, if any
    pub data: Option<Resource>,
    /// Freshness state
    pub freshness: Freshness,
    /// The in-flight mutation, if any
    pub pending: Option<PendingMutation>,
    /// When the last server-confirmed value was observed
    pub last_confirmed_at: Option<DateTime<Utc>>,
}

/// Gate result for a background fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchGate {
    /// Go ahead; the entry is now marked Fetching
    Allow,
    /// A mutation is pending; skip this tick
    Suspended,
    /// The entry no longer exists; the poll task must exit
    Evicted,
}

/// Outcome of an optimistic application.
#[derive(Debug, Clone)]
pub enum OptimisticOutcome {
    /// The transform was applied and a mutation is now pending
    Applied(EntrySnapshot),
    /// The transform changes nothing; no mutation was recorded
    Noop(EntrySnapshot),
    /// The entry does not exist or holds no data yet
    NotCached,
}

/// One cache entry, owned exclusively by the store.
#[derive(Debug)]
struct CacheEntry {
    key: QueryKey,
    data: Option<Resource>,
    freshness: Freshness,
    pending: Option<MutationDescriptor>,
    last_confirmed_at: Option<DateTime<Utc>>,
    subscribers: HashSet<u64>,
    watch_tx: watch::Sender<EntrySnapshot>,
}

impl CacheEntry {
    fn new(key: QueryKey) -> Self {
        let initial = EntrySnapshot {
            key,
            data: None,
            freshness: Freshness::Empty,
            pending: None,
            last_confirmed_at: None,
        };
        let (watch_tx, _) = watch::channel(initial);
        Self {
            key,
            data: None,
            freshness: Freshness::Empty,
            pending: None,
            last_confirmed_at: None,
            subscribers: HashSet::new(),
            watch_tx,
        }
    }

    fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            key: self.key,
            data: self.data.clone(),
            freshness: self.freshness,
            pending: self.pending.as_ref().map(|p| PendingMutation {
                kind: p.kind,
                applied_at: p.applied_at,
            }),
            last_confirmed_at: self.last_confirmed_at,
        }
    }

    /// Refreshes the stored snapshot, waking subscribers only when data,
    /// freshness or the pending mutation actually changed.
    fn notify(&self) {
        let next = self.snapshot();
        self.watch_tx.send_if_modified(|current| {
            let changed = current.data != next.data
                || current.freshness != next.freshness
                || current.pending != next.pending;
            *current = next;
            changed
        });
    }
}

/// Internal state of the Store actor: the entry map and the subscriber id
/// counter.
///
/// Every method is a complete state transition; the actor loop (and the mock
/// under its lock) performs exactly one per message, which is what makes the
/// at-most-one-pending-mutation invariant enforceable.
#[derive(Debug, Default)]
pub struct StoreData {
    entries: HashMap<QueryKey, CacheEntry>,
    next_subscriber_id: u64,
}

impl StoreData {
    /// Creates an empty store state.
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a subscriber, creating an Empty entry on first
    /// subscription.
    ///
    /// Returns the current snapshot, a change-notification channel, and the
    /// subscriber id to pass back on unsubscription.
    pub fn subscribe(
        &mut self,
        key: QueryKey,
    ) -> (EntrySnapshot, watch::Receiver<EntrySnapshot>, u64) {
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| CacheEntry::new(key));

        self.next_subscriber_id += 1;
        let id = self.next_subscriber_id;
        entry.subscribers.insert(id);

        (entry.snapshot(), entry.watch_tx.subscribe(), id)
    }

    /// Removes a subscriber.
    ///
    /// The entry is evicted once its subscriber count reaches zero and no
    /// mutation is pending; an entry with an in-flight mutation lingers
    /// until the mutation settles. Returns the remaining subscriber count
    /// and whether the entry was evicted.
    pub fn unsubscribe(&mut self, key: QueryKey, id: u64) -> (usize, bool) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return (0, false);
        };

        entry.subscribers.remove(&id);
        let remaining = entry.subscribers.len();
        let evicted = remaining == 0 && entry.pending.is_none();
        if evicted {
            self.entries.remove(&key);
        }

        (remaining, evicted)
    }

    /// Reads an entry snapshot without side effects.
    pub fn get_snapshot(&self, key: QueryKey) -> Option<EntrySnapshot> {
        self.entries.get(&key).map(CacheEntry::snapshot)
    }

    /// Gates a background fetch.
    ///
    /// A key with a pending mutation is suspended so a refresh can never
    /// overwrite an optimistic value mid-flight; a missing entry tells the
    /// poll task to exit.
    ///
    /// Subscribers are not woken for the Fetching transition: it flaps on
    /// every poll tick and carries no information a view would render.
    pub fn begin_fetch(&mut self, key: QueryKey) -> FetchGate {
        let Some(entry) = self.entries.get_mut(&key) else {
            return FetchGate::Evicted;
        };
        if entry.pending.is_some() {
            return FetchGate::Suspended;
        }

        entry.freshness = Freshness::Fetching;
        FetchGate::Allow
    }

    /// Applies a server-observed value to an entry.
    ///
    /// The result is discarded when the entry has a pending mutation whose
    /// `applied_at` is newer than `observed_at`: a poll issued before the
    /// user's action must not clobber the optimistic write that raced ahead
    /// of it. A result observed at or after the mutation was applied is the
    /// settlement (or a refresh that supersedes it) and clears the pending
    /// descriptor. Returns whether the value was applied.
    pub fn apply_remote_result(
        &mut self,
        key: QueryKey,
        data: Resource,
        observed_at: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            // Evicted while the fetch or write was in flight: discard.
            return false;
        };

        if let Some(pending) = &entry.pending {
            if observed_at < pending.applied_at {
                return false;
            }
        }

        entry.data = Some(data);
        entry.pending = None;
        entry.freshness = Freshness::Fresh;
        entry.last_confirmed_at = Some(observed_at);
        entry.notify();
        self.evict_if_orphaned(key);
        true
    }

    /// Applies an optimistic transform to an entry.
    ///
    /// Rejects with [`SyncError::Busy`] when a mutation is already pending.
    /// Records a descriptor holding a snapshot of the prior data and
    /// notifies subscribers before returning, so the caller's UI reflects
    /// the change the moment this resolves.
    pub fn apply_optimistic(
        &mut self,
        key: QueryKey,
        op: &MutationOp,
        now: DateTime<Utc>,
    ) -> Result<OptimisticOutcome, SyncError> {
        let Some(entry) = self.entries.get_mut(&key) else {
            return Ok(OptimisticOutcome::NotCached);
        };
        if entry.pending.is_some() {
            return Err(SyncError::Busy(key));
        }
        let Some(data) = entry.data.clone() else {
            return Ok(OptimisticOutcome::NotCached);
        };

        match op.apply(&data) {
            None => Ok(OptimisticOutcome::Noop(entry.snapshot())),
            Some(next) => {
                entry.pending = Some(MutationDescriptor {
                    kind: op.kind(),
                    snapshot_before: data,
                    applied_at: now,
                });
                entry.data = Some(next);
                entry.notify();
                Ok(OptimisticOutcome::Applied(entry.snapshot()))
            }
        }
    }

    /// Rolls an entry back to the snapshot taken before its pending
    /// mutation.
    ///
    /// The restored data is marked Stale: the write failed, so the next
    /// poll re-confirms it. Returns whether there was anything to roll
    /// back.
    pub fn rollback(&mut self, key: QueryKey) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        let Some(pending) = entry.pending.take() else {
            return false;
        };

        entry.data = Some(pending.snapshot_before);
        entry.freshness = Freshness::Stale;
        entry.notify();
        self.evict_if_orphaned(key);
        true
    }

    /// Clears the pending mutation keeping the optimistic data.
    ///
    /// Used when the remote write succeeded but the confirming refresh
    /// failed: the user's action must not be rolled back, and the entry is
    /// marked Stale so the poller repairs it. `last_confirmed_at` is left
    /// untouched because the optimistic value never came from the server.
    pub fn settle_pending(&mut self, key: QueryKey) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        if entry.pending.take().is_none() {
            return;
        }

        entry.freshness = Freshness::Stale;
        entry.notify();
        self.evict_if_orphaned(key);
    }

    /// Marks an entry Stale after a failed background fetch.
    pub fn fetch_failed(&mut self, key: QueryKey) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        if entry.freshness == Freshness::Fetching {
            entry.freshness = Freshness::Stale;
            entry.notify();
        }
    }

    /// Number of live entries, for logging and tests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops an entry whose last subscriber left while a mutation was still
    /// pending, once that mutation has settled.
    fn evict_if_orphaned(&mut self, key: QueryKey) {
        if let Some(entry) = self.entries.get(&key) {
            if entry.subscribers.is_empty() && entry.pending.is_none() {
                self.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::forum::ResourceId;

    fn post(id: i64, likes: i64, liked_by: Vec<i64>) -> Post {
        Post {
            id: ResourceId::Num(id),
            title: format!("post {}", id),
            likes,
            liked_by,
            ..Default::default()
        }
    }

    #[test]
    fn like_appends_user_and_increments() {
        let op = MutationOp::Like { user_id: 1 };
        let data = Resource::Post(post(7, 3, vec![]));
        let Some(Resource::Post(updated)) = op.apply(&data) else {
            panic!("like should apply");
        };
        assert_eq!(updated.likes, 4);
        assert_eq!(updated.liked_by, vec![1]);
    }

    #[test]
    fn like_on_already_liked_post_is_noop() {
        let op = MutationOp::Like { user_id: 1 };
        let data = Resource::Post(post(7, 4, vec![1]));
        assert!(op.apply(&data).is_none());
    }

    #[test]
    fn unlike_on_not_liked_post_is_noop() {
        let op = MutationOp::Unlike { user_id: 1 };
        let data = Resource::Post(post(7, 4, vec![2]));
        assert!(op.apply(&data).is_none());
    }

    #[test]
    fn unlike_clamps_likes_at_zero() {
        let op = MutationOp::Unlike { user_id: 1 };
        let data = Resource::Post(post(7, 0, vec![1]));
        let Some(Resource::Post(updated)) = op.apply(&data) else {
            panic!("unlike should apply");
        };
        assert_eq!(updated.likes, 0);
        assert!(updated.liked_by.is_empty());
    }

    #[test]
    fn mismatched_resource_shape_is_noop() {
        let op = MutationOp::Like { user_id: 1 };
        let data = Resource::Comments(vec![]);
        assert!(op.apply(&data).is_none());
    }
}
