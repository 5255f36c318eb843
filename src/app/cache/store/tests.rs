use chrono::{Duration, Utc};

use crate::api::forum::{Comment, Post, ResourceId};
use crate::app::cache::{QueryKey, SyncError};
use crate::log::Log;

use super::data::{FetchGate, Freshness, MutationKind, MutationOp, OptimisticOutcome, Resource};
use super::Store;

fn post(id: i64, likes: i64, liked_by: Vec<i64>) -> Post {
    Post {
        id: ResourceId::Num(id),
        title: format!("post {}", id),
        content: "content".to_string(),
        likes,
        liked_by,
        ..Default::default()
    }
}

/// Subscribes and seeds an entry with a server-confirmed value.
async fn seed(store: &Store, key: QueryKey, data: Resource) -> u64 {
    let (_, _, id) = store.subscribe(key).await;
    assert!(store.apply_remote_result(key, data, Utc::now()).await);
    id
}

#[tokio::test]
async fn subscribe_creates_empty_entry() {
    let store = Store::mock();
    let key = QueryKey::Post(7);

    let (snapshot, _rx, _id) = store.subscribe(key).await;
    assert_eq!(snapshot.key, key);
    assert_eq!(snapshot.freshness, Freshness::Empty);
    assert!(snapshot.data.is_none());
    assert!(snapshot.pending.is_none());
    assert!(snapshot.last_confirmed_at.is_none());
}

#[tokio::test]
async fn fetch_cycle_moves_empty_to_fresh() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    store.subscribe(key).await;

    assert_eq!(store.begin_fetch(key).await, FetchGate::Allow);
    let snapshot = store.get_snapshot(key).await.unwrap();
    assert_eq!(snapshot.freshness, Freshness::Fetching);

    let observed = Utc::now();
    assert!(
        store
            .apply_remote_result(key, Resource::Post(post(7, 3, vec![])), observed)
            .await
    );

    let snapshot = store.get_snapshot(key).await.unwrap();
    assert_eq!(snapshot.freshness, Freshness::Fresh);
    assert_eq!(snapshot.last_confirmed_at, Some(observed));
    assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 3);
}

#[tokio::test]
async fn failed_fetch_marks_entry_stale() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    store.subscribe(key).await;

    assert_eq!(store.begin_fetch(key).await, FetchGate::Allow);
    store.fetch_failed(key).await;

    let snapshot = store.get_snapshot(key).await.unwrap();
    assert_eq!(snapshot.freshness, Freshness::Stale);
}

#[tokio::test]
async fn optimistic_like_is_visible_synchronously() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    let (_, rx, _) = store.subscribe(key).await;
    store
        .apply_remote_result(key, Resource::Post(post(7, 3, vec![])), Utc::now())
        .await;

    let outcome = store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();

    // The subscriber's channel already carries the optimistic value
    let seen = rx.borrow().clone();
    let seen_post = seen.data.unwrap();
    let seen_post = seen_post.as_post().unwrap();
    assert_eq!(seen_post.likes, 4);
    assert_eq!(seen_post.liked_by, vec![1]);

    let OptimisticOutcome::Applied(snapshot) = outcome else {
        panic!("like should apply");
    };
    let pending = snapshot.pending.unwrap();
    assert_eq!(pending.kind, MutationKind::Like);
}

#[tokio::test]
async fn second_mutation_is_busy_and_leaves_data_unchanged() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();
    let before = store.get_snapshot(key).await.unwrap();

    let err = store
        .apply_optimistic(key, MutationOp::Unlike { user_id: 1 })
        .await
        .unwrap_err();
    assert_eq!(err, SyncError::Busy(key));

    let after = store.get_snapshot(key).await.unwrap();
    assert_eq!(after.data, before.data);
    assert_eq!(after.pending, before.pending);
}

#[tokio::test]
async fn stale_poll_result_never_overwrites_optimistic_data() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    // A poll captured its observation time, then the user acted before the
    // response landed.
    let observed_before_action = Utc::now() - Duration::seconds(1);
    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();

    let applied = store
        .apply_remote_result(key, Resource::Post(post(7, 3, vec![])), observed_before_action)
        .await;
    assert!(!applied);

    let snapshot = store.get_snapshot(key).await.unwrap();
    let data = snapshot.data.unwrap();
    assert_eq!(data.as_post().unwrap().likes, 4);
    assert!(snapshot.pending.is_some());
}

#[tokio::test]
async fn settlement_result_clears_pending_and_confirms() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();

    let observed = Utc::now() + Duration::seconds(1);
    let applied = store
        .apply_remote_result(key, Resource::Post(post(7, 4, vec![1])), observed)
        .await;
    assert!(applied);

    let snapshot = store.get_snapshot(key).await.unwrap();
    assert!(snapshot.pending.is_none());
    assert_eq!(snapshot.freshness, Freshness::Fresh);
    assert_eq!(snapshot.last_confirmed_at, Some(observed));
    assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 4);
}

#[tokio::test]
async fn rollback_restores_exact_pre_mutation_snapshot() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    let original = Resource::Post(post(7, 3, vec![2, 5]));
    seed(&store, key, original.clone()).await;

    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();
    assert!(store.rollback(key).await);

    let snapshot = store.get_snapshot(key).await.unwrap();
    assert_eq!(snapshot.data, Some(original));
    assert!(snapshot.pending.is_none());
    assert_eq!(snapshot.freshness, Freshness::Stale);
}

#[tokio::test]
async fn rollback_without_pending_is_a_no_op() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    assert!(!store.rollback(key).await);
}

#[tokio::test]
async fn idempotent_unlike_records_no_pending() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![2]))).await;

    let outcome = store
        .apply_optimistic(key, MutationOp::Unlike { user_id: 1 })
        .await
        .unwrap();
    let OptimisticOutcome::Noop(snapshot) = outcome else {
        panic!("unlike of a not-liked post should be a no-op");
    };
    assert!(snapshot.pending.is_none());

    let data = snapshot.data.unwrap();
    let data = data.as_post().unwrap();
    assert_eq!(data.likes, 3);
    assert_eq!(data.liked_by, vec![2]);
}

#[tokio::test]
async fn begin_fetch_is_suspended_while_mutation_pending() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();
    assert_eq!(store.begin_fetch(key).await, FetchGate::Suspended);

    // Settling the mutation resumes polling
    let observed = Utc::now() + Duration::seconds(1);
    store
        .apply_remote_result(key, Resource::Post(post(7, 4, vec![1])), observed)
        .await;
    assert_eq!(store.begin_fetch(key).await, FetchGate::Allow);
}

#[tokio::test]
async fn last_unsubscribe_evicts_the_entry() {
    let store = Store::mock();
    let key = QueryKey::Post(7);

    let (_, _, first) = store.subscribe(key).await;
    let (_, _, second) = store.subscribe(key).await;

    let (remaining, evicted) = store.unsubscribe(key, first).await;
    assert_eq!(remaining, 1);
    assert!(!evicted);

    let (remaining, evicted) = store.unsubscribe(key, second).await;
    assert_eq!(remaining, 0);
    assert!(evicted);

    assert!(store.get_snapshot(key).await.is_none());
    assert_eq!(store.begin_fetch(key).await, FetchGate::Evicted);
}

#[tokio::test]
async fn eviction_is_deferred_while_a_mutation_is_pending() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    let id = seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();

    let (remaining, evicted) = store.unsubscribe(key, id).await;
    assert_eq!(remaining, 0);
    assert!(!evicted);
    assert!(store.get_snapshot(key).await.is_some());

    // Settlement of the orphaned entry evicts it
    let observed = Utc::now() + Duration::seconds(1);
    store
        .apply_remote_result(key, Resource::Post(post(7, 4, vec![1])), observed)
        .await;
    assert!(store.get_snapshot(key).await.is_none());
}

#[tokio::test]
async fn remote_result_after_eviction_is_discarded() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    let (_, _, id) = store.subscribe(key).await;
    store.unsubscribe(key, id).await;

    let applied = store
        .apply_remote_result(key, Resource::Post(post(7, 3, vec![])), Utc::now())
        .await;
    assert!(!applied);
}

#[tokio::test]
async fn like_then_unlike_sequenced_returns_to_original_count() {
    let store = Store::mock();
    let key = QueryKey::Post(7);
    seed(&store, key, Resource::Post(post(7, 3, vec![]))).await;

    // Like settles first
    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();
    store
        .apply_remote_result(
            key,
            Resource::Post(post(7, 4, vec![1])),
            Utc::now() + Duration::seconds(1),
        )
        .await;

    // Then the unlike runs and settles
    let outcome = store
        .apply_optimistic(key, MutationOp::Unlike { user_id: 1 })
        .await
        .unwrap();
    assert!(matches!(outcome, OptimisticOutcome::Applied(_)));
    store
        .apply_remote_result(
            key,
            Resource::Post(post(7, 3, vec![])),
            Utc::now() + Duration::seconds(2),
        )
        .await;

    let snapshot = store.get_snapshot(key).await.unwrap();
    let data = snapshot.data.unwrap();
    let data = data.as_post().unwrap();
    assert_eq!(data.likes, 3);
    assert!(data.liked_by.is_empty());
}

#[tokio::test]
async fn comment_thread_appends_placeholder_in_order() {
    let store = Store::mock();
    let key = QueryKey::Comments(7);
    let existing = Comment {
        id: ResourceId::Num(11),
        post_id: 7,
        content: "first".to_string(),
        ..Default::default()
    };
    seed(&store, key, Resource::Comments(vec![existing])).await;

    let placeholder = Comment {
        id: ResourceId::temporary(Utc::now()),
        post_id: 7,
        content: "hello".to_string(),
        ..Default::default()
    };
    let outcome = store
        .apply_optimistic(
            key,
            MutationOp::AppendComment {
                comment: placeholder,
            },
        )
        .await
        .unwrap();

    let OptimisticOutcome::Applied(snapshot) = outcome else {
        panic!("comment should apply");
    };
    let data = snapshot.data.unwrap();
    let comments = data.as_comments().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[1].content, "hello");
    assert!(comments[1].id.is_temporary());
}

#[tokio::test]
async fn mutation_on_an_uncached_key_reports_not_cached() {
    let store = Store::mock();

    let outcome = store
        .apply_optimistic(QueryKey::Post(9), MutationOp::Like { user_id: 1 })
        .await
        .unwrap();
    assert!(matches!(outcome, OptimisticOutcome::NotCached));
}

#[tokio::test]
async fn spawned_store_actor_runs_the_same_transitions() {
    let store = Store::spawn(Log::Mock);
    let key = QueryKey::Post(7);

    let (snapshot, mut rx, id) = store.subscribe(key).await;
    assert_eq!(snapshot.freshness, Freshness::Empty);

    store
        .apply_remote_result(key, Resource::Post(post(7, 3, vec![])), Utc::now())
        .await;
    rx.changed().await.unwrap();
    assert_eq!(
        rx.borrow().data.as_ref().unwrap().as_post().unwrap().likes,
        3
    );

    store
        .apply_optimistic(key, MutationOp::Like { user_id: 1 })
        .await
        .unwrap();
    rx.changed().await.unwrap();
    assert_eq!(
        rx.borrow().data.as_ref().unwrap().as_post().unwrap().likes,
        4
    );

    let (remaining, evicted) = store.unsubscribe(key, id).await;
    assert_eq!(remaining, 0);
    assert!(!evicted); // the like is still pending
}
