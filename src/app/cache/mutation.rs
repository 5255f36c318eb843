use chrono::Utc;

use crate::api::forum::{Author, Comment, ForumApi, NewComment, NewPost, Post, ResourceId};
use crate::log::Log;
use crate::ArcStr;

use super::store::{MutationOp, OptimisticOutcome, Resource, Store};
use super::{QueryKey, SyncError, fetch_resource};

const SCOPE: &str = "app.cache.mutation";

/// The Mutation Executor: optimistic-then-confirm writes.
///
/// Each method follows the same shape: speculatively rewrite the target
/// entry through the store (which rejects with [`SyncError::Busy`] when a
/// mutation is already in flight there), perform the remote write, and on
/// settlement either confirm the entry with server truth or roll it back to
/// the snapshot taken before the speculation.
///
/// The acting identity is always an argument; callers take it from the
/// session. Callers also keep their own copy of any typed input (comment
/// text, post draft) so it can be restored when a write fails.
#[derive(Debug, Clone)]
pub struct MutationExecutor {
    store: Store,
    api: ForumApi,
    log: Log,
}

impl MutationExecutor {
    /// Creates an executor over the given store and API.
    pub fn new(store: Store, api: ForumApi, log: Log) -> Self {
        Self { store, api, log }
    }

    /// Likes a post as the given user.
    ///
    /// Liking a post the user already likes is a no-op returning the current
    /// state. Returns the server-confirmed post on success.
    pub async fn like(
        &self,
        post_id: i64,
        user_id: i64,
        token: Option<ArcStr>,
    ) -> Result<Post, SyncError> {
        self.set_like_state(post_id, MutationOp::Like { user_id }, token)
            .await
    }

    /// Removes the given user's like from a post.
    ///
    /// Unliking a post the user does not like is a no-op returning the
    /// current state. Like counts never go below zero.
    pub async fn unlike(
        &self,
        post_id: i64,
        user_id: i64,
        token: Option<ArcStr>,
    ) -> Result<Post, SyncError> {
        self.set_like_state(post_id, MutationOp::Unlike { user_id }, token)
            .await
    }

    /// Shared optimistic-then-confirm path for like and unlike.
    async fn set_like_state(
        &self,
        post_id: i64,
        op: MutationOp,
        token: Option<ArcStr>,
    ) -> Result<Post, SyncError> {
        let key = QueryKey::Post(post_id);

        match self.store.apply_optimistic(key, op.clone()).await? {
            OptimisticOutcome::Noop(snapshot) => {
                // Already in the requested state; nothing to write.
                let post = snapshot
                    .data
                    .as_ref()
                    .and_then(Resource::as_post)
                    .cloned()
                    .expect("a post entry holds a post");
                Ok(post)
            }
            OptimisticOutcome::NotCached => {
                // No local view to update: read-modify-write directly.
                let post = self.api.get_post(post_id).await?;
                let Some(Resource::Post(updated)) = op.apply(&Resource::Post(post.clone())) else {
                    return Ok(post);
                };
                let confirmed = self
                    .api
                    .patch_post_likes(post_id, updated.likes, updated.liked_by, token)
                    .await?;
                Ok(confirmed)
            }
            OptimisticOutcome::Applied(snapshot) => {
                let optimistic = snapshot
                    .data
                    .as_ref()
                    .and_then(Resource::as_post)
                    .cloned()
                    .expect("a post entry holds a post");

                match self
                    .api
                    .patch_post_likes(
                        post_id,
                        optimistic.likes,
                        optimistic.liked_by.clone(),
                        token,
                    )
                    .await
                {
                    Ok(confirmed) => {
                        self.store
                            .apply_remote_result(key, Resource::Post(confirmed.clone()), Utc::now())
                            .await;
                        Ok(confirmed)
                    }
                    Err(err) => {
                        self.log
                            .warn(SCOPE, format!("like write failed for {}: {}", key, err));
                        self.store.rollback(key).await;
                        Err(err.into())
                    }
                }
            }
        }
    }

    /// Posts a comment as the given author.
    ///
    /// A placeholder with a temporary id appears in the thread immediately;
    /// on success the thread is re-read so the canonical server record
    /// replaces the placeholder, so a temporary id is never merged into
    /// confirmed state. On failure the thread reverts and the caller keeps
    /// the typed text. Returns the canonical comment on success.
    pub async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
        author: Author,
        token: Option<ArcStr>,
    ) -> Result<Comment, SyncError> {
        let key = QueryKey::Comments(post_id);
        let now = Utc::now();

        let placeholder = Comment {
            id: ResourceId::temporary(now),
            post_id,
            content: content.to_string(),
            author_id: author.id,
            author: author.clone(),
            created_at: Some(now),
        };
        let outcome = self
            .store
            .apply_optimistic(
                key,
                MutationOp::AppendComment {
                    comment: placeholder,
                },
            )
            .await?;

        let new_comment = NewComment::new(post_id, content, author, now);
        match outcome {
            OptimisticOutcome::Applied(_) => match self.api.create_comment(new_comment, token).await
            {
                Ok(created) => {
                    self.confirm_collection(key).await;
                    Ok(created)
                }
                Err(err) => {
                    self.log
                        .warn(SCOPE, format!("comment write failed for {}: {}", key, err));
                    self.store.rollback(key).await;
                    Err(err.into())
                }
            },
            // No cached thread to speculate on; a plain write is all there is.
            OptimisticOutcome::Noop(_) | OptimisticOutcome::NotCached => self
                .api
                .create_comment(new_comment, token)
                .await
                .map_err(Into::into),
        }
    }

    /// Publishes a post as the given author.
    ///
    /// A placeholder prepended to the feed appears immediately; on success
    /// the feed is re-read so the canonical record replaces it. Returns the
    /// canonical post on success.
    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        author: Author,
        token: Option<ArcStr>,
    ) -> Result<Post, SyncError> {
        let key = QueryKey::PostFeed;
        let now = Utc::now();

        let placeholder = Post {
            id: ResourceId::temporary(now),
            title: title.to_string(),
            content: content.to_string(),
            author_id: author.id,
            author: author.clone(),
            created_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };
        let outcome = self
            .store
            .apply_optimistic(key, MutationOp::PrependPost { post: placeholder })
            .await?;

        let new_post = NewPost::new(title, content, author, now);
        match outcome {
            OptimisticOutcome::Applied(_) => match self.api.create_post(new_post, token).await {
                Ok(created) => {
                    self.confirm_collection(key).await;
                    Ok(created)
                }
                Err(err) => {
                    self.log
                        .warn(SCOPE, format!("post write failed for {}: {}", key, err));
                    self.store.rollback(key).await;
                    Err(err.into())
                }
            },
            OptimisticOutcome::Noop(_) | OptimisticOutcome::NotCached => self
                .api
                .create_post(new_post, token)
                .await
                .map_err(Into::into),
        }
    }

    /// Forced refresh after a successful creation: replace the optimistic
    /// collection with the canonical one. When the refresh itself fails the
    /// pending descriptor is settled in place: the write did succeed, so
    /// rolling back would drop the user's action; the entry goes Stale and
    /// the poller repairs it.
    async fn confirm_collection(&self, key: QueryKey) {
        match fetch_resource(&self.api, key).await {
            Ok(resource) => {
                self.store
                    .apply_remote_result(key, resource, Utc::now())
                    .await;
            }
            Err(err) => {
                self.log.warn(
                    SCOPE,
                    format!("confirming refresh of {} failed: {}", key, err),
                );
                self.store.settle_pending(key).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::forum::{ApiError, MockForum};
    use crate::app::cache::store::Freshness;
    use std::collections::HashMap;

    fn post(id: i64, likes: i64, liked_by: Vec<i64>) -> Post {
        Post {
            id: ResourceId::Num(id),
            title: format!("post {}", id),
            likes,
            liked_by,
            ..Default::default()
        }
    }

    fn ada() -> Author {
        Author {
            id: 1,
            username: "ada".to_string(),
            display_name: "Ada".to_string(),
            avatar: String::new(),
        }
    }

    /// Store seeded with the post entry, API seeded with the same post.
    async fn like_fixture(likes: i64, liked_by: Vec<i64>) -> (Store, ForumApi, MutationExecutor) {
        let store = Store::mock();
        let api = ForumApi::mock(MockForum::with_posts(vec![post(7, likes, liked_by.clone())]));
        let executor = MutationExecutor::new(store.clone(), api.clone(), Log::Mock);

        let key = QueryKey::Post(7);
        store.subscribe(key).await;
        store
            .apply_remote_result(key, Resource::Post(post(7, likes, liked_by)), Utc::now())
            .await;

        (store, api, executor)
    }

    #[tokio::test]
    async fn like_confirms_with_the_server_value() {
        let (store, _, executor) = like_fixture(3, vec![]).await;

        let confirmed = executor.like(7, 1, None).await.unwrap();
        assert_eq!(confirmed.likes, 4);
        assert_eq!(confirmed.liked_by, vec![1]);

        let snapshot = store.get_snapshot(QueryKey::Post(7)).await.unwrap();
        assert!(snapshot.pending.is_none());
        assert_eq!(snapshot.freshness, Freshness::Fresh);
        assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 4);
    }

    #[tokio::test]
    async fn failed_like_rolls_back_and_reports() {
        let (store, api, executor) = like_fixture(3, vec![]).await;
        if let ForumApi::Mock(mock) = &api {
            mock.lock().await.reject_writes = Some((500, "server error".into()));
        }

        let err = executor.like(7, 1, None).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Api(ApiError::RemoteRejected { status: 500, .. })
        ));

        let snapshot = store.get_snapshot(QueryKey::Post(7)).await.unwrap();
        assert!(snapshot.pending.is_none());
        let data = snapshot.data.unwrap();
        let data = data.as_post().unwrap();
        assert_eq!(data.likes, 3);
        assert!(data.liked_by.is_empty());
    }

    #[tokio::test]
    async fn like_of_already_liked_post_is_idempotent() {
        let (store, _, executor) = like_fixture(4, vec![1]).await;

        let current = executor.like(7, 1, None).await.unwrap();
        assert_eq!(current.likes, 4);
        assert_eq!(current.liked_by, vec![1]);

        // No write happened, so nothing is pending and nothing changed
        let snapshot = store.get_snapshot(QueryKey::Post(7)).await.unwrap();
        assert!(snapshot.pending.is_none());
    }

    #[tokio::test]
    async fn unlike_of_not_liked_post_is_idempotent() {
        let (store, _, executor) = like_fixture(4, vec![2]).await;

        let current = executor.unlike(7, 1, None).await.unwrap();
        assert_eq!(current.likes, 4);
        assert_eq!(current.liked_by, vec![2]);

        let snapshot = store.get_snapshot(QueryKey::Post(7)).await.unwrap();
        assert!(snapshot.pending.is_none());
    }

    #[tokio::test]
    async fn second_mutation_before_settlement_is_busy() {
        let (store, _, executor) = like_fixture(3, vec![]).await;
        let key = QueryKey::Post(7);

        // Hold a pending mutation open by applying it directly, as if the
        // first write had not settled yet.
        store
            .apply_optimistic(key, MutationOp::Like { user_id: 1 })
            .await
            .unwrap();

        let err = executor.unlike(7, 1, None).await.unwrap_err();
        assert_eq!(err, SyncError::Busy(key));

        // The optimistic state is untouched
        let snapshot = store.get_snapshot(key).await.unwrap();
        assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 4);
    }

    #[tokio::test]
    async fn uncached_like_degrades_to_a_plain_write() {
        let store = Store::mock();
        let api = ForumApi::mock(MockForum::with_posts(vec![post(7, 3, vec![])]));
        let executor = MutationExecutor::new(store.clone(), api, Log::Mock);

        // Nobody subscribed post:7, so there is no entry to speculate on
        let confirmed = executor.like(7, 1, None).await.unwrap();
        assert_eq!(confirmed.likes, 4);
        assert_eq!(confirmed.liked_by, vec![1]);
        assert!(store.get_snapshot(QueryKey::Post(7)).await.is_none());
    }

    #[tokio::test]
    async fn comment_placeholder_is_replaced_by_the_canonical_record() {
        let store = Store::mock();
        let api = ForumApi::mock(MockForum::with_posts(vec![post(7, 0, vec![])]));
        let executor = MutationExecutor::new(store.clone(), api, Log::Mock);

        let key = QueryKey::Comments(7);
        store.subscribe(key).await;
        store
            .apply_remote_result(key, Resource::Comments(vec![]), Utc::now())
            .await;

        let created = executor
            .create_comment(7, "hello", ada(), None)
            .await
            .unwrap();
        assert_eq!(created.content, "hello");
        assert!(!created.id.is_temporary());

        // After the confirming refresh the thread holds exactly the
        // canonical record: same content and author, server-issued id.
        let snapshot = store.get_snapshot(key).await.unwrap();
        let data = snapshot.data.unwrap();
        let comments = data.as_comments().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "hello");
        assert_eq!(comments[0].author_id, 1);
        assert!(!comments[0].id.is_temporary());
        assert!(snapshot.pending.is_none());
        assert_eq!(snapshot.freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn failed_comment_rolls_back_the_thread() {
        let store = Store::mock();
        let existing = Comment {
            id: ResourceId::Num(11),
            post_id: 7,
            content: "first".to_string(),
            ..Default::default()
        };
        let api = ForumApi::mock(MockForum {
            comments: HashMap::from([(7, vec![existing.clone()])]),
            reject_writes: Some((500, "server error".into())),
            ..Default::default()
        });
        let executor = MutationExecutor::new(store.clone(), api, Log::Mock);

        let key = QueryKey::Comments(7);
        store.subscribe(key).await;
        store
            .apply_remote_result(key, Resource::Comments(vec![existing.clone()]), Utc::now())
            .await;

        let err = executor
            .create_comment(7, "hello", ada(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Api(_)));

        // The thread is exactly what it was before the attempt
        let snapshot = store.get_snapshot(key).await.unwrap();
        assert_eq!(snapshot.data, Some(Resource::Comments(vec![existing])));
        assert!(snapshot.pending.is_none());
    }

    #[tokio::test]
    async fn created_post_lands_in_the_feed_without_a_temporary_id() {
        let store = Store::mock();
        let api = ForumApi::mock(MockForum::with_posts(vec![post(7, 0, vec![])]));
        let executor = MutationExecutor::new(store.clone(), api.clone(), Log::Mock);

        let key = QueryKey::PostFeed;
        store.subscribe(key).await;
        let feed = api.get_posts().await.unwrap();
        store
            .apply_remote_result(key, Resource::Posts(feed), Utc::now())
            .await;

        let created = executor
            .create_post("fresh", "body", ada(), None)
            .await
            .unwrap();
        assert_eq!(created.title, "fresh");
        assert!(!created.id.is_temporary());

        let snapshot = store.get_snapshot(key).await.unwrap();
        let data = snapshot.data.unwrap();
        let posts = data.as_posts().unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| !p.id.is_temporary()));
        assert!(posts.iter().any(|p| p.title == "fresh"));
    }
}
