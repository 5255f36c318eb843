use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{Mutex, mpsc::Sender, oneshot};

use crate::{ArcStr, log::Log, net::Net};

mod core;
pub mod data;
pub mod message;
pub mod mock;

// Re-export public types for external use
pub use data::{
    ApiError, AuthResponse, AuthUser, Author, Comment, Credentials, LikeRecord, NewComment,
    NewPost, NewUser, Post, ResourceId,
};
pub use message::ForumApiMessage;
pub use mock::MockForum;

/// The Forum API actor: the client of the remote resource store.
///
/// This actor intermediates calls to the networking actor, providing
/// domain-specific methods for reading and writing posts, comments and
/// likes, and for authenticating. It is a thin adapter: one logical
/// operation maps to one HTTP call, there are no retries, and every failure
/// is reported to the caller as a typed [`ApiError`].
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum ForumApi {
    /// A real Forum API actor that performs HTTP requests through the
    /// networking actor
    Actual(Sender<ForumApiMessage>),
    /// A mock implementation for testing backed by an in-memory store
    Mock(Arc<Mutex<MockForum>>),
}

impl ForumApi {
    /// Creates a new Forum API actor and spawns its core.
    ///
    /// # Arguments
    /// * `net` - The networking actor for making HTTP requests
    /// * `base_url` - The base URL of the remote resource store
    /// * `log` - The logging actor
    pub fn spawn(net: Net, base_url: ArcStr, log: Log) -> Self {
        let (api, _) = core::Core::new(net, base_url, log).spawn();
        api
    }

    /// Creates a new mock Forum API instance for testing.
    pub fn mock(data: MockForum) -> Self {
        Self::Mock(Arc::new(Mutex::new(data)))
    }

    /// Creates a new empty mock Forum API instance for testing.
    pub fn mock_empty() -> Self {
        Self::mock(MockForum::default())
    }

    /// Fetches the posts feed, newest first.
    pub async fn get_posts(&self) -> Result<Vec<Post>, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::GetPosts { tx })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.get_posts(),
        }
    }

    /// Fetches a single post by id.
    pub async fn get_post(&self, id: i64) -> Result<Post, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::GetPost { id, tx })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.get_post(id),
        }
    }

    /// Creates a post.
    ///
    /// # Arguments
    /// * `new_post` - The post body, including client-filled timestamps
    /// * `token` - Bearer token attached when present
    pub async fn create_post(
        &self,
        new_post: NewPost,
        token: Option<ArcStr>,
    ) -> Result<Post, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::CreatePost {
                        new_post,
                        token,
                        tx,
                    })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.create_post(new_post),
        }
    }

    /// Fetches the comment thread of a post, oldest first.
    pub async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::GetComments { post_id, tx })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.get_comments(post_id),
        }
    }

    /// Creates a comment.
    pub async fn create_comment(
        &self,
        new_comment: NewComment,
        token: Option<ArcStr>,
    ) -> Result<Comment, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::CreateComment {
                        new_comment,
                        token,
                        tx,
                    })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.create_comment(new_comment),
        }
    }

    /// Patches the like state of a post. Used for both like and unlike.
    pub async fn patch_post_likes(
        &self,
        id: i64,
        likes: i64,
        liked_by: Vec<i64>,
        token: Option<ArcStr>,
    ) -> Result<Post, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::PatchPostLikes {
                        id,
                        likes,
                        liked_by,
                        token,
                        tx,
                    })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.patch_post_likes(id, likes, liked_by),
        }
    }

    /// Fetches the like rows of a post.
    pub async fn get_likes(&self, post_id: i64) -> Result<Vec<LikeRecord>, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::GetLikes { post_id, tx })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.get_likes(post_id),
        }
    }

    /// Authenticates with existing credentials.
    pub async fn login(&self, credentials: Credentials) -> Result<AuthResponse, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::Login { credentials, tx })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.login(credentials),
        }
    }

    /// Creates an account and authenticates.
    pub async fn register(&self, new_user: NewUser) -> Result<AuthResponse, ApiError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(ForumApiMessage::Register { new_user, tx })
                    .await
                    .context("Sending message to ForumApi actor")
                    .expect("ForumApi actor died");
                rx.await
                    .context("Awaiting response from ForumApi actor")
                    .expect("ForumApi actor died")
            }
            Self::Mock(mock) => mock.lock().await.register(new_user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Log;
    use crate::net::message::{MockRequestKey, NetResponse};
    use std::collections::HashMap;

    const BASE: &str = "https://forum.test";

    fn api_over(responses: HashMap<MockRequestKey, NetResponse>) -> ForumApi {
        let net = Net::mock(responses);
        ForumApi::spawn(net, ArcStr::from(BASE), Log::Mock)
    }

    #[tokio::test]
    async fn test_get_posts_parses_and_sorts_newest_first() {
        let body = r#"[
            {"id": 1, "title": "older", "createdAt": "2024-01-01T00:00:00Z"},
            {"id": 2, "title": "newer", "createdAt": "2024-06-01T00:00:00Z"}
        ]"#;
        let url = ArcStr::from(format!("{}/posts?_sort=createdAt&_order=desc", BASE).as_str());
        let api = api_over(HashMap::from([(
            MockRequestKey::get(url),
            NetResponse::new(200, body),
        )]));

        let posts = api.get_posts().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "newer");
        assert_eq!(posts[1].title, "older");
    }

    #[tokio::test]
    async fn test_get_comments_sorts_oldest_first() {
        let body = r#"[
            {"id": 12, "postId": 7, "content": "second", "createdAt": "2024-02-01T00:00:00Z"},
            {"id": 11, "postId": 7, "content": "first", "createdAt": "2024-01-01T00:00:00Z"}
        ]"#;
        let url = ArcStr::from(
            format!("{}/comments?postId=7&_sort=createdAt&_order=asc", BASE).as_str(),
        );
        let api = api_over(HashMap::from([(
            MockRequestKey::get(url),
            NetResponse::new(200, body),
        )]));

        let comments = api.get_comments(7).await.unwrap();
        assert_eq!(comments[0].content, "first");
        assert_eq!(comments[1].content, "second");
    }

    #[tokio::test]
    async fn test_get_post_maps_404_to_remote_rejected() {
        let url = ArcStr::from(format!("{}/posts/9", BASE).as_str());
        let api = api_over(HashMap::from([(
            MockRequestKey::get(url),
            NetResponse::new(404, r#"{"message": "Not found"}"#),
        )]));

        let err = api.get_post(9).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::RemoteRejected {
                status: 404,
                message: "Not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_maps_to_network_unavailable() {
        let api = api_over(HashMap::new());
        let err = api.get_posts().await.unwrap_err();
        assert!(matches!(err, ApiError::NetworkUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_a_rejection() {
        let url = ArcStr::from(format!("{}/posts/3", BASE).as_str());
        let api = api_over(HashMap::from([(
            MockRequestKey::get(url),
            NetResponse::new(200, "<html>not json</html>"),
        )]));

        let err = api.get_post(3).await.unwrap_err();
        assert!(matches!(err, ApiError::RemoteRejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_login_parses_auth_response() {
        let body = r#"{"accessToken": "abc123", "user": {"id": 4, "username": "ada"}}"#;
        let url = ArcStr::from(format!("{}/login", BASE).as_str());
        let api = api_over(HashMap::from([(
            MockRequestKey::post(url),
            NetResponse::new(200, body),
        )]));

        let auth = api
            .login(Credentials {
                email: "ada@example.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert_eq!(auth.access_token, "abc123");
        assert_eq!(auth.user.id, 4);
    }

    #[tokio::test]
    async fn test_login_rejection_uses_string_body() {
        let url = ArcStr::from(format!("{}/login", BASE).as_str());
        let api = api_over(HashMap::from([(
            MockRequestKey::post(url),
            NetResponse::new(400, r#""Incorrect password""#),
        )]));

        let err = api
            .login(Credentials {
                email: "ada@example.com".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::RemoteRejected {
                status: 400,
                message: "Incorrect password".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_patch_post_likes_round_trips() {
        let body = r#"{"id": 7, "title": "t", "likes": 4, "likedBy": [1]}"#;
        let url = ArcStr::from(format!("{}/posts/7", BASE).as_str());
        let api = api_over(HashMap::from([(
            MockRequestKey::patch(url),
            NetResponse::new(200, body),
        )]));

        let post = api
            .patch_post_likes(7, 4, vec![1], Some(ArcStr::from("token")))
            .await
            .unwrap();
        assert_eq!(post.likes, 4);
        assert_eq!(post.liked_by, vec![1]);
    }
}
