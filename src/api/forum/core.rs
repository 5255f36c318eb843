use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::DateTime;
use serde::{Serialize, de::DeserializeOwned};
use tokio::task::JoinHandle;

use crate::{
    ArcStr,
    log::Log,
    net::{Net, message::NetResponse},
};

use super::{
    ForumApi,
    data::{
        ApiError, AuthResponse, Comment, Credentials, LikeRecord, NewComment, NewPost, NewUser,
        Post,
    },
    message::ForumApiMessage,
};

const SCOPE: &str = "api.forum";

/// `PATCH /posts/{id}` body used for both like and unlike.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LikesPatch {
    likes: i64,
    liked_by: Vec<i64>,
}

/// Core implementation of the Forum API actor.
///
/// Translates logical forum operations into HTTP calls against the remote
/// resource store and parses the responses into typed records. This layer
/// performs no retries; a failed call is reported to the caller as is.
pub struct Core {
    /// Networking actor for HTTP requests
    net: Net,
    /// Base URL of the remote resource store
    base_url: ArcStr,
    /// Log actor for operation logging
    log: Log,
}

impl Core {
    /// Creates a new Forum API core.
    ///
    /// # Arguments
    /// * `net` - The networking actor for making HTTP requests
    /// * `base_url` - The base URL of the remote resource store
    /// * `log` - The logging actor
    pub fn new(net: Net, base_url: ArcStr, log: Log) -> Self {
        Self { net, base_url, log }
    }

    /// Transforms the Forum API core instance into an actor.
    ///
    /// # Returns
    /// A tuple containing:
    /// - The `ForumApi` interface
    /// - A join handle for the spawned task
    pub fn spawn(self) -> (ForumApi, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    ForumApiMessage::GetPosts { tx } => {
                        let _ = tx.send(self.handle_get_posts().await);
                    }
                    ForumApiMessage::GetPost { id, tx } => {
                        let _ = tx.send(self.handle_get_post(id).await);
                    }
                    ForumApiMessage::CreatePost {
                        new_post,
                        token,
                        tx,
                    } => {
                        let _ = tx.send(self.handle_create_post(new_post, token).await);
                    }
                    ForumApiMessage::GetComments { post_id, tx } => {
                        let _ = tx.send(self.handle_get_comments(post_id).await);
                    }
                    ForumApiMessage::CreateComment {
                        new_comment,
                        token,
                        tx,
                    } => {
                        let _ = tx.send(self.handle_create_comment(new_comment, token).await);
                    }
                    ForumApiMessage::PatchPostLikes {
                        id,
                        likes,
                        liked_by,
                        token,
                        tx,
                    } => {
                        let _ = tx.send(self.handle_patch_post_likes(id, likes, liked_by, token).await);
                    }
                    ForumApiMessage::GetLikes { post_id, tx } => {
                        let _ = tx.send(self.handle_get_likes(post_id).await);
                    }
                    ForumApiMessage::Login { credentials, tx } => {
                        let _ = tx.send(self.handle_login(credentials).await);
                    }
                    ForumApiMessage::Register { new_user, tx } => {
                        let _ = tx.send(self.handle_register(new_user).await);
                    }
                }
            }
        });

        (ForumApi::Actual(tx), handle)
    }

    /// Fetches the posts feed, newest first.
    ///
    /// The store is asked to sort, and the result is sorted again locally
    /// because feed ordering is an invariant of the cache layer.
    async fn handle_get_posts(&self) -> Result<Vec<Post>, ApiError> {
        let url = self.url("/posts?_sort=createdAt&_order=desc");
        let response = self.net.get(url, None).await?;
        let mut posts: Vec<Post> = decode(response)?;
        posts.sort_by_key(|p| Reverse(p.created_at.unwrap_or(DateTime::UNIX_EPOCH)));
        Ok(posts)
    }

    /// Fetches a single post by id.
    async fn handle_get_post(&self, id: i64) -> Result<Post, ApiError> {
        let url = self.url(&format!("/posts/{}", id));
        let response = self.net.get(url, None).await?;
        decode(response)
    }

    /// Creates a post.
    async fn handle_create_post(
        &self,
        new_post: NewPost,
        token: Option<ArcStr>,
    ) -> Result<Post, ApiError> {
        let url = self.url("/posts");
        let response = self
            .net
            .post(url, Some(write_headers(token.as_ref())), Some(encode(&new_post)))
            .await?;
        let created: Post = decode(response)?;
        self.log
            .info(SCOPE, format!("created post '{}'", created.title));
        Ok(created)
    }

    /// Fetches the comment thread of a post, oldest first.
    async fn handle_get_comments(&self, post_id: i64) -> Result<Vec<Comment>, ApiError> {
        let url = self.url(&format!(
            "/comments?postId={}&_sort=createdAt&_order=asc",
            post_id
        ));
        let response = self.net.get(url, None).await?;
        let mut comments: Vec<Comment> = decode(response)?;
        comments.sort_by_key(|c| c.created_at.unwrap_or(DateTime::UNIX_EPOCH));
        Ok(comments)
    }

    /// Creates a comment.
    async fn handle_create_comment(
        &self,
        new_comment: NewComment,
        token: Option<ArcStr>,
    ) -> Result<Comment, ApiError> {
        let url = self.url("/comments");
        let response = self
            .net
            .post(
                url,
                Some(write_headers(token.as_ref())),
                Some(encode(&new_comment)),
            )
            .await?;
        decode(response)
    }

    /// Patches the like state of a post. Used for both like and unlike.
    async fn handle_patch_post_likes(
        &self,
        id: i64,
        likes: i64,
        liked_by: Vec<i64>,
        token: Option<ArcStr>,
    ) -> Result<Post, ApiError> {
        let url = self.url(&format!("/posts/{}", id));
        let body = LikesPatch { likes, liked_by };
        let response = self
            .net
            .patch(url, Some(write_headers(token.as_ref())), Some(encode(&body)))
            .await?;
        decode(response)
    }

    /// Fetches the like rows of a post.
    async fn handle_get_likes(&self, post_id: i64) -> Result<Vec<LikeRecord>, ApiError> {
        let url = self.url(&format!("/likes?postId={}", post_id));
        let response = self.net.get(url, None).await?;
        decode(response)
    }

    /// Authenticates with existing credentials.
    async fn handle_login(&self, credentials: Credentials) -> Result<AuthResponse, ApiError> {
        let url = self.url("/login");
        let response = self
            .net
            .post(url, Some(write_headers(None)), Some(encode(&credentials)))
            .await?;
        decode(response)
    }

    /// Creates an account and authenticates.
    async fn handle_register(&self, new_user: NewUser) -> Result<AuthResponse, ApiError> {
        let url = self.url("/register");
        let response = self
            .net
            .post(url, Some(write_headers(None)), Some(encode(&new_user)))
            .await?;
        decode(response)
    }

    /// Builds a full URL from a path-and-query suffix.
    fn url(&self, suffix: &str) -> ArcStr {
        ArcStr::from(format!("{}{}", self.base_url, suffix).as_str())
    }
}

/// Builds the header map for write requests: JSON content type plus a bearer
/// token when one is present.
fn write_headers(token: Option<&ArcStr>) -> HashMap<ArcStr, ArcStr> {
    let mut headers = HashMap::from([(
        ArcStr::from("Content-Type"),
        ArcStr::from("application/json"),
    )]);

    if let Some(token) = token {
        headers.insert(
            ArcStr::from("Authorization"),
            ArcStr::from(format!("Bearer {}", token).as_str()),
        );
    }

    headers
}

/// Serializes a request body.
fn encode<T: Serialize>(value: &T) -> ArcStr {
    ArcStr::from(
        serde_json::to_string(value)
            .expect("Serializing a request body")
            .as_str(),
    )
}

/// Interprets a response: non-success statuses become `RemoteRejected`,
/// success bodies are decoded into the expected type.
fn decode<T: DeserializeOwned>(response: NetResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(ApiError::RemoteRejected {
            status: response.status,
            message: rejection_message(&response),
        });
    }

    serde_json::from_str(&response.body).map_err(|_| ApiError::RemoteRejected {
        status: response.status,
        message: "unexpected response body".to_string(),
    })
}

/// Extracts a human-readable message from a rejection body. The store
/// answers with `{"message": ...}` objects, bare JSON strings, or plain
/// text depending on the endpoint.
fn rejection_message(response: &NetResponse) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&response.body) {
        return body.message;
    }
    if let Ok(message) = serde_json::from_str::<String>(&response.body) {
        return message;
    }

    let raw = response.body.trim();
    if raw.is_empty() {
        format!("status {}", response.status)
    } else {
        raw.to_string()
    }
}
