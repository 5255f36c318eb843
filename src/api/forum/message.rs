use tokio::sync::oneshot;

use crate::ArcStr;

use super::data::{
    ApiError, AuthResponse, Comment, Credentials, LikeRecord, NewComment, NewPost, NewUser, Post,
};

/// Messages for the Forum API actor.
#[derive(Debug)]
pub enum ForumApiMessage {
    /// Read the posts feed, newest first
    GetPosts {
        tx: oneshot::Sender<Result<Vec<Post>, ApiError>>,
    },
    /// Read a single post by id
    GetPost {
        id: i64,
        tx: oneshot::Sender<Result<Post, ApiError>>,
    },
    /// Create a post
    CreatePost {
        new_post: NewPost,
        token: Option<ArcStr>,
        tx: oneshot::Sender<Result<Post, ApiError>>,
    },
    /// Read the comment thread of a post, oldest first
    GetComments {
        post_id: i64,
        tx: oneshot::Sender<Result<Vec<Comment>, ApiError>>,
    },
    /// Create a comment
    CreateComment {
        new_comment: NewComment,
        token: Option<ArcStr>,
        tx: oneshot::Sender<Result<Comment, ApiError>>,
    },
    /// Patch the like state of a post
    PatchPostLikes {
        id: i64,
        likes: i64,
        liked_by: Vec<i64>,
        token: Option<ArcStr>,
        tx: oneshot::Sender<Result<Post, ApiError>>,
    },
    /// Read the like rows of a post
    GetLikes {
        post_id: i64,
        tx: oneshot::Sender<Result<Vec<LikeRecord>, ApiError>>,
    },
    /// Authenticate with existing credentials
    Login {
        credentials: Credentials,
        tx: oneshot::Sender<Result<AuthResponse, ApiError>>,
    },
    /// Create an account and authenticate
    Register {
        new_user: NewUser,
        tx: oneshot::Sender<Result<AuthResponse, ApiError>>,
    },
}
