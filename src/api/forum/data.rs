use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::message::NetError;

/// Identifier of a remote resource.
///
/// The remote store issues numeric ids, while optimistic placeholders carry
/// locally generated `temp-{millis}` string ids until the canonical record
/// arrives, so both shapes must parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    /// A server-issued numeric id
    Num(i64),
    /// A string id, including local temporary ids
    Str(String),
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::Num(0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl ResourceId {
    /// Creates a temporary id for an optimistic placeholder record.
    pub fn temporary(now: DateTime<Utc>) -> Self {
        Self::Str(format!("temp-{}", now.timestamp_millis()))
    }

    /// Returns true for locally generated placeholder ids.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Str(s) if s.starts_with("temp-"))
    }
}

/// Author record embedded in posts and comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub avatar: String,
}

/// A post record as stored by the remote store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Post {
    pub id: ResourceId,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author: Author,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub likes: i64,
    pub liked_by: Vec<i64>,
    pub comment_count: i64,
    pub tags: Vec<String>,
    pub views: i64,
}

/// A comment record as stored by the remote store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: ResourceId,
    pub post_id: i64,
    pub content: String,
    pub author_id: i64,
    pub author: Author,
    pub created_at: Option<DateTime<Utc>>,
}

/// A row of the `likes` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LikeRecord {
    pub id: ResourceId,
    pub post_id: i64,
    pub user_id: i64,
}

/// The authenticated user returned by login and register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar: String,
}

impl From<&AuthUser> for Author {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Response of the login and register endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: AuthUser,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Register request body, mirroring the profile the store expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar: String,
}

impl NewUser {
    /// Builds a registration body for the given account details, filling the
    /// profile defaults the store expects.
    pub fn new(email: &str, username: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            username: username.to_string(),
            display_name: username.to_string(),
            bio: String::new(),
            avatar: format!(
                "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
                username
            ),
        }
    }
}

/// Create-post request body. The client fills timestamps and zeroed counters;
/// the server keeps them if present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: i64,
    pub liked_by: Vec<i64>,
    pub comment_count: i64,
    pub tags: Vec<String>,
    pub views: i64,
}

impl NewPost {
    /// Builds a create-post body authored by the given user at `now`.
    pub fn new(title: &str, content: &str, author: Author, now: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            author_id: author.id,
            author,
            created_at: now,
            updated_at: now,
            likes: 0,
            liked_by: Vec::new(),
            comment_count: 0,
            tags: Vec::new(),
            views: 0,
        }
    }
}

/// Create-comment request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: i64,
    pub content: String,
    pub author_id: i64,
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

impl NewComment {
    /// Builds a create-comment body authored by the given user at `now`.
    pub fn new(post_id: i64, content: &str, author: Author, now: DateTime<Utc>) -> Self {
        Self {
            post_id,
            content: content.to_string(),
            author_id: author.id,
            author,
            created_at: now,
        }
    }
}

/// Failures of the Remote Resource Client.
///
/// Transport failures surface as [`ApiError::NetworkUnavailable`]; any
/// non-success status, including an undecodable success body, surfaces as
/// [`ApiError::RemoteRejected`] carrying the response status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The remote store could not be reached at all
    #[error("cannot reach the remote store: {0}")]
    NetworkUnavailable(String),
    /// The remote store answered with a non-success status
    #[error("the remote store rejected the request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },
}

impl From<NetError> for ApiError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Unavailable(reason) => Self::NetworkUnavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_parses_numbers_and_strings() {
        let num: ResourceId = serde_json::from_str("7").unwrap();
        assert_eq!(num, ResourceId::Num(7));

        let s: ResourceId = serde_json::from_str("\"temp-1700000000000\"").unwrap();
        assert!(s.is_temporary());
        assert!(!num.is_temporary());
    }

    #[test]
    fn post_tolerates_missing_fields() {
        let post: Post = serde_json::from_str(r#"{"id": 7, "title": "hello"}"#).unwrap();
        assert_eq!(post.id, ResourceId::Num(7));
        assert_eq!(post.title, "hello");
        assert_eq!(post.likes, 0);
        assert!(post.liked_by.is_empty());
        assert!(post.created_at.is_none());
    }

    #[test]
    fn new_post_body_uses_camel_case() {
        let author = Author {
            id: 3,
            username: "ada".into(),
            display_name: "Ada".into(),
            avatar: String::new(),
        };
        let body = NewPost::new("t", "c", author, Utc::now());
        let encoded = serde_json::to_string(&body).unwrap();
        assert!(encoded.contains("\"authorId\":3"));
        assert!(encoded.contains("\"likedBy\":[]"));
        assert!(encoded.contains("\"commentCount\":0"));
    }
}
