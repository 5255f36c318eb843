use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::DateTime;

use super::data::{
    ApiError, AuthResponse, AuthUser, Comment, Credentials, LikeRecord, NewComment, NewPost,
    NewUser, Post, ResourceId,
};

/// In-memory stand-in for the remote resource store, used for testing.
///
/// Holds posts, comments and like rows directly, and can inject failures:
/// `offline` makes every operation fail as unreachable, `reject_writes`
/// rejects writes with a chosen status while reads keep working.
#[derive(Debug, Default)]
pub struct MockForum {
    /// The posts collection
    pub posts: Vec<Post>,
    /// Comment threads keyed by post id
    pub comments: HashMap<i64, Vec<Comment>>,
    /// The likes collection
    pub likes: Vec<LikeRecord>,
    /// When set, every write is rejected with this status and message
    pub reject_writes: Option<(u16, String)>,
    /// When true, every operation fails as if the store were unreachable
    pub offline: bool,
    /// Counter for server-issued ids
    pub(crate) next_id: i64,
}

impl MockForum {
    /// Creates a mock store seeded with the given posts.
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Default::default()
        }
    }

    /// Allocates a server-style numeric id.
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn guard_read(&self) -> Result<(), ApiError> {
        if self.offline {
            return Err(ApiError::NetworkUnavailable("mock store is offline".into()));
        }
        Ok(())
    }

    fn guard_write(&self) -> Result<(), ApiError> {
        self.guard_read()?;
        if let Some((status, message)) = &self.reject_writes {
            return Err(ApiError::RemoteRejected {
                status: *status,
                message: message.clone(),
            });
        }
        Ok(())
    }

    /// Reads the posts feed, newest first.
    pub fn get_posts(&self) -> Result<Vec<Post>, ApiError> {
        self.guard_read()?;
        let mut posts = self.posts.clone();
        posts.sort_by_key(|p| Reverse(p.created_at.unwrap_or(DateTime::UNIX_EPOCH)));
        Ok(posts)
    }

    /// Reads a single post by id.
    pub fn get_post(&self, id: i64) -> Result<Post, ApiError> {
        self.guard_read()?;
        self.posts
            .iter()
            .find(|p| p.id == ResourceId::Num(id))
            .cloned()
            .ok_or(ApiError::RemoteRejected {
                status: 404,
                message: format!("post {} not found", id),
            })
    }

    /// Creates a post with a server-issued id.
    pub fn create_post(&mut self, new_post: NewPost) -> Result<Post, ApiError> {
        self.guard_write()?;
        let post = Post {
            id: ResourceId::Num(self.allocate_id()),
            title: new_post.title,
            content: new_post.content,
            author_id: new_post.author_id,
            author: new_post.author,
            created_at: Some(new_post.created_at),
            updated_at: Some(new_post.updated_at),
            likes: new_post.likes,
            liked_by: new_post.liked_by,
            comment_count: new_post.comment_count,
            tags: new_post.tags,
            views: new_post.views,
        };
        self.posts.push(post.clone());
        Ok(post)
    }

    /// Reads the comment thread of a post, oldest first.
    pub fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, ApiError> {
        self.guard_read()?;
        let mut comments = self.comments.get(&post_id).cloned().unwrap_or_default();
        comments.sort_by_key(|c| c.created_at.unwrap_or(DateTime::UNIX_EPOCH));
        Ok(comments)
    }

    /// Creates a comment with a server-issued id.
    pub fn create_comment(&mut self, new_comment: NewComment) -> Result<Comment, ApiError> {
        self.guard_write()?;
        let comment = Comment {
            id: ResourceId::Num(self.allocate_id()),
            post_id: new_comment.post_id,
            content: new_comment.content,
            author_id: new_comment.author_id,
            author: new_comment.author,
            created_at: Some(new_comment.created_at),
        };
        self.comments
            .entry(comment.post_id)
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    /// Patches the like state of a post and returns the updated record.
    pub fn patch_post_likes(
        &mut self,
        id: i64,
        likes: i64,
        liked_by: Vec<i64>,
    ) -> Result<Post, ApiError> {
        self.guard_write()?;
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == ResourceId::Num(id))
            .ok_or(ApiError::RemoteRejected {
                status: 404,
                message: format!("post {} not found", id),
            })?;
        post.likes = likes;
        post.liked_by = liked_by;
        Ok(post.clone())
    }

    /// Reads the like rows of a post.
    pub fn get_likes(&self, post_id: i64) -> Result<Vec<LikeRecord>, ApiError> {
        self.guard_read()?;
        Ok(self
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .cloned()
            .collect())
    }

    /// Authenticates any non-empty credentials with a fixed account.
    pub fn login(&self, credentials: Credentials) -> Result<AuthResponse, ApiError> {
        self.guard_read()?;
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return Err(ApiError::RemoteRejected {
                status: 400,
                message: "Email and password are required".into(),
            });
        }
        let username = credentials
            .email
            .split('@')
            .next()
            .unwrap_or("user")
            .to_string();
        Ok(AuthResponse {
            access_token: "mock-token".into(),
            user: AuthUser {
                id: 1,
                email: credentials.email,
                display_name: username.clone(),
                username,
                avatar: String::new(),
            },
        })
    }

    /// Registers an account and authenticates it.
    pub fn register(&self, new_user: NewUser) -> Result<AuthResponse, ApiError> {
        self.guard_read()?;
        Ok(AuthResponse {
            access_token: "mock-token".into(),
            user: AuthUser {
                id: 1,
                email: new_user.email,
                username: new_user.username,
                display_name: new_user.display_name,
                avatar: new_user.avatar,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_writes_leaves_reads_working() {
        let mut mock = MockForum::with_posts(vec![Post {
            id: ResourceId::Num(1),
            ..Default::default()
        }]);
        mock.reject_writes = Some((403, "forbidden".into()));

        assert!(mock.get_post(1).is_ok());
        let err = mock.patch_post_likes(1, 1, vec![1]).unwrap_err();
        assert_eq!(
            err,
            ApiError::RemoteRejected {
                status: 403,
                message: "forbidden".into()
            }
        );
    }

    #[test]
    fn offline_rejects_everything() {
        let mock = MockForum {
            offline: true,
            ..Default::default()
        };
        assert!(matches!(
            mock.get_posts(),
            Err(ApiError::NetworkUnavailable(_))
        ));
    }
}
