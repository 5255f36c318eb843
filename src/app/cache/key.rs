use std::fmt::Display;

/// Identifier of a cache entry: a resource kind plus its scalar parameter.
///
/// Two keys with the same kind and parameter refer to the same entry. Keys
/// are small and copyable so they can travel freely through actor messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The posts feed, newest first
    PostFeed,
    /// A single post by id
    Post(i64),
    /// The comment thread of a post, oldest first
    Comments(i64),
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PostFeed => write!(f, "posts"),
            Self::Post(id) => write!(f, "post:{}", id),
            Self::Comments(post_id) => write!(f, "comments:{}", post_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_compare_by_kind_and_parameter() {
        assert_eq!(QueryKey::Post(7), QueryKey::Post(7));
        assert_ne!(QueryKey::Post(7), QueryKey::Post(8));
        assert_ne!(QueryKey::Post(7), QueryKey::Comments(7));

        let mut map = HashMap::new();
        map.insert(QueryKey::Post(7), ());
        assert!(map.contains_key(&QueryKey::Post(7)));
    }

    #[test]
    fn keys_display_for_logs() {
        assert_eq!(QueryKey::PostFeed.to_string(), "posts");
        assert_eq!(QueryKey::Post(7).to_string(), "post:7");
        assert_eq!(QueryKey::Comments(7).to_string(), "comments:7");
    }
}
