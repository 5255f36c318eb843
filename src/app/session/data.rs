use serde::{Deserialize, Serialize};

use crate::{ArcStr, api::forum::AuthUser};

/// The persisted session: bearer token and the authenticated user.
///
/// Both fields are absent when nobody is logged in; an empty session file
/// deserializes to the logged-out state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    /// Bearer token returned by login or register
    token: Option<String>,
    /// The authenticated user the token belongs to
    user: Option<AuthUser>,
}

impl Data {
    /// Gets the stored bearer token.
    pub fn token(&self) -> Option<ArcStr> {
        self.token.as_deref().map(ArcStr::from)
    }

    /// Gets the authenticated user.
    pub fn user(&self) -> Option<AuthUser> {
        self.user.clone()
    }

    /// Stores a token and the user it belongs to.
    pub fn set(&mut self, token: ArcStr, user: AuthUser) {
        self.token = Some(token.as_ref().to_string());
        self.user = Some(user);
    }

    /// Clears the session.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_deserializes_to_logged_out() {
        let data: Data = toml::from_str("").unwrap();
        assert!(data.token().is_none());
        assert!(data.user().is_none());
    }

    #[test]
    fn set_and_clear_round_trip() {
        let mut data = Data::default();
        data.set(
            ArcStr::from("token"),
            AuthUser {
                id: 4,
                username: "ada".into(),
                ..Default::default()
            },
        );
        assert_eq!(data.token().unwrap().as_ref(), "token");
        assert_eq!(data.user().unwrap().id, 4);

        data.clear();
        assert!(data.token().is_none());
    }
}
