use tokio::sync::oneshot;

use crate::{ArcStr, api::forum::AuthUser};

/// Messages that can be sent to the session actor.
#[derive(Debug)]
pub enum Message {
    /// Load the session from its file
    Load {
        /// Channel to send the result back to the caller
        tx: oneshot::Sender<anyhow::Result<()>>,
    },
    /// Save the session to its file
    Save {
        /// Channel to send the result back to the caller
        tx: oneshot::Sender<anyhow::Result<()>>,
    },
    /// Get the stored bearer token
    GetToken {
        /// Channel to send the result back to the caller
        tx: oneshot::Sender<Option<ArcStr>>,
    },
    /// Get the authenticated user
    GetUser {
        /// Channel to send the result back to the caller
        tx: oneshot::Sender<Option<AuthUser>>,
    },
    /// Store a token and the user it belongs to
    Set {
        /// The bearer token
        token: ArcStr,
        /// The authenticated user
        user: AuthUser,
    },
    /// Clear the session
    Clear,
}
