pub use data::Data;
use message::Message;

use crate::{ArcPath, ArcStr, api::forum::AuthUser, fs::Fs};
use anyhow::Context;

mod core;
pub mod data;
mod message;
mod mock;

/// The session actor holding the bearer token and the authenticated user.
///
/// The acting identity for every mutation comes from here; nothing in the
/// application assumes a fixed user. The session is persisted as a TOML file
/// so a login survives across invocations, and an absent or empty file means
/// logged out.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender.
#[derive(Debug, Clone)]
pub enum Session {
    /// A real session actor that reads from and writes to a file
    Actual(tokio::sync::mpsc::Sender<Message>),
    /// A mock implementation for testing that stores data in memory
    Mock(mock::Mock),
}

impl Session {
    /// Creates a new session instance and spawns its actor.
    ///
    /// # Arguments
    /// * `fs` - The filesystem actor for file operations
    /// * `path` - The path to the session file
    pub fn spawn(fs: Fs, path: ArcPath) -> Self {
        let (session, _) = core::Core::new(fs, path).spawn();
        session
    }

    /// Creates a new mock session instance for testing.
    pub fn mock(data: Data) -> Self {
        Self::Mock(mock::Mock::new(data))
    }

    /// Creates a logged-out mock session instance for testing.
    pub fn mock_logged_out() -> Self {
        Self::mock(Data::default())
    }

    /// Loads the session from its file.
    pub async fn load(&self) -> anyhow::Result<()> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Load { tx })
                    .await
                    .context("Loading session with Session actor")
                    .expect("Session actor died");
                rx.await
                    .context("Awaiting response for session load with Session actor")
                    .expect("Session actor died")
            }
            Self::Mock(mock) => mock.load().await,
        }
    }

    /// Saves the session to its file.
    pub async fn save(&self) -> anyhow::Result<()> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Save { tx })
                    .await
                    .context("Saving session with Session actor")
                    .expect("Session actor died");
                rx.await
                    .context("Awaiting response for session save with Session actor")
                    .expect("Session actor died")
            }
            Self::Mock(mock) => mock.save().await,
        }
    }

    /// Gets the stored bearer token, if logged in.
    pub async fn token(&self) -> Option<ArcStr> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::GetToken { tx })
                    .await
                    .context("Getting token with Session actor")
                    .expect("Session actor died");
                rx.await
                    .context("Awaiting response for token with Session actor")
                    .expect("Session actor died")
            }
            Self::Mock(mock) => mock.token().await,
        }
    }

    /// Gets the authenticated user, if logged in.
    pub async fn user(&self) -> Option<AuthUser> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::GetUser { tx })
                    .await
                    .context("Getting user with Session actor")
                    .expect("Session actor died");
                rx.await
                    .context("Awaiting response for user with Session actor")
                    .expect("Session actor died")
            }
            Self::Mock(mock) => mock.user().await,
        }
    }

    /// Stores a token and the user it belongs to.
    pub async fn set(&self, token: ArcStr, user: AuthUser) {
        match self {
            Self::Actual(sender) => {
                let _ = sender.send(Message::Set { token, user }).await;
            }
            Self::Mock(mock) => mock.set(token, user).await,
        }
    }

    /// Clears the session.
    pub async fn clear(&self) {
        match self {
            Self::Actual(sender) => {
                let _ = sender.send(Message::Clear).await;
            }
            Self::Mock(mock) => mock.clear().await,
        }
    }
}
