use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod cache;
pub mod config;
pub mod session;

mod core;
mod data;

pub use data::{AppState, Command, MockData};

/// App actor - Central coordinator for the entire application
///
/// This actor wires and holds all other actors (filesystem, config, log,
/// network, API, session, and the cache synchronization layer) and executes
/// CLI commands against them. Command handlers play the view-subscriber
/// role: they subscribe to the keys they render, await data, print to
/// stdout, and unsubscribe.
#[derive(Debug)]
pub enum App {
    /// Ready to execute commands (fully built)
    Ready(Arc<core::Core>),
    /// Mock implementation for testing
    Mock(Arc<Mutex<MockData>>),
}

impl App {
    /// Create a new App actor with full initialization.
    ///
    /// This performs all necessary setup including:
    /// - Actor initialization (env, fs, config, log, net, api, session)
    /// - Configuration and session loading
    /// - Cache store, poller and mutation executor wiring
    pub async fn build() -> Result<Self> {
        let core = core::Core::build().await?;
        Ok(Self::Ready(Arc::new(core)))
    }

    /// Create a mock App actor for testing.
    pub fn mock(data: MockData) -> Self {
        Self::Mock(Arc::new(Mutex::new(data)))
    }

    /// Execute a CLI command and shut down.
    pub async fn resolve(&self, command: Command) -> Result<()> {
        match self {
            Self::Ready(core) => {
                let result = match command {
                    Command::Feed { count } => core.handle_feed_command(count).await,
                    Command::Show { id } => core.handle_show_command(id).await,
                    Command::Like { id } => core.handle_like_command(id).await,
                    Command::Unlike { id } => core.handle_unlike_command(id).await,
                    Command::Comment { id, text } => core.handle_comment_command(id, text).await,
                    Command::NewPost { title, content } => {
                        core.handle_new_post_command(title, content).await
                    }
                    Command::Likes { id } => core.handle_likes_command(id).await,
                    Command::Watch { id, seconds } => core.handle_watch_command(id, seconds).await,
                    Command::Login { email, password } => {
                        core.handle_login_command(email, password).await
                    }
                    Command::Register {
                        email,
                        username,
                        password,
                    } => core.handle_register_command(email, username, password).await,
                    Command::Logout => core.handle_logout_command().await,
                };
                // Flush logs whether the command succeeded or not
                let shutdown = core.handle_shutdown().await;
                result.and(shutdown)
            }
            Self::Mock(data) => {
                let mut mock_data = data.lock().await;
                mock_data.executed_commands.push(command.clone());
                mock_data.state.current_command = Some(command);
                Ok(())
            }
        }
    }
}
