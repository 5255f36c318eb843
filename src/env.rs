use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use tokio::sync::{Mutex, mpsc::Sender};

use crate::{ArcOsStr, ArcStr};

/// The core of the Env actor, responsible for environment variable reads.
///
/// This struct provides thread-safe access to environment variables through
/// an actor pattern. It wraps the standard library's environment variable
/// functions behind a message channel.
#[derive(Debug, Default)]
pub struct EnvCore {}

impl EnvCore {
    /// Creates a new Env core instance.
    pub fn new() -> Self {
        Default::default()
    }

    /// Transforms an instance of [`EnvCore`] into an actor ready to receive
    /// messages.
    ///
    /// # Returns
    /// A tuple containing:
    /// - An [`Env`] instance that can be used to send messages to the actor
    /// - A join handle for the spawned task
    pub fn spawn(self) -> (Env, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Message::GetEnv { tx, key } => self.get_env(tx, key),
                }
            }
        });

        (Env::Actual(tx), handle)
    }

    /// Reads an environment variable and sends the result through the
    /// provided channel.
    fn get_env(
        &self,
        tx: tokio::sync::oneshot::Sender<Result<ArcStr, std::env::VarError>>,
        key: ArcOsStr,
    ) {
        let _ = tx.send(std::env::var(key).map(Arc::from));
    }
}

/// Messages that can be sent to an [`EnvCore`] actor.
#[derive(Debug)]
pub enum Message {
    /// Reads an environment variable
    GetEnv {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<ArcStr, std::env::VarError>>,
        /// The environment variable name
        key: ArcOsStr,
    },
}

/// The environment actor that provides a thread-safe interface for
/// environment variable reads.
///
/// This enum represents either a real environment actor or a mock
/// implementation for testing purposes.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum Env {
    /// A real environment actor backed by the process environment
    Actual(Sender<Message>),
    /// A mock implementation for testing backed by an in-memory map
    Mock(Arc<Mutex<HashMap<ArcOsStr, ArcStr>>>),
}

impl Env {
    /// Creates a new environment instance and spawns its actor.
    pub fn spawn() -> Self {
        let (env, _) = EnvCore::new().spawn();
        env
    }

    /// Creates a new mock environment instance for testing.
    ///
    /// # Arguments
    /// * `vars` - Initial variables the mock knows about
    pub fn mock(vars: HashMap<ArcOsStr, ArcStr>) -> Self {
        Self::Mock(Arc::new(Mutex::new(vars)))
    }

    /// Creates a new empty mock environment instance for testing.
    pub fn mock_empty() -> Self {
        Self::Mock(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Reads an environment variable.
    ///
    /// # Errors
    /// Returns an error if the variable is unset or not valid unicode.
    pub async fn env(&self, key: ArcOsStr) -> anyhow::Result<ArcStr> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::GetEnv {
                        tx,
                        key: key.clone(),
                    })
                    .await
                    .context("Sending message to Env actor")?;
                rx.await
                    .context("Awaiting response from Env actor")?
                    .with_context(|| format!("Reading environment variable {:?}", key))
            }
            Self::Mock(vars) => {
                let vars = vars.lock().await;
                vars.get(&key)
                    .cloned()
                    .with_context(|| format!("Reading environment variable {:?}", key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[tokio::test]
    async fn test_mock_env_returns_known_variable() {
        let key = ArcOsStr::from(OsStr::new("FORUM_HUB_TEST"));
        let vars = HashMap::from([(key.clone(), ArcStr::from("value"))]);
        let env = Env::mock(vars);

        let value = env.env(key).await.unwrap();
        assert_eq!(value.as_ref(), "value");
    }

    #[tokio::test]
    async fn test_mock_env_fails_on_unknown_variable() {
        let env = Env::mock_empty();
        let result = env.env(ArcOsStr::from(OsStr::new("MISSING"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_actual_env_reads_process_environment() {
        let env = Env::spawn();
        // PATH is present in any reasonable test environment.
        let value = env.env(ArcOsStr::from(OsStr::new("PATH"))).await;
        assert!(value.is_ok());
    }
}
