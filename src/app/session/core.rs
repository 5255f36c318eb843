use crate::{ArcPath, fs::Fs};

use super::{data::Data, message::Message};

/// The core session actor that handles file I/O and data management.
///
/// Keeps the bearer token and authenticated user in memory and persists
/// them to a TOML file next to the configuration.
pub struct Core {
    /// The filesystem actor for file operations
    fs: Fs,
    /// The path to the session file
    path: ArcPath,
    /// The current session data
    data: Data,
}

impl Core {
    /// Creates a new session core instance.
    ///
    /// # Arguments
    /// * `fs` - The filesystem actor for file operations
    /// * `path` - The path to the session file
    pub fn new(fs: Fs, path: ArcPath) -> Self {
        Self {
            fs,
            path,
            data: Data::default(),
        }
    }

    /// Spawns the session actor and returns a handle to it.
    pub fn spawn(mut self) -> (super::Session, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Message::Load { tx } => {
                        let res = self.load().await;
                        let _ = tx.send(res);
                    }
                    Message::Save { tx } => {
                        let res = self.save().await;
                        let _ = tx.send(res);
                    }
                    Message::GetToken { tx } => {
                        let _ = tx.send(self.data.token());
                    }
                    Message::GetUser { tx } => {
                        let _ = tx.send(self.data.user());
                    }
                    Message::Set { token, user } => {
                        self.data.set(token, user);
                    }
                    Message::Clear => {
                        self.data.clear();
                    }
                }
            }
        });
        (super::Session::Actual(tx), handle)
    }

    /// Loads the session from its file.
    ///
    /// A missing file is not an error: it simply means nobody is logged in.
    async fn load(&mut self) -> anyhow::Result<()> {
        let contents = match self.fs.read_to_string(self.path.clone()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.data = Data::default();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let data = toml::from_str(&contents)?;
        self.data = data;
        Ok(())
    }

    /// Saves the session to its file, replacing its previous contents.
    async fn save(&self) -> anyhow::Result<()> {
        let contents = toml::to_string(&self.data)?;
        self.fs.write_string(self.path.clone(), contents).await?;
        Ok(())
    }
}
