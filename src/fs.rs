use std::{
    collections::{HashMap, LinkedList},
    io,
    sync::Arc,
};

use anyhow::Context;
use tokio::{fs::OpenOptions, sync::mpsc::Sender};

use crate::{ArcFile, ArcPath};

/// The core of the Fs actor, responsible for handling filesystem operations.
///
/// Two access styles are offered, matching the two kinds of files the
/// application touches: long-lived handles for append-style writers (the
/// log files), cached so repeated opens return the same descriptor, and
/// whole-file string reads/writes for the small TOML documents (config and
/// session), which replace the previous contents atomically from the
/// caller's point of view.
#[derive(Debug, Default)]
pub struct FsCore {
    /// The cache of open files, mapping paths to their file handles
    files: HashMap<ArcPath, ArcFile>,
}

impl FsCore {
    /// Creates a new Fs core instance with an empty file cache.
    pub fn new() -> Self {
        Default::default()
    }

    /// Transforms an instance of [`FsCore`] into an actor ready to receive
    /// messages.
    ///
    /// # Returns
    /// A tuple containing:
    /// - A [`Fs`] instance that can be used to send messages to the actor
    /// - A join handle for the spawned task
    pub fn spawn(mut self) -> (Fs, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                use Message::*;
                match msg {
                    OpenFile { tx, path } => self.open_file(tx, path).await,
                    CloseFile { path } => self.close_file(path),
                    ReadToString { tx, path } => self.read_to_string(tx, path).await,
                    WriteString { tx, path, contents } => {
                        self.write_string(tx, path, contents).await
                    }
                    RemoveFile { tx, path } => self.remove_file(tx, path).await,
                    ReadDir { tx, path } => self.read_dir(tx, path).await,
                    MkDir { tx, path } => self.mkdir(tx, path).await,
                }
            }
        });

        (Fs::Actual(tx), handle)
    }

    /// Opens a file for appending, or returns a cached handle if one exists.
    ///
    /// The file is opened with read, write and create permissions.
    async fn open_file(
        &mut self,
        tx: tokio::sync::oneshot::Sender<Result<ArcFile, tokio::io::Error>>,
        path: ArcPath,
    ) {
        let f = match self.files.get(&path) {
            Some(f) => f.clone(),
            None => match OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&path)
                .await
            {
                Ok(f) => {
                    let f: ArcFile = Arc::new(tokio::sync::RwLock::new(f));
                    self.files.insert(path, f.clone());
                    f
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            },
        };
        let _ = tx.send(Ok(f));
    }

    /// Removes a file handle from the cache.
    ///
    /// This doesn't close the file immediately - all `Arc` references must
    /// be dropped before the file is actually closed.
    fn close_file(&mut self, path: ArcPath) {
        self.files.remove(&path);
    }

    /// Reads a whole file into a string.
    async fn read_to_string(
        &self,
        tx: tokio::sync::oneshot::Sender<Result<String, io::Error>>,
        path: ArcPath,
    ) {
        let res = tokio::fs::read_to_string(&path).await;
        let _ = tx.send(res);
    }

    /// Replaces a file's contents with the given string.
    async fn write_string(
        &self,
        tx: tokio::sync::oneshot::Sender<Result<(), io::Error>>,
        path: ArcPath,
        contents: String,
    ) {
        let res = tokio::fs::write(&path, contents).await;
        let _ = tx.send(res);
    }

    /// Removes a file from the filesystem.
    async fn remove_file(
        &self,
        tx: tokio::sync::oneshot::Sender<Result<(), tokio::io::Error>>,
        path: ArcPath,
    ) {
        let res = tokio::fs::remove_file(&path).await;
        let _ = tx.send(res);
    }

    /// Reads the contents of a directory.
    ///
    /// Returns a list of paths to all entries in the directory.
    async fn read_dir(
        &self,
        tx: tokio::sync::oneshot::Sender<Result<LinkedList<ArcPath>, io::Error>>,
        path: ArcPath,
    ) {
        match tokio::fs::read_dir(&path).await {
            Ok(mut rd) => {
                let mut entries = LinkedList::new();
                let res = loop {
                    match rd.next_entry().await {
                        Ok(Some(entry)) => entries.push_back(ArcPath::from(&entry.path())),
                        Ok(None) => break Ok(entries),
                        Err(e) => break Err(e),
                    }
                };

                let _ = tx.send(res);
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    }

    /// Creates a directory and all its parent directories if they don't
    /// exist.
    async fn mkdir(&self, tx: tokio::sync::oneshot::Sender<Result<(), io::Error>>, path: ArcPath) {
        let res = tokio::fs::create_dir_all(&path).await;
        let _ = tx.send(res);
    }
}

/// Messages that can be sent to a [`FsCore`] actor.
#[derive(Debug)]
pub enum Message {
    /// Opens a file for appending and returns its handle
    OpenFile {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<ArcFile, tokio::io::Error>>,
        /// The path of the file to open
        path: ArcPath,
    },
    /// Removes a file handle from the cache
    CloseFile {
        /// The path of the file to remove from cache
        path: ArcPath,
    },
    /// Reads a whole file into a string
    ReadToString {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<String, io::Error>>,
        /// The path of the file to read
        path: ArcPath,
    },
    /// Replaces a file's contents with a string
    WriteString {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<(), io::Error>>,
        /// The path of the file to write
        path: ArcPath,
        /// The new file contents
        contents: String,
    },
    /// Removes a file from the filesystem
    RemoveFile {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<(), tokio::io::Error>>,
        /// The path of the file to remove
        path: ArcPath,
    },
    /// Reads the contents of a directory
    ReadDir {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<LinkedList<ArcPath>, io::Error>>,
        /// The path of the directory to read
        path: ArcPath,
    },
    /// Creates a directory and its parents
    MkDir {
        /// Channel to send the result back to the caller
        tx: tokio::sync::oneshot::Sender<Result<(), io::Error>>,
        /// The path of the directory to create
        path: ArcPath,
    },
}

/// A mock implementation of the Fs actor, used for testing.
///
/// String reads and writes operate on an in-memory map, so config and
/// session actors can run against it without touching the disk. Open-file
/// handles must be provided up front, as the mock won't create real files.
#[derive(Debug, Clone, Default)]
pub struct FsMock {
    /// In-memory storage for open file handles
    files: HashMap<ArcPath, ArcFile>,
    /// In-memory storage for whole-file contents
    contents: HashMap<ArcPath, String>,
    /// In-memory storage for directory listings
    dirs: HashMap<ArcPath, LinkedList<ArcPath>>,
}

/// The fs actor is responsible for handling filesystem operations.
///
/// This enum represents either a real filesystem actor or a mock
/// implementation for testing purposes. It provides a unified interface for
/// filesystem operations regardless of the underlying implementation.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum Fs {
    /// A real filesystem actor that interacts with the system
    Actual(Sender<Message>),
    /// A mock implementation for testing
    Mock(Arc<tokio::sync::Mutex<FsMock>>),
}

impl From<FsCore> for Fs {
    fn from(core: FsCore) -> Self {
        let (fs, _) = core.spawn();
        fs
    }
}

use Fs::*;

impl Fs {
    /// Creates a new filesystem instance and spawns its actor.
    pub fn spawn() -> Self {
        let (fs, _) = FsCore::new().spawn();
        fs
    }

    /// Creates a new mock instance of the Fs actor for testing.
    ///
    /// # Arguments
    /// * `files` - Pre-opened file handles the mock hands out
    pub fn mock(files: HashMap<ArcPath, ArcFile>) -> Self {
        let mock = FsMock {
            files,
            ..FsMock::default()
        };

        Mock(Arc::new(tokio::sync::Mutex::new(mock)))
    }

    /// Opens a file for appending.
    ///
    /// File opening is cached, so opening a file multiple times will return
    /// the same file descriptor using `Arc` to avoid cloning.
    ///
    /// # Errors
    /// If the file cannot be opened, an error is returned, also if a mock is
    /// being used and the file was not previously passed to [`Fs::mock`].
    pub async fn open_file(&self, path: ArcPath) -> Result<ArcFile, io::Error> {
        match self {
            Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::OpenFile { tx, path })
                    .await
                    .context("Opening file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file open with Fs")
                    .expect("fs actor died")
            }
            Mock(lock) => {
                let lock = lock.lock().await;
                lock.files
                    .get(&path)
                    .map(ArcFile::clone)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
            }
        }
    }

    /// Removes a file from the cache, notice that this won't close the file
    /// immediately. Every `Arc` must be dropped before the file is actually
    /// closed.
    pub async fn close_file(&self, path: ArcPath) {
        match self {
            Actual(sender) => sender
                .send(Message::CloseFile { path })
                .await
                .context("Closing file with Fs")
                .expect("fs actor died"),
            Mock(mutex) => {
                let mut lock = mutex.lock().await;
                lock.files.remove(&path);
            }
        }
    }

    /// Reads a whole file into a string.
    pub async fn read_to_string(&self, path: ArcPath) -> Result<String, io::Error> {
        match self {
            Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::ReadToString { tx, path })
                    .await
                    .context("Reading file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file read with Fs")
                    .expect("fs actor died")
            }
            Mock(lock) => {
                let lock = lock.lock().await;
                lock.contents
                    .get(&path)
                    .cloned()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
            }
        }
    }

    /// Replaces a file's contents with the given string.
    pub async fn write_string(&self, path: ArcPath, contents: String) -> Result<(), io::Error> {
        match self {
            Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::WriteString { tx, path, contents })
                    .await
                    .context("Writing file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file write with Fs")
                    .expect("fs actor died")
            }
            Mock(lock) => {
                let mut lock = lock.lock().await;
                lock.contents.insert(path, contents);
                Ok(())
            }
        }
    }

    /// Removes a file from the filesystem.
    pub async fn remove_file(&self, path: ArcPath) -> Result<(), io::Error> {
        match self {
            Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::RemoveFile { tx, path })
                    .await
                    .context("Removing file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file removal with Fs")
                    .expect("fs actor died")
            }
            Mock(lock) => {
                let mut lock = lock.lock().await;
                let had_handle = lock.files.remove(&path).is_some();
                let had_contents = lock.contents.remove(&path).is_some();
                if had_handle || had_contents {
                    Ok(())
                } else {
                    Err(io::Error::new(io::ErrorKind::NotFound, "file not found"))
                }
            }
        }
    }

    /// Reads a directory.
    pub async fn read_dir(&self, path: ArcPath) -> Result<LinkedList<ArcPath>, io::Error> {
        match self {
            Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::ReadDir { tx, path })
                    .await
                    .context("Reading directory with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for directory read with Fs")
                    .expect("fs actor died")
            }
            Mock(lock) => {
                let lock = lock.lock().await;
                let entries = lock.dirs.get(&path).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "directory not found")
                })?;

                Ok(entries.clone())
            }
        }
    }

    /// Creates a directory if it doesn't exist.
    pub async fn mkdir(&self, path: ArcPath) -> Result<(), io::Error> {
        match self {
            Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::MkDir { tx, path })
                    .await
                    .context("Creating directory with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for directory creation with Fs")
                    .expect("fs actor died")
            }
            Mock(lock) => {
                let mut lock = lock.lock().await;
                lock.dirs.insert(path, LinkedList::new());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_write_and_read_string() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = ArcPath::from(&temp_dir.path().join("notes.toml"));

        let (fs, _) = FsCore::new().spawn();

        fs.write_string(file_path.clone(), "token = \"abc\"\n".to_string())
            .await
            .unwrap();
        let contents = fs.read_to_string(file_path.clone()).await.unwrap();
        assert_eq!(contents, "token = \"abc\"\n");

        // A rewrite replaces the previous contents entirely
        fs.write_string(file_path.clone(), "x = 1\n".to_string())
            .await
            .unwrap();
        let contents = fs.read_to_string(file_path.clone()).await.unwrap();
        assert_eq!(contents, "x = 1\n");

        fs.remove_file(file_path).await.unwrap();
        temp_dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_fs_read_missing_file_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = ArcPath::from(&temp_dir.path().join("absent.toml"));

        let (fs, _) = FsCore::new().spawn();
        let result = fs.read_to_string(file_path).await;
        assert!(matches!(result, Err(e) if e.kind() == io::ErrorKind::NotFound));

        temp_dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_fs_open_close_and_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir_path = temp_dir.path().join("test_fs_open_close");
        let file_path = dir_path.join("handle.log");

        let dir_path = ArcPath::from(&dir_path);
        let file_path = ArcPath::from(&file_path);

        let (fs, _) = FsCore::new().spawn();

        // Create directory and file, verify the directory listing sees it
        fs.mkdir(dir_path.clone()).await.unwrap();
        fs.open_file(file_path.clone()).await.unwrap();
        fs.close_file(file_path.clone()).await;

        let entries = fs.read_dir(dir_path.clone()).await.unwrap();
        assert_eq!(entries.len(), 1);

        fs.remove_file(file_path).await.unwrap();
        let entries = fs.read_dir(dir_path).await.unwrap();
        assert!(entries.is_empty());

        temp_dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_mock_fs_string_round_trip() {
        let fs = Fs::mock(HashMap::new());
        let path = ArcPath::from("session.toml");

        assert!(fs.read_to_string(path.clone()).await.is_err());
        fs.write_string(path.clone(), "token = \"abc\"\n".to_string())
            .await
            .unwrap();
        let contents = fs.read_to_string(path).await.unwrap();
        assert_eq!(contents, "token = \"abc\"\n");
    }
}
