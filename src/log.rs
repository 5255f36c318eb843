use std::{fmt::Display, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::{io::AsyncWriteExt, sync::mpsc::Sender, task::JoinHandle};

use crate::{ArcFile, ArcPath, fs::Fs};

/// Describes the log level of a message.
///
/// This enum is used to determine the severity of a log message so the
/// logger can handle it according to the configured verbosity level.
///
/// # Ordering
/// The levels are ordered by severity: `Info` < `Warning` < `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LogLevel {
    #[default]
    /// The lowest level, dedicated to regular information that is not
    /// critical. Used for general operational messages.
    Info,
    /// Mid level, used to indicate when something went wrong but it's not
    /// critical. Used for recoverable errors or potential issues.
    Warning,
    /// The highest level, used to indicate critical errors that require
    /// attention but are not severe enough to crash the program.
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Describes a message to be logged.
///
/// Contains the message content, the scope (module) that emitted it, and its
/// associated log level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogMessage {
    /// The severity level of the message
    level: LogLevel,
    /// The subsystem that emitted the message, e.g. `app.cache.store`
    scope: String,
    /// The actual message content
    message: String,
}

impl Display for LogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.scope, self.message)
    }
}

/// The core of the logging system that manages logging to both stderr and
/// log files.
///
/// This struct provides thread-safe logging capabilities through an actor
/// pattern. It handles writing messages to both a timestamped log file and a
/// "latest" log file, while also maintaining a buffer of messages to be
/// printed to stderr when the logger is flushed.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads through the
/// actor pattern. All logging operations are handled sequentially.
#[derive(Debug)]
pub struct LogCore {
    /// Filesystem interface for file operations
    fs: Fs,
    /// Directory where log files are stored
    log_dir: ArcPath,
    /// Path to the current timestamped log file
    log_path: ArcPath,
    /// Handle to the current log file
    log_file: ArcFile,
    /// Handle to the "latest" log file
    latest_log_file: ArcFile,
    /// Buffer of messages to be printed to stderr
    logs_to_print: Vec<LogMessage>,
    /// Minimum level of messages to be printed to stderr
    print_level: LogLevel,
    /// Maximum age of log files in days before they are deleted
    max_age: usize,
}

impl LogCore {
    /// Creates a new logger instance with the specified configuration.
    ///
    /// # Arguments
    /// * `fs` - Filesystem interface for file operations
    /// * `level` - Minimum log level for messages to be printed to stderr
    /// * `max_age` - Maximum age of log files in days before they are deleted
    /// * `log_dir` - Directory where log files will be stored
    ///
    /// # Errors
    /// Returns an error if the log directory cannot be created or if either
    /// log file cannot be opened.
    pub async fn build(
        fs: Fs,
        level: LogLevel,
        max_age: usize,
        log_dir: ArcPath,
    ) -> anyhow::Result<Self> {
        fs.mkdir(log_dir.clone())
            .await
            .context("Failed to create the log directory")?;

        let log_path = ArcPath::from(&log_dir.join(format!(
            "forum-hub_{}.log",
            chrono::Utc::now().format("%Y-%m-%d-%H-%M-%S")
        )));
        let latest_log_path = ArcPath::from(&log_dir.join("latest.log"));

        let log_file = fs
            .open_file(log_path.clone())
            .await
            .context("Failed to create log file")?;
        let latest_log_file = fs
            .open_file(latest_log_path)
            .await
            .context("Failed to create latest log file")?;

        Ok(Self {
            fs,
            log_dir,
            log_path,
            log_file,
            latest_log_file,
            logs_to_print: Vec::new(),
            print_level: level,
            max_age,
        })
    }

    /// Transforms the logger core instance into an actor.
    ///
    /// # Returns
    /// A tuple containing:
    /// - A [`Log`] instance that can be used to send messages to the actor
    /// - A join handle for the spawned task
    pub fn spawn(mut self) -> (Log, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(100);
        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Message::Log(msg) => {
                        self.log(msg).await;
                    }
                    Message::Flush => {
                        self.flush();
                        rx.close();
                        break;
                    }
                    Message::CollectGarbage => {
                        self.collect_garbage().await;
                    }
                }
            }
        });

        (Log::Actual(tx), handle)
    }

    /// Writes a log message to both log files and potentially to the stderr
    /// buffer.
    async fn log(&mut self, message: LogMessage) {
        let mut lock = self.log_file.write().await;
        lock.write_all(format!("{}\n", &message).as_bytes())
            .await
            .expect("Failed to write to the current log file");

        lock.flush()
            .await
            .expect("Failed to flush the current log file");
        drop(lock);

        let mut lock = self.latest_log_file.write().await;
        lock.write_all(format!("{}\n", &message).as_bytes())
            .await
            .expect("Failed to write to the latest log file");

        lock.flush()
            .await
            .expect("Failed to flush the latest log file");
        drop(lock);

        if message.level >= self.print_level {
            self.logs_to_print.push(message);
        }
    }

    /// Writes buffered log messages to stderr and destroys the logger.
    fn flush(self) {
        for message in &self.logs_to_print {
            eprintln!("{}", message);
        }

        if !self.logs_to_print.is_empty() {
            eprintln!("Check the full log file: {}", self.log_path.display());
        }
    }

    /// Runs the garbage collector to delete old log files.
    ///
    /// This method scans the log directory and deletes any log files that
    /// are older than the configured maximum age. If max_age is 0, no files
    /// are deleted.
    async fn collect_garbage(&mut self) {
        if self.max_age == 0 {
            return;
        }

        let now = std::time::SystemTime::now();

        let Ok(logs) = self.fs.read_dir(self.log_dir.clone()).await else {
            self.log(LogMessage {
                level: LogLevel::Error,
                scope: "log".to_string(),
                message: "Failed to read the logs directory during garbage collection".into(),
            })
            .await;
            return;
        };

        for log in logs {
            let Some(filename) = log.file_name() else {
                continue;
            };

            if !filename.to_string_lossy().ends_with(".log")
                || !filename.to_string_lossy().starts_with("forum-hub_")
            {
                continue;
            }

            let Ok(Ok(created_date)) = log.metadata().map(|meta| meta.created()) else {
                continue;
            };
            let Ok(age) = now.duration_since(created_date) else {
                continue;
            };
            let age = age.as_secs() / 60 / 60 / 24;

            if age as usize > self.max_age && self.fs.remove_file(log.clone()).await.is_err() {
                self.log(LogMessage {
                    level: LogLevel::Warning,
                    scope: "log".to_string(),
                    message: format!("Failed to remove the log file: {}", log.to_string_lossy()),
                })
                .await;
            }
        }
    }
}

/// Messages that can be sent to a [`LogCore`] actor.
#[derive(Debug)]
pub enum Message {
    /// Logs a message with the specified level, scope and content
    Log(LogMessage),
    /// Flushes the logger by writing buffered messages to stderr and
    /// destroying the instance
    Flush,
    /// Runs the log garbage collector to delete old log files
    CollectGarbage,
}

/// The logging actor that provides a thread-safe interface for logging
/// operations.
///
/// This enum represents either a real logging actor or a mock implementation
/// for testing purposes.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender.
#[derive(Debug, Clone)]
pub enum Log {
    /// A real logging actor that writes to files and stderr
    Actual(Sender<Message>),
    /// A mock implementation for testing that does nothing
    Mock,
}

impl From<LogCore> for Log {
    fn from(value: LogCore) -> Self {
        value.spawn().0
    }
}

impl Log {
    /// Creates a new logging instance and spawns its actor.
    ///
    /// # Arguments
    /// * `fs` - Filesystem interface for file operations
    /// * `level` - Minimum log level for messages to be printed to stderr
    /// * `max_age` - Maximum age of log files in days before they are deleted
    /// * `log_dir` - Directory where log files will be stored
    pub async fn spawn(
        fs: Fs,
        level: LogLevel,
        max_age: usize,
        log_dir: ArcPath,
    ) -> anyhow::Result<Self> {
        Ok(LogCore::build(fs, level, max_age, log_dir).await?.spawn().0)
    }

    /// Helper to simplify the logging process. This method sends a
    /// [`LogMessage`] to the logger. Will send the message in a new task so
    /// it won't block the caller.
    ///
    /// # Panics
    /// If the logger was flushed
    fn log(&self, scope: &str, message: String, level: LogLevel) {
        let sender = match self {
            Log::Mock => return,
            Log::Actual(sender) => sender.clone(),
        };
        let scope = scope.to_string();

        tokio::spawn(async move {
            sender
                .send(Message::Log(LogMessage {
                    level,
                    scope,
                    message,
                }))
                .await
                .expect("Attempt to use logger after a flush");
        });
    }

    /// Log a message with the `INFO` level.
    ///
    /// # Panics
    /// If the logger was flushed
    pub fn info<M: Display>(&self, scope: &str, message: M) {
        self.log(scope, message.to_string(), LogLevel::Info);
    }

    /// Log a message with the `WARNING` level.
    ///
    /// # Panics
    /// If the logger was flushed
    pub fn warn<M: Display>(&self, scope: &str, message: M) {
        self.log(scope, message.to_string(), LogLevel::Warning);
    }

    /// Log a message with the `ERROR` level.
    pub fn error<M: Display>(&self, scope: &str, message: M) {
        self.log(scope, message.to_string(), LogLevel::Error);
    }

    /// Flushes the logger by printing its messages to stderr and closing the
    /// log file. After this method is called, the logger is destroyed and
    /// any attempt to use it will panic.
    ///
    /// # Panics
    /// If called twice
    pub fn flush(self) -> JoinHandle<()> {
        let Self::Actual(sender) = self else {
            return tokio::spawn(async {});
        };

        tokio::spawn(async move {
            sender
                .send(Message::Flush)
                .await
                .expect("Flushing a logger twice");
        })
    }

    /// Collects the garbage from the logs directory. Garbage logs are the
    /// ones older than the `max_age` set during the logger build.
    ///
    /// # Panics
    /// If called after a flush
    pub async fn collect_garbage(&self) {
        let Self::Actual(sender) = self else {
            return;
        };

        sender
            .send(Message::CollectGarbage)
            .await
            .expect("Attempt to use logger after a flush")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_message_format() {
        let message = LogMessage {
            level: LogLevel::Warning,
            scope: "app.cache.store".to_string(),
            message: "discarded stale refresh".to_string(),
        };
        assert_eq!(
            message.to_string(),
            "[WARN] app.cache.store: discarded stale refresh"
        );
    }

    #[tokio::test]
    async fn test_mock_log_is_a_no_op() {
        let log = Log::Mock;
        log.info("test", "nothing happens");
        log.collect_garbage().await;
        log.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_actual_log_writes_to_latest_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = ArcPath::from(&temp_dir.path().join("logs"));

        let fs = Fs::spawn();
        let log = Log::spawn(fs, LogLevel::Error, 0, log_dir.clone())
            .await
            .unwrap();

        log.info("test", "hello from the test");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let contents = tokio::fs::read_to_string(log_dir.join("latest.log"))
            .await
            .unwrap();
        assert!(contents.contains("[INFO] test: hello from the test"));

        temp_dir.close().unwrap();
    }
}
