use serde::{Deserialize, Serialize};

use crate::{ArcPath, ArcStr, log::LogLevel};

/// Options for path-based configuration values that can be accessed and
/// modified.
#[derive(Debug, Clone, Copy)]
pub enum PathOpt {
    /// Directory where log files are stored
    LogDir,
    /// Path to the persisted session file
    SessionPath,
}

/// Options for numeric configuration values that can be accessed and
/// modified.
#[derive(Debug, Clone, Copy)]
pub enum USizeOpt {
    /// Maximum age of log files in days before they are deleted
    MaxAge,
    /// Timeout for network requests in seconds
    Timeout,
    /// Background poll interval for subscribed cache keys in seconds
    PollInterval,
}

/// Options for string configuration values that can be accessed and
/// modified.
#[derive(Debug, Clone, Copy)]
pub enum StrOpt {
    /// Base URL of the remote resource store
    BaseUrl,
}

/// The configuration data structure that holds all configurable values.
///
/// This struct is responsible for storing and managing all configuration
/// values. It provides methods to access and modify these values in a
/// type-safe manner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    /// Base URL of the remote resource store
    base_url: String,
    /// Path to the persisted session file
    session_path: ArcPath,
    /// Directory where log files are stored
    log_dir: ArcPath,
    /// Current log level
    log_level: LogLevel,
    /// Maximum age of log files in days before they are deleted
    max_age: usize,
    /// Timeout for network requests in seconds
    timeout: usize,
    /// Background poll interval for subscribed cache keys in seconds
    poll_interval: usize,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            base_url: "https://community-forum-backend-4g6j.onrender.com".to_string(),
            session_path: ArcPath::from("/tmp/forum-hub/session.toml"),
            log_dir: ArcPath::from("/tmp/forum-hub/logs"),
            log_level: LogLevel::Warning,
            max_age: 0,
            timeout: 30,
            poll_interval: 2,
        }
    }
}

impl Data {
    /// Gets a path-based configuration value.
    pub fn path(&self, opt: PathOpt) -> ArcPath {
        match opt {
            PathOpt::LogDir => self.log_dir.clone(),
            PathOpt::SessionPath => self.session_path.clone(),
        }
    }

    /// Sets a path-based configuration value.
    pub fn set_path(&mut self, opt: PathOpt, path: ArcPath) {
        match opt {
            PathOpt::LogDir => self.log_dir = path,
            PathOpt::SessionPath => self.session_path = path,
        }
    }

    /// Gets the current log level.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Sets the log level.
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Gets a numeric configuration value.
    pub fn usize(&self, opt: USizeOpt) -> usize {
        match opt {
            USizeOpt::MaxAge => self.max_age,
            USizeOpt::Timeout => self.timeout,
            USizeOpt::PollInterval => self.poll_interval,
        }
    }

    /// Sets a numeric configuration value.
    pub fn set_usize(&mut self, opt: USizeOpt, value: usize) {
        match opt {
            USizeOpt::MaxAge => self.max_age = value,
            USizeOpt::Timeout => self.timeout = value,
            USizeOpt::PollInterval => self.poll_interval = value,
        }
    }

    /// Gets a string configuration value.
    pub fn string(&self, opt: StrOpt) -> ArcStr {
        match opt {
            StrOpt::BaseUrl => ArcStr::from(self.base_url.as_str()),
        }
    }

    /// Sets a string configuration value.
    pub fn set_string(&mut self, opt: StrOpt, value: ArcStr) {
        match opt {
            StrOpt::BaseUrl => self.base_url = value.as_ref().to_string(),
        }
    }
}
