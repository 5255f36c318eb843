use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{ArcPath, ArcStr, log::LogLevel};
use crate::app::config::{Data, PathOpt, StrOpt, USizeOpt};

/// Mock implementation of the Config actor for testing purposes.
///
/// This struct stores configuration data in memory, allowing tests to run
/// without creating actual configuration files.
#[derive(Debug, Clone)]
pub struct Mock {
    data: Arc<Mutex<Data>>,
}

impl Mock {
    /// Creates a new mock instance with the provided configuration data.
    pub fn new(data: Data) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Loads the configuration from the file.
    /// Mock implementation is a no-op that always succeeds.
    pub async fn load(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Saves the current configuration to the file.
    /// Mock implementation is a no-op that always succeeds.
    pub async fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Gets a path-based configuration value from the stored data.
    pub async fn path(&self, opt: PathOpt) -> ArcPath {
        let data = self.data.lock().await;
        data.path(opt)
    }

    /// Sets a path-based configuration value in the stored data.
    pub async fn set_path(&self, opt: PathOpt, path: ArcPath) {
        let mut data = self.data.lock().await;
        data.set_path(opt, path);
    }

    /// Gets the current log level from the stored data.
    pub async fn log_level(&self) -> LogLevel {
        let data = self.data.lock().await;
        data.log_level()
    }

    /// Sets the log level in the stored data.
    pub async fn set_log_level(&self, level: LogLevel) {
        let mut data = self.data.lock().await;
        data.set_log_level(level);
    }

    /// Gets a numeric configuration value from the stored data.
    pub async fn usize(&self, opt: USizeOpt) -> usize {
        let data = self.data.lock().await;
        data.usize(opt)
    }

    /// Sets a numeric configuration value in the stored data.
    pub async fn set_usize(&self, opt: USizeOpt, value: usize) {
        let mut data = self.data.lock().await;
        data.set_usize(opt, value);
    }

    /// Gets a string configuration value from the stored data.
    pub async fn string(&self, opt: StrOpt) -> ArcStr {
        let data = self.data.lock().await;
        data.string(opt)
    }

    /// Sets a string configuration value in the stored data.
    pub async fn set_string(&self, opt: StrOpt, value: ArcStr) {
        let mut data = self.data.lock().await;
        data.set_string(opt, value);
    }

    /// Gets the mock data for inspection in tests.
    pub async fn get_data(&self) -> Data {
        let data = self.data.lock().await;
        data.clone()
    }
}
