use std::ffi::OsStr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Cheaply clonable shared string used across actor messages.
pub type ArcStr = Arc<str>;

/// Cheaply clonable shared OS string used for environment lookups.
pub type ArcOsStr = Arc<OsStr>;

/// Shared handle to an open file, guarded for concurrent readers and writers.
pub type ArcFile = Arc<tokio::sync::RwLock<tokio::fs::File>>;

/// Cheaply clonable shared path with value semantics.
///
/// Wraps an `Arc<Path>` so paths can be used as map keys, sent between
/// actors, and persisted inside configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArcPath(Arc<Path>);

impl Deref for ArcPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ArcPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<&Path> for ArcPath {
    fn from(path: &Path) -> Self {
        Self(Arc::from(path))
    }
}

impl From<&PathBuf> for ArcPath {
    fn from(path: &PathBuf) -> Self {
        Self(Arc::from(path.as_path()))
    }
}

impl From<&str> for ArcPath {
    fn from(path: &str) -> Self {
        Self(Arc::from(Path::new(path)))
    }
}

impl Serialize for ArcPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ArcPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = PathBuf::deserialize(deserializer)?;
        Ok(Self::from(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_path_derefs_to_path() {
        let path = ArcPath::from("/tmp/forum-hub/config.toml");
        assert_eq!(path.file_name().unwrap(), "config.toml");
        assert_eq!(path.join("x").to_str().unwrap(), "/tmp/forum-hub/config.toml/x");
    }

    #[test]
    fn arc_path_round_trips_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            path: ArcPath,
        }

        let holder = Holder {
            path: ArcPath::from("/var/log/forum-hub"),
        };
        let encoded = toml::to_string(&holder).unwrap();
        let decoded: Holder = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.path, holder.path);
    }
}
