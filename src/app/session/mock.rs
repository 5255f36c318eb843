use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{ArcStr, api::forum::AuthUser};

use super::data::Data;

/// Mock implementation of the Session actor for testing purposes.
///
/// Stores the session in memory; load and save are no-ops.
#[derive(Debug, Clone)]
pub struct Mock {
    data: Arc<Mutex<Data>>,
}

impl Mock {
    /// Creates a new mock instance with the provided session data.
    pub fn new(data: Data) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// No-op load that always succeeds.
    pub async fn load(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// No-op save that always succeeds.
    pub async fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Gets the stored bearer token.
    pub async fn token(&self) -> Option<ArcStr> {
        let data = self.data.lock().await;
        data.token()
    }

    /// Gets the authenticated user.
    pub async fn user(&self) -> Option<AuthUser> {
        let data = self.data.lock().await;
        data.user()
    }

    /// Stores a token and the user it belongs to.
    pub async fn set(&self, token: ArcStr, user: AuthUser) {
        let mut data = self.data.lock().await;
        data.set(token, user);
    }

    /// Clears the session.
    pub async fn clear(&self) {
        let mut data = self.data.lock().await;
        data.clear();
    }
}
