use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ArcStr;
use crate::net::message::{MockRequestKey, NetError, NetResponse};

/// Mock implementation of the Net actor for testing purposes.
///
/// This struct contains predefined HTTP responses for various request types,
/// allowing tests to run without making actual network requests. A request
/// with no registered response fails as if the network were unavailable,
/// which doubles as the failure-injection mechanism for offline scenarios;
/// non-2xx responses can be registered directly to exercise rejection paths.
#[derive(Debug, Clone)]
pub struct Mock {
    responses: Arc<Mutex<HashMap<MockRequestKey, NetResponse>>>,
}

impl Mock {
    /// Creates a new mock instance with the provided responses.
    ///
    /// # Arguments
    /// * `responses` - Initial response cache mapping HTTP method + URL pairs
    ///   to responses
    pub fn new(responses: HashMap<MockRequestKey, NetResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }

    /// Creates a new mock instance with an empty response cache.
    pub fn empty() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a response for a request key.
    pub async fn insert(&self, key: MockRequestKey, response: NetResponse) {
        let mut responses = self.responses.lock().await;
        responses.insert(key, response);
    }

    /// Looks up a response for the given key.
    async fn lookup(&self, key: MockRequestKey) -> Result<NetResponse, NetError> {
        let responses = self.responses.lock().await;
        responses.get(&key).cloned().ok_or_else(|| {
            NetError::Unavailable(format!("no mock response registered for {}", key.url))
        })
    }

    /// Performs an HTTP GET request using mock responses.
    pub async fn get(
        &self,
        url: ArcStr,
        _headers: Option<HashMap<ArcStr, ArcStr>>,
    ) -> Result<NetResponse, NetError> {
        self.lookup(MockRequestKey::get(url)).await
    }

    /// Performs an HTTP POST request using mock responses.
    pub async fn post(
        &self,
        url: ArcStr,
        _headers: Option<HashMap<ArcStr, ArcStr>>,
        _body: Option<ArcStr>,
    ) -> Result<NetResponse, NetError> {
        self.lookup(MockRequestKey::post(url)).await
    }

    /// Performs an HTTP PATCH request using mock responses.
    pub async fn patch(
        &self,
        url: ArcStr,
        _headers: Option<HashMap<ArcStr, ArcStr>>,
        _body: Option<ArcStr>,
    ) -> Result<NetResponse, NetError> {
        self.lookup(MockRequestKey::patch(url)).await
    }
}
