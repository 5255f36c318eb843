use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::oneshot::Sender;

use crate::ArcStr;

/// A raw HTTP response as seen by the transport: status code plus body text.
///
/// Interpreting the status (success vs rejection) is the caller's concern;
/// the transport reports a failure only when no response was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetResponse {
    /// The HTTP status code of the response
    pub status: u16,
    /// The response body as text
    pub body: ArcStr,
}

impl NetResponse {
    /// Creates a response from a status code and body text.
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: ArcStr::from(body),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure: the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    /// The connection could not be established or was interrupted
    #[error("network unavailable: {0}")]
    Unavailable(String),
}

/// Messages that can be sent to the networking actor.
///
/// This enum defines the different types of network operations that can be
/// performed through the networking actor system.
#[derive(Debug)]
pub enum Message {
    /// Performs an HTTP GET request to the specified URL
    Get {
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        tx: Sender<Result<NetResponse, NetError>>,
    },
    /// Performs an HTTP POST request to the specified URL
    Post {
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        body: Option<ArcStr>,
        tx: Sender<Result<NetResponse, NetError>>,
    },
    /// Performs an HTTP PATCH request to the specified URL
    Patch {
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        body: Option<ArcStr>,
        tx: Sender<Result<NetResponse, NetError>>,
    },
}

/// Key identifying a request in the mock response cache: method plus URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MockRequestKey {
    /// The HTTP method of the request
    pub method: MockMethod,
    /// The full request URL
    pub url: ArcStr,
}

/// HTTP methods understood by the mock transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockMethod {
    Get,
    Post,
    Patch,
}

impl MockRequestKey {
    /// Creates a key for a GET request.
    pub fn get(url: ArcStr) -> Self {
        Self {
            method: MockMethod::Get,
            url,
        }
    }

    /// Creates a key for a POST request.
    pub fn post(url: ArcStr) -> Self {
        Self {
            method: MockMethod::Post,
            url,
        }
    }

    /// Creates a key for a PATCH request.
    pub fn patch(url: ArcStr) -> Self {
        Self {
            method: MockMethod::Patch,
            url,
        }
    }
}
