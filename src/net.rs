use anyhow::Context;
use std::collections::HashMap;
use tokio::sync::mpsc::Sender;

use crate::{
    ArcStr,
    app::config::Config,
    net::{
        core::Core,
        message::{Message, MockRequestKey, NetError, NetResponse},
    },
};

mod core;
mod mock;
pub mod message;

/// The networking actor that provides a thread-safe interface for HTTP
/// operations.
///
/// This enum represents either a real networking actor or a mock
/// implementation for testing purposes. It provides a unified interface for
/// network operations regardless of the underlying implementation.
///
/// Responses always carry the HTTP status code alongside the body so callers
/// can translate non-success statuses into their own failure types; the
/// transport itself only fails when no response was produced at all.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum Net {
    /// A real networking actor that performs HTTP requests
    Actual(Sender<Message>),
    /// A mock implementation for testing
    Mock(mock::Mock),
}

impl Net {
    /// Creates a new networking instance and spawns its actor.
    ///
    /// # Arguments
    /// * `config` - The configuration actor, used for the request timeout
    /// * `log` - The logging actor for operation logging
    pub async fn spawn(config: Config, log: crate::log::Log) -> Self {
        let (net, _) = Core::new(config, log).await.spawn();
        net
    }

    /// Creates a new mock networking instance for testing.
    ///
    /// # Arguments
    /// * `responses` - Initial response cache mapping HTTP method + URL pairs
    ///   to responses
    pub fn mock(responses: HashMap<MockRequestKey, NetResponse>) -> Self {
        Self::Mock(mock::Mock::new(responses))
    }

    /// Creates a new empty mock networking instance for testing.
    ///
    /// A request against an empty mock fails as if the network were
    /// unavailable.
    pub fn mock_empty() -> Self {
        Self::Mock(mock::Mock::empty())
    }

    /// Performs an HTTP GET request to the specified URL.
    ///
    /// # Arguments
    /// * `url` - The URL to send the GET request to
    /// * `headers` - Optional headers to include in the request
    ///
    /// # Returns
    /// The response status and body, or a transport error.
    pub async fn get(
        &self,
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
    ) -> Result<NetResponse, NetError> {
        match self {
            Net::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Get { url, headers, tx })
                    .await
                    .context("Sending message to Net actor")
                    .expect("Net actor died");
                rx.await
                    .context("Awaiting response from Net actor")
                    .expect("Net actor died")
            }
            Net::Mock(mock) => mock.get(url, headers).await,
        }
    }

    /// Performs an HTTP POST request to the specified URL.
    ///
    /// # Arguments
    /// * `url` - The URL to send the POST request to
    /// * `headers` - Optional headers to include in the request
    /// * `body` - Optional body content to send with the request
    ///
    /// # Returns
    /// The response status and body, or a transport error.
    pub async fn post(
        &self,
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        body: Option<ArcStr>,
    ) -> Result<NetResponse, NetError> {
        match self {
            Net::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Post {
                        url,
                        headers,
                        body,
                        tx,
                    })
                    .await
                    .context("Sending message to Net actor")
                    .expect("Net actor died");
                rx.await
                    .context("Awaiting response from Net actor")
                    .expect("Net actor died")
            }
            Net::Mock(mock) => mock.post(url, headers, body).await,
        }
    }

    /// Performs an HTTP PATCH request to the specified URL.
    ///
    /// # Arguments
    /// * `url` - The URL to send the PATCH request to
    /// * `headers` - Optional headers to include in the request
    /// * `body` - Optional body content to send with the request
    ///
    /// # Returns
    /// The response status and body, or a transport error.
    pub async fn patch(
        &self,
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        body: Option<ArcStr>,
    ) -> Result<NetResponse, NetError> {
        match self {
            Net::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Patch {
                        url,
                        headers,
                        body,
                        tx,
                    })
                    .await
                    .context("Sending message to Net actor")
                    .expect("Net actor died");
                rx.await
                    .context("Awaiting response from Net actor")
                    .expect("Net actor died")
            }
            Net::Mock(mock) => mock.patch(url, headers, body).await,
        }
    }
}
