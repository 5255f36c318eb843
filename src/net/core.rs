use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::{
    ArcStr,
    app::config::{Config, USizeOpt},
    log::Log,
    net::{
        Net,
        message::{Message, NetError, NetResponse},
    },
};

const SCOPE: &str = "net";

/// The core of the networking system that handles HTTP requests.
///
/// This struct provides thread-safe access to network operations through an
/// actor pattern. It wraps the reqwest HTTP client and provides a safe
/// interface for making HTTP requests.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads through the
/// actor pattern. All network operations are handled sequentially.
#[derive(Debug)]
pub struct Core {
    /// Logging interface for operation logging
    log: Log,
    /// HTTP client for making requests
    client: Client,
}

impl Core {
    /// Creates a new networking instance.
    ///
    /// # Arguments
    /// * `config` - The configuration actor, consulted for the request
    ///   timeout
    /// * `log` - The logging actor for operation logging
    pub async fn new(config: Config, log: Log) -> Self {
        let timeout = config.usize(USizeOpt::Timeout).await;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout as u64))
            .build()
            .expect("Building the HTTP client");

        Self { log, client }
    }

    /// Transforms the networking core instance into an actor.
    ///
    /// This method spawns a new task that will handle network operations
    /// asynchronously through a message channel. All operations are processed
    /// sequentially to ensure consistency.
    ///
    /// # Returns
    /// A tuple containing:
    /// - The `Net` interface
    /// - A join handle for the spawned task
    pub fn spawn(self) -> (Net, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(100);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Get { url, headers, tx } => {
                        let response = self.handle_get_request(url, headers).await;
                        let _ = tx.send(response);
                    }
                    Message::Post {
                        url,
                        headers,
                        body,
                        tx,
                    } => {
                        let response = self.handle_post_request(url, headers, body).await;
                        let _ = tx.send(response);
                    }
                    Message::Patch {
                        url,
                        headers,
                        body,
                        tx,
                    } => {
                        let response = self.handle_patch_request(url, headers, body).await;
                        let _ = tx.send(response);
                    }
                }
            }
        });

        (Net::Actual(tx), handle)
    }

    /// Handles GET requests with optional headers
    async fn handle_get_request(
        &self,
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
    ) -> Result<NetResponse, NetError> {
        let mut request = self.client.get(url.as_ref());

        if let Some(headers) = headers {
            for (key, value) in headers {
                request = request.header(key.as_ref(), value.as_ref());
            }
        }

        self.dispatch(url, request).await
    }

    /// Handles POST requests with optional headers and body
    async fn handle_post_request(
        &self,
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        body: Option<ArcStr>,
    ) -> Result<NetResponse, NetError> {
        let mut request = self.client.post(url.as_ref());

        if let Some(headers) = headers {
            for (key, value) in headers {
                request = request.header(key.as_ref(), value.as_ref());
            }
        }

        if let Some(body) = body {
            request = request.body(body.as_ref().to_string());
        }

        self.dispatch(url, request).await
    }

    /// Handles PATCH requests with optional headers and body
    async fn handle_patch_request(
        &self,
        url: ArcStr,
        headers: Option<HashMap<ArcStr, ArcStr>>,
        body: Option<ArcStr>,
    ) -> Result<NetResponse, NetError> {
        let mut request = self.client.patch(url.as_ref());

        if let Some(headers) = headers {
            for (key, value) in headers {
                request = request.header(key.as_ref(), value.as_ref());
            }
        }

        if let Some(body) = body {
            request = request.body(body.as_ref().to_string());
        }

        self.dispatch(url, request).await
    }

    /// Sends a prepared request and collects status plus body.
    async fn dispatch(
        &self,
        url: ArcStr,
        request: reqwest::RequestBuilder,
    ) -> Result<NetResponse, NetError> {
        let response = request.send().await.map_err(|e| {
            self.log
                .warn(SCOPE, format!("request to {} failed: {}", url, e));
            NetError::Unavailable(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| NetError::Unavailable(e.to_string()))?;

        Ok(NetResponse {
            status,
            body: ArcStr::from(body.as_str()),
        })
    }
}
