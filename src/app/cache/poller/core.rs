use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::api::forum::ForumApi;
use crate::app::cache::store::{FetchGate, Store};
use crate::app::cache::{QueryKey, fetch_resource};
use crate::log::Log;

use super::{Poller, message::Message};

const SCOPE: &str = "app.cache.poller";

/// Core implementation of the Poller actor.
///
/// Keeps one timer task per polled key. Each task passes every tick through
/// the store's fetch gate, so a pending mutation pauses the key and an
/// evicted entry terminates its task even if a stop message never arrives.
pub struct Core {
    /// The cache store fed with poll results
    store: Store,
    /// Forum API used for background reads
    api: ForumApi,
    /// Log actor
    log: Log,
    /// Interval between background refreshes
    period: Duration,
    /// Running timer tasks keyed by query key
    tasks: HashMap<QueryKey, JoinHandle<()>>,
}

impl Core {
    /// Creates a new Poller core.
    ///
    /// # Arguments
    /// * `store` - The cache store fed with poll results
    /// * `api` - The Forum API used for background reads
    /// * `log` - The logging actor
    /// * `period` - Interval between background refreshes
    pub fn new(store: Store, api: ForumApi, log: Log, period: Duration) -> Self {
        Self {
            store,
            api,
            log,
            period,
            tasks: HashMap::new(),
        }
    }

    /// Spawns the actor and returns the public interface and join handle.
    pub fn spawn(self) -> (Poller, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            let mut core = self;

            while let Some(message) = rx.recv().await {
                match message {
                    Message::Start { key, tx } => {
                        core.handle_start(key);
                        let _ = tx.send(());
                    }
                    Message::Stop { key, tx } => {
                        core.handle_stop(key);
                        let _ = tx.send(());
                    }
                }
            }

            // The poller is gone; no timer may outlive it
            for (_, task) in core.tasks.drain() {
                task.abort();
            }
        });

        (Poller::Actual(tx), handle)
    }

    /// Starts the timer task for a key unless one is already running.
    fn handle_start(&mut self, key: QueryKey) {
        if let Some(task) = self.tasks.get(&key) {
            if !task.is_finished() {
                return;
            }
        }

        let store = self.store.clone();
        let api = self.api.clone();
        let log = self.log.clone();
        let period = self.period;
        let task = tokio::spawn(poll_loop(store, api, log, key, period));
        self.tasks.insert(key, task);
    }

    /// Cancels the timer task for a key.
    fn handle_stop(&mut self, key: QueryKey) {
        if let Some(task) = self.tasks.remove(&key) {
            task.abort();
            self.log.info(SCOPE, format!("stopped polling {}", key));
        }
    }
}

/// The per-key timer loop. The first tick fires immediately, covering the
/// initial fetch of a freshly subscribed entry.
async fn poll_loop(store: Store, api: ForumApi, log: Log, key: QueryKey, period: Duration) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        match store.begin_fetch(key).await {
            FetchGate::Allow => {}
            FetchGate::Suspended => continue,
            FetchGate::Evicted => break,
        }

        let observed_at = Utc::now();
        match fetch_resource(&api, key).await {
            Ok(resource) => {
                store.apply_remote_result(key, resource, observed_at).await;
            }
            Err(err) => {
                log.warn(SCOPE, format!("background refresh of {} failed: {}", key, err));
                store.fetch_failed(key).await;
            }
        }
    }
}
