use chrono::Utc;
use tokio::task::JoinHandle;

use crate::log::Log;

use super::{Store, data::StoreData, message::Message};

const BUFFER_SIZE: usize = 100;
const SCOPE: &str = "app.cache.store";

/// Core implementation of the Store actor.
///
/// Owns the entry map exclusively; every transition arrives as a message
/// and completes before the next one is read, which is what upholds the
/// at-most-one-pending-mutation invariant.
pub struct Core {
    /// Log actor for transition logging
    log: Log,
    /// The entry map and subscriber counter
    data: StoreData,
}

impl Core {
    /// Creates a new Store core.
    pub fn new(log: Log) -> Self {
        Self {
            log,
            data: StoreData::new(),
        }
    }

    /// Spawns the actor and returns the public interface and join handle.
    pub fn spawn(self) -> (Store, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            let mut core = self;

            while let Some(message) = rx.recv().await {
                match message {
                    Message::Subscribe { key, tx } => {
                        let result = core.data.subscribe(key);
                        let _ = tx.send(result);
                    }
                    Message::Unsubscribe { key, id, tx } => {
                        let result = core.data.unsubscribe(key, id);
                        if result.1 {
                            core.log.info(SCOPE, format!("evicted {}", key));
                        }
                        let _ = tx.send(result);
                    }
                    Message::GetSnapshot { key, tx } => {
                        let _ = tx.send(core.data.get_snapshot(key));
                    }
                    Message::BeginFetch { key, tx } => {
                        let _ = tx.send(core.data.begin_fetch(key));
                    }
                    Message::ApplyRemoteResult {
                        key,
                        data,
                        observed_at,
                        tx,
                    } => {
                        let applied = core.data.apply_remote_result(key, data, observed_at);
                        if !applied {
                            core.log
                                .info(SCOPE, format!("discarded stale result for {}", key));
                        }
                        let _ = tx.send(applied);
                    }
                    Message::ApplyOptimistic { key, op, tx } => {
                        let result = core.data.apply_optimistic(key, &op, Utc::now());
                        let _ = tx.send(result);
                    }
                    Message::Rollback { key, tx } => {
                        let rolled_back = core.data.rollback(key);
                        if rolled_back {
                            core.log.info(SCOPE, format!("rolled back {}", key));
                        }
                        let _ = tx.send(rolled_back);
                    }
                    Message::SettlePending { key, tx } => {
                        core.data.settle_pending(key);
                        let _ = tx.send(());
                    }
                    Message::FetchFailed { key, tx } => {
                        core.data.fetch_failed(key);
                        let _ = tx.send(());
                    }
                }
            }
        });

        (Store::Actual(tx), handle)
    }
}
