use tokio::sync::oneshot;

use crate::app::cache::QueryKey;

/// Messages for the Poller actor.
#[derive(Debug)]
pub enum Message {
    /// Start the poll timer for a key; a no-op when one is already running
    Start {
        key: QueryKey,
        tx: oneshot::Sender<()>,
    },
    /// Cancel the poll timer for a key
    Stop {
        key: QueryKey,
        tx: oneshot::Sender<()>,
    },
}
