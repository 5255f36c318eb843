use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc::Sender, oneshot};

use crate::api::forum::ForumApi;
use crate::log::Log;

mod core;
pub mod message;

use message::Message;

use super::QueryKey;
use super::store::Store;

/// The Poller actor: background refresh for every subscribed key.
///
/// For each started key it runs a timer task that fetches the resource at a
/// fixed interval and feeds the result into the store. The store's fetch
/// gate enforces the suspension rule (a key with a pending mutation is
/// skipped) and terminates the task once the entry is evicted, so polling
/// never leaks past an entry's lifetime.
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is
/// cheap as it only copies the channel sender.
#[derive(Debug, Clone)]
pub enum Poller {
    /// A real poller actor managing timer tasks
    Actual(Sender<Message>),
    /// A no-op implementation for tests that drive the store directly
    Mock,
}

impl Poller {
    /// Creates a new poller and spawns its actor.
    ///
    /// # Arguments
    /// * `store` - The cache store fed with poll results
    /// * `api` - The Forum API used for background reads
    /// * `log` - The logging actor
    /// * `period` - Interval between background refreshes
    pub fn spawn(store: Store, api: ForumApi, log: Log, period: Duration) -> Self {
        let (poller, _) = core::Core::new(store, api, log, period).spawn();
        poller
    }

    /// Creates a no-op mock poller for testing.
    pub fn mock() -> Self {
        Self::Mock
    }

    /// Starts background polling for a key. Idempotent: a key that is
    /// already polled keeps its existing timer.
    pub async fn start(&self, key: QueryKey) {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::Start { key, tx })
                    .await
                    .context("Sending message to Poller actor")
                    .expect("Poller actor died");
                rx.await
                    .context("Awaiting response from Poller actor")
                    .expect("Poller actor died")
            }
            Self::Mock => {}
        }
    }

    /// Cancels background polling for a key.
    pub async fn stop(&self, key: QueryKey) {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = oneshot::channel();
                sender
                    .send(Message::Stop { key, tx })
                    .await
                    .context("Sending message to Poller actor")
                    .expect("Poller actor died");
                rx.await
                    .context("Awaiting response from Poller actor")
                    .expect("Poller actor died")
            }
            Self::Mock => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::forum::{MockForum, Post, ResourceId};
    use crate::app::cache::store::{Freshness, MutationOp};

    const PERIOD: Duration = Duration::from_millis(20);

    fn seeded_api() -> ForumApi {
        ForumApi::mock(MockForum::with_posts(vec![Post {
            id: ResourceId::Num(7),
            title: "seeded".to_string(),
            likes: 3,
            ..Default::default()
        }]))
    }

    #[tokio::test]
    async fn first_tick_fetches_an_empty_entry() {
        let store = Store::mock();
        let api = seeded_api();
        let poller = Poller::spawn(store.clone(), api, Log::Mock, PERIOD);

        let key = QueryKey::Post(7);
        let (_, mut rx, _) = store.subscribe(key).await;
        poller.start(key).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                rx.changed().await.unwrap();
                let snapshot = rx.borrow().clone();
                if snapshot.freshness == Freshness::Fresh && snapshot.data.is_some() {
                    break;
                }
            }
        })
        .await
        .expect("entry never became fresh");

        let snapshot = store.get_snapshot(key).await.unwrap();
        assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 3);
    }

    #[tokio::test]
    async fn polling_is_suspended_while_a_mutation_is_pending() {
        let store = Store::mock();
        let api = seeded_api();
        let poller = Poller::spawn(store.clone(), api, Log::Mock, PERIOD);

        let key = QueryKey::Post(7);
        store.subscribe(key).await;
        poller.start(key).await;

        // Wait for the initial fetch, then apply an optimistic like that the
        // mock API knows nothing about.
        tokio::time::sleep(PERIOD * 3).await;
        store
            .apply_optimistic(key, MutationOp::Like { user_id: 1 })
            .await
            .unwrap();

        // Several periods later the optimistic value still stands: ticks are
        // suspended, so the server's stale likes=3 never lands.
        tokio::time::sleep(PERIOD * 5).await;
        let snapshot = store.get_snapshot(key).await.unwrap();
        assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 4);
        assert!(snapshot.pending.is_some());
    }

    #[tokio::test]
    async fn stop_cancels_the_timer() {
        let store = Store::mock();
        let api = seeded_api();
        let poller = Poller::spawn(store.clone(), api.clone(), Log::Mock, PERIOD);

        let key = QueryKey::Post(7);
        store.subscribe(key).await;
        poller.start(key).await;
        tokio::time::sleep(PERIOD * 3).await;
        poller.stop(key).await;

        // Change the remote value after stopping; it must never arrive.
        if let ForumApi::Mock(mock) = &api {
            let mut mock = mock.lock().await;
            mock.patch_post_likes(7, 9, vec![2, 3, 4]).unwrap();
        }

        tokio::time::sleep(PERIOD * 5).await;
        let snapshot = store.get_snapshot(key).await.unwrap();
        assert_eq!(snapshot.data.unwrap().as_post().unwrap().likes, 3);
    }

    #[tokio::test]
    async fn failed_fetches_mark_the_entry_stale() {
        let store = Store::mock();
        let api = ForumApi::mock(MockForum {
            offline: true,
            ..Default::default()
        });
        let poller = Poller::spawn(store.clone(), api, Log::Mock, PERIOD);

        let key = QueryKey::Post(7);
        let (_, mut rx, _) = store.subscribe(key).await;
        poller.start(key).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().freshness == Freshness::Stale {
                    break;
                }
            }
        })
        .await
        .expect("entry never went stale");
    }
}
