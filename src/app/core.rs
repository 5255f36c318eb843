use std::ffi::OsStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::api::forum::{Author, AuthUser, Credentials, ForumApi, NewUser, Post};
use crate::app::cache::{
    CacheSync, MutationExecutor, Poller, QueryKey, Resource, Store,
};
use crate::app::config::{Config, PathOpt, StrOpt, USizeOpt};
use crate::app::session::Session;
use crate::env::Env;
use crate::fs::Fs;
use crate::log::Log;
use crate::net::Net;
use crate::{ArcOsStr, ArcPath, ArcStr};

use super::data::{AppState, Command};

const SCOPE: &str = "app";
const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Core implementation of the App actor
#[derive(Debug)]
pub struct Core {
    /// Application state
    state: AppState,
    /// Environment actor
    env: Env,
    /// Filesystem actor
    fs: Fs,
    /// Configuration actor
    config: Config,
    /// Logging actor
    log: Log,
    /// Network actor
    net: Net,
    /// Forum API actor
    api: ForumApi,
    /// Session actor holding the acting identity
    session: Session,
    /// Cache facade pairing the store with the poller
    cache: CacheSync,
    /// Optimistic mutation executor
    executor: MutationExecutor,
}

impl Core {
    /// Build a new App actor core with full initialization
    pub async fn build() -> Result<Self> {
        // Initialize basic actors
        let env = Env::spawn();
        let fs = Fs::spawn();

        // Set up configuration under $HOME/.config/forum-hub
        let home = env.env(ArcOsStr::from(OsStr::new("HOME"))).await?;
        let config_dir = std::path::Path::new(home.as_ref())
            .join(".config")
            .join("forum-hub");
        fs.mkdir(ArcPath::from(&config_dir))
            .await
            .context("Creating the configuration directory")?;

        let config_path = ArcPath::from(&config_dir.join("config.toml"));
        let config = Config::spawn(fs.clone(), config_path);

        if config.load().await.is_err() {
            // First run: keep the session next to the config and persist the
            // defaults so they are editable.
            config
                .set_path(
                    PathOpt::SessionPath,
                    ArcPath::from(&config_dir.join("session.toml")),
                )
                .await;
            config.save().await?;
        }

        // Initialize logging
        let log = Log::spawn(
            fs.clone(),
            config.log_level().await,
            config.usize(USizeOpt::MaxAge).await,
            config.path(PathOpt::LogDir).await,
        )
        .await?;
        log.collect_garbage().await;

        // Initialize network, API and session actors
        let net = Net::spawn(config.clone(), log.clone()).await;
        let api = ForumApi::spawn(net.clone(), config.string(StrOpt::BaseUrl).await, log.clone());

        let session_path = config.path(PathOpt::SessionPath).await;
        if let Some(parent) = session_path.parent() {
            fs.mkdir(ArcPath::from(parent))
                .await
                .context("Creating the session directory")?;
        }
        let session = Session::spawn(fs.clone(), session_path);
        if let Err(e) = session.load().await {
            log.warn(SCOPE, format!("Failed to load the session: {}", e));
        }

        // Initialize the synchronization layer
        let store = Store::spawn(log.clone());
        let poller = Poller::spawn(
            store.clone(),
            api.clone(),
            log.clone(),
            Duration::from_secs(config.usize(USizeOpt::PollInterval).await as u64),
        );
        let cache = CacheSync::new(store.clone(), poller);
        let executor = MutationExecutor::new(store, api.clone(), log.clone());

        log.info(SCOPE, "App actor initialized successfully");

        Ok(Self {
            state: AppState {
                initialized: true,
                current_command: None,
            },
            env,
            fs,
            config,
            log,
            net,
            api,
            session,
            cache,
            executor,
        })
    }

    /// Handle graceful shutdown: nothing is persisted (the cache lives only
    /// in memory), but buffered log messages are flushed to stderr.
    pub async fn handle_shutdown(&self) -> Result<()> {
        self.log.info(SCOPE, "Shutting down");
        let _ = self.log.clone().flush().await;
        Ok(())
    }

    /// The acting identity for mutations, taken from the session.
    async fn identity(&self) -> Result<(AuthUser, Option<ArcStr>)> {
        let user = self
            .session
            .user()
            .await
            .context("not logged in, run `forum-hub login` first")?;
        let token = self.session.token().await;
        Ok((user, token))
    }

    /// Handle the feed command: show the posts feed, newest first.
    pub async fn handle_feed_command(&self, count: usize) -> Result<()> {
        let mut subscription = self.cache.subscribe(QueryKey::PostFeed).await;
        let result = subscription.first_data(LOAD_TIMEOUT).await;
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                self.cache.unsubscribe(subscription).await;
                return Err(e);
            }
        };

        let posts = data.as_posts().unwrap_or(&[]).to_vec();
        self.cache.unsubscribe(subscription).await;

        if posts.is_empty() {
            println!("No posts found");
            return Ok(());
        }

        println!("Forum feed ({} posts):", posts.len());
        println!();
        for (i, post) in posts.iter().take(count).enumerate() {
            print_post_summary(i + 1, post);
        }

        Ok(())
    }

    /// Handle the show command: one post with its comment thread.
    pub async fn handle_show_command(&self, id: i64) -> Result<()> {
        let mut post_sub = self.cache.subscribe(QueryKey::Post(id)).await;
        let mut comments_sub = self.cache.subscribe(QueryKey::Comments(id)).await;

        let post = post_sub.first_data(LOAD_TIMEOUT).await;
        let comments = comments_sub.first_data(LOAD_TIMEOUT).await;
        self.cache.unsubscribe(post_sub).await;
        self.cache.unsubscribe(comments_sub).await;

        let post_data = post?;
        let post = post_data.as_post().context("post entry held no post")?;

        println!("{}", post.title);
        println!("{}", "=".repeat(post.title.len().max(8)));
        println!("{}", post.content);
        println!();
        println!(
            "by {}, {} likes, {} views",
            post.author.display_name, post.likes, post.views
        );
        if let Some(created_at) = post.created_at {
            println!("posted {}", created_at.format("%Y-%m-%d %H:%M UTC"));
        }

        let comments_data = comments?;
        let comments = comments_data.as_comments().unwrap_or(&[]);
        println!();
        println!("Comments ({}):", comments.len());
        for comment in comments {
            let when = comment
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {} [{}]: {}",
                comment.author.display_name, when, comment.content
            );
        }

        Ok(())
    }

    /// Handle the like command.
    pub async fn handle_like_command(&self, id: i64) -> Result<()> {
        let (user, token) = self.identity().await?;

        let mut subscription = self.cache.subscribe(QueryKey::Post(id)).await;
        let loaded = subscription.first_data(LOAD_TIMEOUT).await;
        if let Err(e) = loaded {
            self.cache.unsubscribe(subscription).await;
            return Err(e);
        }

        let result = self.executor.like(id, user.id, token).await;
        self.cache.unsubscribe(subscription).await;

        let post = result?;
        println!("Liked '{}', now {} likes", post.title, post.likes);
        Ok(())
    }

    /// Handle the unlike command.
    pub async fn handle_unlike_command(&self, id: i64) -> Result<()> {
        let (user, token) = self.identity().await?;

        let mut subscription = self.cache.subscribe(QueryKey::Post(id)).await;
        let loaded = subscription.first_data(LOAD_TIMEOUT).await;
        if let Err(e) = loaded {
            self.cache.unsubscribe(subscription).await;
            return Err(e);
        }

        let result = self.executor.unlike(id, user.id, token).await;
        self.cache.unsubscribe(subscription).await;

        let post = result?;
        println!("Unliked '{}', now {} likes", post.title, post.likes);
        Ok(())
    }

    /// Handle the comment command.
    ///
    /// The typed text is captured before the optimistic write; when the
    /// write fails it is echoed back so nothing the user typed is lost.
    pub async fn handle_comment_command(&self, id: i64, text: String) -> Result<()> {
        let (user, token) = self.identity().await?;

        let mut subscription = self.cache.subscribe(QueryKey::Comments(id)).await;
        let loaded = subscription.first_data(LOAD_TIMEOUT).await;
        if let Err(e) = loaded {
            self.cache.unsubscribe(subscription).await;
            return Err(e);
        }

        let result = self
            .executor
            .create_comment(id, &text, Author::from(&user), token)
            .await;
        self.cache.unsubscribe(subscription).await;

        match result {
            Ok(comment) => {
                println!("Comment posted (id {})", comment.id);
                Ok(())
            }
            Err(err) => {
                println!("Your comment was not posted. The text is preserved:");
                println!("  {}", text);
                Err(err.into())
            }
        }
    }

    /// Handle the new-post command.
    pub async fn handle_new_post_command(&self, title: String, content: String) -> Result<()> {
        let (user, token) = self.identity().await?;

        let mut subscription = self.cache.subscribe(QueryKey::PostFeed).await;
        let loaded = subscription.first_data(LOAD_TIMEOUT).await;
        if let Err(e) = loaded {
            self.cache.unsubscribe(subscription).await;
            return Err(e);
        }

        let result = self
            .executor
            .create_post(&title, &content, Author::from(&user), token)
            .await;
        self.cache.unsubscribe(subscription).await;

        match result {
            Ok(post) => {
                println!("Published '{}' (id {})", post.title, post.id);
                Ok(())
            }
            Err(err) => {
                println!("Your post was not published. Title and content are preserved:");
                println!("  {}", title);
                println!("  {}", content);
                Err(err.into())
            }
        }
    }

    /// Handle the likes command: who liked a post.
    pub async fn handle_likes_command(&self, id: i64) -> Result<()> {
        let likes = self.api.get_likes(id).await?;
        if likes.is_empty() {
            println!("Nobody has liked post {} yet", id);
            return Ok(());
        }

        println!("Post {} was liked by {} user(s):", id, likes.len());
        for like in likes {
            println!("  user {}", like.user_id);
        }
        Ok(())
    }

    /// Handle the watch command: stream live updates of a post and its
    /// comment thread until the duration elapses or Ctrl-C.
    pub async fn handle_watch_command(&self, id: i64, seconds: Option<u64>) -> Result<()> {
        let duration = Duration::from_secs(seconds.unwrap_or(30));
        let mut post_sub = self.cache.subscribe(QueryKey::Post(id)).await;
        let mut comments_sub = self.cache.subscribe(QueryKey::Comments(id)).await;

        println!(
            "Watching post {} for {}s (Ctrl-C to stop early)...",
            id,
            duration.as_secs()
        );

        let deadline = tokio::time::Instant::now() + duration;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = tokio::signal::ctrl_c() => break,
                changed = post_sub.updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = post_sub.updates.borrow().clone();
                    if let Some(post) = snapshot.data.as_ref().and_then(Resource::as_post) {
                        println!(
                            "[{}] '{}': {} likes",
                            Utc::now().format("%H:%M:%S"),
                            post.title,
                            post.likes
                        );
                    }
                }
                changed = comments_sub.updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = comments_sub.updates.borrow().clone();
                    if let Some(comments) = snapshot.data.as_ref().and_then(Resource::as_comments) {
                        println!(
                            "[{}] {} comment(s)",
                            Utc::now().format("%H:%M:%S"),
                            comments.len()
                        );
                    }
                }
            }
        }

        self.cache.unsubscribe(post_sub).await;
        self.cache.unsubscribe(comments_sub).await;
        Ok(())
    }

    /// Handle the login command.
    pub async fn handle_login_command(&self, email: String, password: String) -> Result<()> {
        let auth = self.api.login(Credentials { email, password }).await?;
        self.session
            .set(ArcStr::from(auth.access_token.as_str()), auth.user.clone())
            .await;
        self.session.save().await?;
        println!("Logged in as {}", auth.user.username);
        Ok(())
    }

    /// Handle the register command.
    pub async fn handle_register_command(
        &self,
        email: String,
        username: String,
        password: String,
    ) -> Result<()> {
        let auth = self
            .api
            .register(NewUser::new(&email, &username, &password))
            .await?;
        self.session
            .set(ArcStr::from(auth.access_token.as_str()), auth.user.clone())
            .await;
        self.session.save().await?;
        println!("Registered and logged in as {}", auth.user.username);
        Ok(())
    }

    /// Handle the logout command.
    pub async fn handle_logout_command(&self) -> Result<()> {
        self.session.clear().await;
        self.session.save().await?;
        println!("Logged out");
        Ok(())
    }
}

/// One feed block per post.
fn print_post_summary(index: usize, post: &Post) {
    println!("{}. {} (id {})", index, post.title, post.id);
    let excerpt: String = post.content.chars().take(120).collect();
    println!("   {}", excerpt);
    let when = post
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown date".to_string());
    println!(
        "   by {}, {} likes, {} comments, {}",
        post.author.display_name, post.likes, post.comment_count, when
    );
    println!();
}
