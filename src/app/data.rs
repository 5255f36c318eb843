/// Commands that can be executed by the App actor
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the posts feed, newest first
    Feed { count: usize },
    /// Show a post with its comment thread
    Show { id: i64 },
    /// Like a post as the logged-in user
    Like { id: i64 },
    /// Remove the logged-in user's like from a post
    Unlike { id: i64 },
    /// Comment on a post as the logged-in user
    Comment { id: i64, text: String },
    /// Publish a new post as the logged-in user
    NewPost { title: String, content: String },
    /// List who liked a post
    Likes { id: i64 },
    /// Watch a post and its comment thread for live updates
    Watch { id: i64, seconds: Option<u64> },
    /// Log in and store the session
    Login { email: String, password: String },
    /// Create an account, log in and store the session
    Register {
        email: String,
        username: String,
        password: String,
    },
    /// Forget the stored session
    Logout,
}

/// Application state managed by the App actor
#[derive(Debug, Default)]
pub struct AppState {
    /// Whether the application has been initialized
    pub initialized: bool,
    /// Current command being executed (if any)
    pub current_command: Option<Command>,
}

/// Mock data for testing the App actor
#[derive(Debug, Default)]
pub struct MockData {
    /// Simulated application state
    pub state: AppState,
    /// Commands that have been executed
    pub executed_commands: Vec<Command>,
    /// Whether shutdown has been called
    pub shutdown_called: bool,
}
