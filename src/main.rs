use clap::{Parser, Subcommand};

use fh::app::{App, Command};

#[derive(Parser)]
#[command(name = "forum-hub")]
#[command(about = "A CLI client for a community forum with live-updating cached views")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the posts feed, newest first
    Feed {
        /// Number of posts to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Show a post with its comment thread
    Show {
        /// The post id
        #[arg(required = true)]
        id: i64,
    },
    /// Like a post (requires login)
    Like {
        /// The post id
        #[arg(required = true)]
        id: i64,
    },
    /// Remove your like from a post (requires login)
    Unlike {
        /// The post id
        #[arg(required = true)]
        id: i64,
    },
    /// Comment on a post (requires login)
    Comment {
        /// The post id
        #[arg(required = true)]
        id: i64,
        /// The comment text
        #[arg(required = true)]
        text: String,
    },
    /// Publish a new post (requires login)
    NewPost {
        /// The post title
        #[arg(required = true)]
        title: String,
        /// The post content
        #[arg(required = true)]
        content: String,
    },
    /// List who liked a post
    Likes {
        /// The post id
        #[arg(required = true)]
        id: i64,
    },
    /// Watch a post and its comments for live updates
    Watch {
        /// The post id
        #[arg(required = true)]
        id: i64,
        /// How long to watch, in seconds (default 30)
        #[arg(short, long)]
        seconds: Option<u64>,
    },
    /// Log in with an existing account
    Login {
        /// The account email
        #[arg(required = true)]
        email: String,
        /// The account password
        #[arg(required = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        /// The account email
        #[arg(required = true)]
        email: String,
        /// The account username
        #[arg(required = true)]
        username: String,
        /// The account password
        #[arg(required = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Feed { count } => Command::Feed { count },
            Commands::Show { id } => Command::Show { id },
            Commands::Like { id } => Command::Like { id },
            Commands::Unlike { id } => Command::Unlike { id },
            Commands::Comment { id, text } => Command::Comment { id, text },
            Commands::NewPost { title, content } => Command::NewPost { title, content },
            Commands::Likes { id } => Command::Likes { id },
            Commands::Watch { id, seconds } => Command::Watch { id, seconds },
            Commands::Login { email, password } => Command::Login { email, password },
            Commands::Register {
                email,
                username,
                password,
            } => Command::Register {
                email,
                username,
                password,
            },
            Commands::Logout => Command::Logout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app = App::build().await?;
    app.resolve(cli.command.into()).await
}
