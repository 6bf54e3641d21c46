use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use gator::config::Config;
use gator::feed::Fetcher;
use gator::scheduler::{parse_interval, Scheduler};
use gator::shutdown::{self, ShutdownTrigger};
use gator::storage::{Database, DatabaseError, User};
use gator::util::validate_feed_url;

/// Get the config directory path (~/.config/gator/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gator"))
}

#[derive(Parser, Debug)]
#[command(name = "gator", about = "RSS feed aggregator", version)]
struct Args {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Act as this user instead of `current_user` from the config file
    #[arg(long, short, value_name = "NAME", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new user
    Register { name: String },
    /// List registered users
    Users,
    /// Delete every user, feed, follow and post
    Reset,
    /// Register a feed and follow it
    Addfeed { name: String, url: String },
    /// List all registered feeds
    Feeds,
    /// Follow a registered feed
    Follow { url: String },
    /// List the feeds you follow
    Following,
    /// Stop following a feed
    Unfollow { url: String },
    /// Show the newest posts from followed feeds
    Browse {
        #[arg(long, short, default_value_t = 2)]
        limit: u32,
    },
    /// Poll feeds continuously, e.g. `gator agg 1m30s`
    Agg {
        /// Time between polls (default: `poll_interval` from the config file)
        interval: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Validate before touching the database so a typo fails fast
    let agg_interval = match &args.command {
        Command::Agg { interval } => {
            let raw = interval.as_deref().unwrap_or(&config.poll_interval);
            Some(parse_interval(raw)?)
        }
        _ => None,
    };

    let db_path = config.database_path_in(&config_dir);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory {}", parent.display())
            })?;
        }
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .context("Failed to open database")?;

    let current_user = args.user.clone().or_else(|| config.current_user.clone());

    match args.command {
        Command::Register { name } => match db.create_user(&name).await {
            Ok(user) => {
                println!("Registered user {}", user.name);
                println!("Act as them with --user {0} or current_user = \"{0}\" in config", user.name);
            }
            Err(DatabaseError::AlreadyExists(_)) => bail!("User {} already exists", name.trim()),
            Err(e) => return Err(e.into()),
        },
        Command::Users => {
            for user in db.list_users().await? {
                if current_user.as_deref() == Some(user.name.as_str()) {
                    println!("* {} (current)", user.name);
                } else {
                    println!("* {}", user.name);
                }
            }
        }
        Command::Reset => {
            let removed = db.reset().await.context("Failed to reset database")?;
            println!("Database reset ({} users removed)", removed);
        }
        Command::Addfeed { name, url } => {
            let user = require_user(&db, current_user.as_deref()).await?;
            let url = validate_feed_url(&url)?;
            match db.create_feed(&name, url.as_str(), user.id).await {
                Ok(feed) => {
                    println!("Added feed {} ({})", feed.name, feed.url);
                    println!("{} now follows it", user.name);
                }
                Err(DatabaseError::AlreadyExists(_)) => {
                    bail!("Feed {} is already registered; use `gator follow` instead", url)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Feeds => {
            for feed in db.list_feeds().await? {
                println!("* {} ({}) added by {}", feed.name, feed.url, feed.owner);
            }
        }
        Command::Follow { url } => {
            let user = require_user(&db, current_user.as_deref()).await?;
            let url = validate_feed_url(&url)?;
            let feed = db
                .get_feed_by_url(url.as_str())
                .await?
                .with_context(|| format!("No feed registered with URL {}", url))?;
            match db.follow_feed(user.id, feed.id).await {
                Ok(()) => println!("{} now follows {}", user.name, feed.name),
                Err(DatabaseError::AlreadyExists(_)) => {
                    println!("{} already follows {}", user.name, feed.name)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Following => {
            let user = require_user(&db, current_user.as_deref()).await?;
            for feed in db.feeds_followed_by(user.id).await? {
                println!("* {}", feed.name);
            }
        }
        Command::Unfollow { url } => {
            let user = require_user(&db, current_user.as_deref()).await?;
            let url = validate_feed_url(&url)?;
            let feed = db
                .get_feed_by_url(url.as_str())
                .await?
                .with_context(|| format!("No feed registered with URL {}", url))?;
            if db.unfollow_feed(user.id, feed.id).await? {
                println!("{} unfollowed {}", user.name, feed.name);
            } else {
                println!("{} was not following {}", user.name, feed.name);
            }
        }
        Command::Browse { limit } => {
            let user = require_user(&db, current_user.as_deref()).await?;
            let posts = db.posts_for_user(user.id, limit).await?;
            if posts.is_empty() {
                println!("No posts yet. Run `gator agg` to collect some.");
            }
            for post in posts {
                let published = post
                    .published_at
                    .map(|at| at.format("%a %b %e %Y").to_string())
                    .unwrap_or_else(|| "undated".to_string());
                println!("{} | {}", published, post.title);
                println!("    {}", post.url);
                if let Some(description) = &post.description {
                    println!("    {}", description);
                }
                println!();
            }
        }
        Command::Agg { .. } => {
            let interval =
                agg_interval.ok_or_else(|| anyhow::anyhow!("Poll interval was not resolved"))?;
            let fetcher = Fetcher::new().context("Failed to build HTTP client")?;
            let (trigger, shutdown) = shutdown::channel();
            spawn_signal_handler(trigger)?;

            println!("Collecting feeds every {:?}", interval);
            let scheduler = Scheduler::new(db, fetcher, interval)?;
            let cycles = scheduler.run(shutdown).await;
            println!("Stopped after {} poll cycles", cycles);
        }
    }

    Ok(())
}

/// Resolve the acting user, which must already be registered.
async fn require_user(db: &Database, name: Option<&str>) -> Result<User> {
    let Some(name) = name else {
        bail!("No current user: pass --user <NAME> or set current_user in the config file");
    };
    db.get_user_by_name(name)
        .await?
        .with_context(|| format!("User {} is not registered; run `gator register {}`", name, name))
}

/// Fire `trigger` on SIGINT or SIGTERM.
fn spawn_signal_handler(trigger: ShutdownTrigger) -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down"),
            }
            trigger.trigger();
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, shutting down");
            trigger.trigger();
        }
    });

    Ok(())
}
