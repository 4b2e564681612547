use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

use offnews::api::{build_http_client, NewsClient, CATEGORIES};
use offnews::config::Config;
use offnews::connectivity::NetworkMonitor;
use offnews::domain::{
    Article, ArticleError, DateFormatter, NewsTab, NewsUseCases, NO_NEWS_ARTICLES,
};
use offnews::presentation::{HomeViewModel, MainViewModel, ScreenState};
use offnews::repository::NewsRepository;
use offnews::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/offnews/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("offnews"))
}

#[derive(Parser, Debug)]
#[command(name = "offnews", about = "Offline-first news reader backed by NewsAPI")]
struct Args {
    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch top headlines into the cache
    Headlines {
        #[arg(value_parser = PossibleValuesParser::new(CATEGORIES.iter().copied()))]
        category: Option<String>,
    },
    /// Search all articles and replace the cache with the results
    Search { query: String },
    /// List cached articles
    List,
    /// List bookmarked articles
    Bookmarks,
    /// Show one article (falls back to the first one if the id is gone)
    Show {
        id: i64,
        /// Look the id up among bookmarks instead of the cache
        #[arg(long)]
        bookmarks: bool,
    },
    /// Bookmark a cached article
    Bookmark { id: i64 },
    /// Remove a bookmark
    Unbookmark { id: i64 },
    /// Keep the cache fresh, refetching whenever the network comes back
    Watch,
}

type UseCases = NewsUseCases<NewsClient>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config = Config::load(&config_dir.join("config.toml")).context("Failed to load config")?;
    let db_path = config_dir.join("offnews.db");

    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of offnews appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let http = build_http_client().context("Failed to create HTTP client")?;
    let client = NewsClient::from_config(http, &config).context("Invalid News API settings")?;
    let repository = NewsRepository::new(client, db);
    let use_cases = NewsUseCases::new(repository, DateFormatter::new(config.date_format.clone()));

    match args.command {
        Command::Headlines { category } => {
            let category = category.unwrap_or_else(|| config.default_category.clone());
            let main_vm = MainViewModel::new(use_cases.clone(), config.default_category.clone());
            let count = main_vm
                .fetch_top_headlines(&category)
                .await
                .with_context(|| format!("Failed to fetch '{category}' headlines"))?;
            println!("Cached {count} {category} headlines.");
            print_list(&use_cases).await?;
        }
        Command::Search { query } => {
            let articles = use_cases
                .search_news(&query)
                .await
                .with_context(|| format!("Search for '{query}' failed"))?;
            println!("{} results for '{query}':", articles.len());
            for article in &articles {
                print_row(article);
            }
        }
        Command::List => print_list(&use_cases).await?,
        Command::Bookmarks => {
            let mut bookmarks = Box::pin(use_cases.bookmarked_articles());
            match bookmarks.next().await {
                Some(Ok(articles)) => articles.iter().for_each(print_row),
                Some(Err(ArticleError::Empty(message))) => println!("{message}"),
                Some(Err(e)) => return Err(e).context("Failed to read bookmarks"),
                None => {}
            }
        }
        Command::Show { id, bookmarks } => {
            let tab = if bookmarks {
                NewsTab::Bookmarks
            } else {
                NewsTab::Home
            };
            match use_cases.get_article(id, tab).await {
                Ok(Some(article)) => print_details(&article, id),
                Ok(None) => println!("{NO_NEWS_ARTICLES}"),
                Err(ArticleError::Empty(message)) => println!("{message}"),
                Err(e) => return Err(e).context("Failed to read article"),
            }
        }
        Command::Bookmark { id } => {
            let found = use_cases
                .repository()
                .get_cached_article(id)
                .await
                .context("Failed to read article cache")?;
            let row = match found {
                Some(hit) if hit.is_exact() => hit.into_inner(),
                _ => anyhow::bail!("No cached article with id {id}"),
            };
            let article = Article::from_cached(row, use_cases.dates());
            if article.is_bookmarked {
                println!("Already bookmarked: {}", article.title);
            } else {
                use_cases
                    .toggle_bookmark(&article)
                    .await
                    .context("Failed to bookmark article")?;
                println!("Bookmarked: {}", article.title);
            }
        }
        Command::Unbookmark { id } => {
            let found = use_cases
                .repository()
                .get_bookmarked_article(id)
                .await
                .context("Failed to read bookmarks")?;
            let row = match found {
                Some(hit) if hit.is_exact() => hit.into_inner(),
                _ => anyhow::bail!("No bookmark with id {id}"),
            };
            let article = Article::from_bookmarked(row, use_cases.dates());
            use_cases
                .toggle_bookmark(&article)
                .await
                .context("Failed to remove bookmark")?;
            println!("Removed bookmark: {}", article.title);
        }
        Command::Watch => watch(use_cases, &config).await?,
    }

    Ok(())
}

async fn print_list(use_cases: &UseCases) -> Result<()> {
    let mut articles = Box::pin(use_cases.cached_articles());
    match articles.next().await {
        Some(Ok(articles)) => articles.iter().for_each(print_row),
        Some(Err(ArticleError::Empty(message))) => println!("{message}"),
        Some(Err(e)) => return Err(e).context("Failed to read article cache"),
        None => {}
    }
    Ok(())
}

fn print_row(article: &Article) {
    let mark = if article.is_bookmarked { '*' } else { ' ' };
    println!(
        "{mark} [{:>4}] {} ({}, {})",
        article.id, article.title, article.source_name, article.published_display
    );
}

fn print_details(article: &Article, requested: i64) {
    if article.id != requested {
        println!("(article {requested} not found, showing the first one)");
    }
    println!("{}", article.title);
    println!("{} | {}", article.source_name, article.published_display);
    if article.is_bookmarked {
        println!("Bookmarked");
    }
    if let Some(image) = &article.image_url {
        println!("Image: {image}");
    }
    if !article.description.is_empty() {
        println!();
        println!("{}", article.description);
    }
}

/// Run until Ctrl-C: probe connectivity, refetch on reconnect and print the
/// home screen whenever it changes.
async fn watch(use_cases: UseCases, config: &Config) -> Result<()> {
    let monitor = NetworkMonitor::new(
        config.connectivity_probe.clone(),
        Duration::from_secs(config.probe_interval_secs.max(1)),
    );
    let (online, monitor_task) = monitor.spawn();

    let main_vm = MainViewModel::new(use_cases.clone(), config.default_category.clone());
    let connectivity_task = main_vm.drive_connectivity(online);

    let home = HomeViewModel::new(use_cases);
    let mut home_state = home.subscribe();
    let mut app_state = main_vm.subscribe();
    let home_task = home.start();

    println!("Watching for news (Ctrl-C to stop)...");
    let mut was_offline = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = home_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = home_state.borrow_and_update().clone();
                match state.screen_state {
                    ScreenState::Loading => println!("Loading..."),
                    ScreenState::Error(message) => println!("{message}"),
                    ScreenState::Success => {
                        println!();
                        state.articles.iter().for_each(print_row);
                        if let Some(featured) = &state.current_selected_article {
                            println!("Featured: {}", featured.title);
                        }
                    }
                }
            }
            changed = app_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = app_state.borrow_and_update().clone();
                tracing::debug!(
                    offline = state.is_offline,
                    loading = state.is_loading,
                    "App state changed"
                );
                if state.is_offline != was_offline {
                    if state.is_offline {
                        println!("Offline, showing cached articles.");
                    } else {
                        println!("Back online.");
                    }
                    was_offline = state.is_offline;
                }
            }
        }
    }

    home_task.abort();
    connectivity_task.abort();
    monitor_task.abort();
    println!("Goodbye!");
    Ok(())
}
