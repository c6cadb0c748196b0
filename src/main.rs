//! Magline - catalog / download-assistant client
//!
//! Drives a media-cataloging backend over HTTP: search and listings, magnet
//! resolution per title, streaming batch lookups, and PikPak cloud downloads.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use magline::api::models::{MagnetQuery, MovieQuery};
use magline::{ApiClient, AppSettings, BatchEvent, Session};

#[derive(Parser)]
#[command(name = "magline", version, about = "Catalog and download-assistant client")]
struct Cli {
    /// Backend base URL, overrides the settings file
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog by keyword or movie id
    Search { keyword: String },
    /// Show one movie record
    Movie { id: String },
    /// List magnet links for a movie, best first
    Magnets {
        id: String,
        /// Only magnets with subtitles
        #[arg(long)]
        subtitled: bool,
    },
    /// Show a catalog page with optional filters
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Filter type (star, genre, director, ...)
        #[arg(long)]
        filter_type: Option<String>,
        #[arg(long)]
        filter_value: Option<String>,
        /// Restrict to movies that have magnet links
        #[arg(long)]
        magnet_only: bool,
        /// "normal" or "uncensored"
        #[arg(long)]
        movie_type: Option<String>,
    },
    /// Resolve best magnets for several movies over the streaming batch endpoint
    Batch {
        ids: Vec<String>,
        #[arg(long)]
        subtitled: bool,
    },
    /// Verify and store PikPak credentials
    Login { username: String, password: String },
    /// Forget the stored PikPak credentials
    Logout,
    /// Push the best magnet for each movie to the PikPak account
    Download {
        ids: Vec<String>,
        #[arg(long)]
        subtitled: bool,
    },
    /// Show the server-side download history
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut settings = AppSettings::load(&AppSettings::default_path()).await;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    let api = ApiClient::new(&settings).context("failed to build backend client")?;

    match cli.command {
        Command::Search { keyword } => match api.search_movies(&keyword).await? {
            Some(movie) => print_movie(&movie),
            None => println!("no result for {}", keyword),
        },

        Command::Movie { id } => match api.get_movie(&id).await? {
            Some(movie) => print_movie(&movie),
            None => println!("movie {} not found", id),
        },

        Command::Magnets { id, subtitled } => {
            let detail = api
                .get_movie(&id)
                .await?
                .with_context(|| format!("movie {} not found", id))?;
            let mut query = MagnetQuery::largest_first(&detail);
            query.has_subtitle = subtitled.then_some(true);

            let magnets = api.get_magnets(&id, &query).await?;
            if magnets.is_empty() {
                println!("no magnets for {}", id);
            }
            for magnet in magnets {
                println!(
                    "{}  {}  subtitle={}",
                    magnet.link,
                    magnet.size.as_deref().unwrap_or("?"),
                    magnet.has_subtitle,
                );
            }
        }

        Command::List {
            page,
            filter_type,
            filter_value,
            magnet_only,
            movie_type,
        } => {
            let query = MovieQuery {
                page: Some(page),
                filter_type,
                filter_value,
                magnet: magnet_only.then(|| "exist".to_string()),
                movie_type,
                ..Default::default()
            };
            match api.list_movies(&query).await? {
                Some(listing) => {
                    for movie in &listing.movies {
                        println!("{}  {}  {}", movie.id, movie.date.as_deref().unwrap_or(""), movie.title);
                    }
                    if let Some(pagination) = &listing.pagination {
                        println!("-- page {} of {:?}", pagination.current_page, pagination.pages);
                    }
                }
                None => println!("no listing"),
            }
        }

        Command::Batch { ids, subtitled } => {
            if ids.is_empty() {
                bail!("no movie ids given");
            }
            let mut total = 0usize;
            let mut seen = 0usize;
            let mut completed = false;

            api.batch_magnets(&ids, subtitled.then_some(true), |event| match event {
                BatchEvent::Start { total: n } => {
                    total = n;
                    println!("resolving {} movies...", n);
                }
                BatchEvent::Progress {
                    movie_id,
                    success,
                    best_magnet,
                    is_downloaded,
                    error,
                } => {
                    seen += 1;
                    if success {
                        let link = best_magnet.map(|m| m.link).unwrap_or_default();
                        let mark = if is_downloaded.unwrap_or(false) { " (downloaded)" } else { "" };
                        println!("[{}/{}] {}{}  {}", seen, total, movie_id, mark, link);
                    } else {
                        println!(
                            "[{}/{}] {}  failed: {}",
                            seen,
                            total,
                            movie_id,
                            error.unwrap_or_else(|| "unknown".to_string()),
                        );
                    }
                }
                BatchEvent::Complete => completed = true,
            })
            .await?;

            if !completed {
                bail!("stream ended before completion, results may be partial");
            }
        }

        Command::Login { username, password } => {
            let mut session = Session::load(Session::default_path()).await;
            session.login(&api, &username, &password).await?;
            println!("logged in as {}", username);
        }

        Command::Logout => {
            let mut session = Session::load(Session::default_path()).await;
            session.logout().await?;
            println!("logged out");
        }

        Command::Download { ids, subtitled } => {
            if ids.is_empty() {
                bail!("no movie ids given");
            }
            let session = Session::load(Session::default_path()).await;
            let outcome = session
                .download_movies(&api, &ids, subtitled.then_some(true))
                .await?;

            println!(
                "queued {} / skipped {} / missing {}",
                outcome.queued.len(),
                outcome.skipped.len(),
                outcome.missing.len(),
            );
            if let Some(message) = outcome.message {
                println!("{}", message);
            }
            for movie_id in &outcome.missing {
                println!("no resource: {}", movie_id);
            }
        }

        Command::History => {
            let history = api.get_history().await?;
            if history.is_empty() {
                println!("history is empty");
            }
            for entry in history {
                println!(
                    "{}  {}  {}",
                    entry.movie_id,
                    entry
                        .downloaded_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                    entry.title.as_deref().unwrap_or(""),
                );
            }
        }
    }

    Ok(())
}

fn print_movie(movie: &magline::MovieDetail) {
    println!("{}  {}", movie.id, movie.title);
    if let Some(date) = &movie.date {
        println!("date: {}", date);
    }
    println!("gid: {}  uc: {}", movie.gid, movie.uc);
}
