//! eventide - command-line client for the events backend.
//!
//! Drives the same coordinators an interactive client would: searches go
//! through the query coordinator (with "load more" via `--pages`), messages
//! through the optimistic mutation coordinator.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eventide::cache::CacheStore;
use eventide::transport::{ApiClient, EventLookup, EventSearch, MessageSender};
use eventide::{
    EventId, MutationCoordinator, QueryCoordinator, QueryState, QueryStatus, QueryTransport,
    SearchParams, SyncConfig,
};

/// Eventide CLI client
#[derive(Parser)]
#[command(name = "eventide")]
#[command(version)]
#[command(about = "Search nearby events and send chat messages")]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "EVENTIDE_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for events near a location
    Search {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Search radius
        #[arg(short, long)]
        radius: Option<f64>,
        /// Free-text query
        #[arg(short, long)]
        query: Option<String>,
        /// Category filter (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Platform filter (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Show a single event by id or `externalId:platform`
    Event { id: String },

    /// Send a chat message
    Send {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        sender: String,
        message: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = SyncConfig::load(args.config.as_deref())?;
    if let Some(url) = args.base_url {
        config = config.base_url(url);
    }
    let client = ApiClient::new(&config)?;

    match args.command {
        Command::Search {
            lat,
            lon,
            radius,
            query,
            categories,
            platforms,
            pages,
        } => {
            let mut params = SearchParams::new(lat, lon)
                .categories(categories)
                .platforms(platforms);
            params.radius = radius;
            params.query = query;

            let search = QueryCoordinator::new(
                Arc::new(EventSearch::new(client, &config)),
                Arc::new(CacheStore::new(&config.cache_config())),
                config.query_options(),
            );
            search.set_params(params);
            let mut state = settle(&search).await;

            for _ in 1..pages {
                if !search.fetch_next_page() {
                    break;
                }
                state = settle(&search).await;
            }

            if let Some(error) = &state.error {
                eprintln!("search failed [{}]: {error}", error.code());
                std::process::exit(1);
            }
            for event in &state.items {
                println!(
                    "{:<24} {:<40} {}",
                    event.id,
                    event.title,
                    event.start_date.as_deref().unwrap_or("-")
                );
            }
            println!(
                "page {} · {} of {} results",
                state.pagination.page,
                state.items.len(),
                state.pagination.total_count
            );
            for (source, status) in &state.metadata.sources {
                if let Some(error) = &status.error {
                    println!("  {source}: error: {error}");
                } else if status.searched {
                    println!("  {source}: {} results", status.count);
                }
            }
        }

        Command::Event { id } => {
            let lookup = QueryCoordinator::uncached(
                Arc::new(EventLookup::new(client)),
                config.query_options(),
            );
            lookup.set_params(EventId::raw(id));
            let state = settle(&lookup).await;
            match (&state.error, state.items.first()) {
                (Some(error), _) => {
                    eprintln!("lookup failed [{}]: {error}", error.code());
                    std::process::exit(1);
                }
                (None, Some(event)) => println!("{}", serde_json::to_string_pretty(event)?),
                (None, None) => println!("no event"),
            }
        }

        Command::Send {
            conversation,
            sender,
            message,
        } => {
            let chat = MutationCoordinator::builder(Arc::new(MessageSender::new(
                client,
                conversation,
                sender,
            )))
            .on_success(|sent| println!("sent {}", sent.id))
            .on_error(|error| eprintln!("send failed: {error}"))
            .build();

            match chat.submit(&message) {
                Some(send) => send.settled().await,
                None => eprintln!("nothing to send"),
            }
            if chat.items().iter().any(|item| item.is_failed()) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Wait for the coordinator to finish its current fetch.
async fn settle<Q: QueryTransport>(
    coordinator: &QueryCoordinator<Q>,
) -> QueryState<Q::Item, Q::Metadata> {
    let mut updates = coordinator.subscribe();
    let _ = updates
        .wait_for(|s| matches!(s.status, QueryStatus::Succeeded | QueryStatus::Failed) && !s.is_busy())
        .await;
    coordinator.state()
}
