pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod lifecycle;
pub mod llm;
pub mod map;
pub mod models;
pub mod scraping;
pub mod taxonomy;
mod utils;
pub mod view;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigStore};
use db::Store;
use favorites::Favorites;
use lifecycle::{LifecycleController, LifecycleSettings, RefreshOutcome};
use llm::GeminiClient;
use models::{Candidate, CandidateId, Event, EventDraft, EventId};
use taxonomy::Category;
use view::{CategoryFilter, ViewMode};

/// Key under which the admin's current candidate batch survives between commands.
const CANDIDATES_KEY: &str = "scrapedCandidates";

#[derive(Debug, Parser)]
#[command(name = "event-hunter")]
#[command(about = "Discover, favorite and curate local events")]
#[command(version)]
struct Cli {
    /// Directory holding the event database and config
    #[arg(long, global = true, env = "EVENT_HUNTER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List approved events
    Events {
        /// all, map or favorites
        #[arg(long, default_value = "all")]
        view: ViewMode,
        /// "all" or a category label/key
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
    },
    /// List the category taxonomy
    Categories,
    /// Toggle an event in or out of favorites
    Favorite { id: EventId },
    /// List events awaiting approval
    Pending,
    /// Categorize a pending event and approve it
    Approve { id: EventId },
    /// Drop a pending event
    Reject { id: EventId },
    /// Add an approved event by hand
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        location: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        #[arg(long, allow_hyphen_values = true)]
        lng: String,
    },
    /// Ask the discovery service for a fresh batch of candidates
    Scrape,
    /// List the current scraped candidates
    Candidates,
    /// Move a scraped candidate into pending
    Promote { handle: u32 },
    /// Drop a scraped candidate
    Discard { handle: u32 },
    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Store, settings and controller for one command invocation.
pub struct Session {
    config_store: ConfigStore,
    store: Store,
    controller: LifecycleController<GeminiClient, GeminiClient>,
}

impl Session {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config_store = ConfigStore::load(root);
        let config = config_store.read();
        let store = Store::open_default(root).context("failed to open event store")?;
        let gemini = GeminiClient::from_config(&config);
        let controller = LifecycleController::from_source(
            gemini.clone(),
            gemini,
            LifecycleSettings::from_config(&config),
            &store,
        )
        .context("failed to load events")?
        .with_candidates(load_candidates(&store));
        Ok(Self {
            config_store,
            store,
            controller,
        })
    }

    pub fn config(&self) -> AppConfig {
        self.config_store.read()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn controller(&self) -> &LifecycleController<GeminiClient, GeminiClient> {
        &self.controller
    }

    /// Writes events and candidates back so the next command sees them.
    pub fn save(&self) -> anyhow::Result<()> {
        self.store
            .replace_events(&self.controller.all_events())
            .context("failed to save events")?;
        let candidates = serde_json::to_string(&self.controller.candidates())?;
        self.store
            .set_value(CANDIDATES_KEY, &candidates)
            .context("failed to save candidates")?;
        Ok(())
    }
}

fn load_candidates(store: &Store) -> Vec<Candidate> {
    match store.get_value(CANDIDATES_KEY) {
        Ok(Some(payload)) => serde_json::from_str(&payload).unwrap_or_else(|err| {
            tracing::warn!("discarding unreadable candidate batch: {err}");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(err) => {
            tracing::warn!("candidate batch unavailable: {err}");
            Vec::new()
        }
    }
}

fn format_event(event: &Event, favorite: bool) -> String {
    format!(
        "{marker} {id:>14}  {date:<10}  [{category}]  {title} @ {location}",
        marker = if favorite { "*" } else { " " },
        id = event.id,
        date = event.date,
        category = event.category,
        title = event.title,
        location = event.location,
    )
}

/// One line per visible event: map markers in map view, a listing otherwise.
fn event_lines(session: &Session, view: ViewMode, filter: CategoryFilter) -> Vec<String> {
    let favorites = Favorites::load(session.store());
    let approved = session.controller().approved();
    let shown = view::visible_events(&approved, favorites.set(), view, filter);

    if view == ViewMode::Map {
        let bounds = session.config().map_bounds;
        return bounds
            .markers(shown)
            .into_iter()
            .map(|marker| {
                format!(
                    "{id:>14}  top {top:>6.1}%  left {left:>6.1}%  [{category}]  {title}{outside}",
                    id = marker.id,
                    top = marker.position.top_pct,
                    left = marker.position.left_pct,
                    category = marker.category,
                    title = marker.title,
                    outside = if marker.in_bounds { "" } else { "  (outside map)" },
                )
            })
            .collect();
    }

    shown
        .into_iter()
        .map(|event| format_event(event, favorites.is_favorite(event.id)))
        .collect()
}

fn show_config(config: &AppConfig) -> anyhow::Result<()> {
    let mut shown = config.clone();
    shown.gemini_api_key = shown.gemini_api_key.map(|_| "********".to_string());
    println!("{}", serde_json::to_string_pretty(&shown)?);
    if config.effective_api_key().is_none() {
        println!("warning: no Gemini API key; categorization and discovery will fall back");
    }
    Ok(())
}

async fn execute(session: &Session, command: Command) -> anyhow::Result<()> {
    let controller = session.controller();
    match command {
        Command::Events { view, category } => {
            let lines = event_lines(session, view, category);
            if lines.is_empty() {
                println!("No events found. Try a different category or view your favorites.");
            }
            for line in lines {
                println!("{line}");
            }
        }
        Command::Categories => {
            for category in Category::ALL {
                println!("{:<12} {}", category.key(), category.label());
            }
        }
        Command::Favorite { id } => {
            let mut favorites = Favorites::load(session.store());
            if favorites.toggle(id) {
                println!("Added {id} to favorites");
            } else {
                println!("Removed {id} from favorites");
            }
        }
        Command::Pending => {
            let pending = controller.pending();
            println!("Pending approval ({})", pending.len());
            for event in &pending {
                println!("{}", format_event(event, false));
            }
        }
        Command::Approve { id } => {
            let event = controller.approve(id).await?;
            println!("Approved {} as {}", event.id, event.category);
        }
        Command::Reject { id } => {
            if controller.reject(id) {
                println!("Rejected {id}");
            } else {
                println!("No pending event {id}");
            }
        }
        Command::Add {
            title,
            description,
            date,
            location,
            lat,
            lng,
        } => {
            let event = controller
                .add_manual(EventDraft {
                    title,
                    description,
                    date,
                    location,
                    lat,
                    lng,
                })
                .await?;
            println!("Added {} as {}", event.id, event.category);
        }
        Command::Scrape => match controller.refresh_candidates().await {
            RefreshOutcome::Replaced(count) => println!("Found {count} candidate events"),
            RefreshOutcome::Superseded => println!("Discovery superseded by a newer request"),
        },
        Command::Candidates => {
            let candidates = controller.candidates();
            if candidates.is_empty() {
                println!("No candidates. Run `event-hunter scrape` to find events.");
            }
            for candidate in candidates {
                println!(
                    "#{:<4} {:<10}  {} @ {}",
                    candidate.handle,
                    candidate.scraped.date,
                    candidate.scraped.title,
                    candidate.scraped.location
                );
            }
        }
        Command::Promote { handle } => {
            let event = controller.promote_scraped(CandidateId(handle))?;
            println!("Candidate #{handle} is now pending as {}", event.id);
        }
        Command::Discard { handle } => {
            if controller.discard_scraped(CandidateId(handle)) {
                println!("Discarded candidate #{handle}");
            } else {
                println!("No candidate #{handle}");
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Show => show_config(&session.config())?,
            ConfigAction::Set {
                api_key,
                model,
                region,
                timeout_secs,
            } => {
                let updated = session.config_store.update(|config| {
                    if let Some(key) = api_key {
                        config.gemini_api_key = Some(key);
                    }
                    if let Some(model) = model {
                        config.gemini_model = model;
                    }
                    if let Some(region) = region {
                        config.discovery_region = region;
                    }
                    if let Some(secs) = timeout_secs {
                        config.collaborator_timeout_secs = secs;
                    }
                })?;
                show_config(&updated)?;
            }
        },
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("event_hunter_lib=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let root = utils::data_root(cli.data_dir.as_deref());
    tracing::debug!(root = %root.display(), "using data root");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async {
        let session = Session::open(&root)?;
        execute(&session, cli.command).await?;
        session.save()
    })
}
