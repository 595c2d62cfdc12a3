use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

use storefront_offline::cache::SqliteStorage;
use storefront_offline::config::Config;
use storefront_offline::db::Database;
use storefront_offline::event::{EventHandler, WorkerEvent};
use storefront_offline::host::ConsoleHost;
use storefront_offline::logging;
use storefront_offline::net::{Destination, HttpClient};
use storefront_offline::orders::{Order, SqliteOrderStore};
use storefront_offline::report::TracingReporter;
use storefront_offline::worker::{EventOutcome, OfflineWorker, WorkerParts};

type Worker = OfflineWorker<SqliteStorage, HttpClient, SqliteOrderStore, ConsoleHost>;

#[derive(Parser, Debug)]
#[command(name = "storefront-offline")]
#[command(about = "Offline cache and deferred order sync for a storefront")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront-offline/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the current cache generation
  #[arg(short, long)]
  generation: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Preload the cache manifest into the current generation
  Install,
  /// Delete every cache generation except the current one
  Activate,
  /// Intercept a request as the page would issue it
  Fetch {
    /// Absolute URL or path relative to the origin
    url: String,
    /// Treat the request as a full-page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Drop one URL from the current generation
  Evict { url: String },
  /// Submit an order, deferring it if delivery fails
  Submit {
    /// Order id
    id: String,
    /// Order fields as a JSON object
    #[arg(default_value = "{}")]
    details: String,
  },
  /// Deliver a connectivity-restored signal
  Sync {
    /// Sync tag (defaults to the configured order sync tag)
    #[arg(long)]
    tag: Option<String>,
  },
  /// Deliver a push message
  Push { payload: Option<String> },
  /// Deliver a notification click
  Click {
    /// Action chosen on the notification (e.g. explore, close)
    action: Option<String>,
  },
  /// Show cache generations and pending orders
  Status,
  /// Read JSON events from stdin, one per line, and handle them in order
  Run,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  // Override generation if specified on command line
  let mut settings = config.settings()?;
  if let Some(generation) = args.generation {
    settings.generation = generation;
  }

  let db = Arc::new(Database::open(config.storage.path.as_deref())?);
  let worker: Worker = OfflineWorker::new(
    settings.clone(),
    WorkerParts {
      cache: Arc::new(SqliteStorage::new(Arc::clone(&db))),
      network: Arc::new(HttpClient::new(&settings.origin, &config.network)?),
      orders: Arc::new(SqliteOrderStore::new(Arc::clone(&db))),
      host: Arc::new(ConsoleHost),
      reporter: Arc::new(TracingReporter),
    },
  );

  match args.command {
    Command::Install => print(&worker.dispatch(WorkerEvent::Install).await)?,
    Command::Activate => print(&worker.dispatch(WorkerEvent::Activate).await)?,
    Command::Fetch { url, navigate } => {
      let destination = if navigate {
        Destination::Document
      } else {
        Destination::Empty
      };
      let event = WorkerEvent::Fetch {
        url,
        method: None,
        destination,
      };
      print(&worker.dispatch(event).await)?;
    }
    Command::Evict { url } => {
      let url = worker.resolve(&url)?;
      let removed = worker.evict(&url).await?;
      println!("{}", serde_json::json!({ "url": url, "removed": removed }));
    }
    Command::Submit { id, details } => {
      let details: serde_json::Value = serde_json::from_str(&details)
        .map_err(|e| eyre!("Order details must be JSON: {}", e))?;
      let event = WorkerEvent::SubmitOrder {
        order: Order::new(id, details),
      };
      print(&worker.dispatch(event).await)?;
    }
    Command::Sync { tag } => {
      let tag = tag.unwrap_or_else(|| worker.settings().sync_tag.clone());
      print(&worker.dispatch(WorkerEvent::Sync { tag }).await)?;
    }
    Command::Push { payload } => {
      print(&worker.dispatch(WorkerEvent::Push { payload }).await)?;
    }
    Command::Click { action } => {
      let event = WorkerEvent::NotificationClick { body: None, action };
      print(&worker.dispatch(event).await)?;
    }
    Command::Status => status(&worker).await?,
    Command::Run => run(&worker).await?,
  }

  Ok(())
}

/// Handle stdin events one at a time until input ends.
async fn run(worker: &Worker) -> Result<()> {
  let mut events = EventHandler::from_reader(BufReader::new(tokio::io::stdin()));

  while let Some(event) = events.next().await {
    print(&worker.dispatch(event).await)?;
  }

  Ok(())
}

async fn status(worker: &Worker) -> Result<()> {
  let generations = worker.generations().await?;
  let pending: Vec<_> = worker
    .pending_orders()
    .await?
    .into_iter()
    .map(|p| serde_json::json!({ "id": p.order.id, "queued_at": p.queued_at }))
    .collect();

  let status = serde_json::json!({
    "current_generation": worker.settings().generation,
    "generations": generations,
    "pending_orders": pending,
  });
  println!("{}", serde_json::to_string_pretty(&status)?);
  Ok(())
}

fn print(outcome: &EventOutcome) -> Result<()> {
  println!("{}", serde_json::to_string(outcome)?);
  Ok(())
}
