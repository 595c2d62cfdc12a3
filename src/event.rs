use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::warn;

use crate::net::Destination;
use crate::orders::Order;

/// Lifecycle and network events delivered by the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
  Install,
  Activate,
  Fetch {
    /// Absolute URL or a path relative to the origin
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    destination: Destination,
  },
  Sync {
    tag: String,
  },
  Push {
    #[serde(default)]
    payload: Option<String>,
  },
  NotificationClick {
    /// Body of the notification that was clicked
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    action: Option<String>,
  },
  SubmitOrder {
    order: Order,
  },
}

/// Event source that parses one JSON event per input line
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl EventHandler {
  /// Spawn a reader task feeding events from `reader` into the channel
  pub fn from_reader<R>(reader: R) -> Self
  where
    R: AsyncBufRead + Unpin + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      let mut lines = reader.lines();
      loop {
        match lines.next_line().await {
          Ok(Some(line)) => {
            if line.trim().is_empty() {
              continue;
            }
            match serde_json::from_str::<WorkerEvent>(&line) {
              Ok(event) => {
                if tx.send(event).is_err() {
                  break;
                }
              }
              Err(e) => warn!(error = %e, "Skipping malformed event"),
            }
          }
          Ok(None) => break,
          Err(e) => {
            warn!(error = %e, "Event input failed");
            break;
          }
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<WorkerEvent> {
    self.rx.recv().await
  }
}
