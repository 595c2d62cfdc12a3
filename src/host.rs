//! Notification host for the command-line adapter.

use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::error::HostError;
use crate::notify::{Notification, NotificationHost};

/// Writes notifications and window requests to the log instead of a desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleHost;

#[async_trait]
impl NotificationHost for ConsoleHost {
  async fn show(&self, notification: &Notification) -> Result<(), HostError> {
    info!(
      title = %notification.title,
      body = %notification.body,
      actions = notification.actions.len(),
      "Showing notification"
    );
    Ok(())
  }

  async fn close(&self, notification: &Notification) -> Result<(), HostError> {
    info!(title = %notification.title, "Closing notification");
    Ok(())
  }

  async fn open_or_focus_window(&self, url: &Url) -> Result<(), HostError> {
    info!(url = %url, "Open or focus window");
    Ok(())
  }
}
