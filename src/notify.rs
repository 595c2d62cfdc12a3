//! Push notification rendering and click routing.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::error::HostError;

/// Action id that opens the application.
pub const ACTION_EXPLORE: &str = "explore";
/// Action id that only dismisses the notification.
pub const ACTION_CLOSE: &str = "close";

/// Fixed presentation settings for every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
  pub title: String,
  pub default_body: String,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
  pub action: String,
  pub title: String,
  pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
  /// Epoch milliseconds at which the push arrived
  pub date_of_arrival: i64,
  pub primary_key: u32,
}

/// A notification ready to be shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
  pub data: NotificationData,
  pub actions: Vec<NotificationAction>,
}

/// Host platform surface for notifications and windows.
#[async_trait]
pub trait NotificationHost: Send + Sync {
  async fn show(&self, notification: &Notification) -> Result<(), HostError>;

  async fn close(&self, notification: &Notification) -> Result<(), HostError>;

  /// Focus an existing window at `url`, or open a new one.
  async fn open_or_focus_window(&self, url: &Url) -> Result<(), HostError>;
}

pub struct NotificationDispatcher<N: NotificationHost> {
  host: Arc<N>,
  template: NotificationTemplate,
  app_root: Url,
}

impl<N: NotificationHost> NotificationDispatcher<N> {
  pub fn new(host: Arc<N>, template: NotificationTemplate, app_root: Url) -> Self {
    Self {
      host,
      template,
      app_root,
    }
  }

  /// Build the notification for a push payload.
  pub fn render(&self, payload: Option<&str>) -> Notification {
    let body = match payload {
      Some(text) if !text.is_empty() => text.to_string(),
      _ => self.template.default_body.clone(),
    };

    let action = |id: &str, title: &str| NotificationAction {
      action: id.to_string(),
      title: title.to_string(),
      icon: self.template.icon.clone(),
    };

    Notification {
      title: self.template.title.clone(),
      body,
      icon: self.template.icon.clone(),
      badge: self.template.badge.clone(),
      vibrate: self.template.vibrate.clone(),
      data: NotificationData {
        date_of_arrival: Utc::now().timestamp_millis(),
        primary_key: 1,
      },
      actions: vec![
        action(ACTION_EXPLORE, "View Details"),
        action(ACTION_CLOSE, "Close"),
      ],
    }
  }

  /// Render and display a push payload.
  pub async fn on_push(&self, payload: Option<&str>) -> Result<Notification, HostError> {
    let notification = self.render(payload);
    self.host.show(&notification).await?;
    debug!(body = %notification.body, "Displayed notification");
    Ok(notification)
  }

  /// Dismiss the notification and route the chosen action.
  pub async fn on_click(
    &self,
    notification: &Notification,
    action: Option<&str>,
  ) -> Result<(), HostError> {
    self.host.close(notification).await?;

    if action == Some(ACTION_EXPLORE) {
      info!(url = %self.app_root, "Opening application window");
      self.host.open_or_focus_window(&self.app_root).await?;
    }

    Ok(())
  }
}
