//! The offline worker: one handler per host event.
//!
//! The host adapter owns event delivery and calls these handlers; the worker
//! never reaches back into the host except through [`NotificationHost`].

mod activate;
mod fetch;
mod install;

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::cache::{CacheLayer, CacheStorage, RequestKey};
use crate::config::WorkerSettings;
use crate::error::{FetchError, HostError, InstallError, NetworkError, StorageError};
use crate::event::WorkerEvent;
use crate::net::{Fetch, Request};
use crate::notify::{Notification, NotificationDispatcher, NotificationHost};
use crate::orders::{DeferredQueue, DrainReport, Order, OrderStore, PendingOrder, Submission, SyncTrigger};
use crate::report::{ErrorReporter, Failure, FailureKind};

pub use activate::GenerationManager;
pub use fetch::{FetchInterceptor, Interception, ResponseSource};
pub use install::AssetPreloader;

/// Collaborators the worker is built from.
pub struct WorkerParts<C, F, O, N> {
  pub cache: Arc<C>,
  pub network: Arc<F>,
  pub orders: Arc<O>,
  pub host: Arc<N>,
  pub reporter: Arc<dyn ErrorReporter>,
}

pub struct OfflineWorker<C, F, O, N>
where
  C: CacheStorage,
  F: Fetch,
  O: OrderStore,
  N: NotificationHost,
{
  settings: WorkerSettings,
  cache: CacheLayer<C>,
  preloader: AssetPreloader<C, F>,
  interceptor: FetchInterceptor<C, F>,
  generations: GenerationManager<C>,
  queue: Arc<DeferredQueue<O, F>>,
  sync: SyncTrigger<O, F>,
  notifications: NotificationDispatcher<N>,
  reporter: Arc<dyn ErrorReporter>,
}

impl<C, F, O, N> OfflineWorker<C, F, O, N>
where
  C: CacheStorage + 'static,
  F: Fetch,
  O: OrderStore,
  N: NotificationHost,
{
  pub fn new(settings: WorkerSettings, parts: WorkerParts<C, F, O, N>) -> Self {
    let WorkerParts {
      cache,
      network,
      orders,
      host,
      reporter,
    } = parts;

    let root = settings.root_document();
    let layer = CacheLayer::new(Arc::clone(&cache), settings.generation.clone());

    let queue = Arc::new(DeferredQueue::new(
      orders,
      Arc::clone(&network),
      settings.orders_endpoint.clone(),
      Arc::clone(&reporter),
    ));

    Self {
      preloader: AssetPreloader::new(
        layer.clone(),
        Arc::clone(&network),
        settings.manifest.clone(),
      ),
      interceptor: FetchInterceptor::new(
        layer.clone(),
        network,
        root.clone(),
        Arc::clone(&reporter),
      ),
      generations: GenerationManager::new(
        cache,
        settings.generation.clone(),
        Arc::clone(&reporter),
      ),
      sync: SyncTrigger::new(settings.sync_tag.clone(), Arc::clone(&queue)),
      notifications: NotificationDispatcher::new(host, settings.notification.clone(), root),
      cache: layer,
      queue,
      reporter,
      settings,
    }
  }

  pub fn settings(&self) -> &WorkerSettings {
    &self.settings
  }

  /// Install: preload the manifest into the current generation.
  pub async fn on_install(&self) -> Result<usize, InstallError> {
    self.preloader.install().await.map_err(|e| {
      self.reporter.report(Failure::new(
        FailureKind::InstallFatal,
        "preloading cache manifest",
        &e,
      ));
      e
    })
  }

  /// Activate: drop every generation except the current one.
  pub async fn on_activate(&self) -> Vec<String> {
    match self.generations.activate().await {
      Ok(deleted) => deleted,
      Err(e) => {
        self.reporter.report(Failure::new(
          FailureKind::StorageSoft,
          "listing cache generations",
          &e,
        ));
        Vec::new()
      }
    }
  }

  pub async fn on_fetch(&self, request: &Request) -> Result<Interception, FetchError> {
    self.interceptor.intercept(request).await
  }

  pub async fn on_sync(&self, tag: &str) -> Option<DrainReport> {
    self.sync.on_signal(tag).await
  }

  pub async fn on_push(&self, payload: Option<&str>) -> Result<Notification, HostError> {
    self.notifications.on_push(payload).await
  }

  pub async fn on_notification_click(
    &self,
    notification: &Notification,
    action: Option<&str>,
  ) -> Result<(), HostError> {
    self.notifications.on_click(notification, action).await
  }

  /// Submit an order from the page, deferring it if delivery fails.
  pub async fn submit_order(&self, order: &Order) -> Result<Submission, StorageError> {
    self.queue.submit(order).await
  }

  pub async fn pending_orders(&self) -> Result<Vec<PendingOrder>, StorageError> {
    self.queue.pending().await
  }

  pub async fn generations(&self) -> Result<Vec<String>, StorageError> {
    self.cache.storage().list_generations().await
  }

  /// Drop one entry from the current generation.
  pub async fn evict(&self, url: &Url) -> Result<bool, StorageError> {
    self.cache.remove(&RequestKey::get(url)).await
  }

  /// Resolve a path or absolute URL against the origin.
  pub fn resolve(&self, target: &str) -> Result<Url, NetworkError> {
    self
      .settings
      .origin
      .join(target)
      .map_err(|e| NetworkError::InvalidRequest(format!("{}: {}", target, e)))
  }

  /// Route a host event to its handler.
  ///
  /// Fetch interceptions are awaited until their background cache write
  /// settles, as the host would keep the worker alive for it.
  pub async fn dispatch(&self, event: WorkerEvent) -> EventOutcome {
    match event {
      WorkerEvent::Install => match self.on_install().await {
        Ok(assets) => EventOutcome::Installed { assets },
        Err(e) => EventOutcome::Failed {
          message: e.to_string(),
        },
      },
      WorkerEvent::Activate => EventOutcome::Activated {
        deleted: self.on_activate().await,
      },
      WorkerEvent::Fetch {
        url,
        method,
        destination,
      } => {
        let request = match self.fetch_request(&url, method.as_deref()) {
          Ok(request) => request.with_destination(destination),
          Err(e) => {
            return EventOutcome::Failed {
              message: e.to_string(),
            }
          }
        };
        match self.on_fetch(&request).await {
          Ok(mut served) => {
            served.settled().await;
            EventOutcome::Fetched {
              status: served.response.status,
              source: served.source,
              bytes: served.response.body.len(),
            }
          }
          Err(e) => EventOutcome::Failed {
            message: e.to_string(),
          },
        }
      }
      WorkerEvent::Sync { tag } => EventOutcome::Synced {
        report: self.on_sync(&tag).await,
      },
      WorkerEvent::Push { payload } => match self.on_push(payload.as_deref()).await {
        Ok(notification) => EventOutcome::Notified { notification },
        Err(e) => EventOutcome::Failed {
          message: e.to_string(),
        },
      },
      WorkerEvent::NotificationClick { body, action } => {
        let notification = self.notifications.render(body.as_deref());
        match self
          .on_notification_click(&notification, action.as_deref())
          .await
        {
          Ok(()) => EventOutcome::Clicked,
          Err(e) => EventOutcome::Failed {
            message: e.to_string(),
          },
        }
      }
      WorkerEvent::SubmitOrder { order } => match self.submit_order(&order).await {
        Ok(submission) => EventOutcome::OrderSubmitted {
          order_id: order.id,
          submission,
        },
        Err(e) => EventOutcome::Failed {
          message: e.to_string(),
        },
      },
    }
  }

  fn fetch_request(&self, target: &str, method: Option<&str>) -> Result<Request, NetworkError> {
    let url = self.resolve(target)?;
    let method = match method {
      Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
        .map_err(|e| NetworkError::InvalidRequest(format!("{}: {}", m, e)))?,
      None => Method::GET,
    };

    let mut request = Request::get(url);
    request.method = method;
    Ok(request)
  }
}

/// What a dispatched event produced, for the host adapter to print.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
  Installed {
    assets: usize,
  },
  Activated {
    deleted: Vec<String>,
  },
  Fetched {
    status: u16,
    source: ResponseSource,
    bytes: usize,
  },
  Synced {
    report: Option<DrainReport>,
  },
  Notified {
    notification: Notification,
  },
  Clicked,
  OrderSubmitted {
    order_id: String,
    submission: Submission,
  },
  Failed {
    message: String,
  },
}
