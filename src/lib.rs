//! Offline resilience for a storefront page.
//!
//! Serves cached assets cache-first, keeps one cache generation per
//! deployment, defers order submissions that fail until connectivity
//! returns, and renders push notifications. Host platforms deliver their
//! lifecycle events to [`worker::OfflineWorker`].

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod host;
pub mod logging;
pub mod net;
pub mod notify;
pub mod orders;
pub mod report;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;
