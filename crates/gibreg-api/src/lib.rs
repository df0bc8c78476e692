//! Read-only JSON API over the registry mirror.
//!
//! Exposes an axum [`Router`] backed by any
//! [`gibreg_core::store::RegistryStore`]. Writes only happen through sweeps;
//! nothing here mutates the store.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gibreg_api::api_router(Arc::new(store)))
//! ```

pub mod entries;
pub mod error;
pub mod stats;

use std::sync::Arc;

use axum::{Router, routing::get};
use gibreg_core::store::RegistryStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RegistryStore + 'static,
{
  Router::new()
    .route("/entries", get(entries::list::<S>))
    .route("/entries/{identifier}", get(entries::by_identifier::<S>))
    .route("/stats", get(stats::handler::<S>))
    .with_state(store)
}
