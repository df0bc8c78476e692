//! Handler for `GET /stats`.

use std::sync::Arc;

use axum::{Json, extract::State};
use gibreg_core::store::{RegistryStore, StoreStats};

use crate::error::ApiError;

/// `GET /stats`: `{"active": n, "total": n}`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<StoreStats>, ApiError>
where
  S: RegistryStore,
{
  let stats = store.stats().await.map_err(ApiError::store)?;
  Ok(Json(stats))
}
