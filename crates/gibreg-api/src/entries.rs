//! Handlers for `/entries` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/entries` | `?identifier=&document_type=&include_inactive=&limit=&offset=` |
//! | `GET`  | `/entries/{identifier}` | Full history for one subject |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use gibreg_core::{
  entry::{DocumentType, RegistryEntry},
  store::{EntryFilter, RegistryStore},
};
use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub identifier:       Option<String>,
  pub document_type:    Option<DocumentType>,
  #[serde(default)]
  pub include_inactive: bool,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

/// `GET /entries`: active entries ordered by id.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<RegistryEntry>>, ApiError>
where
  S: RegistryStore,
{
  let Query(params) = params?;
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
  if limit > MAX_LIMIT {
    return Err(ApiError::BadRequest(format!(
      "limit must not exceed {MAX_LIMIT}"
    )));
  }

  let filter = EntryFilter {
    identifier:       params.identifier,
    document_type:    params.document_type,
    include_inactive: params.include_inactive,
  };
  let entries = store
    .find_active(&filter, limit, params.offset.unwrap_or(0))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /entries/{identifier}`: every entry for the subject, `[]` if none.
pub async fn by_identifier<S>(
  State(store): State<Arc<S>>,
  Path(identifier): Path<String>,
) -> Result<Json<Vec<RegistryEntry>>, ApiError>
where
  S: RegistryStore,
{
  let entries = store
    .find_all_by_identifier(&identifier)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}
