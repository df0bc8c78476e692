//! The reconciliation sweep: registry listing → store upserts → deactivation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gibreg_core::{
  entry::NaturalKey,
  store::{RegistryStore, StoreStats},
};
use gibreg_userlist::SkipCounts;
use uuid::Uuid;

use crate::{Error, Result, source::RegistrySource};

/// Outcome of one completed sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
  pub sweep_id:    Uuid,
  /// The timestamp stamped on every row the sweep touched.
  pub observed_at: DateTime<Utc>,
  pub batches:     usize,
  /// Observations that were written to the store.
  pub upserted:    usize,
  /// Observations that failed validation and were left out.
  pub rejected:    usize,
  /// Distinct natural keys confirmed by this sweep.
  pub seen:        usize,
  pub deactivated: u64,
  pub skipped:     SkipCounts,
  /// Table counts after the sweep.
  pub stats:       StoreStats,
}

/// Run one full sweep of `source` into `store`.
///
/// Every valid observation is upserted with `observed_at`. An observation
/// that fails validation is not written, but its key still counts as seen.
/// Once the source is exhausted, active entries whose key was not seen are
/// deactivated in a single transaction. A source or store error returns early and skips the
/// deactivation step, so a partial listing never flags live entries.
pub async fn run_sweep<S, R>(
  store: &S,
  source: &mut R,
  observed_at: DateTime<Utc>,
) -> Result<SweepReport>
where
  S: RegistryStore,
  R: RegistrySource,
{
  let sweep_id = Uuid::new_v4();
  tracing::info!(%sweep_id, %observed_at, "sweep started");

  let mut seen: HashSet<NaturalKey> = HashSet::new();
  let mut skipped = SkipCounts::default();
  let mut batches = 0;
  let mut upserted = 0;
  let mut rejected = 0;

  while let Some(batch) = source.next_batch().await? {
    batches += 1;
    skipped.add(batch.skipped);
    tracing::info!(
      %sweep_id,
      part = %batch.label,
      observations = batch.observations.len(),
      skipped = batch.skipped.total(),
      "processing batch"
    );

    for observation in batch.observations {
      // A listed key stays active even when its row cannot be refreshed.
      seen.insert(observation.key());
      if let Err(err) = observation.validate() {
        tracing::warn!(
          %sweep_id,
          identifier = %observation.identifier,
          alias = %observation.alias,
          error = %err,
          "rejected observation"
        );
        rejected += 1;
        continue;
      }

      store
        .upsert_observation(observation, observed_at)
        .await
        .map_err(Error::store)?;
      upserted += 1;
    }
  }

  if batches == 0 {
    return Err(Error::EmptySweep);
  }

  let seen_count = seen.len();
  let deactivated = store
    .deactivate_missing(observed_at, seen)
    .await
    .map_err(Error::store)?;
  let stats = store.stats().await.map_err(Error::store)?;

  tracing::info!(
    %sweep_id,
    batches,
    upserted,
    rejected,
    seen = seen_count,
    deactivated,
    active = stats.active,
    total = stats.total,
    "sweep finished"
  );

  Ok(SweepReport {
    sweep_id,
    observed_at,
    batches,
    upserted,
    rejected,
    seen: seen_count,
    deactivated,
    skipped,
    stats,
  })
}

#[cfg(test)]
mod tests {
  use std::collections::VecDeque;

  use chrono::{Duration, TimeZone};
  use gibreg_core::{
    entry::{DocumentType, Observation, PartyKind},
    store::EntryFilter,
  };
  use gibreg_store_sqlite::SqliteStore;

  use super::*;
  use crate::source::SourceBatch;

  /// Replays canned batches; an `Err` entry simulates a failed download.
  struct ScriptedSource {
    batches: VecDeque<Result<SourceBatch>>,
  }

  impl ScriptedSource {
    fn new(batches: Vec<Result<SourceBatch>>) -> Self {
      Self { batches: batches.into() }
    }
  }

  impl RegistrySource for ScriptedSource {
    async fn next_batch(&mut self) -> Result<Option<SourceBatch>> {
      self.batches.pop_front().transpose()
    }
  }

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap() }

  fn obs(identifier: &str, alias: &str) -> Observation {
    Observation {
      identifier:    identifier.into(),
      alias:         alias.into(),
      title:         Some("ACME".into()),
      kind:          PartyKind::from_identifier(identifier).unwrap(),
      document_type: DocumentType::Invoice,
      first_seen_at: Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn batch(label: &str, observations: Vec<Observation>) -> Result<SourceBatch> {
    Ok(SourceBatch {
      label: label.into(),
      observations,
      skipped: SkipCounts::default(),
    })
  }

  async fn active_aliases(store: &SqliteStore) -> Vec<String> {
    store
      .find_active(&EntryFilter::default(), 100, 0)
      .await
      .unwrap()
      .into_iter()
      .map(|e| e.alias)
      .collect()
  }

  #[tokio::test]
  async fn sweep_upserts_then_deactivates_missing() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    let mut first = ScriptedSource::new(vec![
      batch("part-1", vec![obs("1234567890", "urn:mail:a@acme.com")]),
      batch("part-2", vec![obs("12345678901", "urn:mail:b@home.com")]),
    ]);
    let report = run_sweep(&store, &mut first, t0()).await.unwrap();
    assert_eq!(report.batches, 2);
    assert_eq!(report.upserted, 2);
    assert_eq!(report.deactivated, 0);
    assert_eq!(report.stats.active, 2);

    let mut second = ScriptedSource::new(vec![batch(
      "part-1",
      vec![obs("1234567890", "urn:mail:a@acme.com")],
    )]);
    let report = run_sweep(&store, &mut second, t0() + Duration::days(1))
      .await
      .unwrap();
    assert_eq!(report.deactivated, 1);
    assert_eq!(report.stats.active, 1);
    assert_eq!(report.stats.total, 2);
    assert_eq!(active_aliases(&store).await, vec!["urn:mail:a@acme.com"]);
  }

  #[tokio::test]
  async fn failing_source_leaves_existing_entries_active() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut seed = ScriptedSource::new(vec![batch(
      "part-1",
      vec![
        obs("1234567890", "urn:mail:a@acme.com"),
        obs("1234567890", "urn:mail:b@acme.com"),
      ],
    )]);
    run_sweep(&store, &mut seed, t0()).await.unwrap();

    let mut broken = ScriptedSource::new(vec![
      batch("part-1", vec![obs("1234567890", "urn:mail:a@acme.com")]),
      Err(Error::NoParts),
    ]);
    let err = run_sweep(&store, &mut broken, t0() + Duration::days(1))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NoParts));

    assert_eq!(store.stats().await.unwrap().active, 2);
  }

  #[tokio::test]
  async fn invalid_observations_are_rejected_not_fatal() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut long_title = obs("1234567890", "urn:mail:long@acme.com");
    long_title.title = Some("X".repeat(101));

    let mut source = ScriptedSource::new(vec![batch(
      "part-1",
      vec![long_title, obs("1234567890", "urn:mail:ok@acme.com")],
    )]);
    let report = run_sweep(&store, &mut source, t0()).await.unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(report.upserted, 1);
    assert_eq!(active_aliases(&store).await, vec!["urn:mail:ok@acme.com"]);
  }

  #[tokio::test]
  async fn rejected_observation_keeps_existing_entry_active() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut seed = ScriptedSource::new(vec![batch(
      "part-1",
      vec![obs("1234567890", "urn:mail:a@acme.com")],
    )]);
    run_sweep(&store, &mut seed, t0()).await.unwrap();

    let mut renamed = obs("1234567890", "urn:mail:a@acme.com");
    renamed.title = Some("Y".repeat(101));
    let mut source = ScriptedSource::new(vec![batch("part-1", vec![renamed])]);
    let report = run_sweep(&store, &mut source, t0() + Duration::days(1))
      .await
      .unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(report.upserted, 0);
    assert_eq!(report.seen, 1);
    assert_eq!(report.deactivated, 0);

    let history = store.find_all_by_identifier("1234567890").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_active);
    assert_eq!(history[0].title.as_deref(), Some("ACME"));
    assert_eq!(history[0].last_synced_at, t0());
  }

  #[tokio::test]
  async fn source_without_batches_is_refused() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut seed = ScriptedSource::new(vec![batch(
      "part-1",
      vec![obs("1234567890", "urn:mail:a@acme.com")],
    )]);
    run_sweep(&store, &mut seed, t0()).await.unwrap();

    let mut empty = ScriptedSource::new(vec![]);
    let err = run_sweep(&store, &mut empty, t0() + Duration::days(1))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::EmptySweep));
    assert_eq!(store.stats().await.unwrap().active, 1);
  }

  #[tokio::test]
  async fn repeated_key_within_one_sweep_is_counted_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut source = ScriptedSource::new(vec![
      batch("part-1", vec![obs("1234567890", "urn:mail:a@acme.com")]),
      batch("part-2", vec![obs("1234567890", "urn:mail:a@acme.com")]),
    ]);

    let report = run_sweep(&store, &mut source, t0()).await.unwrap();
    assert_eq!(report.upserted, 2);
    assert_eq!(report.seen, 1);
    assert_eq!(report.stats.total, 1);
  }
}
