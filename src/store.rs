//! ==============================================================================
//! store.rs - shared telemetry store (ingest + query)
//! ==============================================================================
//!
//! purpose:
//!     owns the snapshot and the rolling history behind ONE lock so that an
//!     ingest (merge, then append) is a single atomic step for readers.
//!
//! relationships:
//!     - used by: server.rs (POST -> ingest, GET -> query)
//!     - uses: snapshot.rs, history.rs, alert.rs
//!
//! locking:
//!     - ingest: write lock for merge + append, nothing else
//!     - query: read lock just long enough to copy state out; formatting the
//!       (up to capacity) history entries happens after the lock is released
//!
//! ==============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;

use crate::alert;
use crate::config::HubConfig;
use crate::domain::{CurrentReadings, HistoryPoint, QueryResponse, TelemetryPatch};
use crate::history::{round1, HistoryLog, HistorySample};
use crate::snapshot::SnapshotState;

#[derive(Debug)]
struct StoreState {
    snapshot: SnapshotState,
    history: HistoryLog,
}

/// Process-wide telemetry state. Share it as `Arc<TelemetryStore>`.
#[derive(Debug)]
pub struct TelemetryStore {
    state: RwLock<StoreState>,
}

/// What a single ingest did, captured under the same write lock.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// a history sample was appended
    pub sampled: bool,
    pub history_len: usize,
    /// snapshot right after this patch was merged
    pub snapshot: SnapshotState,
}

impl TelemetryStore {
    pub fn new(snapshot: SnapshotState, history_capacity: usize) -> Self {
        Self {
            state: RwLock::new(StoreState {
                snapshot,
                history: HistoryLog::with_capacity(history_capacity),
            }),
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        let snapshot = if config.snapshot.seed_defaults {
            SnapshotState::default()
        } else {
            SnapshotState::unseeded()
        };
        Self::new(snapshot, config.history.capacity)
    }

    /// Merges the patch and, when both ambient readings are known, records a
    /// history sample. Samples on every call, even if the patch carried no
    /// ambient fields.
    pub async fn ingest(&self, patch: &TelemetryPatch) -> IngestOutcome {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.snapshot.merge(patch);

        // stamped under the lock; the log clamps any backwards clock step
        let sampled = match state.snapshot.ambient() {
            Some((temperature, humidity)) => {
                state
                    .history
                    .append(HistorySample::new(Utc::now(), temperature, humidity));
                true
            }
            None => false,
        };

        IngestOutcome {
            sampled,
            history_len: state.history.len(),
            snapshot: state.snapshot.clone(),
        }
    }

    /// Current snapshot, formatted history and alert. Never fails.
    pub async fn query(&self) -> QueryResponse {
        let (snapshot, history) = {
            let state = self.state.read().await;
            (state.snapshot.clone(), state.history.read_all())
        };

        render(&snapshot, &history, Utc::now())
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> SnapshotState {
        self.state.read().await.snapshot.clone()
    }

    #[cfg(test)]
    pub async fn history(&self) -> Vec<HistorySample> {
        self.state.read().await.history.read_all()
    }

    /// (retained samples, capacity)
    pub async fn history_usage(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.history.len(), state.history.capacity())
    }
}

fn render(snapshot: &SnapshotState, history: &[HistorySample], now: DateTime<Utc>) -> QueryResponse {
    let current = CurrentReadings {
        temperature: snapshot.temperature.map(round1),
        humidity: snapshot.humidity.map(round1),
        cpu_temperature: snapshot.cpu_temperature,
        board_temperature: snapshot.board_temperature,
        memory_use_label: snapshot.memory_use_label.clone(),
        cpu_usage_percent: snapshot.cpu_usage_percent,
        wifi_signal_dbm: snapshot.wifi_signal_dbm,
        last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let history = history
        .iter()
        .map(|s| HistoryPoint {
            name: s.time_label(),
            temperature: s.temperature,
            humidity: s.humidity,
        })
        .collect();

    QueryResponse {
        current,
        history,
        // raw value: 26.01 warns even though it displays as 26.0
        alert: alert::evaluate(snapshot.temperature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertKind;
    use crate::history::DEFAULT_CAPACITY;
    use std::sync::Arc;

    fn ambient(temperature: f64, humidity: f64) -> TelemetryPatch {
        TelemetryPatch {
            temperature: Some(temperature),
            humidity: Some(humidity),
            ..TelemetryPatch::default()
        }
    }

    #[tokio::test]
    async fn ingest_then_query_reports_warning() {
        let store = TelemetryStore::new(SnapshotState::unseeded(), DEFAULT_CAPACITY);

        let outcome = store.ingest(&ambient(27.3, 50.1)).await;
        assert!(outcome.sampled);
        assert_eq!(outcome.history_len, 1);
        assert_eq!(outcome.snapshot.temperature, Some(27.3));

        let response = store.query().await;
        assert_eq!(response.current.temperature, Some(27.3));
        assert_eq!(response.current.humidity, Some(50.1));
        assert_eq!(response.alert.map(|a| a.kind), Some(AlertKind::Warning));
        assert_eq!(response.history.len(), 1);
        assert_eq!(response.history[0].temperature, 27.3);
        assert_eq!(response.history[0].humidity, 50.1);
    }

    #[tokio::test]
    async fn memory_only_update_without_ambient_records_nothing() {
        let store = TelemetryStore::new(SnapshotState::unseeded(), DEFAULT_CAPACITY);
        let patch = TelemetryPatch { free_memory_bytes: Some(204_800.0), ..TelemetryPatch::default() };

        let outcome = store.ingest(&patch).await;

        assert!(!outcome.sampled);
        assert_eq!(store.history_usage().await.0, 0);
        assert_eq!(store.snapshot().await.memory_use_label, "200.00KB");

        let response = store.query().await;
        assert_eq!(response.current.temperature, None);
        assert!(response.alert.is_none());
        assert!(response.history.is_empty());
    }

    #[tokio::test]
    async fn every_ingest_samples_when_ambient_is_known() {
        let store = TelemetryStore::new(SnapshotState::default(), DEFAULT_CAPACITY);
        let patch = TelemetryPatch { cpu_usage_percent: Some(5.0), ..TelemetryPatch::default() };

        store.ingest(&patch).await;
        store.ingest(&patch).await;

        let history = store.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|s| s.temperature == 23.5 && s.humidity == 45.2));
        assert!(history[0].timestamp <= history[1].timestamp);
    }

    #[tokio::test]
    async fn history_keeps_most_recent_samples_in_call_order() {
        let store = TelemetryStore::new(SnapshotState::unseeded(), 10);
        for i in 0..25 {
            store.ingest(&ambient(i as f64, 40.0)).await;
        }

        let temps: Vec<f64> = store.history().await.iter().map(|s| s.temperature).collect();
        assert_eq!(temps, (15..25).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn huge_reading_still_serializes_as_number() {
        let store = TelemetryStore::new(SnapshotState::unseeded(), DEFAULT_CAPACITY);
        let outcome = store.ingest(&ambient(1.7e308, 50.0)).await;
        assert!(outcome.sampled);

        let json = serde_json::to_value(store.query().await).unwrap();

        assert_eq!(json["current"]["temperature"].as_f64(), Some(1.7e308));
        assert_eq!(json["history"][0]["temperature"].as_f64(), Some(1.7e308));
        assert_eq!(json["history"][0]["humidity"].as_f64(), Some(50.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn outcome_reports_its_own_merge() {
        let store = Arc::new(TelemetryStore::new(SnapshotState::unseeded(), 16));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for i in 0..100 {
                        let v = (w * 1000 + i) as f64;
                        let outcome = store.ingest(&ambient(v, v)).await;
                        assert_eq!(outcome.snapshot.temperature, Some(v));
                        assert_eq!(outcome.snapshot.humidity, Some(v));
                    }
                })
            })
            .collect();

        for handle in writers {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn current_values_are_rounded_for_display() {
        let store = TelemetryStore::new(SnapshotState::default(), DEFAULT_CAPACITY);
        store.ingest(&ambient(26.01, 44.449)).await;

        let response = store.query().await;
        assert_eq!(response.current.temperature, Some(26.0));
        assert_eq!(response.current.humidity, Some(44.4));
        assert_eq!(response.alert.map(|a| a.kind), Some(AlertKind::Warning));
    }

    #[tokio::test]
    async fn last_updated_is_fresh_per_query() {
        let store = TelemetryStore::new(SnapshotState::default(), DEFAULT_CAPACITY);
        let before = Utc::now();

        let stamp = store.query().await.current.last_updated;
        let parsed = DateTime::parse_from_rfc3339(&stamp).unwrap();

        assert!(stamp.ends_with('Z'));
        assert!(parsed.timestamp_millis() >= before.timestamp_millis());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_half_an_ingest() {
        let store = Arc::new(TelemetryStore::new(SnapshotState::unseeded(), 64));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for i in 0..200 {
                        let v = (w * 1000 + i) as f64;
                        store.ingest(&ambient(v, v)).await;
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let response = store.query().await;
                        assert!(response.history.len() <= 64);
                        if let Some(last) = response.history.last() {
                            assert_eq!(response.current.temperature, Some(last.temperature));
                            assert_eq!(response.current.humidity, Some(last.humidity));
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.await.unwrap();
        }
        assert_eq!(store.history_usage().await, (64, 64));
    }
}
