// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Refresh coordination for the live overlay.
//!
//! The coordinator owns the poll timer and the published snapshot. Each tick
//! recomputes the bounding box from the current center, fetches flights,
//! derives a path for every positioned flight, and atomically replaces the
//! snapshot seen by subscribers. The poll is awaited inside the tick loop,
//! so at most one fetch is ever in flight; a slow poll coalesces ticks
//! instead of stacking requests.
//!
//! Teardown cancels the timer. A poll already in flight is allowed to
//! finish, but its result is checked against the cancellation token and
//! discarded rather than published stale.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::feed::FlightEntity;
use crate::geo;
use crate::service::{AviationService, FeedTransport};

/// Default flight feed poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Derived great-circle path from the observer's center to one flight.
///
/// Recomputed from scratch every tick; never persisted or interpolated
/// between ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightPath {
    /// The `FlightEntity::id` this path belongs to.
    pub flight_id: String,
    /// Ordered `(latitude, longitude)` samples, observer end first.
    pub coordinates: Vec<(f64, f64)>,
}

/// One complete published tick: flights plus their derived paths.
///
/// Replaces the previous snapshot wholesale; subscribers never observe a
/// partial update.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSnapshot {
    /// Flights decoded from this tick's feed response.
    pub flights: Vec<FlightEntity>,
    /// Paths for the flights that carried a usable position.
    pub paths: Vec<FlightPath>,
    /// When this tick's fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Poll generation, monotonically increasing from 1.
    pub generation: u64,
}

/// Configuration for the refresh coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Observer center `(latitude, longitude)` in degrees.
    pub center: (f64, f64),
    /// Coverage radius in kilometers.
    pub radius_km: f64,
    /// Flight feed poll interval.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            radius_km: 100.0,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Handle to a spawned refresh task.
///
/// The task polls until `shutdown()` is called or the handle is dropped.
pub struct RefreshCoordinator {
    snapshot_rx: watch::Receiver<Option<RefreshSnapshot>>,
    center_tx: watch::Sender<(f64, f64)>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("center", &*self.center_tx.borrow())
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Spawn the poll task and return its handle.
    ///
    /// The first poll fires immediately; subsequent polls follow the
    /// configured interval.
    #[must_use]
    pub fn spawn<T>(service: AviationService<T>, config: CoordinatorConfig) -> Self
    where
        T: FeedTransport + 'static,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (center_tx, center_rx) = watch::channel(config.center);
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        tokio::spawn(async move {
            poll_loop(service, config, snapshot_tx, center_rx, task_cancel).await;
        });

        Self {
            snapshot_rx,
            center_tx,
            cancel_token,
        }
    }

    /// Subscribe to published snapshots.
    ///
    /// The receiver holds `None` until the first tick completes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<RefreshSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Latest published snapshot, if any tick has completed.
    #[must_use]
    pub fn latest(&self) -> Option<RefreshSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Move the observer center; the next tick recomputes the bounding box.
    pub fn set_center(&self, lat: f64, lon: f64) {
        let _ = self.center_tx.send((lat, lon));
    }

    /// Current observer center.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        *self.center_tx.borrow()
    }

    /// Stop polling.
    ///
    /// The pending timer is cancelled; a poll already in flight completes
    /// but its result is discarded.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for RefreshCoordinator {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn poll_loop<T>(
    service: AviationService<T>,
    config: CoordinatorConfig,
    snapshot_tx: watch::Sender<Option<RefreshSnapshot>>,
    center_rx: watch::Receiver<(f64, f64)>,
    cancel_token: CancellationToken,
) where
    T: FeedTransport,
{
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut generation: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = cancel_token.cancelled() => {
                info!("Refresh coordinator cancelled");
                return;
            }
        }

        generation += 1;
        let center = *center_rx.borrow();
        let bounds = geo::bounding_box(center.0, center.1, config.radius_km);
        let flights = service.flights_in_bounding_box(&bounds).await;

        // The fetch may have raced teardown; discard instead of publishing stale.
        if cancel_token.is_cancelled() {
            info!("Discarding poll result after shutdown");
            return;
        }

        let paths: Vec<FlightPath> = flights
            .iter()
            .filter(|flight| flight.has_position())
            .map(|flight| FlightPath {
                flight_id: flight.id.clone(),
                coordinates: service.flight_path(center, (flight.latitude, flight.longitude)),
            })
            .collect();

        debug!(
            "Tick {generation}: {} flights, {} paths",
            flights.len(),
            paths.len()
        );

        let snapshot = RefreshSnapshot {
            flights,
            paths,
            fetched_at: Utc::now(),
            generation,
        };
        if snapshot_tx.send(Some(snapshot)).is_err() {
            return; // All receivers dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    use crate::feed::FeedResponse;
    use crate::service::{FeedTransport, FetchError};
    use crate::weather::WeatherSample;
    use serde_json::json;

    /// Scripted transport: records queries, optionally blocks on a gate.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        payload: serde_json::Value,
        gate: Option<Arc<Notify>>,
        calls: Arc<AtomicUsize>,
        bounds_seen: Arc<Mutex<Vec<String>>>,
    }

    impl FeedTransport for ScriptedTransport {
        fn fetch_feed(
            &self,
            query: &[(&'static str, String)],
        ) -> impl Future<Output = Result<FeedResponse, FetchError>> + Send {
            let payload = self.payload.clone();
            let gate = self.gate.clone();
            let calls = Arc::clone(&self.calls);
            let bounds_seen = Arc::clone(&self.bounds_seen);
            let bounds = query
                .iter()
                .find(|(key, _)| *key == "bounds")
                .map(|(_, value)| value.clone())
                .unwrap_or_default();

            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                bounds_seen.lock().unwrap().push(bounds);
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                Ok(serde_json::from_value(payload).unwrap())
            }
        }

        fn fetch_weather(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> impl Future<Output = Result<WeatherSample, FetchError>> + Send {
            async move { Err(FetchError::Status(reqwest::StatusCode::NOT_FOUND)) }
        }
    }

    fn config() -> CoordinatorConfig {
        CoordinatorConfig {
            center: (51.5074, -0.1278),
            radius_km: 100.0,
            poll_interval: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_feed_publishes_empty_snapshot() {
        let transport = ScriptedTransport {
            payload: json!({ "full_count": 0, "version": 4 }),
            ..Default::default()
        };
        let coordinator = RefreshCoordinator::spawn(AviationService::new(transport), config());
        let mut snapshots = coordinator.subscribe();

        snapshots.changed().await.unwrap();
        let snapshot = snapshots.borrow().clone().unwrap();
        assert!(snapshot.flights.is_empty());
        assert!(snapshot.paths.is_empty());
        assert_eq!(snapshot.generation, 1);

        coordinator.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_derived_only_for_positioned_flights() {
        let transport = ScriptedTransport {
            payload: json!({
                "full_count": 2,
                "version": 4,
                "aaa111": ["UAL123", 52.0, 0.5, 90, 10000, 250],
                "bbb222": ["BAW456", null, null, 180, 9000, 230]
            }),
            ..Default::default()
        };
        let coordinator = RefreshCoordinator::spawn(AviationService::new(transport), config());
        let mut snapshots = coordinator.subscribe();

        snapshots.changed().await.unwrap();
        let snapshot = snapshots.borrow().clone().unwrap();
        assert_eq!(snapshot.flights.len(), 2);
        assert_eq!(snapshot.paths.len(), 1);
        assert_eq!(snapshot.paths[0].flight_id, "aaa111");

        let path = &snapshot.paths[0].coordinates;
        let first = path.first().unwrap();
        let last = path.last().unwrap();
        assert!((first.0 - 51.5074).abs() < 1e-9);
        assert!((last.0 - 52.0).abs() < 1e-9);

        coordinator.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_replaced_wholesale_each_tick() {
        let transport = ScriptedTransport {
            payload: json!({
                "aaa111": ["UAL123", 52.0, 0.5, 90, 10000, 250]
            }),
            ..Default::default()
        };
        let coordinator = RefreshCoordinator::spawn(AviationService::new(transport), config());
        let mut snapshots = coordinator.subscribe();

        snapshots.changed().await.unwrap();
        let first = snapshots.borrow().clone().unwrap();
        snapshots.changed().await.unwrap();
        let second = snapshots.borrow().clone().unwrap();

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert_eq!(second.flights.len(), 1);

        coordinator.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_inflight_poll() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport {
            payload: json!({
                "aaa111": ["UAL123", 52.0, 0.5, 90, 10000, 250]
            }),
            gate: Some(Arc::clone(&gate)),
            calls: Arc::clone(&calls),
            ..Default::default()
        };
        let coordinator = RefreshCoordinator::spawn(AviationService::new(transport), config());
        let snapshots = coordinator.subscribe();

        // Wait for the first poll to start, then tear down while it blocks.
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        coordinator.shutdown();
        gate.notify_one();

        // Give the released poll every chance to (incorrectly) publish.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(snapshots.borrow().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "timer fired after shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_center_recomputes_bounding_box() {
        let bounds_seen = Arc::new(Mutex::new(Vec::new()));
        let transport = ScriptedTransport {
            payload: json!({}),
            bounds_seen: Arc::clone(&bounds_seen),
            ..Default::default()
        };
        let coordinator = RefreshCoordinator::spawn(AviationService::new(transport), config());
        let mut snapshots = coordinator.subscribe();

        snapshots.changed().await.unwrap();
        coordinator.set_center(40.6413, -73.7781);
        snapshots.changed().await.unwrap();

        let seen = bounds_seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);

        coordinator.shutdown();
    }
}
