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

//! Client library for a live aviation map overlay.
//!
//! This library polls a bounded-box aircraft position feed, decodes the
//! provider's positional-array records into typed flight entities, derives
//! great-circle paths for rendering, and publishes one consistent snapshot
//! per refresh tick. It supports multiple layers that can be used
//! independently or composed together:
//!
//! - **Geometry layer**: bounding boxes, distances, and great-circle path
//!   sampling ([`geo`])
//! - **Feed layer**: positional-record decoding with per-field defaulting
//!   ([`feed`])
//! - **Service layer**: async fetch orchestration over an injectable
//!   transport ([`service`])
//! - **Coordinator layer**: the poll timer and atomic snapshot publication
//!   ([`coordinator`])
//! - **Weather layer**: on-demand point samples and the simulated overlay
//!   ticker ([`weather`])
//!
//! # Quick Start
//!
//! Spawn a [`RefreshCoordinator`] over a service for full-stack operation:
//!
//! ```no_run
//! use aviation_client::{
//!     AviationService, CoordinatorConfig, HttpFeedTransport, RefreshCoordinator,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = HttpFeedTransport::new("http://localhost:3000/api/flights", "");
//!     let service = AviationService::new(transport);
//!     let coordinator = RefreshCoordinator::spawn(
//!         service,
//!         CoordinatorConfig {
//!             center: (51.5074, -0.1278),
//!             radius_km: 100.0,
//!             ..Default::default()
//!         },
//!     );
//!
//!     let mut snapshots = coordinator.subscribe();
//!     while snapshots.changed().await.is_ok() {
//!         if let Some(snapshot) = snapshots.borrow().clone() {
//!             println!("{} flights at {}", snapshot.flights.len(), snapshot.fetched_at);
//!         }
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! The decoder and geometry utilities have no async machinery and can be
//! used on their own:
//!
//! ```
//! use aviation_client::{feed, geo};
//!
//! let bounds = geo::bounding_box(51.5074, -0.1278, 100.0);
//! assert!(bounds.min_lat < 51.5074 && 51.5074 < bounds.max_lat);
//!
//! let response: feed::FeedResponse = serde_json::from_str(
//!     r#"{"full_count": 1, "version": 4,
//!         "abc123": ["UAL123", 51.5, -0.1, 90, 10000, 250]}"#,
//! )
//! .unwrap();
//! let flights = feed::decode(&response);
//! assert_eq!(flights[0].callsign, "UAL123");
//! ```

pub mod coordinator;
pub mod feed;
pub mod geo;
pub mod service;
pub mod weather;

pub use coordinator::{CoordinatorConfig, FlightPath, RefreshCoordinator, RefreshSnapshot};
pub use feed::{FeedEntry, FeedResponse, FlightEntity};
pub use geo::BoundingBox;
pub use service::{AviationService, FeedTransport, FetchError, HttpFeedTransport};
pub use weather::{WeatherCell, WeatherSample, WeatherTicker};
