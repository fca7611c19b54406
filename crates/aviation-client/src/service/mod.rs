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

//! Flight data service.
//!
//! Orchestrates feed and weather fetches behind an injectable transport so
//! callers (and tests) decide how bytes reach the network. The service is an
//! explicitly constructed value with no global instance.
//!
//! Fetch failures degrade instead of propagating: the flight poll returns an
//! empty batch and the weather lookup returns `None`, because the refresh
//! loop must keep ticking through feed outages and a weather failure must
//! not break a marker interaction.

use std::future::Future;

use log::warn;
use thiserror::Error;

use crate::feed::{self, FeedResponse, FlightEntity};
use crate::geo::{self, BoundingBox};
use crate::weather::{CurrentWeatherResponse, WeatherSample};

/// Default OpenWeatherMap current-weather endpoint.
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Upstream age ceiling for feed records, in seconds.
const FEED_MAX_AGE_SECS: u32 = 14_400;

/// Errors surfaced by a transport implementation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Transport seam for the service.
///
/// Implementations fetch the raw payloads; the service owns decoding and
/// failure policy. Tests substitute a stub.
pub trait FeedTransport: Send + Sync {
    /// Fetch a feed response for the given query.
    fn fetch_feed(
        &self,
        query: &[(&'static str, String)],
    ) -> impl Future<Output = Result<FeedResponse, FetchError>> + Send;

    /// Fetch a point weather sample.
    fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<WeatherSample, FetchError>> + Send;
}

/// Build the fixed query for a bounded feed fetch.
///
/// Bounds serialize as `maxLat,minLat,minLon,maxLon` and every upstream
/// surveillance source flag is enabled, with a four-hour record age ceiling.
#[must_use]
pub fn feed_query(bounds: &BoundingBox) -> Vec<(&'static str, String)> {
    let mut params = vec![(
        "bounds",
        format!(
            "{},{},{},{}",
            bounds.max_lat, bounds.min_lat, bounds.min_lon, bounds.max_lon
        ),
    )];
    for flag in [
        "faa",
        "satellite",
        "mlat",
        "flarm",
        "adsb",
        "gnd",
        "air",
        "vehicles",
        "estimated",
    ] {
        params.push((flag, "1".to_string()));
    }
    params.push(("maxage", FEED_MAX_AGE_SECS.to_string()));
    params.push(("gliders", "1".to_string()));
    params.push(("stats", "1".to_string()));
    params
}

/// Client-facing service for flight and weather data.
///
/// Stateless: pure request/response with no caching or retained
/// connections. Construct one per consumer and clone freely.
#[derive(Debug, Clone)]
pub struct AviationService<T> {
    transport: T,
    path_steps: usize,
}

impl<T: FeedTransport> AviationService<T> {
    /// Create a service over the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_path_steps(transport, geo::DEFAULT_PATH_STEPS)
    }

    /// Create a service with a custom path sample count.
    ///
    /// Fewer steps trade path smoothness for payload size.
    #[must_use]
    pub fn with_path_steps(transport: T, path_steps: usize) -> Self {
        Self {
            transport,
            path_steps,
        }
    }

    /// Fetch all flights inside `bounds`.
    ///
    /// Any transport or upstream failure is logged and degrades to an empty
    /// batch; the caller keeps polling through outages.
    pub async fn flights_in_bounding_box(&self, bounds: &BoundingBox) -> Vec<FlightEntity> {
        let query = feed_query(bounds);
        match self.transport.fetch_feed(&query).await {
            Ok(response) => feed::decode(&response),
            Err(e) => {
                warn!("Error fetching flights: {e}");
                Vec::new()
            }
        }
    }

    /// Point weather lookup; `None` on any failure.
    pub async fn weather_at(&self, lat: f64, lon: f64) -> Option<WeatherSample> {
        match self.transport.fetch_weather(lat, lon).await {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!("Error fetching weather at ({lat:.4}, {lon:.4}): {e}");
                None
            }
        }
    }

    /// Great-circle path from the observer's center to a target position.
    #[must_use]
    pub fn flight_path(&self, center: (f64, f64), target: (f64, f64)) -> Vec<(f64, f64)> {
        geo::great_circle_path(center, target, self.path_steps)
    }

    /// Estimate a flight duration as `HH:MM` for a distance at an average
    /// speed. Non-positive speeds yield `"00:00"`.
    #[must_use]
    pub fn estimate_flight_time(&self, distance_km: f64, avg_speed_kmh: f64) -> String {
        let hours = distance_km / avg_speed_kmh;
        if !hours.is_finite() || hours <= 0.0 {
            return "00:00".to_string();
        }
        let total_minutes = (hours * 60.0).round() as i64;
        format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
    }
}

/// Production transport backed by `reqwest`.
///
/// The feed URL normally points at the application's own proxy endpoint,
/// which adds the headers the upstream provider requires.
#[derive(Debug, Clone)]
pub struct HttpFeedTransport {
    client: reqwest::Client,
    feed_url: String,
    weather_url: String,
    weather_api_key: String,
}

impl HttpFeedTransport {
    /// Create a transport for the given feed endpoint and weather API key.
    ///
    /// An empty key is allowed; the weather upstream rejects it and the
    /// failure degrades like any other.
    #[must_use]
    pub fn new(feed_url: impl Into<String>, weather_api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            feed_url: feed_url.into(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_api_key: weather_api_key.into(),
        }
    }

    /// Override the weather endpoint.
    #[must_use]
    pub fn with_weather_url(mut self, weather_url: impl Into<String>) -> Self {
        self.weather_url = weather_url.into();
        self
    }
}

impl FeedTransport for HttpFeedTransport {
    fn fetch_feed(
        &self,
        query: &[(&'static str, String)],
    ) -> impl Future<Output = Result<FeedResponse, FetchError>> + Send {
        async move {
            let response = self.client.get(&self.feed_url).query(query).send().await?;
            if !response.status().is_success() {
                return Err(FetchError::Status(response.status()));
            }
            Ok(response.json::<FeedResponse>().await?)
        }
    }

    fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<WeatherSample, FetchError>> + Send {
        async move {
            let response = self
                .client
                .get(&self.weather_url)
                .query(&[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("appid", self.weather_api_key.clone()),
                    ("units", "metric".to_string()),
                ])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(FetchError::Status(response.status()));
            }
            let payload = response.json::<CurrentWeatherResponse>().await?;
            Ok(WeatherSample::from(payload))
        }
    }
}
