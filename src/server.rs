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

//! HTTP surface: the flight-feed proxy and the renderer-facing endpoints.
//!
//! The proxy forwards a browser-shaped query to the upstream feed provider,
//! adding the headers the provider requires, and passes the JSON body
//! through verbatim. The remaining endpoints read the latest published
//! state: refresh snapshots, overlay cells, and the resolved location.

use std::sync::Arc;

use axum::extract::{Query, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::error;
use serde::Deserialize;
use tokio::sync::watch;

use aviation_client::coordinator::RefreshSnapshot;
use aviation_client::service::{AviationService, HttpFeedTransport};
use aviation_client::weather::{WeatherCell, WeatherSample};

use crate::geolocate::LocationInfo;

/// Shared state for the router.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Upstream feed URL the proxy forwards to.
    pub upstream_feed_url: String,
    /// Client used for upstream proxy calls.
    pub upstream_client: reqwest::Client,
    /// Service backing the on-demand weather endpoint.
    pub service: AviationService<HttpFeedTransport>,
    /// Latest snapshot published by the refresh coordinator.
    pub snapshots: watch::Receiver<Option<RefreshSnapshot>>,
    /// Latest simulated overlay cells.
    pub overlay: watch::Receiver<Vec<WeatherCell>>,
    /// Observer location resolved at startup.
    pub location: Arc<LocationInfo>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/flights", get(proxy_flights))
        .route("/api/snapshot", get(latest_snapshot))
        .route("/api/weather", get(weather_at))
        .route("/api/weather/overlay", get(weather_overlay))
        .route("/api/location", get(location))
        .with_state(state)
}

/// Extract a non-empty `bounds` value from a raw query string.
fn bounds_param(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "bounds" && !value.is_empty()).then_some(value)
    })
}

/// Proxy a feed request to the upstream provider.
///
/// The full query string is forwarded verbatim; the upstream rejects
/// requests without browser-looking headers, so the proxy supplies them.
async fn proxy_flights(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();

    if bounds_param(&query).is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Bounds parameter is required" })),
        )
            .into_response();
    }

    let url = format!("{}?{}", state.upstream_feed_url, query);
    match fetch_upstream(&state.upstream_client, &url).await {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, "public, max-age=30"),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Error fetching flight data: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch flight data" })),
            )
                .into_response()
        }
    }
}

/// Fetch the upstream body, treating non-2xx as failure.
async fn fetch_upstream(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    client
        .get(url)
        .header("Accept", "application/json")
        .header("Origin", "https://www.flightradar24.com")
        .header("Referer", "https://www.flightradar24.com/")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

/// Latest published refresh snapshot; `null` until the first tick lands.
async fn latest_snapshot(State(state): State<AppState>) -> Json<Option<RefreshSnapshot>> {
    Json(state.snapshots.borrow().clone())
}

#[derive(Debug, Deserialize)]
struct WeatherParams {
    lat: f64,
    lon: f64,
}

/// On-demand weather for a selected flight's position.
///
/// Always HTTP 200; a failed lookup serializes as `null` so a marker
/// interaction never surfaces an error.
async fn weather_at(
    State(state): State<AppState>,
    Query(params): Query<WeatherParams>,
) -> Json<Option<WeatherSample>> {
    Json(state.service.weather_at(params.lat, params.lon).await)
}

/// Latest simulated overlay cells.
async fn weather_overlay(State(state): State<AppState>) -> Json<Vec<WeatherCell>> {
    Json(state.overlay.borrow().clone())
}

/// Observer location resolved at startup.
async fn location(State(state): State<AppState>) -> Json<LocationInfo> {
    Json(state.location.as_ref().clone())
}
