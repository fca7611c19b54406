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

//! Weather data for the overlay.
//!
//! Point samples come from the OpenWeatherMap current-weather API on demand
//! (when a flight is selected); the simulated overlay cells refresh on their
//! own timer, independent of the flight poll interval.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Environment variable consulted before any configured API key.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Default refresh interval for the simulated overlay.
pub const DEFAULT_OVERLAY_INTERVAL: Duration = Duration::from_secs(5);

/// Point-in-time weather at a coordinate, metric units.
///
/// Fetched on demand and never cached; each marker interaction triggers a
/// fresh lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSample {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Wind speed in meters per second.
    pub wind_speed: f64,
    /// Wind direction in degrees.
    pub wind_direction: f64,
    /// Visibility in meters.
    pub visibility: f64,
    /// Rain volume over the last hour in millimeters, `0` when dry.
    pub precipitation: f64,
    /// Cloud cover percentage.
    pub cloud_cover: f64,
}

/// Wire shape of the OpenWeatherMap current-weather response.
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    main: WeatherMain,
    wind: WeatherWind,
    #[serde(default)]
    visibility: f64,
    #[serde(default)]
    rain: Option<WeatherRain>,
    clouds: WeatherClouds,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherRain {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherClouds {
    all: f64,
}

impl From<CurrentWeatherResponse> for WeatherSample {
    fn from(payload: CurrentWeatherResponse) -> Self {
        Self {
            temperature: payload.main.temp,
            wind_speed: payload.wind.speed,
            wind_direction: payload.wind.deg,
            visibility: payload.visibility,
            precipitation: payload.rain.map_or(0.0, |rain| rain.one_hour),
            cloud_cover: payload.clouds.all,
        }
    }
}

/// Resolve the OpenWeatherMap API key.
///
/// The environment variable takes precedence over the configured value;
/// empty strings count as absent either way.
#[must_use]
pub fn resolve_api_key(config_key: Option<&str>) -> Option<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            return Some(key);
        }
    }

    config_key.map(str::to_string).filter(|key| !key.is_empty())
}

/// One simulated weather phenomenon drawn as a circle overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherCell {
    /// Stable cell identifier.
    pub id: String,
    /// Phenomenon kind, e.g. `"rain"`.
    pub kind: String,
    /// Intensity in `0.0..=1.0`; the renderer scales circle radius from it.
    pub intensity: f64,
    /// Cell center `(latitude, longitude)` in degrees.
    pub coordinates: (f64, f64),
}

/// Simulated overlay cells for the current instant.
///
/// Stands in for a licensed radar product in the demo.
#[must_use]
pub fn simulated_cells() -> Vec<WeatherCell> {
    vec![WeatherCell {
        id: "1".to_string(),
        kind: "rain".to_string(),
        intensity: 0.7,
        coordinates: (51.5074, -0.1278),
    }]
}

/// Handle to the simulated-overlay refresh task.
///
/// Runs on its own interval; never coordinated with the flight poll timer.
pub struct WeatherTicker {
    cells_rx: watch::Receiver<Vec<WeatherCell>>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for WeatherTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherTicker")
            .field("cell_count", &self.cells_rx.borrow().len())
            .finish_non_exhaustive()
    }
}

impl WeatherTicker {
    /// Spawn the overlay task refreshing every `refresh_interval`.
    #[must_use]
    pub fn spawn(refresh_interval: Duration) -> Self {
        let (cells_tx, cells_rx) = watch::channel(Vec::new());
        let cancel_token = CancellationToken::new();
        let task_cancel = cancel_token.clone();

        tokio::spawn(async move {
            let mut ticker = interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = task_cancel.cancelled() => return,
                }

                if cells_tx.send(simulated_cells()).is_err() {
                    return; // Receiver dropped
                }
            }
        });

        Self {
            cells_rx,
            cancel_token,
        }
    }

    /// Subscribe to overlay refreshes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<WeatherCell>> {
        self.cells_rx.clone()
    }

    /// Latest published cell set (empty before the first tick).
    #[must_use]
    pub fn latest(&self) -> Vec<WeatherCell> {
        self.cells_rx.borrow().clone()
    }

    /// Stop the overlay task.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for WeatherTicker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_current_weather() {
        let payload: CurrentWeatherResponse = serde_json::from_value(json!({
            "main": { "temp": 14.2, "pressure": 1012, "humidity": 81 },
            "wind": { "speed": 5.1, "deg": 240 },
            "visibility": 10000,
            "rain": { "1h": 0.3 },
            "clouds": { "all": 75 }
        }))
        .unwrap();

        let sample = WeatherSample::from(payload);
        assert_eq!(sample.temperature, 14.2);
        assert_eq!(sample.wind_speed, 5.1);
        assert_eq!(sample.wind_direction, 240.0);
        assert_eq!(sample.visibility, 10000.0);
        assert_eq!(sample.precipitation, 0.3);
        assert_eq!(sample.cloud_cover, 75.0);
    }

    #[test]
    fn test_decode_dry_weather_defaults_precipitation() {
        let payload: CurrentWeatherResponse = serde_json::from_value(json!({
            "main": { "temp": 25.0 },
            "wind": { "speed": 2.0 },
            "clouds": { "all": 0 }
        }))
        .unwrap();

        let sample = WeatherSample::from(payload);
        assert_eq!(sample.precipitation, 0.0);
        assert_eq!(sample.wind_direction, 0.0);
        assert_eq!(sample.visibility, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_publishes_cells() {
        let ticker = WeatherTicker::spawn(Duration::from_secs(5));
        let mut cells = ticker.subscribe();

        cells.changed().await.unwrap();
        let published = cells.borrow().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].kind, "rain");

        ticker.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_stops_after_shutdown() {
        let ticker = WeatherTicker::spawn(Duration::from_secs(5));
        let mut cells = ticker.subscribe();
        cells.changed().await.unwrap();

        ticker.shutdown();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!cells.has_changed().unwrap_or(false));
    }
}
