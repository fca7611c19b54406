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

//! Application configuration management.
//!
//! This module handles persistent configuration storage using TOML format.
//! Every field carries a serde default so a partial config file loads
//! cleanly.

use serde::{Deserialize, Serialize};

/// Upstream flight feed the proxy endpoint forwards to.
pub const DEFAULT_FEED_URL: &str = "https://data-cloud.flightradar24.com/zones/fcgi/feed.js";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Coverage radius around the observer in kilometers
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,

    /// Flight feed poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Simulated weather overlay refresh interval in seconds
    #[serde(default = "default_weather_interval_secs")]
    pub weather_interval_secs: u64,

    /// Upstream flight feed URL the proxy forwards to
    #[serde(default = "default_feed_url")]
    pub upstream_feed_url: String,

    /// OpenWeatherMap API key (optional, env var takes precedence)
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// Override observer latitude (skips IP geolocation)
    #[serde(default)]
    pub override_latitude: Option<f64>,

    /// Override observer longitude (skips IP geolocation)
    #[serde(default)]
    pub override_longitude: Option<f64>,
}

// Default value functions for serde
fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_radius_km() -> f64 {
    100.0
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_weather_interval_secs() -> u64 {
    5
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            radius_km: default_radius_km(),
            poll_interval_secs: default_poll_interval_secs(),
            weather_interval_secs: default_weather_interval_secs(),
            upstream_feed_url: default_feed_url(),
            openweathermap_api_key: None,
            override_latitude: None,
            override_longitude: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating the default file on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load("godeye", "config")
    }

    /// Get the config file path for display to user
    pub fn config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path("godeye", "config")
    }

    /// Configured override center, when both coordinates are present
    #[must_use]
    pub fn override_center(&self) -> Option<(f64, f64)> {
        match (self.override_latitude, self.override_longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.radius_km, 100.0);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.weather_interval_secs, 5);
        assert!(config.override_center().is_none());
    }

    #[test]
    fn test_override_center_requires_both_coordinates() {
        let config = AppConfig {
            override_latitude: Some(51.5),
            ..Default::default()
        };
        assert!(config.override_center().is_none());

        let config = AppConfig {
            override_latitude: Some(51.5),
            override_longitude: Some(-0.1),
            ..Default::default()
        };
        assert_eq!(config.override_center(), Some((51.5, -0.1)));
    }
}
