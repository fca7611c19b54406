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

//! IP-derived observer location.
//!
//! Two-step lookup: the caller's public IP from ipify, then the ipapi.co
//! record for that IP. Unlike the poll path, failures here propagate to the
//! caller; this fetch is user-triggered and retryable.

use serde::{Deserialize, Serialize};

/// Observer location resolved from the public IP.
#[derive(Debug, Clone, Serialize)]
pub struct LocationInfo {
    /// Public IP address the lookup was made for.
    pub ip: String,
    /// Resolved city name, `"Unknown"` when the provider omits it.
    pub city: String,
    /// Resolved country name, `"Unknown"` when the provider omits it.
    #[serde(rename = "country_name")]
    pub country: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LocationInfo {
    /// A location pinned to fixed coordinates, used for overrides and
    /// fallbacks where no lookup happened.
    #[must_use]
    pub fn fixed(latitude: f64, longitude: f64) -> Self {
        Self {
            ip: "unknown".to_string(),
            city: "Unknown".to_string(),
            country: "Unknown".to_string(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpifyResponse {
    ip: String,
}

#[derive(Debug, Deserialize)]
struct IpapiResponse {
    city: Option<String>,
    country_name: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// Resolve the observer's IP-derived location.
pub async fn lookup(client: &reqwest::Client) -> Result<LocationInfo, reqwest::Error> {
    let ip = client
        .get("https://api.ipify.org?format=json")
        .send()
        .await?
        .error_for_status()?
        .json::<IpifyResponse>()
        .await?
        .ip;

    let record = client
        .get(format!("https://ipapi.co/{ip}/json/"))
        .send()
        .await?
        .error_for_status()?
        .json::<IpapiResponse>()
        .await?;

    Ok(LocationInfo {
        ip,
        city: record.city.unwrap_or_else(|| "Unknown".to_string()),
        country: record
            .country_name
            .unwrap_or_else(|| "Unknown".to_string()),
        latitude: record.latitude,
        longitude: record.longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_location() {
        let location = LocationInfo::fixed(51.5, -0.1);
        assert_eq!(location.latitude, 51.5);
        assert_eq!(location.longitude, -0.1);
        assert_eq!(location.city, "Unknown");
    }

    #[test]
    fn test_location_serializes_provider_shape() {
        let location = LocationInfo {
            ip: "203.0.113.7".to_string(),
            city: "London".to_string(),
            country: "United Kingdom".to_string(),
            latitude: 51.5074,
            longitude: -0.1278,
        };

        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["ip"], "203.0.113.7");
        assert_eq!(json["country_name"], "United Kingdom");
        assert!(json.get("country").is_none());
    }

    #[test]
    fn test_ipapi_record_decodes_with_missing_city() {
        let record: IpapiResponse = serde_json::from_str(
            r#"{"country_name": "United Kingdom", "latitude": 51.5, "longitude": -0.1}"#,
        )
        .unwrap();
        assert!(record.city.is_none());
        assert_eq!(record.latitude, 51.5);
    }
}
