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

//! Decoding of the upstream flight feed format.
//!
//! The provider answers a bounded-box query with one JSON object mapping
//! opaque record keys to either scalar metadata (`full_count`, `version`) or
//! a positional array describing one aircraft. Fields live at fixed indices
//! in that array.
//!
//! Decoding is tolerant per field, never per record: a null or malformed
//! slot becomes a default (`0` for numbers, `"Unknown"` for strings) so the
//! number of decoded entities always matches the number of record keys in
//! the response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel for display fields the feed did not populate.
pub const UNKNOWN: &str = "Unknown";

/// Response keys that carry metadata rather than aircraft records.
const METADATA_KEYS: [&str; 2] = ["full_count", "version"];

// Field positions in a feed record array.
const IDX_CALLSIGN: usize = 0;
const IDX_LATITUDE: usize = 1;
const IDX_LONGITUDE: usize = 2;
const IDX_HEADING: usize = 3;
const IDX_ALTITUDE: usize = 4;
const IDX_SPEED: usize = 5;
const IDX_AIRLINE: usize = 8;
const IDX_AIRCRAFT: usize = 9;
const IDX_ORIGIN: usize = 11;
const IDX_DESTINATION: usize = 12;
const IDX_STATUS: usize = 14;

/// One value in the upstream response: a positional record or metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedEntry {
    /// Positional array describing one aircraft.
    Record(Vec<Value>),
    /// Scalar or object metadata (`full_count`, `version`, `stats`).
    Metadata(Value),
}

/// A complete upstream feed response.
///
/// Ordered map, so a given response always decodes to the same entity
/// sequence.
pub type FeedResponse = BTreeMap<String, FeedEntry>;

/// One observed aircraft at one point in time.
///
/// Constructed fresh from every poll and never mutated; the next poll's
/// batch supersedes it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightEntity {
    /// Opaque record key from the feed, stable within one response.
    pub id: String,
    /// Display callsign, `"Unknown"` when absent.
    pub callsign: String,
    /// Latitude in degrees; `0` when the record is incomplete.
    pub latitude: f64,
    /// Longitude in degrees; `0` when the record is incomplete.
    pub longitude: f64,
    /// Heading in degrees, clockwise from north (0-360).
    pub heading: f64,
    /// Altitude as reported by the feed, passed through unconverted.
    pub altitude: f64,
    /// Speed as reported by the feed, passed through unconverted.
    pub speed: f64,
    /// Aircraft type designator, `"Unknown"` when absent.
    pub aircraft: String,
    /// Operating airline, `"Unknown"` when absent.
    pub airline: String,
    /// Origin airport code, `"Unknown"` when absent.
    pub origin: String,
    /// Destination airport code, `"Unknown"` when absent.
    pub destination: String,
    /// Flight status text, `"Unknown"` when absent.
    pub status: String,
}

impl FlightEntity {
    /// Whether the record carried a usable position.
    ///
    /// The feed leaves both coordinates at zero for incomplete records, so
    /// (0, 0) counts as "no position".
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

/// Decode an upstream response into flight entities.
///
/// Metadata keys produce nothing; every record key yields exactly one
/// entity, however malformed its slots.
#[must_use]
pub fn decode(response: &FeedResponse) -> Vec<FlightEntity> {
    response
        .iter()
        .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
        .filter_map(|(key, entry)| match entry {
            FeedEntry::Record(fields) => Some(decode_record(key, fields)),
            FeedEntry::Metadata(_) => None,
        })
        .collect()
}

fn decode_record(key: &str, fields: &[Value]) -> FlightEntity {
    FlightEntity {
        id: key.to_string(),
        callsign: string_at(fields, IDX_CALLSIGN),
        latitude: number_at(fields, IDX_LATITUDE),
        longitude: number_at(fields, IDX_LONGITUDE),
        heading: number_at(fields, IDX_HEADING),
        altitude: number_at(fields, IDX_ALTITUDE),
        speed: number_at(fields, IDX_SPEED),
        airline: string_at(fields, IDX_AIRLINE),
        aircraft: string_at(fields, IDX_AIRCRAFT),
        origin: string_at(fields, IDX_ORIGIN),
        destination: string_at(fields, IDX_DESTINATION),
        status: string_at(fields, IDX_STATUS),
    }
}

/// Numeric slot, `0` when null, absent, or non-numeric.
fn number_at(fields: &[Value], index: usize) -> f64 {
    fields.get(index).and_then(Value::as_f64).unwrap_or(0.0)
}

/// String slot, `"Unknown"` when null, absent, or empty.
fn string_at(fields: &[Value], index: usize) -> String {
    fields
        .get(index)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map_or_else(|| UNKNOWN.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> FeedResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_full_record() {
        let response = response(json!({
            "full_count": 5,
            "version": 1,
            "abc123": [
                "UAL123", 51.5, -0.1, 90, 10000, 250, null, null,
                "United", "B738", null, "JFK", "LHR", null, "Scheduled"
            ]
        }));

        let flights = decode(&response);
        assert_eq!(flights.len(), 1);

        let flight = &flights[0];
        assert_eq!(flight.id, "abc123");
        assert_eq!(flight.callsign, "UAL123");
        assert_eq!(flight.latitude, 51.5);
        assert_eq!(flight.longitude, -0.1);
        assert_eq!(flight.heading, 90.0);
        assert_eq!(flight.altitude, 10000.0);
        assert_eq!(flight.speed, 250.0);
        assert_eq!(flight.airline, "United");
        assert_eq!(flight.aircraft, "B738");
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.destination, "LHR");
        assert_eq!(flight.status, "Scheduled");
    }

    #[test]
    fn test_metadata_keys_produce_no_entities() {
        let response = response(json!({ "full_count": 42, "version": 4 }));
        assert!(decode(&response).is_empty());
    }

    #[test]
    fn test_non_array_values_are_skipped() {
        let response = response(json!({
            "stats": { "total": { "ads-b": 12 } },
            "abc123": ["UAL123", 51.5, -0.1, 90, 10000, 250]
        }));
        assert_eq!(decode(&response).len(), 1);
    }

    #[test]
    fn test_null_callsign_defaults_to_unknown() {
        let response = response(json!({
            "abc123": [null, 51.5, -0.1, 90, 10000, 250]
        }));
        assert_eq!(decode(&response)[0].callsign, UNKNOWN);
    }

    #[test]
    fn test_empty_string_defaults_to_unknown() {
        let response = response(json!({
            "abc123": ["", 51.5, -0.1, 90, 10000, 250, null, null, ""]
        }));
        let flight = &decode(&response)[0];
        assert_eq!(flight.callsign, UNKNOWN);
        assert_eq!(flight.airline, UNKNOWN);
    }

    #[test]
    fn test_null_numeric_defaults_to_zero() {
        let response = response(json!({
            "abc123": ["UAL123", null, null, null, null, null]
        }));
        let flight = &decode(&response)[0];
        assert_eq!(flight.latitude, 0.0);
        assert_eq!(flight.longitude, 0.0);
        assert_eq!(flight.heading, 0.0);
        assert_eq!(flight.altitude, 0.0);
        assert_eq!(flight.speed, 0.0);
        assert!(!flight.has_position());
    }

    #[test]
    fn test_short_record_never_drops() {
        let response = response(json!({ "abc123": ["UAL123"] }));
        let flights = decode(&response);
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].callsign, "UAL123");
        assert_eq!(flights[0].destination, UNKNOWN);
    }

    #[test]
    fn test_entity_count_matches_record_count() {
        let response = response(json!({
            "full_count": 3,
            "version": 4,
            "a1": ["AAA111", 51.0, 0.1, 0, 0, 0],
            "b2": [null, null, null],
            "c3": ["CCC333", 52.0, 0.3, 180, 9000, 220]
        }));
        assert_eq!(decode(&response).len(), 3);
    }

    #[test]
    fn test_has_position_requires_both_coordinates() {
        let on_equator = FlightEntity {
            latitude: 0.0,
            longitude: 12.5,
            ..decoded_stub()
        };
        assert!(!on_equator.has_position());

        let positioned = FlightEntity {
            latitude: 51.5,
            longitude: -0.1,
            ..decoded_stub()
        };
        assert!(positioned.has_position());
    }

    fn decoded_stub() -> FlightEntity {
        let response = response(json!({ "abc123": [] }));
        decode(&response).remove(0)
    }
}
