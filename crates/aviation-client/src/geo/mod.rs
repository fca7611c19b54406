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

//! Spherical geometry for the overlay map.
//!
//! Bounding boxes, great-circle distance, and great-circle path sampling on
//! a spherical Earth model. Coordinates are `(latitude, longitude)` pairs in
//! degrees throughout. These functions do not validate their inputs; NaN in
//! means NaN out, and the caller decides what a usable coordinate is.

use serde::Serialize;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default number of samples in a great-circle path.
pub const DEFAULT_PATH_STEPS: usize = 100;

/// A latitude/longitude rectangle approximating a circular coverage area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    /// Western edge in degrees.
    pub min_lon: f64,
    /// Eastern edge in degrees.
    pub max_lon: f64,
}

/// Compute the bounding box of a coverage circle around a center point.
///
/// The longitude delta is divided by the cosine of the center latitude so
/// the box tracks a circle of `radius_km` on the sphere instead of an
/// ellipse stretched at high latitudes.
#[must_use]
pub fn bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
    let lon_delta = lat_delta / lat.to_radians().cos();

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Great-circle distance between two points in kilometers (haversine).
///
/// Symmetric: `distance_km(a, b) == distance_km(b, a)`.
#[must_use]
pub fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Sample `steps` points along the shortest spherical path from `start` to
/// `end`, endpoints included.
///
/// Pure: identical inputs always produce the identical sequence. A
/// degenerate path (`start == end`) yields `steps` copies of `start`.
#[must_use]
pub fn great_circle_path(start: (f64, f64), end: (f64, f64), steps: usize) -> Vec<(f64, f64)> {
    if steps == 0 {
        return Vec::new();
    }

    let d = central_angle(start, end);
    let sin_d = d.sin();
    if sin_d.abs() < f64::EPSILON {
        return vec![start; steps];
    }

    let lat1 = start.0.to_radians();
    let lon1 = start.1.to_radians();
    let lat2 = end.0.to_radians();
    let lon2 = end.1.to_radians();

    (0..steps)
        .map(|i| {
            let f = if steps == 1 {
                0.0
            } else {
                i as f64 / (steps - 1) as f64
            };
            let a = ((1.0 - f) * d).sin() / sin_d;
            let b = (f * d).sin() / sin_d;

            let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
            let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
            let z = a * lat1.sin() + b * lat2.sin();

            let lat = z.atan2(x.hypot(y));
            let lon = y.atan2(x);
            (lat.to_degrees(), lon.to_degrees())
        })
        .collect()
}

/// Central angle between two points in radians (haversine form).
fn central_angle(a: (f64, f64), b: (f64, f64)) -> f64 {
    let lat1 = a.0.to_radians();
    let lat2 = b.0.to_radians();
    let delta_lat = (b.0 - a.0).to_radians();
    let delta_lon = (b.1 - a.1).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}
