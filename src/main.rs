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

mod config;
mod geolocate;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};

use aviation_client::coordinator::{CoordinatorConfig, RefreshCoordinator};
use aviation_client::service::{AviationService, HttpFeedTransport};
use aviation_client::weather::{self, WeatherTicker};

use config::AppConfig;
use geolocate::LocationInfo;
use server::AppState;

/// IP geolocation demo with a live aviation map overlay.
#[derive(Debug, Parser)]
#[command(name = "godeye", version, about)]
struct Args {
    /// Address to bind the HTTP server to
    #[arg(long)]
    listen: Option<String>,

    /// Observer latitude (skips IP geolocation when paired with --lon)
    #[arg(long)]
    lat: Option<f64>,

    /// Observer longitude (skips IP geolocation when paired with --lat)
    #[arg(long)]
    lon: Option<f64>,

    /// Coverage radius in kilometers
    #[arg(long)]
    radius: Option<f64>,

    /// Flight feed poll interval in seconds
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = AppConfig::load()?;
    if let Ok(path) = AppConfig::config_path() {
        info!("Config loaded from {}", path.display());
    }

    let listen_addr = args
        .listen
        .clone()
        .unwrap_or_else(|| config.listen_addr.clone());
    let radius_km = args.radius.unwrap_or(config.radius_km);
    let poll_interval = Duration::from_secs(args.interval.unwrap_or(config.poll_interval_secs));

    let client = reqwest::Client::new();
    let location = resolve_location(&args, &config, &client).await;
    info!(
        "Observer at {}, {} ({:.4}, {:.4})",
        location.city, location.country, location.latitude, location.longitude
    );

    // The service fetches through our own proxy endpoint, which supplies the
    // headers the upstream feed requires. The listen address may be a
    // wildcard bind, so connect back over loopback.
    let proxy_host = listen_addr.replace("0.0.0.0", "127.0.0.1");
    let api_key =
        weather::resolve_api_key(config.openweathermap_api_key.as_deref()).unwrap_or_default();
    let service = AviationService::new(HttpFeedTransport::new(
        format!("http://{proxy_host}/api/flights"),
        api_key,
    ));

    let coordinator = RefreshCoordinator::spawn(
        service.clone(),
        CoordinatorConfig {
            center: (location.latitude, location.longitude),
            radius_km,
            poll_interval,
        },
    );
    let ticker = WeatherTicker::spawn(Duration::from_secs(config.weather_interval_secs));

    let state = AppState {
        upstream_feed_url: config.upstream_feed_url.clone(),
        upstream_client: client,
        service,
        snapshots: coordinator.subscribe(),
        overlay: ticker.subscribe(),
        location: Arc::new(location),
    };

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("listening on {listen_addr}");
    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown();
    ticker.shutdown();
    Ok(())
}

/// Resolve the observer center: CLI override, then config override, then IP
/// geolocation. A failed lookup falls back to (0, 0) rather than aborting;
/// the overlay stays empty until a center is configured.
async fn resolve_location(
    args: &Args,
    config: &AppConfig,
    client: &reqwest::Client,
) -> LocationInfo {
    let override_center = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => config.override_center(),
    };

    if let Some((lat, lon)) = override_center {
        return LocationInfo::fixed(lat, lon);
    }

    match geolocate::lookup(client).await {
        Ok(location) => location,
        Err(e) => {
            warn!("IP geolocation failed: {e}; set override coordinates in the config or pass --lat/--lon");
            LocationInfo::fixed(0.0, 0.0)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
}
