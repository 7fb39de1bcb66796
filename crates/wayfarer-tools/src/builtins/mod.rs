//! Built-in travel tools
//!
//! Each integration is enabled only when its credentials are present; a
//! missing key disables that integration's tools and nothing else.

mod flights;
mod hotels;
mod maps;
mod rail;

#[cfg(test)]
mod tests;

pub use flights::{
    AirportCodeTool, ConfirmFlightPriceTool, NearestAirportsTool, SearchFlightsTool,
    SeatAvailabilityTool,
};
pub use hotels::{HotelDetailsTool, SearchHotelsTool};
pub use maps::{
    AirQualityTool, FindPlacesTool, MapsEndpoints, OptimizeDayTripTool, PlaceDetailsTool,
    RouteTool, WeatherForecastTool,
};
pub use rail::{SearchTrainsTool, TrainSeatsTool, TrainStatusTool};

use crate::api_client::{ApiClient, Credentials};
use crate::error::{Error, Result};
use crate::registry::ToolRegistry;
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Amadeus sandbox
pub const DEFAULT_AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";
/// Amadeus OAuth2 token path
pub const AMADEUS_TOKEN_PATH: &str = "/v1/security/oauth2/token";
/// Currency for fares when none is configured
pub const DEFAULT_CURRENCY: &str = "INR";
/// RapidAPI host of the Indian Railways API
pub const DEFAULT_RAIL_HOST: &str = "irctc1.p.rapidapi.com";

/// Amadeus flight/hotel integration settings
#[derive(Debug, Clone)]
pub struct AmadeusSettings {
    /// API root
    pub base_url: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: SecretString,
    /// Fare currency
    pub currency: String,
}

impl AmadeusSettings {
    /// Read `AMADEUS_CLIENT_ID`, `AMADEUS_CLIENT_SECRET`, `AMADEUS_BASE_URL`
    /// and `AMADEUS_CURRENCY`. `None` when either credential is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = non_empty_env("AMADEUS_CLIENT_ID")?;
        let client_secret = non_empty_env("AMADEUS_CLIENT_SECRET")?;
        Some(Self {
            base_url: non_empty_env("AMADEUS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AMADEUS_BASE_URL.to_string()),
            client_id,
            client_secret: SecretString::from(client_secret),
            currency: non_empty_env("AMADEUS_CURRENCY")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        })
    }
}

/// Google Maps Platform settings
#[derive(Debug, Clone)]
pub struct MapsSettings {
    /// API key
    pub api_key: SecretString,
    /// Endpoint URLs
    pub endpoints: MapsEndpoints,
}

impl MapsSettings {
    /// Read `GOOGLE_MAPS_API_KEY`
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: SecretString::from(non_empty_env("GOOGLE_MAPS_API_KEY")?),
            endpoints: MapsEndpoints::default(),
        })
    }
}

/// Indian Railways (RapidAPI) settings
#[derive(Debug, Clone)]
pub struct RailSettings {
    /// RapidAPI key
    pub api_key: SecretString,
    /// RapidAPI host header value
    pub host: String,
    /// API root
    pub base_url: String,
}

impl RailSettings {
    /// Read `RAIL_API_KEY` and `RAIL_API_HOST`
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = non_empty_env("RAIL_API_KEY")?;
        let host = non_empty_env("RAIL_API_HOST").unwrap_or_else(|| DEFAULT_RAIL_HOST.to_string());
        Some(Self {
            api_key: SecretString::from(api_key),
            base_url: format!("https://{host}"),
            host,
        })
    }
}

/// Credentials for every integration; `None` disables one
#[derive(Debug, Clone, Default)]
pub struct TravelSettings {
    /// Flights and hotels
    pub amadeus: Option<AmadeusSettings>,
    /// Places, routes, weather and air quality
    pub maps: Option<MapsSettings>,
    /// Trains
    pub rail: Option<RailSettings>,
}

impl TravelSettings {
    /// Read all integrations from the environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            amadeus: AmadeusSettings::from_env(),
            maps: MapsSettings::from_env(),
            rail: RailSettings::from_env(),
        }
    }
}

/// Register every configured integration's tools
pub fn register_builtins(registry: &mut ToolRegistry, settings: &TravelSettings) -> Result<()> {
    match &settings.amadeus {
        Some(amadeus) => {
            let client = Arc::new(ApiClient::new(
                "amadeus",
                &amadeus.base_url,
                Credentials::ClientCredentials {
                    token_url: AMADEUS_TOKEN_PATH.to_string(),
                    client_id: amadeus.client_id.clone(),
                    client_secret: amadeus.client_secret.clone(),
                },
            )?);
            registry.register(Arc::new(SearchFlightsTool::new(
                client.clone(),
                &amadeus.currency,
            )));
            registry.register(Arc::new(AirportCodeTool::new(client.clone())));
            registry.register(Arc::new(NearestAirportsTool::new(client.clone())));
            registry.register(Arc::new(ConfirmFlightPriceTool::new(client.clone())));
            registry.register(Arc::new(SeatAvailabilityTool::new(client.clone())));
            registry.register(Arc::new(SearchHotelsTool::new(client.clone())));
            registry.register(Arc::new(HotelDetailsTool::new(client)));
            info!(base_url = %amadeus.base_url, "Amadeus flight and hotel tools enabled");
        }
        None => warn!("AMADEUS_CLIENT_ID/AMADEUS_CLIENT_SECRET not set; flight and hotel tools disabled"),
    }

    match &settings.maps {
        Some(maps) => {
            let client = Arc::new(ApiClient::new(
                "google_maps",
                &maps.endpoints.place_details,
                Credentials::ApiKey {
                    header: "X-Goog-Api-Key".to_string(),
                    key: maps.api_key.clone(),
                },
            )?);
            let endpoints = Arc::new(maps.endpoints.clone());
            registry.register(Arc::new(FindPlacesTool::new(client.clone(), endpoints.clone())));
            registry.register(Arc::new(PlaceDetailsTool::new(client.clone(), endpoints.clone())));
            registry.register(Arc::new(RouteTool::new(client.clone(), endpoints.clone())));
            registry.register(Arc::new(OptimizeDayTripTool::new(
                client.clone(),
                endpoints.clone(),
            )));
            registry.register(Arc::new(WeatherForecastTool::new(
                client.clone(),
                endpoints.clone(),
            )));
            registry.register(Arc::new(AirQualityTool::new(client, endpoints)));
            info!("Google Maps place, route and weather tools enabled");
        }
        None => warn!("GOOGLE_MAPS_API_KEY not set; place, route and weather tools disabled"),
    }

    match &settings.rail {
        Some(rail) => {
            let client = Arc::new(
                ApiClient::new(
                    "rail",
                    &rail.base_url,
                    Credentials::ApiKey {
                        header: "x-rapidapi-key".to_string(),
                        key: rail.api_key.clone(),
                    },
                )?
                .with_header("x-rapidapi-host", &rail.host),
            );
            registry.register(Arc::new(SearchTrainsTool::new(client.clone())));
            registry.register(Arc::new(TrainStatusTool::new(client.clone())));
            registry.register(Arc::new(TrainSeatsTool::new(client)));
            info!(host = %rail.host, "Rail tools enabled");
        }
        None => warn!("RAIL_API_KEY not set; train tools disabled"),
    }

    Ok(())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("Missing '{key}' parameter")))
}

pub(crate) fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn optional_u64(input: &Value, key: &str) -> Option<u64> {
    input.get(key).and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

pub(crate) fn optional_f64(input: &Value, key: &str) -> Option<f64> {
    input.get(key).and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// Validate a `YYYY-MM-DD` date argument
pub(crate) fn required_date<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    let value = required_str(input, key)?;
    parse_date(key, value)?;
    Ok(value)
}

pub(crate) fn parse_date(key: &str, value: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        Error::InvalidInput(format!("'{key}' must be a date in YYYY-MM-DD format, got '{value}'"))
    })
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
