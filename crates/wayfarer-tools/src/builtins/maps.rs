//! Google Maps Platform tools: places, routes, day trips, weather and air quality

use super::{elapsed_ms, optional_str, optional_u64, required_str};
use crate::api_client::ApiRequest;
use crate::error::{Error, Result};
use crate::registry::{Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::ApiClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";
const PLACES_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.rating,places.userRatingCount,places.types,places.location,places.priceLevel";
const PLACE_DETAILS_FIELD_MASK: &str = "id,displayName,formattedAddress,rating,\
userRatingCount,websiteUri,regularOpeningHours,editorialSummary,location";
const ROUTES_FIELD_MASK: &str =
    "routes.duration,routes.distanceMeters,routes.description,routes.localizedValues";
const DAY_TRIP_FIELD_MASK: &str = "routes.duration,routes.distanceMeters,\
routes.optimizedIntermediateWaypointIndex,routes.legs.duration,routes.legs.distanceMeters";
const TRAVEL_MODES: &[&str] = &["DRIVE", "WALK", "BICYCLE", "TRANSIT", "TWO_WHEELER"];
/// Routes cannot reorder waypoints for transit
const DAY_TRIP_MODES: &[&str] = &["DRIVE", "WALK", "BICYCLE", "TWO_WHEELER"];
const MAX_DAY_TRIP_STOPS: usize = 25;

/// Endpoint URLs for each Maps Platform API
#[derive(Debug, Clone)]
pub struct MapsEndpoints {
    /// Places text search
    pub place_search: String,
    /// Places root; the place id is appended
    pub place_details: String,
    /// Routes `computeRoutes`
    pub routes: String,
    /// Geocoding
    pub geocode: String,
    /// Daily weather forecast
    pub weather: String,
    /// Current air quality
    pub air_quality: String,
}

impl Default for MapsEndpoints {
    fn default() -> Self {
        Self {
            place_search: "https://places.googleapis.com/v1/places:searchText".to_string(),
            place_details: "https://places.googleapis.com/v1/places".to_string(),
            routes: "https://routes.googleapis.com/directions/v2:computeRoutes".to_string(),
            geocode: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            weather: "https://weather.googleapis.com/v1/forecast/days:lookup".to_string(),
            air_quality: "https://airquality.googleapis.com/v1/currentConditions:lookup"
                .to_string(),
        }
    }
}

impl MapsEndpoints {
    /// All endpoints under one root, for local stand-ins
    #[must_use]
    pub fn under(base: &str) -> Self {
        Self {
            place_search: format!("{base}/place-search"),
            place_details: format!("{base}/places"),
            routes: format!("{base}/routes"),
            geocode: format!("{base}/geocode"),
            weather: format!("{base}/weather"),
            air_quality: format!("{base}/air-quality"),
        }
    }
}

/// A geocoded place
#[derive(Debug, Clone, PartialEq)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
    address: String,
}

async fn geocode(client: &ApiClient, endpoints: &MapsEndpoints, address: &str) -> Result<Coordinates> {
    let body = client
        .send(
            ApiRequest::get(&endpoints.geocode)
                .with_query("address", address)
                .with_key_param("key"),
        )
        .await?;

    match body["status"].as_str() {
        Some("OK") => {}
        Some("ZERO_RESULTS") => {
            return Err(Error::InvalidInput(format!("No location found for '{address}'")))
        }
        other => {
            return Err(Error::InvalidResponse(format!(
                "geocoding status {}: {}",
                other.unwrap_or("missing"),
                body["error_message"].as_str().unwrap_or_default()
            )))
        }
    }

    let first = &body["results"][0];
    let location = &first["geometry"]["location"];
    match (location["lat"].as_f64(), location["lng"].as_f64()) {
        (Some(latitude), Some(longitude)) => Ok(Coordinates {
            latitude,
            longitude,
            address: first["formatted_address"]
                .as_str()
                .unwrap_or(address)
                .to_string(),
        }),
        _ => Err(Error::InvalidResponse(
            "geocoding result without coordinates".to_string(),
        )),
    }
}

/// Text search for places and points of interest
pub struct FindPlacesTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    endpoints: Arc<MapsEndpoints>,
}

impl FindPlacesTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>, endpoints: Arc<MapsEndpoints>) -> Self {
        let definition = ToolDefinition::new(
            "find_places",
            "Search places and points of interest by free text, e.g. \
             'beach shacks in North Goa' or 'museums near Panaji'.",
        )
        .with_category(ToolCategory::Places)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer", "description": "1-20 (default 5)"}
            },
            "required": ["query"]
        }));
        Self {
            definition,
            client,
            endpoints,
        }
    }
}

#[async_trait::async_trait]
impl Tool for FindPlacesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let query = required_str(&input, "query")?;
        let max_results = optional_u64(&input, "max_results").unwrap_or(5).clamp(1, 20);

        let body = self
            .client
            .send(
                ApiRequest::post(
                    &self.endpoints.place_search,
                    json!({ "textQuery": query, "maxResultCount": max_results }),
                )
                .with_header(FIELD_MASK_HEADER, PLACES_FIELD_MASK),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Details of one place by id
pub struct PlaceDetailsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    endpoints: Arc<MapsEndpoints>,
}

impl PlaceDetailsTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>, endpoints: Arc<MapsEndpoints>) -> Self {
        let definition = ToolDefinition::new(
            "get_place_details",
            "Opening hours, rating, website and summary of a place id from find_places.",
        )
        .with_category(ToolCategory::Places)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "place_id": {"type": "string"}
            },
            "required": ["place_id"]
        }));
        Self {
            definition,
            client,
            endpoints,
        }
    }
}

#[async_trait::async_trait]
impl Tool for PlaceDetailsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let place_id = required_str(&input, "place_id")?;
        if place_id.contains('/') {
            return Err(Error::InvalidInput(format!("Invalid place_id '{place_id}'")));
        }

        let body = self
            .client
            .send(
                ApiRequest::get(format!("{}/{place_id}", self.endpoints.place_details))
                    .with_header(FIELD_MASK_HEADER, PLACE_DETAILS_FIELD_MASK),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Travel time and distance between two places
pub struct RouteTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    endpoints: Arc<MapsEndpoints>,
}

impl RouteTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>, endpoints: Arc<MapsEndpoints>) -> Self {
        let definition = ToolDefinition::new(
            "get_route",
            "Travel duration and distance between two addresses or place names.",
        )
        .with_category(ToolCategory::Routes)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "origin": {"type": "string"},
                "destination": {"type": "string"},
                "travel_mode": {"type": "string", "enum": TRAVEL_MODES, "description": "Default DRIVE"}
            },
            "required": ["origin", "destination"]
        }));
        Self {
            definition,
            client,
            endpoints,
        }
    }
}

#[async_trait::async_trait]
impl Tool for RouteTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let origin = required_str(&input, "origin")?;
        let destination = required_str(&input, "destination")?;
        let travel_mode = optional_str(&input, "travel_mode")
            .unwrap_or("DRIVE")
            .to_uppercase();
        if !TRAVEL_MODES.contains(&travel_mode.as_str()) {
            return Err(Error::InvalidInput(format!("Unknown travel_mode '{travel_mode}'")));
        }

        let body = self
            .client
            .send(
                ApiRequest::post(
                    &self.endpoints.routes,
                    json!({
                        "origin": {"address": origin},
                        "destination": {"address": destination},
                        "travelMode": travel_mode,
                    }),
                )
                .with_header(FIELD_MASK_HEADER, ROUTES_FIELD_MASK),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Orders the stops of a day trip to minimise travel
pub struct OptimizeDayTripTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    endpoints: Arc<MapsEndpoints>,
}

impl OptimizeDayTripTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>, endpoints: Arc<MapsEndpoints>) -> Self {
        let definition = ToolDefinition::new(
            "optimize_day_trip",
            "Find the fastest order to visit a list of stops in one day, starting from \
             a hotel or address and returning there unless an end is given. Returns \
             the stops in visiting order with travel time and distance per leg.",
        )
        .with_category(ToolCategory::Routes)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "start": {"type": "string", "description": "Starting address or place name"},
                "stops": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Places to visit, at most 25"
                },
                "end": {"type": "string", "description": "Final address; defaults to start"},
                "travel_mode": {"type": "string", "enum": DAY_TRIP_MODES, "description": "Default DRIVE"}
            },
            "required": ["start", "stops"]
        }));
        Self {
            definition,
            client,
            endpoints,
        }
    }
}

/// Visiting order from `optimizedIntermediateWaypointIndex`, falling back to input order
pub(super) fn visiting_order(route: &Value, stop_count: usize) -> Result<Vec<usize>> {
    let Some(indices) = route["optimizedIntermediateWaypointIndex"].as_array() else {
        return Ok((0..stop_count).collect());
    };
    let order: Vec<usize> = indices
        .iter()
        .filter_map(Value::as_u64)
        .map(|i| i as usize)
        .collect();
    let mut seen = order.clone();
    seen.sort_unstable();
    seen.dedup();
    if order.len() != stop_count || seen.len() != stop_count || seen.iter().any(|&i| i >= stop_count) {
        return Err(Error::InvalidResponse(format!(
            "Routes returned a waypoint order that does not cover the {stop_count} stops"
        )));
    }
    Ok(order)
}

#[async_trait::async_trait]
impl Tool for OptimizeDayTripTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let origin = required_str(&input, "start")?;
        let end = optional_str(&input, "end").unwrap_or(origin);
        let stops: Vec<&str> = input
            .get("stops")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if stops.is_empty() {
            return Err(Error::InvalidInput("'stops' needs at least one place".to_string()));
        }
        if stops.len() > MAX_DAY_TRIP_STOPS {
            return Err(Error::InvalidInput(format!(
                "At most {MAX_DAY_TRIP_STOPS} stops per day trip, got {}",
                stops.len()
            )));
        }
        let travel_mode = optional_str(&input, "travel_mode")
            .unwrap_or("DRIVE")
            .to_uppercase();
        if !DAY_TRIP_MODES.contains(&travel_mode.as_str()) {
            return Err(Error::InvalidInput(format!(
                "travel_mode '{travel_mode}' cannot be used for day trips"
            )));
        }

        debug!(start = origin, stops = stops.len(), %travel_mode, "Optimizing day trip");
        let intermediates: Vec<Value> = stops.iter().map(|s| json!({ "address": s })).collect();
        let body = self
            .client
            .send(
                ApiRequest::post(
                    &self.endpoints.routes,
                    json!({
                        "origin": {"address": origin},
                        "destination": {"address": end},
                        "intermediates": intermediates,
                        "travelMode": travel_mode,
                        "optimizeWaypointOrder": true,
                    }),
                )
                .with_header(FIELD_MASK_HEADER, DAY_TRIP_FIELD_MASK),
            )
            .await?;

        let route = body["routes"]
            .as_array()
            .and_then(|routes| routes.first())
            .ok_or_else(|| Error::InvalidResponse("Routes found no route through these stops".to_string()))?;
        let order = visiting_order(route, stops.len())?;

        // leg i arrives at the i-th visited stop; the last leg returns to the end
        let legs = route["legs"].as_array().cloned().unwrap_or_default();
        let arrivals = order
            .iter()
            .map(|&i| stops[i])
            .chain(std::iter::once(end));
        let itinerary: Vec<Value> = arrivals
            .enumerate()
            .map(|(n, place)| {
                let leg = legs.get(n).cloned().unwrap_or(Value::Null);
                json!({
                    "step": n + 1,
                    "to": place,
                    "duration": leg["duration"],
                    "distance_meters": leg["distanceMeters"],
                })
            })
            .collect();

        Ok(ToolResult::success(
            json!({
                "start": origin,
                "end": end,
                "travel_mode": travel_mode,
                "order": order.iter().map(|&i| stops[i]).collect::<Vec<_>>(),
                "itinerary": itinerary,
                "total_duration": route["duration"],
                "total_distance_meters": route["distanceMeters"],
            }),
            elapsed_ms(start),
        ))
    }
}

/// Daily forecast for a place name
pub struct WeatherForecastTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    endpoints: Arc<MapsEndpoints>,
}

impl WeatherForecastTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>, endpoints: Arc<MapsEndpoints>) -> Self {
        let definition = ToolDefinition::new(
            "get_weather_forecast",
            "Daily weather forecast (up to 10 days) for a city or address.",
        )
        .with_category(ToolCategory::Weather)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "location": {"type": "string"},
                "days": {"type": "integer", "description": "1-10 (default 5)"}
            },
            "required": ["location"]
        }));
        Self {
            definition,
            client,
            endpoints,
        }
    }
}

#[async_trait::async_trait]
impl Tool for WeatherForecastTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let location = required_str(&input, "location")?;
        let days = optional_u64(&input, "days").unwrap_or(5).clamp(1, 10);

        let coordinates = geocode(&self.client, &self.endpoints, location).await?;
        debug!(location, lat = coordinates.latitude, lng = coordinates.longitude, "Geocoded");

        let forecast = self
            .client
            .send(
                ApiRequest::get(&self.endpoints.weather)
                    .with_query("location.latitude", coordinates.latitude)
                    .with_query("location.longitude", coordinates.longitude)
                    .with_query("days", days),
            )
            .await?;

        Ok(ToolResult::success(
            json!({
                "location": coordinates.address,
                "latitude": coordinates.latitude,
                "longitude": coordinates.longitude,
                "forecast": forecast,
            }),
            elapsed_ms(start),
        ))
    }
}

/// Current air quality for a place name
pub struct AirQualityTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    endpoints: Arc<MapsEndpoints>,
}

impl AirQualityTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>, endpoints: Arc<MapsEndpoints>) -> Self {
        let definition = ToolDefinition::new(
            "get_air_quality",
            "Current air quality index and dominant pollutant for a city or address.",
        )
        .with_category(ToolCategory::Weather)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "location": {"type": "string"}
            },
            "required": ["location"]
        }));
        Self {
            definition,
            client,
            endpoints,
        }
    }
}

#[async_trait::async_trait]
impl Tool for AirQualityTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let location = required_str(&input, "location")?;
        let coordinates = geocode(&self.client, &self.endpoints, location).await?;

        let conditions = self
            .client
            .send(ApiRequest::post(
                &self.endpoints.air_quality,
                json!({
                    "location": {
                        "latitude": coordinates.latitude,
                        "longitude": coordinates.longitude
                    }
                }),
            ))
            .await?;

        Ok(ToolResult::success(
            json!({
                "location": coordinates.address,
                "conditions": conditions,
            }),
            elapsed_ms(start),
        ))
    }
}
