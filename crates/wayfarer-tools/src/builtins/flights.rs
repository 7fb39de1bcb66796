//! Amadeus flight tools

use super::{elapsed_ms, optional_f64, optional_str, optional_u64, required_date, required_str};
use chrono::NaiveTime;
use crate::api_client::ApiRequest;
use crate::error::{Error, Result};
use crate::registry::{Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::ApiClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const FLIGHT_PRICING_PATH: &str = "/v1/shopping/flight-offers/pricing";
pub(crate) const LOCATIONS_PATH: &str = "/v1/reference-data/locations";
const NEAREST_AIRPORTS_PATH: &str = "/v1/reference-data/locations/airports";
const FLIGHT_AVAILABILITY_PATH: &str = "/v1/shopping/availability/flight-availabilities";
const MAX_OFFERS: u64 = 10;
const TRAVEL_CLASSES: &[&str] = &["ECONOMY", "PREMIUM_ECONOMY", "BUSINESS", "FIRST"];

/// Searches flight offers between two airports
pub struct SearchFlightsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
    currency: String,
}

impl SearchFlightsTool {
    /// Create the tool; `currency` is used when the model names none
    #[must_use]
    pub fn new(client: Arc<ApiClient>, currency: impl Into<String>) -> Self {
        let definition = ToolDefinition::new(
            "search_flights",
            "Search flight offers between two airports on a date. Use IATA codes \
             (look them up with get_airport_code when unsure). Returns up to 10 offers \
             with itineraries and prices.",
        )
        .with_category(ToolCategory::Flights)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "origin": {"type": "string", "description": "Origin IATA code, e.g. DEL"},
                "destination": {"type": "string", "description": "Destination IATA code, e.g. GOI"},
                "departure_date": {"type": "string", "description": "YYYY-MM-DD"},
                "return_date": {"type": "string", "description": "YYYY-MM-DD, omit for one-way"},
                "adults": {"type": "integer", "description": "Adult passengers (default 1)"},
                "children": {"type": "integer"},
                "infants": {"type": "integer"},
                "travel_class": {"type": "string", "enum": TRAVEL_CLASSES},
                "non_stop": {"type": "boolean"},
                "max_price": {"type": "integer", "description": "Maximum total price"},
                "currency": {"type": "string", "description": "ISO currency code"}
            },
            "required": ["origin", "destination", "departure_date"]
        }));

        Self {
            definition,
            client,
            currency: currency.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchFlightsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();

        let origin = required_str(&input, "origin")?.to_uppercase();
        let destination = required_str(&input, "destination")?.to_uppercase();
        let departure_date = required_date(&input, "departure_date")?;
        let return_date = match optional_str(&input, "return_date") {
            Some(date) => {
                let ret = super::parse_date("return_date", date)?;
                if ret < super::parse_date("departure_date", departure_date)? {
                    return Err(Error::InvalidInput(
                        "return_date is before departure_date".to_string(),
                    ));
                }
                Some(date)
            }
            None => None,
        };
        let travel_class = optional_str(&input, "travel_class").map(str::to_uppercase);
        if let Some(class) = &travel_class {
            if !TRAVEL_CLASSES.contains(&class.as_str()) {
                return Err(Error::InvalidInput(format!("Unknown travel_class '{class}'")));
            }
        }
        let currency = optional_str(&input, "currency").unwrap_or(&self.currency);

        let request = ApiRequest::get(FLIGHT_OFFERS_PATH)
            .with_query("originLocationCode", &origin)
            .with_query("destinationLocationCode", &destination)
            .with_query("departureDate", departure_date)
            .with_optional_query("returnDate", return_date)
            .with_query("adults", optional_u64(&input, "adults").unwrap_or(1).max(1))
            .with_optional_query("children", optional_u64(&input, "children"))
            .with_optional_query("infants", optional_u64(&input, "infants"))
            .with_optional_query("travelClass", travel_class)
            .with_optional_query(
                "nonStop",
                input.get("non_stop").and_then(Value::as_bool),
            )
            .with_optional_query("maxPrice", optional_f64(&input, "max_price").map(|p| p as u64))
            .with_query("currencyCode", currency.to_uppercase())
            .with_query("max", MAX_OFFERS);

        debug!(%origin, %destination, departure_date, "Searching flight offers");
        let body = self.client.send(request).await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Resolves a city or airport name to IATA codes
pub struct AirportCodeTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl AirportCodeTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "get_airport_code",
            "Find IATA airport and city codes matching a place name, e.g. 'Goa' -> GOI.",
        )
        .with_category(ToolCategory::Flights)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "City or airport name"}
            },
            "required": ["query"]
        }));
        Self { definition, client }
    }
}

#[async_trait::async_trait]
impl Tool for AirportCodeTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let query = required_str(&input, "query")?;

        let body = self
            .client
            .send(
                ApiRequest::get(LOCATIONS_PATH)
                    .with_query("keyword", query.to_uppercase())
                    .with_query("subType", "AIRPORT,CITY"),
            )
            .await?;

        let locations: Vec<Value> = body["data"]
            .as_array()
            .map(|items| items.iter().map(summarize_location).collect())
            .unwrap_or_default();

        Ok(ToolResult::success(
            json!({ "query": query, "locations": locations }),
            elapsed_ms(start),
        ))
    }
}

fn summarize_location(item: &Value) -> Value {
    json!({
        "iata_code": item["iataCode"],
        "name": item["name"],
        "type": item["subType"],
        "city": item["address"]["cityName"],
        "country": item["address"]["countryCode"],
    })
}

/// Lists airports near a coordinate
pub struct NearestAirportsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl NearestAirportsTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "nearest_airports",
            "List airports near a latitude/longitude, closest and busiest first.",
        )
        .with_category(ToolCategory::Flights)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "latitude": {"type": "number"},
                "longitude": {"type": "number"},
                "radius_km": {"type": "integer", "description": "Search radius (default 500)"}
            },
            "required": ["latitude", "longitude"]
        }));
        Self { definition, client }
    }
}

#[async_trait::async_trait]
impl Tool for NearestAirportsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let latitude = optional_f64(&input, "latitude")
            .ok_or_else(|| Error::InvalidInput("Missing 'latitude' parameter".to_string()))?;
        let longitude = optional_f64(&input, "longitude")
            .ok_or_else(|| Error::InvalidInput("Missing 'longitude' parameter".to_string()))?;

        let body = self
            .client
            .send(
                ApiRequest::get(NEAREST_AIRPORTS_PATH)
                    .with_query("latitude", latitude)
                    .with_query("longitude", longitude)
                    .with_query("radius", optional_u64(&input, "radius_km").unwrap_or(500))
                    .with_query("page[limit]", 5)
                    .with_query("sort", "relevance"),
            )
            .await?;

        let airports: Vec<Value> = body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let mut summary = summarize_location(item);
                        summary["distance_km"] = item["distance"]["value"].clone();
                        summary
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolResult::success(
            json!({ "airports": airports }),
            elapsed_ms(start),
        ))
    }
}

/// Re-prices a flight offer before the traveller commits to it
pub struct ConfirmFlightPriceTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl ConfirmFlightPriceTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "confirm_flight_price",
            "Confirm the current price and availability of one flight offer \
             returned by search_flights. Pass the offer object unchanged.",
        )
        .with_category(ToolCategory::Flights)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "flight_offer": {"type": "object", "description": "A flight offer from search_flights"}
            },
            "required": ["flight_offer"]
        }));
        Self { definition, client }
    }
}

#[async_trait::async_trait]
impl Tool for ConfirmFlightPriceTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let offer = input
            .get("flight_offer")
            .filter(|v| v.is_object())
            .cloned()
            .ok_or_else(|| Error::InvalidInput("Missing 'flight_offer' object".to_string()))?;

        let body = self
            .client
            .post(
                FLIGHT_PRICING_PATH,
                json!({
                    "data": {
                        "type": "flight-offers-pricing",
                        "flightOffers": [offer]
                    }
                }),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Bookable seats per class on one route and date
pub struct SeatAvailabilityTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl SeatAvailabilityTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "check_flight_availability",
            "Check bookable seats per booking class for flights on a route and date. \
             Use IATA airport codes; departure_time narrows the search to flights \
             leaving around that time.",
        )
        .with_category(ToolCategory::FlightSeats)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "origin": {"type": "string", "description": "Origin IATA code, e.g. BOM"},
                "destination": {"type": "string", "description": "Destination IATA code, e.g. GOI"},
                "departure_date": {"type": "string", "description": "YYYY-MM-DD"},
                "departure_time": {"type": "string", "description": "HH:MM:SS, optional"},
                "adults": {"type": "integer", "description": "Default 1"},
                "children": {"type": "integer", "description": "Default 0"},
                "infants": {"type": "integer", "description": "Held infants, at most one per adult"}
            },
            "required": ["origin", "destination", "departure_date"]
        }));
        Self { definition, client }
    }
}

/// Amadeus traveler list: adults, then children, then held infants, ids from 1
pub(super) fn travelers(adults: u64, children: u64, infants: u64) -> Vec<Value> {
    let kinds = std::iter::repeat("ADULT")
        .take(adults as usize)
        .chain(std::iter::repeat("CHILD").take(children as usize))
        .chain(std::iter::repeat("HELD_INFANT").take(infants as usize));
    kinds
        .enumerate()
        .map(|(i, kind)| json!({ "id": (i + 1).to_string(), "travelerType": kind }))
        .collect()
}

fn summarize_availability(item: &Value) -> Value {
    let segments: Vec<Value> = item["segments"]
        .as_array()
        .map(|segments| {
            segments
                .iter()
                .map(|seg| {
                    json!({
                        "flight": format!(
                            "{}{}",
                            seg["carrierCode"].as_str().unwrap_or_default(),
                            seg["number"].as_str().unwrap_or_default()
                        ),
                        "departure": seg["departure"],
                        "arrival": seg["arrival"],
                        "classes": seg["availabilityClasses"]
                            .as_array()
                            .map(|classes| {
                                classes
                                    .iter()
                                    .map(|c| json!({
                                        "class": c["class"],
                                        "seats": c["numberOfBookableSeats"],
                                    }))
                                    .collect::<Vec<_>>()
                            })
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "duration": item["duration"], "segments": segments })
}

#[async_trait::async_trait]
impl Tool for SeatAvailabilityTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let origin = required_str(&input, "origin")?.to_uppercase();
        let destination = required_str(&input, "destination")?.to_uppercase();
        let departure_date = required_date(&input, "departure_date")?;

        let mut departure = json!({ "date": departure_date });
        if let Some(time) = optional_str(&input, "departure_time") {
            NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| {
                Error::InvalidInput(format!("'departure_time' must be HH:MM:SS, got '{time}'"))
            })?;
            departure["time"] = json!(time);
        }

        let adults = optional_u64(&input, "adults").unwrap_or(1).max(1);
        let children = optional_u64(&input, "children").unwrap_or(0);
        let infants = optional_u64(&input, "infants").unwrap_or(0);
        if infants > adults {
            return Err(Error::InvalidInput(
                "Each held infant needs an accompanying adult".to_string(),
            ));
        }
        if adults + children > 9 {
            return Err(Error::InvalidInput(
                "At most 9 seated travelers per search".to_string(),
            ));
        }

        debug!(%origin, %destination, departure_date, adults, children, infants, "Checking seat availability");
        let body = self
            .client
            .post(
                FLIGHT_AVAILABILITY_PATH,
                json!({
                    "originDestinations": [{
                        "id": "1",
                        "originLocationCode": origin,
                        "destinationLocationCode": destination,
                        "departureDateTime": departure,
                    }],
                    "travelers": travelers(adults, children, infants),
                    "sources": ["GDS"],
                }),
            )
            .await?;

        let flights: Vec<Value> = body["data"]
            .as_array()
            .map(|items| items.iter().map(summarize_availability).collect())
            .unwrap_or_default();

        Ok(ToolResult::success(
            json!({
                "origin": origin,
                "destination": destination,
                "departure_date": departure_date,
                "flights": flights,
            }),
            elapsed_ms(start),
        ))
    }
}
