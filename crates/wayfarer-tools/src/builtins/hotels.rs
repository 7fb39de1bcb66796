//! Amadeus hotel search and offers

use super::flights::LOCATIONS_PATH;
use super::{elapsed_ms, optional_str, optional_u64, parse_date, required_date, required_str};
use crate::api_client::ApiRequest;
use crate::error::{Error, Result};
use crate::registry::{Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::ApiClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const HOTELS_BY_CITY_PATH: &str = "/v1/reference-data/locations/hotels/by-city";
const HOTEL_OFFERS_PATH: &str = "/v3/shopping/hotel-offers";
const MAX_HOTELS: usize = 10;

/// Lists hotels in a city for a stay
pub struct SearchHotelsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl SearchHotelsTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "search_hotels",
            "List hotels in a city for the given stay dates. Accepts a city name or \
             its IATA city code. Returns up to 10 hotels with ids, names and locations; \
             rates are not confirmed.",
        )
        .with_category(ToolCategory::Hotels)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name or IATA city code"},
                "check_in_date": {"type": "string", "description": "YYYY-MM-DD"},
                "check_out_date": {"type": "string", "description": "YYYY-MM-DD"},
                "adults": {"type": "integer", "description": "Guests (default 1)"},
                "radius_km": {"type": "integer", "description": "Distance from city centre (default 5)"}
            },
            "required": ["city", "check_in_date", "check_out_date"]
        }));
        Self { definition, client }
    }

    /// IATA city code for a name; three upper-case letters are taken as a code
    async fn resolve_city_code(&self, city: &str) -> Result<String> {
        if city.len() == 3 && city.chars().all(|c| c.is_ascii_uppercase()) {
            return Ok(city.to_string());
        }

        let body = self
            .client
            .send(
                ApiRequest::get(LOCATIONS_PATH)
                    .with_query("keyword", city.to_uppercase())
                    .with_query("subType", "CITY"),
            )
            .await?;

        body["data"]
            .as_array()
            .and_then(|items| items.iter().find_map(|item| item["iataCode"].as_str()))
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidInput(format!("No IATA city code found for '{city}'")))
    }
}

#[async_trait::async_trait]
impl Tool for SearchHotelsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let city = required_str(&input, "city")?;
        let check_in = required_date(&input, "check_in_date")?;
        let check_out = required_date(&input, "check_out_date")?;
        if parse_date("check_out_date", check_out)? <= parse_date("check_in_date", check_in)? {
            return Err(Error::InvalidInput(
                "check_out_date must be after check_in_date".to_string(),
            ));
        }
        let adults = optional_u64(&input, "adults").unwrap_or(1).max(1);

        let city_code = self.resolve_city_code(city).await?;
        debug!(city, %city_code, "Listing hotels");

        let body = self
            .client
            .send(
                ApiRequest::get(HOTELS_BY_CITY_PATH)
                    .with_query("cityCode", &city_code)
                    .with_query("radius", optional_u64(&input, "radius_km").unwrap_or(5))
                    .with_query("radiusUnit", "KM"),
            )
            .await?;

        let hotels: Vec<Value> = body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .take(MAX_HOTELS)
                    .map(|h| {
                        json!({
                            "hotel_id": h["hotelId"],
                            "name": h["name"],
                            "latitude": h["geoCode"]["latitude"],
                            "longitude": h["geoCode"]["longitude"],
                            "distance_km": h["distance"]["value"],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolResult::success(
            json!({
                "city_code": city_code,
                "hotels": hotels,
                "meta": {
                    "check_in_date": check_in,
                    "check_out_date": check_out,
                    "adults": adults,
                    "note": "Hotel list only; room rates and availability are not confirmed."
                }
            }),
            elapsed_ms(start),
        ))
    }
}

/// Room offers for one hotel found by `search_hotels`
pub struct HotelDetailsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl HotelDetailsTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "get_hotel_details",
            "Get room offers for one hotel: room description, total price, board type \
             and cancellation terms. Use a hotel_id returned by search_hotels.",
        )
        .with_category(ToolCategory::Hotels)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "hotel_id": {"type": "string", "description": "Amadeus hotel id, e.g. MCLONGHM"},
                "check_in_date": {"type": "string", "description": "YYYY-MM-DD, optional"},
                "check_out_date": {"type": "string", "description": "YYYY-MM-DD, optional"},
                "adults": {"type": "integer", "description": "Guests (default 1)"}
            },
            "required": ["hotel_id"]
        }));
        Self { definition, client }
    }
}

fn summarize_offer(offer: &Value) -> Value {
    json!({
        "offer_id": offer["id"],
        "check_in_date": offer["checkInDate"],
        "check_out_date": offer["checkOutDate"],
        "room": offer["room"]["description"]["text"],
        "board_type": offer["boardType"],
        "price": {
            "total": offer["price"]["total"],
            "currency": offer["price"]["currency"],
        },
        "cancellation": offer["policies"]["cancellations"],
    })
}

#[async_trait::async_trait]
impl Tool for HotelDetailsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let hotel_id = required_str(&input, "hotel_id")?.to_uppercase();
        if !hotel_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!(
                "'hotel_id' must be alphanumeric, got '{hotel_id}'"
            )));
        }
        let adults = optional_u64(&input, "adults").unwrap_or(1).max(1);

        let mut request = ApiRequest::get(HOTEL_OFFERS_PATH)
            .with_query("hotelIds", &hotel_id)
            .with_query("adults", adults);
        let check_in = optional_str(&input, "check_in_date");
        let check_out = optional_str(&input, "check_out_date");
        if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
            if parse_date("check_out_date", check_out)? <= parse_date("check_in_date", check_in)? {
                return Err(Error::InvalidInput(
                    "check_out_date must be after check_in_date".to_string(),
                ));
            }
        }
        if let Some(check_in) = check_in {
            parse_date("check_in_date", check_in)?;
            request = request.with_query("checkInDate", check_in);
        }
        if let Some(check_out) = check_out {
            parse_date("check_out_date", check_out)?;
            request = request.with_query("checkOutDate", check_out);
        }

        debug!(%hotel_id, adults, "Fetching hotel offers");
        let body = self.client.send(request).await?;

        let entry = body["data"]
            .as_array()
            .and_then(|items| items.first())
            .ok_or_else(|| Error::InvalidInput(format!("No offers found for hotel '{hotel_id}'")))?;

        let offers: Vec<Value> = entry["offers"]
            .as_array()
            .map(|offers| offers.iter().map(summarize_offer).collect())
            .unwrap_or_default();

        Ok(ToolResult::success(
            json!({
                "hotel_id": hotel_id,
                "name": entry["hotel"]["name"],
                "city_code": entry["hotel"]["cityCode"],
                "available": entry["available"],
                "offers": offers,
            }),
            elapsed_ms(start),
        ))
    }
}
