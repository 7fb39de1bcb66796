use super::*;
use crate::registry::{Tool, ToolCategory};
use crate::test_support::spawn_server;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;

type Params = Query<HashMap<String, String>>;

async fn token() -> Json<Value> {
    Json(json!({"access_token": "tok", "expires_in": 1799}))
}

async fn echo_query(Query(query): Params) -> Json<Value> {
    Json(json!({ "echo": query }))
}

async fn city_lookup(Query(query): Params) -> Json<Value> {
    assert_eq!(query.get("subType").map(String::as_str), Some("CITY"));
    Json(json!({ "data": [{ "iataCode": "GOI", "name": "GOA" }] }))
}

async fn hotels_by_city(Query(query): Params) -> Json<Value> {
    let code = query.get("cityCode").cloned().unwrap_or_default();
    let data: Vec<Value> = (0..15)
        .map(|i| json!({ "hotelId": format!("{code}{i:03}"), "name": format!("Hotel {i}") }))
        .collect();
    Json(json!({ "data": data }))
}

async fn failing_offers() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, r#"{"errors":[{"title":"INVALID DATE"}]}"#)
}

/// One segment per request, with bookable seats equal to the seated travelers
async fn flight_availability(Json(body): Json<Value>) -> Json<Value> {
    let leg = &body["originDestinations"][0];
    let seated = body["travelers"]
        .as_array()
        .map(|t| t.iter().filter(|t| t["travelerType"] != "HELD_INFANT").count())
        .unwrap_or_default();
    let date = leg["departureDateTime"]["date"].as_str().unwrap_or_default();
    let time = leg["departureDateTime"]["time"].as_str().unwrap_or("00:00:00");
    Json(json!({
        "data": [{
            "duration": "PT1H15M",
            "segments": [{
                "carrierCode": "6E",
                "number": "531",
                "departure": {"iataCode": leg["originLocationCode"], "at": format!("{date}T{time}")},
                "arrival": {"iataCode": leg["destinationLocationCode"]},
                "availabilityClasses": [
                    {"class": "Y", "numberOfBookableSeats": seated},
                    {"class": "J", "numberOfBookableSeats": 0}
                ]
            }]
        }],
        "travelers": body["travelers"],
    }))
}

async fn hotel_offers(Query(query): Params) -> Json<Value> {
    let id = query.get("hotelIds").cloned().unwrap_or_default();
    if id == "EMPTY001" {
        return Json(json!({ "data": [] }));
    }
    Json(json!({
        "data": [{
            "available": true,
            "hotel": {"hotelId": id, "name": "Sea Breeze", "cityCode": "GOI"},
            "offers": [{
                "id": "OFFER1",
                "checkInDate": query.get("checkInDate"),
                "checkOutDate": query.get("checkOutDate"),
                "boardType": "BREAKFAST",
                "room": {"description": {"text": format!("Deluxe room for {}", query["adults"])}},
                "price": {"currency": "INR", "total": "18400.00"},
                "policies": {"cancellations": [{"deadline": "2026-12-18T12:00:00"}]}
            }]
        }]
    }))
}

/// Visits the stops in reverse when asked to optimise and the mask requests the order
async fn compute_routes(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let stops = body["intermediates"].as_array().map(Vec::len).unwrap_or_default();
    let mask = headers
        .get("x-goog-fieldmask")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let legs: Vec<Value> = (0..=stops)
        .map(|i| json!({"duration": format!("{}s", 600 * (i + 1)), "distanceMeters": 1000 * (i + 1)}))
        .collect();
    let mut route = json!({"duration": "5400s", "distanceMeters": 12000, "legs": legs});
    if body["optimizeWaypointOrder"] == true && mask.contains("optimizedIntermediateWaypointIndex") {
        route["optimizedIntermediateWaypointIndex"] = json!((0..stops).rev().collect::<Vec<_>>());
    }
    Json(json!({ "routes": [route] }))
}

async fn geocode(Query(query): Params) -> Json<Value> {
    if query.get("key").map(String::as_str) != Some("maps-key") {
        return Json(json!({"status": "REQUEST_DENIED", "error_message": "no key"}));
    }
    match query.get("address").map(String::as_str) {
        Some("Goa") => Json(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "Goa, India",
                "geometry": {"location": {"lat": 15.3, "lng": 74.1}}
            }]
        })),
        _ => Json(json!({"status": "ZERO_RESULTS", "results": []})),
    }
}

async fn weather(headers: HeaderMap, Query(query): Params) -> Json<Value> {
    Json(json!({
        "days": query.get("days"),
        "lat": query.get("location.latitude"),
        "key_header": headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
    }))
}

async fn search_text(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "body": body,
        "mask": headers.get("x-goog-fieldmask").and_then(|v| v.to_str().ok()),
    }))
}

async fn rail_echo(headers: HeaderMap, Query(query): Params) -> Json<Value> {
    Json(json!({
        "echo": query,
        "host": headers.get("x-rapidapi-host").and_then(|v| v.to_str().ok()),
        "key": headers.get("x-rapidapi-key").and_then(|v| v.to_str().ok()),
    }))
}

async fn stub_registry() -> ToolRegistry {
    let app = Router::new()
        .route(AMADEUS_TOKEN_PATH, post(token))
        .route("/v2/shopping/flight-offers", get(echo_query))
        .route("/v1/reference-data/locations", get(city_lookup))
        .route("/v1/reference-data/locations/hotels/by-city", get(hotels_by_city))
        .route(
            "/v1/shopping/availability/flight-availabilities",
            post(flight_availability),
        )
        .route("/v3/shopping/hotel-offers", get(hotel_offers))
        .route("/maps/geocode", get(geocode))
        .route("/maps/routes", post(compute_routes))
        .route("/maps/weather", get(weather))
        .route("/maps/place-search", post(search_text))
        .route("/api/v1/checkSeatAvailability", get(rail_echo));
    let base = spawn_server(app).await;

    let settings = TravelSettings {
        amadeus: Some(AmadeusSettings {
            base_url: base.clone(),
            client_id: "id".into(),
            client_secret: SecretString::from("secret".to_string()),
            currency: "INR".into(),
        }),
        maps: Some(MapsSettings {
            api_key: SecretString::from("maps-key".to_string()),
            endpoints: MapsEndpoints::under(&format!("{base}/maps")),
        }),
        rail: Some(RailSettings {
            api_key: SecretString::from("rail-key".to_string()),
            host: "rail.example".into(),
            base_url: base,
        }),
    };
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &settings).unwrap();
    registry
}

async fn run(registry: &ToolRegistry, name: &str, input: Value) -> crate::Result<Value> {
    let tool = registry.get(name).unwrap();
    tool.execute(input).await.map(|r| r.output)
}

#[test]
fn test_missing_credentials_register_nothing() {
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &TravelSettings::default()).unwrap();
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_all_integrations_register() {
    let registry = stub_registry().await;
    assert_eq!(registry.len(), 16);
    assert_eq!(registry.by_category(ToolCategory::Flights).len(), 4);
    assert_eq!(registry.by_category(ToolCategory::FlightSeats).len(), 1);
    assert_eq!(registry.by_category(ToolCategory::Hotels).len(), 2);
    assert_eq!(registry.by_category(ToolCategory::Routes).len(), 2);
    assert_eq!(registry.by_category(ToolCategory::Rail).len(), 3);
    assert_eq!(registry.by_category(ToolCategory::Weather).len(), 2);
}

#[tokio::test]
async fn test_search_flights_builds_offer_query() {
    let registry = stub_registry().await;
    let output = run(
        &registry,
        "search_flights",
        json!({"origin": "del", "destination": "goi", "departure_date": "2026-12-20", "adults": 2}),
    )
    .await
    .unwrap();

    let echo = &output["echo"];
    assert_eq!(echo["originLocationCode"], "DEL");
    assert_eq!(echo["destinationLocationCode"], "GOI");
    assert_eq!(echo["adults"], "2");
    assert_eq!(echo["currencyCode"], "INR");
    assert_eq!(echo["max"], "10");
    assert!(echo.get("returnDate").is_none());
}

#[tokio::test]
async fn test_search_flights_rejects_bad_dates() {
    let registry = stub_registry().await;
    let err = run(
        &registry,
        "search_flights",
        json!({"origin": "DEL", "destination": "GOI", "departure_date": "20/12/2026"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = run(
        &registry,
        "search_flights",
        json!({
            "origin": "DEL", "destination": "GOI",
            "departure_date": "2026-12-20", "return_date": "2026-12-10"
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_upstream_rejection_is_reported() {
    let app = Router::new()
        .route(AMADEUS_TOKEN_PATH, post(token))
        .route("/v2/shopping/flight-offers", get(failing_offers));
    let base = spawn_server(app).await;
    let client = Arc::new(
        ApiClient::new(
            "amadeus",
            &base,
            Credentials::ClientCredentials {
                token_url: AMADEUS_TOKEN_PATH.into(),
                client_id: "id".into(),
                client_secret: SecretString::from("secret".to_string()),
            },
        )
        .unwrap(),
    );
    let tool = SearchFlightsTool::new(client, "INR");
    let err = tool
        .execute(json!({"origin": "DEL", "destination": "GOI", "departure_date": "2026-12-20"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("INVALID DATE"));
}

#[tokio::test]
async fn test_search_hotels_resolves_city_and_caps_results() {
    let registry = stub_registry().await;
    let output = run(
        &registry,
        "search_hotels",
        json!({"city": "Goa", "check_in_date": "2026-12-20", "check_out_date": "2026-12-24"}),
    )
    .await
    .unwrap();

    assert_eq!(output["city_code"], "GOI");
    assert_eq!(output["hotels"].as_array().unwrap().len(), 10);
    assert_eq!(output["hotels"][0]["hotel_id"], "GOI000");
    assert_eq!(output["meta"]["adults"], 1);
}

#[tokio::test]
async fn test_search_hotels_rejects_inverted_stay() {
    let registry = stub_registry().await;
    let err = run(
        &registry,
        "search_hotels",
        json!({"city": "GOI", "check_in_date": "2026-12-24", "check_out_date": "2026-12-20"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_weather_geocodes_then_forecasts() {
    let registry = stub_registry().await;
    let output = run(&registry, "get_weather_forecast", json!({"location": "Goa", "days": 30}))
        .await
        .unwrap();

    assert_eq!(output["location"], "Goa, India");
    assert_eq!(output["forecast"]["days"], "10");
    assert_eq!(output["forecast"]["lat"], "15.3");
    assert_eq!(output["forecast"]["key_header"], "maps-key");

    let err = run(&registry, "get_weather_forecast", json!({"location": "Atlantis"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_find_places_sends_field_mask() {
    let registry = stub_registry().await;
    let output = run(&registry, "find_places", json!({"query": "beach shacks in Goa"}))
        .await
        .unwrap();

    assert_eq!(output["body"]["textQuery"], "beach shacks in Goa");
    assert_eq!(output["body"]["maxResultCount"], 5);
    assert!(output["mask"].as_str().unwrap().contains("places.displayName"));
}

#[tokio::test]
async fn test_train_seats_uses_rapidapi_headers() {
    let registry = stub_registry().await;
    let output = run(
        &registry,
        "check_train_seats",
        json!({
            "train_number": "12617", "from_station": "ndls", "to_station": "mao",
            "date": "2026-12-20", "class_type": "3a"
        }),
    )
    .await
    .unwrap();

    assert_eq!(output["host"], "rail.example");
    assert_eq!(output["key"], "rail-key");
    assert_eq!(output["echo"]["classType"], "3A");
    assert_eq!(output["echo"]["quota"], "GN");
    assert_eq!(output["echo"]["toStationCode"], "MAO");
}

#[tokio::test]
async fn test_seat_availability_lists_classes_per_segment() {
    let registry = stub_registry().await;
    let output = run(
        &registry,
        "check_flight_availability",
        json!({
            "origin": "bom", "destination": "goi", "departure_date": "2026-12-20",
            "departure_time": "10:30:00", "adults": 2, "children": 1, "infants": 1
        }),
    )
    .await
    .unwrap();

    assert_eq!(output["origin"], "BOM");
    let segment = &output["flights"][0]["segments"][0];
    assert_eq!(segment["flight"], "6E531");
    assert_eq!(segment["departure"]["iataCode"], "BOM");
    assert_eq!(segment["departure"]["at"], "2026-12-20T10:30:00");
    assert_eq!(segment["classes"][0], json!({"class": "Y", "seats": 3}));
    assert_eq!(segment["classes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_seat_availability_validates_travelers_and_time() {
    let registry = stub_registry().await;
    let base = json!({"origin": "BOM", "destination": "GOI", "departure_date": "2026-12-20"});

    let mut more_infants = base.clone();
    more_infants["infants"] = json!(2);
    let err = run(&registry, "check_flight_availability", more_infants)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let mut bad_time = base.clone();
    bad_time["departure_time"] = json!("10am");
    let err = run(&registry, "check_flight_availability", bad_time)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HH:MM:SS"));

    let output = run(&registry, "check_flight_availability", base).await.unwrap();
    assert_eq!(output["flights"][0]["segments"][0]["departure"]["at"], "2026-12-20T00:00:00");
    assert_eq!(output["flights"][0]["segments"][0]["classes"][0]["seats"], 1);
}

#[test]
fn test_traveler_ids_are_sequential() {
    let list = flights::travelers(1, 1, 1);
    let kinds: Vec<_> = list.iter().map(|t| t["travelerType"].as_str().unwrap()).collect();
    let ids: Vec<_> = list.iter().map(|t| t["id"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["ADULT", "CHILD", "HELD_INFANT"]);
    assert_eq!(ids, ["1", "2", "3"]);
}

#[tokio::test]
async fn test_hotel_details_summarizes_offers() {
    let registry = stub_registry().await;
    let output = run(
        &registry,
        "get_hotel_details",
        json!({
            "hotel_id": "goi001", "check_in_date": "2026-12-20",
            "check_out_date": "2026-12-24", "adults": 2
        }),
    )
    .await
    .unwrap();

    assert_eq!(output["hotel_id"], "GOI001");
    assert_eq!(output["name"], "Sea Breeze");
    let offer = &output["offers"][0];
    assert_eq!(offer["check_in_date"], "2026-12-20");
    assert_eq!(offer["room"], "Deluxe room for 2");
    assert_eq!(offer["price"], json!({"total": "18400.00", "currency": "INR"}));
    assert_eq!(offer["board_type"], "BREAKFAST");
}

#[tokio::test]
async fn test_hotel_details_rejects_bad_ids_and_empty_results() {
    let registry = stub_registry().await;
    let err = run(&registry, "get_hotel_details", json!({"hotel_id": "GOI/../x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = run(
        &registry,
        "get_hotel_details",
        json!({"hotel_id": "GOI001", "check_in_date": "2026-12-24", "check_out_date": "2026-12-20"}),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("after check_in_date"));

    let err = run(&registry, "get_hotel_details", json!({"hotel_id": "EMPTY001"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No offers"));
}

#[tokio::test]
async fn test_day_trip_follows_optimized_order() {
    let registry = stub_registry().await;
    let output = run(
        &registry,
        "optimize_day_trip",
        json!({
            "start": "Taj Fort Aguada, Goa",
            "stops": ["Fort Aguada", "Baga Beach", "Anjuna Flea Market"],
            "travel_mode": "drive"
        }),
    )
    .await
    .unwrap();

    assert_eq!(
        output["order"],
        json!(["Anjuna Flea Market", "Baga Beach", "Fort Aguada"])
    );
    let itinerary = output["itinerary"].as_array().unwrap();
    assert_eq!(itinerary.len(), 4);
    assert_eq!(itinerary[0]["to"], "Anjuna Flea Market");
    assert_eq!(itinerary[0]["duration"], "600s");
    assert_eq!(itinerary[3]["to"], "Taj Fort Aguada, Goa");
    assert_eq!(itinerary[3]["distance_meters"], 4000);
    assert_eq!(output["end"], "Taj Fort Aguada, Goa");
    assert_eq!(output["total_duration"], "5400s");
}

#[tokio::test]
async fn test_day_trip_rejects_transit_and_oversized_lists() {
    let registry = stub_registry().await;
    let err = run(
        &registry,
        "optimize_day_trip",
        json!({"start": "Panaji", "stops": ["Old Goa"], "travel_mode": "TRANSIT"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let stops: Vec<String> = (0..26).map(|i| format!("Stop {i}")).collect();
    let err = run(&registry, "optimize_day_trip", json!({"start": "Panaji", "stops": stops}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("At most 25"));

    let err = run(&registry, "optimize_day_trip", json!({"start": "Panaji", "stops": ["  "]}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_visiting_order_rejects_partial_permutations() {
    let route = json!({"optimizedIntermediateWaypointIndex": [1, 1]});
    assert!(maps::visiting_order(&route, 2).is_err());
    let route = json!({"optimizedIntermediateWaypointIndex": [1, 0]});
    assert_eq!(maps::visiting_order(&route, 2).unwrap(), vec![1, 0]);
    assert_eq!(maps::visiting_order(&json!({}), 3).unwrap(), vec![0, 1, 2]);
}
