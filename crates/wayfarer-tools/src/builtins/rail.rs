//! Indian Railways tools (RapidAPI)

use super::{elapsed_ms, optional_str, optional_u64, required_date, required_str};
use crate::api_client::ApiRequest;
use crate::error::{Error, Result};
use crate::registry::{Tool, ToolCategory, ToolDefinition, ToolResult};
use crate::ApiClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

const TRAINS_BETWEEN_PATH: &str = "/api/v3/trainBetweenStations";
const LIVE_STATUS_PATH: &str = "/api/v1/liveTrainStatus";
const SEAT_AVAILABILITY_PATH: &str = "/api/v1/checkSeatAvailability";
const CLASS_TYPES: &[&str] = &["1A", "2A", "3A", "3E", "SL", "CC", "EC", "2S"];

fn station_code(input: &Value, key: &str) -> Result<String> {
    let code = required_str(input, key)?.to_uppercase();
    if !(2..=5).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidInput(format!(
            "'{key}' must be a station code such as NDLS or MAO, got '{code}'"
        )));
    }
    Ok(code)
}

/// Trains running between two stations on a date
pub struct SearchTrainsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl SearchTrainsTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "search_trains",
            "Find trains between two Indian Railways stations on a date. Use station \
             codes, e.g. NDLS for New Delhi or MAO for Madgaon (Goa).",
        )
        .with_category(ToolCategory::Rail)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "from_station": {"type": "string"},
                "to_station": {"type": "string"},
                "date": {"type": "string", "description": "YYYY-MM-DD"}
            },
            "required": ["from_station", "to_station", "date"]
        }));
        Self { definition, client }
    }
}

#[async_trait::async_trait]
impl Tool for SearchTrainsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let body = self
            .client
            .send(
                ApiRequest::get(TRAINS_BETWEEN_PATH)
                    .with_query("fromStationCode", station_code(&input, "from_station")?)
                    .with_query("toStationCode", station_code(&input, "to_station")?)
                    .with_query("dateOfJourney", required_date(&input, "date")?),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Live running status of a train
pub struct TrainStatusTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl TrainStatusTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "get_train_status",
            "Live running status of a train by its number.",
        )
        .with_category(ToolCategory::Rail)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "train_number": {"type": "string", "description": "Five digit train number"},
                "start_day": {"type": "integer", "description": "Days ago the run started, 0-4 (default 1)"}
            },
            "required": ["train_number"]
        }));
        Self { definition, client }
    }
}

#[async_trait::async_trait]
impl Tool for TrainStatusTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let train_number = required_str(&input, "train_number")?;
        let start_day = optional_u64(&input, "start_day").unwrap_or(1).min(4);

        let body = self
            .client
            .send(
                ApiRequest::get(LIVE_STATUS_PATH)
                    .with_query("trainNo", train_number)
                    .with_query("startDay", start_day),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}

/// Seat availability on a train for a class and quota
pub struct TrainSeatsTool {
    definition: ToolDefinition,
    client: Arc<ApiClient>,
}

impl TrainSeatsTool {
    /// Create the tool
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let definition = ToolDefinition::new(
            "check_train_seats",
            "Check seat availability on a train between two stations for a travel class.",
        )
        .with_category(ToolCategory::Rail)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "train_number": {"type": "string"},
                "from_station": {"type": "string"},
                "to_station": {"type": "string"},
                "date": {"type": "string", "description": "YYYY-MM-DD"},
                "class_type": {"type": "string", "enum": CLASS_TYPES, "description": "Default SL"},
                "quota": {"type": "string", "description": "Booking quota, default GN (general)"}
            },
            "required": ["train_number", "from_station", "to_station", "date"]
        }));
        Self { definition, client }
    }
}

#[async_trait::async_trait]
impl Tool for TrainSeatsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let class_type = optional_str(&input, "class_type")
            .unwrap_or("SL")
            .to_uppercase();
        if !CLASS_TYPES.contains(&class_type.as_str()) {
            return Err(Error::InvalidInput(format!("Unknown class_type '{class_type}'")));
        }

        let body = self
            .client
            .send(
                ApiRequest::get(SEAT_AVAILABILITY_PATH)
                    .with_query("classType", &class_type)
                    .with_query("fromStationCode", station_code(&input, "from_station")?)
                    .with_query("quota", optional_str(&input, "quota").unwrap_or("GN").to_uppercase())
                    .with_query("toStationCode", station_code(&input, "to_station")?)
                    .with_query("trainNo", required_str(&input, "train_number")?)
                    .with_query("date", required_date(&input, "date")?),
            )
            .await?;
        Ok(ToolResult::success(body, elapsed_ms(start)))
    }
}
